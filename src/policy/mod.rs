pub mod drift;
pub mod error;
pub mod ownership;
pub mod quantity;
pub mod reconciliation;
pub mod synthesis;
