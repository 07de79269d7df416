pub mod context;
pub mod error;
pub mod identity;
pub mod kinds;
pub mod spec;
