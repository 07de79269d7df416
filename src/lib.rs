pub mod core;
pub mod model;
pub mod policy;
pub mod service;

#[cfg(test)]
mod testing;
