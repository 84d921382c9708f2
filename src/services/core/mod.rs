// src/services/core/mod.rs

pub mod infrastructure;
pub mod market_data;

// Re-export all services for convenience
pub use infrastructure::*;
pub use market_data::*;
