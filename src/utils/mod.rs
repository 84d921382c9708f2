// src/utils/mod.rs

pub mod error;
pub mod kv_standards;
pub mod logger;
pub mod time;

// Re-export commonly used items
pub use error::{ErrorKind, KvOperationError, KvResult, PulseError, PulseResult};
pub use kv_standards::{lock_key, CacheTTL, KeyPrefix, KvKeyBuilder};
pub use logger::*;
