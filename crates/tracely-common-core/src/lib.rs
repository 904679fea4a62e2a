//! Tracely common core types and utilities.

pub mod clock;
pub mod store;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use store::{FileStore, LocalStore, MemoryStore, StoreError};
