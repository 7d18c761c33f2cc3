//! Notification record stores.
//!
//! Both backends key records by symbol and hide a record once its
//! `expires_at` has passed, so per-day state resets at the next UTC
//! midnight without a cleanup job.

pub mod file;
pub mod memory;

pub use file::FileRecordStore;
pub use memory::MemoryRecordStore;
