//! Record store operations
//!
//! The `RecordStore` interface and the backings that are not file based.

pub mod store;
pub mod memory_store;

pub use store::{RecordIter, RecordStore};
pub use memory_store::MemoryStore;
