//! File manager for data files
//!
//! Manages the backing handle, sequential scans and the fixed-width store.

pub mod backing;
pub mod cursor;
pub mod file_store;

pub use backing::Backing;
pub use cursor::Scan;
pub use file_store::FileStore;
