//! Repertoire Engine - fixed-width client record store
//!
//! This crate provides the record store behind the Repertoire client
//! directory: a flat file of fixed-size records supporting append, full scan,
//! lookup by (last name, first name) and in-place update.

pub mod error;
pub mod storage;
pub mod file_manager;
pub mod operations;

pub use error::{RepertoireError, RepertoireResult, StatusCode};
pub use file_manager::FileStore;
pub use operations::{MemoryStore, RecordStore};
pub use storage::{ClientRecord, RecordKey, RecordLayout, RecordPosition, StoredRecord};
