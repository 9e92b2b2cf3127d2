//! Storage layer for the fixed-width record format
//!
//! This module handles the record model and its binary encoding:
//! - Client records, keys and positions
//! - Record layout (field widths, encode/decode)

pub mod record;
pub mod layout;

pub use record::{ClientRecord, RecordKey, RecordPosition, StoredRecord};
pub use layout::RecordLayout;
