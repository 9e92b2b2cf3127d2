//! Client records and their addressing
//!
//! A record is identified on disk only by its position: the index of its
//! fixed-width slot in the data file. Names are raw bytes; they are compared
//! and written back exactly as read, and only decoded for display.

use std::fmt;

/// Position of a record in file order (zero-based slot index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordPosition(pub u64);

impl RecordPosition {
    /// Create a new record position
    pub fn new(index: u64) -> Self {
        RecordPosition(index)
    }

    /// Slot index
    pub fn index(&self) -> u64 {
        self.0
    }

    /// Byte offset of this slot for a given record width
    pub fn to_offset(&self, record_width: usize) -> u64 {
        self.0 * record_width as u64
    }

    /// Position following this one
    pub fn next(&self) -> Self {
        RecordPosition(self.0 + 1)
    }
}

impl fmt::Display for RecordPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lookup key: (last name, first name)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub last_name: Vec<u8>,
    pub first_name: Vec<u8>,
}

impl RecordKey {
    pub fn new(last_name: impl Into<Vec<u8>>, first_name: impl Into<Vec<u8>>) -> Self {
        RecordKey {
            last_name: last_name.into(),
            first_name: first_name.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            String::from_utf8_lossy(&self.last_name),
            String::from_utf8_lossy(&self.first_name)
        )
    }
}

/// One client entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub last_name: Vec<u8>,
    pub first_name: Vec<u8>,
    pub phone_number: i64,
}

impl ClientRecord {
    pub fn new(
        last_name: impl Into<Vec<u8>>,
        first_name: impl Into<Vec<u8>>,
        phone_number: i64,
    ) -> Self {
        ClientRecord {
            last_name: last_name.into(),
            first_name: first_name.into(),
            phone_number,
        }
    }

    /// Key of this record
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.last_name.clone(), self.first_name.clone())
    }

    /// Exact comparison of both name fields against a key
    pub fn matches(&self, key: &RecordKey) -> bool {
        self.last_name == key.last_name && self.first_name == key.first_name
    }

    /// Copy of this record carrying a different phone number
    pub fn with_phone(&self, phone_number: i64) -> Self {
        ClientRecord {
            phone_number,
            ..self.clone()
        }
    }

    /// Ordering used by name sorts: last name, then first name, bytewise
    pub fn cmp_by_name(&self, other: &ClientRecord) -> std::cmp::Ordering {
        self.last_name
            .cmp(&other.last_name)
            .then_with(|| self.first_name.cmp(&other.first_name))
    }
}

impl fmt::Display for ClientRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Last Name: |{}| \tFirst Name: |{}| \tPhone Number: |{}|",
            String::from_utf8_lossy(&self.last_name),
            String::from_utf8_lossy(&self.first_name),
            self.phone_number
        )
    }
}

/// A record together with the slot it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub position: RecordPosition,
    pub record: ClientRecord,
}

impl StoredRecord {
    pub fn new(position: RecordPosition, record: ClientRecord) -> Self {
        StoredRecord { position, record }
    }
}
