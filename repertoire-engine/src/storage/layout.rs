//! Fixed-width record layout
//!
//! Every record occupies the same number of bytes, with no delimiters:
//!
//! ```text
//! [last_name: W][first_name: W][phone_number: 8, native endian]
//! ```
//!
//! A name field of width `W` carries at most `W - 1` bytes of text followed
//! by zero padding, so a stored name is always NUL terminated. The record at
//! slot `i` starts at byte `i * record_width`.
//!
//! Name bytes are kept as they are: text that is not UTF-8 (Latin-1 files,
//! for instance) reads back and rewrites byte for byte.

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use serde::Deserialize;
use std::io::{Cursor, Write};

use crate::error::{RepertoireError, RepertoireResult, StatusCode};

use super::record::{ClientRecord, RecordKey};

/// Field widths of the on-disk record encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecordLayout {
    /// Width in bytes of each name field, terminator included
    pub name_width: usize,
}

impl Default for RecordLayout {
    fn default() -> Self {
        RecordLayout {
            name_width: Self::DEFAULT_NAME_WIDTH,
        }
    }
}

impl RecordLayout {
    /// Name width used by existing data files
    pub const DEFAULT_NAME_WIDTH: usize = 20;
    /// Smallest usable name width (one byte of text plus terminator)
    pub const MIN_NAME_WIDTH: usize = 2;
    /// Largest accepted name width
    pub const MAX_NAME_WIDTH: usize = 4096;
    /// Width of the phone number field
    pub const PHONE_WIDTH: usize = 8;

    /// Create a layout, rejecting widths that cannot hold a name
    pub fn new(name_width: usize) -> RepertoireResult<Self> {
        let layout = RecordLayout { name_width };
        layout.validate()?;
        Ok(layout)
    }

    /// Check the width bounds
    pub fn validate(&self) -> RepertoireResult<()> {
        if (Self::MIN_NAME_WIDTH..=Self::MAX_NAME_WIDTH).contains(&self.name_width) {
            Ok(())
        } else {
            Err(RepertoireError::Status(StatusCode::InvalidLayout))
        }
    }

    /// Bytes occupied by one record
    pub fn record_width(&self) -> usize {
        2 * self.name_width + Self::PHONE_WIDTH
    }

    /// Longest name, in bytes, that survives encoding
    pub fn max_name_len(&self) -> usize {
        self.name_width - 1
    }

    /// Cut a name to what the encoding keeps
    ///
    /// The name ends at its first NUL, and is capped at [`max_name_len`]
    /// bytes. A UTF-8 name is cut on a char boundary; other bytes are cut
    /// where the cap falls.
    ///
    /// [`max_name_len`]: RecordLayout::max_name_len
    pub fn truncate_name<'a>(&self, name: &'a [u8]) -> &'a [u8] {
        let name = match name.iter().position(|&b| b == 0) {
            Some(nul) => &name[..nul],
            None => name,
        };
        let max = self.max_name_len();
        if name.len() <= max {
            return name;
        }
        let mut end = max;
        if let Ok(text) = std::str::from_utf8(name) {
            while !text.is_char_boundary(end) {
                end -= 1;
            }
        }
        &name[..end]
    }

    /// The record exactly as it will read back after encoding
    pub fn normalize(&self, record: &ClientRecord) -> ClientRecord {
        ClientRecord {
            last_name: self.truncate_name(&record.last_name).to_vec(),
            first_name: self.truncate_name(&record.first_name).to_vec(),
            phone_number: record.phone_number,
        }
    }

    /// The key as it compares against stored records
    pub fn normalize_key(&self, key: &RecordKey) -> RecordKey {
        RecordKey::new(
            self.truncate_name(&key.last_name),
            self.truncate_name(&key.first_name),
        )
    }

    /// Encode a record into exactly `record_width` bytes
    pub fn encode(&self, record: &ClientRecord) -> RepertoireResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.record_width());
        self.write_name(&mut buf, &record.last_name)?;
        self.write_name(&mut buf, &record.first_name)?;
        buf.write_i64::<NativeEndian>(record.phone_number)?;
        debug_assert_eq!(buf.len(), self.record_width());
        Ok(buf)
    }

    /// Decode one record from a slot's bytes
    pub fn decode(&self, data: &[u8]) -> RepertoireResult<ClientRecord> {
        if data.len() < self.record_width() {
            return Err(RepertoireError::InvalidFormat(format!(
                "Record too short: {} bytes, expected {}",
                data.len(),
                self.record_width()
            )));
        }

        let w = self.name_width;
        let last_name = read_name(&data[..w]);
        let first_name = read_name(&data[w..2 * w]);
        let phone_number = Cursor::new(&data[2 * w..]).read_i64::<NativeEndian>()?;

        Ok(ClientRecord {
            last_name,
            first_name,
            phone_number,
        })
    }

    fn write_name(&self, buf: &mut Vec<u8>, name: &[u8]) -> RepertoireResult<()> {
        let text = self.truncate_name(name);
        buf.write_all(text)?;
        buf.resize(buf.len() + self.name_width - text.len(), 0);
        Ok(())
    }
}

/// Field bytes up to the first NUL
fn read_name(field: &[u8]) -> Vec<u8> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    field[..end].to_vec()
}
