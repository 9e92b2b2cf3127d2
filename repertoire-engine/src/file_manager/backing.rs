//! Byte-level backing for a fixed-width store
//!
//! A real data file in production, an in-memory buffer in tests.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, Write};

/// Random-access byte storage that can report and change its length
pub trait Backing: Read + Write + Seek {
    /// Current length in bytes
    fn byte_len(&mut self) -> io::Result<u64>;

    /// Truncate or zero-extend to `len` bytes
    fn set_byte_len(&mut self, len: u64) -> io::Result<()>;

    /// Push written data to durable storage
    fn sync(&mut self) -> io::Result<()>;
}

impl Backing for File {
    fn byte_len(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn set_byte_len(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

impl Backing for Cursor<Vec<u8>> {
    fn byte_len(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().len() as u64)
    }

    fn set_byte_len(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length exceeds memory"))?;
        self.get_mut().resize(len, 0);
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}
