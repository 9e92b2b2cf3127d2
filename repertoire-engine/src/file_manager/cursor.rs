//! Sequential scan cursor over a fixed-width data file
//!
//! The cursor owns the only notion of "where we are" during a scan: the
//! position of the next slot to read. Every yielded record carries the
//! position it was read from, so callers never derive offsets from the file
//! handle's side effects.

use std::io::{self, Read, Seek, SeekFrom};

use tracing::{debug, trace};

use crate::error::RepertoireResult;
use crate::storage::{RecordLayout, RecordPosition, StoredRecord};

use super::backing::Backing;

/// Lazy scan from slot 0 to the last complete record
pub struct Scan<'a, B: Backing> {
    backing: &'a mut B,
    layout: RecordLayout,
    next: RecordPosition,
    /// End of file reached, or a read failed
    done: bool,
    buf: Vec<u8>,
}

impl<'a, B: Backing> Scan<'a, B> {
    /// Start a scan at offset 0
    pub fn new(backing: &'a mut B, layout: RecordLayout) -> RepertoireResult<Self> {
        backing.seek(SeekFrom::Start(0))?;
        Ok(Scan {
            backing,
            layout,
            next: RecordPosition::new(0),
            done: false,
            buf: vec![0u8; layout.record_width()],
        })
    }
}

impl<B: Backing> Iterator for Scan<'_, B> {
    type Item = RepertoireResult<StoredRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match fill_slot(&mut *self.backing, &mut self.buf) {
            Ok(SlotRead::Full) => {}
            Ok(SlotRead::Partial(n)) => {
                debug!("Ignoring partial record of {} bytes at {}", n, self.next);
                self.done = true;
                return None;
            }
            Ok(SlotRead::Eof) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        }

        let position = self.next;
        match self.layout.decode(&self.buf) {
            Ok(record) => {
                trace!("Scanned {} {}", position, record);
                self.next = position.next();
                Some(Ok(StoredRecord::new(position, record)))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Outcome of reading one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotRead {
    Full,
    Partial(usize),
    Eof,
}

/// Read one whole slot; a slot cut short by end of file is reported, not an error
pub(crate) fn fill_slot<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<SlotRead> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Ok(if filled == 0 {
                    SlotRead::Eof
                } else {
                    SlotRead::Partial(filled)
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(SlotRead::Full)
}
