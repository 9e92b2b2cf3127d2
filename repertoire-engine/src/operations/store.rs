//! The record store interface
//!
//! Backings implement the positional primitives (append, scan, get,
//! rewrite). Key lookups, updates, sorting and bisection are built on top of
//! them here, so every backing resolves keys the same way: first match in
//! file order wins.

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::error::{RepertoireError, RepertoireResult, StatusCode};
use crate::storage::{ClientRecord, RecordKey, RecordPosition, StoredRecord};

/// Lazy sequence of records in file order
pub type RecordIter<'a> = Box<dyn Iterator<Item = RepertoireResult<StoredRecord>> + 'a>;

/// A sequential collection of client records
pub trait RecordStore {
    /// Write one record after the last one; returns it as it will read back
    fn append(&mut self, record: &ClientRecord) -> RepertoireResult<StoredRecord>;

    /// Scan every record from the first slot; each call starts over
    fn records(&mut self) -> RepertoireResult<RecordIter<'_>>;

    /// Read the record at a position, `None` past the end
    fn get(&mut self, position: RecordPosition) -> RepertoireResult<Option<StoredRecord>>;

    /// Overwrite the full record at an existing position
    fn rewrite(
        &mut self,
        position: RecordPosition,
        record: &ClientRecord,
    ) -> RepertoireResult<StoredRecord>;

    /// Number of complete records
    fn len(&mut self) -> RepertoireResult<u64>;

    fn is_empty(&mut self) -> RepertoireResult<bool> {
        Ok(self.len()? == 0)
    }

    /// The key as stored records would carry it
    fn normalize_key(&self, key: &RecordKey) -> RecordKey {
        key.clone()
    }

    /// Linear scan for the first record whose names equal the key
    fn find_by_key(&mut self, key: &RecordKey) -> RepertoireResult<Option<StoredRecord>> {
        let key = self.normalize_key(key);
        for item in self.records()? {
            let stored = item?;
            if stored.record.matches(&key) {
                debug!("Found {} at {}", key, stored.position);
                return Ok(Some(stored));
            }
        }
        debug!("No record for {}", key);
        Ok(None)
    }

    /// Replace the phone number of the first record matching the key
    ///
    /// The slot written is the one the matching scan stopped on. It is read
    /// back before the rewrite; if it no longer holds the matched record the
    /// update is refused with [`StatusCode::KeyChanged`].
    fn update_by_key(
        &mut self,
        key: &RecordKey,
        phone_number: i64,
    ) -> RepertoireResult<Option<StoredRecord>> {
        let Some(found) = self.find_by_key(key)? else {
            return Ok(None);
        };

        let current = self
            .get(found.position)?
            .ok_or(RepertoireError::Status(StatusCode::InvalidPosition))?;
        if current.record != found.record {
            warn!("Record at {} changed between scan and update", found.position);
            return Err(RepertoireError::Status(StatusCode::KeyChanged));
        }

        let updated = found.record.with_phone(phone_number);
        let stored = self.rewrite(found.position, &updated)?;
        debug!("Updated phone at {} to {}", stored.position, phone_number);
        Ok(Some(stored))
    }

    /// Reorder records by (last name, first name); equal names keep their order
    ///
    /// Returns the number of slots that were rewritten.
    fn sort_by_name(&mut self) -> RepertoireResult<usize> {
        let current = self
            .records()?
            .map(|item| item.map(|stored| stored.record))
            .collect::<RepertoireResult<Vec<_>>>()?;

        let mut sorted = current.clone();
        sorted.sort_by(|a, b| a.cmp_by_name(b));

        let mut rewritten = 0;
        for (index, (old, new)) in current.iter().zip(&sorted).enumerate() {
            if old != new {
                self.rewrite(RecordPosition::new(index as u64), new)?;
                rewritten += 1;
            }
        }
        debug!("Sorted {} records, {} slots rewritten", sorted.len(), rewritten);
        Ok(rewritten)
    }

    /// Binary search for the first record matching the key
    ///
    /// Only meaningful on a store ordered by [`RecordStore::sort_by_name`].
    fn bisect_by_key(&mut self, key: &RecordKey) -> RepertoireResult<Option<StoredRecord>> {
        let key = self.normalize_key(key);
        let target = ClientRecord::new(key.last_name.clone(), key.first_name.clone(), 0);

        let (mut lo, mut hi) = (0u64, self.len()?);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let stored = self
                .get(RecordPosition::new(mid))?
                .ok_or(RepertoireError::Status(StatusCode::InvalidPosition))?;
            if stored.record.cmp_by_name(&target) == Ordering::Less {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        match self.get(RecordPosition::new(lo))? {
            Some(stored) if stored.record.matches(&key) => Ok(Some(stored)),
            _ => Ok(None),
        }
    }
}
