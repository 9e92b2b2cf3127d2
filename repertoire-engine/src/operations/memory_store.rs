//! In-memory record store

use crate::error::{RepertoireError, RepertoireResult, StatusCode};
use crate::storage::{ClientRecord, RecordKey, RecordLayout, RecordPosition, StoredRecord};

use super::store::{RecordIter, RecordStore};

/// Record store held in a vector; nothing is persisted
///
/// With a layout, names are truncated exactly as the file store would.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<ClientRecord>,
    layout: Option<RecordLayout>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Store that mirrors the truncation of a fixed-width layout
    pub fn with_layout(layout: RecordLayout) -> RepertoireResult<Self> {
        layout.validate()?;
        Ok(MemoryStore {
            records: Vec::new(),
            layout: Some(layout),
        })
    }

    fn normalize(&self, record: &ClientRecord) -> ClientRecord {
        match &self.layout {
            Some(layout) => layout.normalize(record),
            None => record.clone(),
        }
    }
}

impl RecordStore for MemoryStore {
    fn append(&mut self, record: &ClientRecord) -> RepertoireResult<StoredRecord> {
        let record = self.normalize(record);
        let position = RecordPosition::new(self.records.len() as u64);
        self.records.push(record.clone());
        Ok(StoredRecord::new(position, record))
    }

    fn records(&mut self) -> RepertoireResult<RecordIter<'_>> {
        Ok(Box::new(self.records.iter().enumerate().map(|(i, record)| {
            Ok(StoredRecord::new(RecordPosition::new(i as u64), record.clone()))
        })))
    }

    fn get(&mut self, position: RecordPosition) -> RepertoireResult<Option<StoredRecord>> {
        Ok(usize::try_from(position.index())
            .ok()
            .and_then(|i| self.records.get(i))
            .map(|record| StoredRecord::new(position, record.clone())))
    }

    fn rewrite(
        &mut self,
        position: RecordPosition,
        record: &ClientRecord,
    ) -> RepertoireResult<StoredRecord> {
        let record = self.normalize(record);
        let slot = usize::try_from(position.index())
            .ok()
            .and_then(|i| self.records.get_mut(i))
            .ok_or(RepertoireError::Status(StatusCode::InvalidPosition))?;
        *slot = record.clone();
        Ok(StoredRecord::new(position, record))
    }

    fn len(&mut self) -> RepertoireResult<u64> {
        Ok(self.records.len() as u64)
    }

    fn normalize_key(&self, key: &RecordKey) -> RecordKey {
        match &self.layout {
            Some(layout) => layout.normalize_key(key),
            None => key.clone(),
        }
    }
}
