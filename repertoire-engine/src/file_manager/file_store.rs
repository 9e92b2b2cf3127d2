//! Fixed-width file store
//!
//! The data file has no header, footer or record count: it is nothing but a
//! run of fixed-width record encodings. The record count is the file size
//! divided by the record width; a trailing partial record is ignored on
//! read and overwritten by the next append.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::error::{RepertoireError, RepertoireResult, StatusCode};
use crate::operations::{RecordIter, RecordStore};
use crate::storage::{ClientRecord, RecordKey, RecordLayout, RecordPosition, StoredRecord};

use super::backing::Backing;
use super::cursor::{fill_slot, Scan, SlotRead};

/// Record store over a fixed-width data file
pub struct FileStore<B: Backing = File> {
    backing: B,
    layout: RecordLayout,
    path: Option<PathBuf>,
}

impl FileStore<File> {
    /// Open a data file read/write, creating it if it cannot be opened
    ///
    /// An existing file is never truncated. If the file can be neither
    /// opened nor created the error carries [`StatusCode::CreateFailed`].
    pub fn open_or_create(path: &Path, layout: RecordLayout) -> RepertoireResult<Self> {
        layout.validate()?;

        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => {
                debug!("Opened data file {}", path.display());
                file
            }
            Err(open_err) => {
                warn!("Cannot open {} read/write ({}), creating it", path.display(), open_err);
                OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create_new(true)
                    .open(path)
                    .map_err(|e| {
                        error!("Cannot create {}: {}", path.display(), e);
                        RepertoireError::Status(StatusCode::CreateFailed)
                    })?
            }
        };

        let mut store = FileStore::from_backing(file, layout)?;
        store.path = Some(path.to_path_buf());
        info!(
            "Data file {} holds {} records of {} bytes",
            path.display(),
            store.len()?,
            layout.record_width()
        );
        Ok(store)
    }
}

impl<B: Backing> FileStore<B> {
    /// Wrap an already open backing
    pub fn from_backing(mut backing: B, layout: RecordLayout) -> RepertoireResult<Self> {
        layout.validate()?;

        let size = backing.byte_len()?;
        let trailing = size % layout.record_width() as u64;
        if trailing != 0 {
            warn!(
                "Data file ends with a partial record ({} of {} bytes); it will be ignored",
                trailing,
                layout.record_width()
            );
        }
        backing.seek(SeekFrom::Start(0))?;

        Ok(FileStore {
            backing,
            layout,
            path: None,
        })
    }

    /// Record layout used by this store
    pub fn layout(&self) -> RecordLayout {
        self.layout
    }

    /// Path of the data file, if file backed
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Flush written records to durable storage
    pub fn sync(&mut self) -> RepertoireResult<()> {
        self.backing.flush()?;
        self.backing.sync()?;
        Ok(())
    }

    /// Give the backing back, e.g. to inspect its bytes
    pub fn into_inner(self) -> B {
        self.backing
    }

    fn width(&self) -> usize {
        self.layout.record_width()
    }

    /// Write one encoded slot at the current position
    fn write_slot(&mut self, bytes: &[u8]) -> RepertoireResult<()> {
        self.backing.write_all(bytes).map_err(|e| {
            if e.kind() == std::io::ErrorKind::WriteZero {
                RepertoireError::Status(StatusCode::ShortWrite)
            } else {
                RepertoireError::Io(e)
            }
        })?;
        self.backing.flush()?;
        Ok(())
    }
}

impl<B: Backing> RecordStore for FileStore<B> {
    fn append(&mut self, record: &ClientRecord) -> RepertoireResult<StoredRecord> {
        let record = self.layout.normalize(record);
        let bytes = self.layout.encode(&record)?;

        let position = RecordPosition::new(self.len()?);
        let end = position.to_offset(self.width());
        if self.backing.byte_len()? != end {
            self.backing.set_byte_len(end)?;
        }
        self.backing.seek(SeekFrom::Start(end))?;

        if let Err(e) = self.write_slot(&bytes) {
            // Drop whatever part of the slot made it out
            if let Err(rollback) = self.backing.set_byte_len(end) {
                error!("Cannot roll back failed append at {}: {}", position, rollback);
            }
            warn!("Append at {} failed: {}", position, e);
            return Err(e);
        }

        debug!("Appended {} at {}", record, position);
        Ok(StoredRecord::new(position, record))
    }

    fn records(&mut self) -> RepertoireResult<RecordIter<'_>> {
        let layout = self.layout;
        Ok(Box::new(Scan::new(&mut self.backing, layout)?))
    }

    fn get(&mut self, position: RecordPosition) -> RepertoireResult<Option<StoredRecord>> {
        if position.index() >= self.len()? {
            return Ok(None);
        }

        self.backing
            .seek(SeekFrom::Start(position.to_offset(self.width())))?;
        let mut buf = vec![0u8; self.width()];
        match fill_slot(&mut self.backing, &mut buf)? {
            SlotRead::Full => {
                let record = self.layout.decode(&buf)?;
                Ok(Some(StoredRecord::new(position, record)))
            }
            SlotRead::Partial(_) | SlotRead::Eof => Ok(None),
        }
    }

    fn rewrite(
        &mut self,
        position: RecordPosition,
        record: &ClientRecord,
    ) -> RepertoireResult<StoredRecord> {
        if position.index() >= self.len()? {
            return Err(RepertoireError::Status(StatusCode::InvalidPosition));
        }

        let record = self.layout.normalize(record);
        let bytes = self.layout.encode(&record)?;
        let offset = position.to_offset(self.width());

        let mut previous = vec![0u8; self.width()];
        self.backing.seek(SeekFrom::Start(offset))?;
        if fill_slot(&mut self.backing, &mut previous)? != SlotRead::Full {
            return Err(RepertoireError::Status(StatusCode::InvalidPosition));
        }

        self.backing.seek(SeekFrom::Start(offset))?;
        if let Err(e) = self.write_slot(&bytes) {
            // Put the old slot back so no torn record remains
            let restored = self
                .backing
                .seek(SeekFrom::Start(offset))
                .and_then(|_| self.backing.write_all(&previous))
                .and_then(|_| self.backing.flush());
            if let Err(rollback) = restored {
                error!("Cannot restore {} after failed rewrite: {}", position, rollback);
            }
            warn!("Rewrite at {} failed: {}", position, e);
            return Err(e);
        }

        debug!("Rewrote {} with {}", position, record);
        Ok(StoredRecord::new(position, record))
    }

    fn len(&mut self) -> RepertoireResult<u64> {
        Ok(self.backing.byte_len()? / self.width() as u64)
    }

    fn normalize_key(&self, key: &RecordKey) -> RecordKey {
        self.layout.normalize_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Read};
    use tempfile::tempdir;

    fn doe() -> ClientRecord {
        ClientRecord::new("Doe", "Jane", 5551234)
    }

    fn roe() -> ClientRecord {
        ClientRecord::new("Roe", "Rick", 5559999)
    }

    fn memory_store() -> FileStore<Cursor<Vec<u8>>> {
        FileStore::from_backing(Cursor::new(Vec::new()), RecordLayout::default()).unwrap()
    }

    /// Backing that accepts at most `capacity` bytes, like a full disk
    struct FullDisk {
        inner: Cursor<Vec<u8>>,
        capacity: usize,
    }

    impl Read for FullDisk {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let pos = self.inner.position() as usize;
            let room = self.capacity.saturating_sub(pos);
            let n = room.min(buf.len());
            self.inner.write(&buf[..n])
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for FullDisk {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    impl Backing for FullDisk {
        fn byte_len(&mut self) -> io::Result<u64> {
            self.inner.byte_len()
        }

        fn set_byte_len(&mut self, len: u64) -> io::Result<()> {
            self.inner.set_byte_len(len)
        }

        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Backing whose writes stop once, after `remaining` more bytes
    struct TornWrite {
        inner: Cursor<Vec<u8>>,
        remaining: Option<usize>,
    }

    impl Read for TornWrite {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Write for TornWrite {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            match self.remaining {
                None => self.inner.write(buf),
                Some(0) => {
                    self.remaining = None;
                    Ok(0)
                }
                Some(n) => {
                    let k = n.min(buf.len());
                    self.remaining = Some(n - k);
                    self.inner.write(&buf[..k])
                }
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for TornWrite {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    impl Backing for TornWrite {
        fn byte_len(&mut self) -> io::Result<u64> {
            self.inner.byte_len()
        }

        fn set_byte_len(&mut self, len: u64) -> io::Result<()> {
            self.inner.set_byte_len(len)
        }

        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// One raw slot of the default layout
    fn raw_slot(last: &[u8], first: &[u8], phone: i64) -> Vec<u8> {
        let layout = RecordLayout::default();
        let w = layout.name_width;
        let mut bytes = vec![0u8; layout.record_width()];
        bytes[..last.len()].copy_from_slice(last);
        bytes[w..w + first.len()].copy_from_slice(first);
        bytes[2 * w..].copy_from_slice(&phone.to_ne_bytes());
        bytes
    }

    #[test]
    fn test_create_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("client_list.txt");

        {
            let mut store = FileStore::open_or_create(&path, RecordLayout::default()).unwrap();
            assert!(store.is_empty().unwrap());
            store.append(&doe()).unwrap();
            store.append(&roe()).unwrap();
        }

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 2 * 48);

        let mut store = FileStore::open_or_create(&path, RecordLayout::default()).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        let all: Vec<_> = store
            .records()
            .unwrap()
            .map(|r| r.unwrap().record)
            .collect();
        assert_eq!(all, vec![doe(), roe()]);
    }

    #[test]
    fn test_open_does_not_truncate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("existing.dat");
        let layout = RecordLayout::default();
        std::fs::write(&path, layout.encode(&doe()).unwrap()).unwrap();

        let mut store = FileStore::open_or_create(&path, layout).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no").join("such").join("dir.dat");

        let err = FileStore::open_or_create(&path, RecordLayout::default())
            .err()
            .unwrap();
        assert_eq!(err.status_code(), StatusCode::CreateFailed);
        assert!(!path.exists());
    }

    #[test]
    fn test_append_roundtrip_is_last() {
        let mut store = memory_store();
        store.append(&doe()).unwrap();
        let stored = store.append(&roe()).unwrap();
        assert_eq!(stored.position, RecordPosition(1));

        let last = store.records().unwrap().last().unwrap().unwrap();
        assert_eq!(last, stored);
        assert_eq!(last.record, roe());
    }

    #[test]
    fn test_count_invariant() {
        let mut store = memory_store();
        for i in 0..7 {
            store
                .append(&ClientRecord::new(format!("Last{}", i), "First", i))
                .unwrap();
        }

        assert_eq!(store.len().unwrap(), 7);
        assert_eq!(store.records().unwrap().count(), 7);
        let bytes = store.into_inner().into_inner();
        assert_eq!(bytes.len(), 7 * RecordLayout::default().record_width());
    }

    #[test]
    fn test_append_truncates_long_names() {
        let mut store = memory_store();
        let long = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        let stored = store.append(&ClientRecord::new(long, "Jo", 1)).unwrap();
        assert_eq!(stored.record.last_name, long[..19].as_bytes());

        let found = store
            .find_by_key(&RecordKey::new(long, "Jo"))
            .unwrap()
            .unwrap();
        assert_eq!(found.position, RecordPosition(0));
        assert_eq!(found.record.last_name, long[..19].as_bytes());
    }

    #[test]
    fn test_embedded_nul_ends_the_name() {
        let mut store = memory_store();
        let stored = store.append(&ClientRecord::new("A\0B", "C", 1)).unwrap();
        assert_eq!(stored.record.last_name, b"A");

        let scanned = store.records().unwrap().next().unwrap().unwrap();
        assert_eq!(scanned, stored);

        let found = store
            .find_by_key(&RecordKey::new("A\0B", "C"))
            .unwrap()
            .unwrap();
        assert_eq!(found.position, RecordPosition(0));
    }

    #[test]
    fn test_find_first_match_wins() {
        let mut store = memory_store();
        store.append(&doe()).unwrap();
        store.append(&roe()).unwrap();
        store.append(&doe().with_phone(42)).unwrap();

        let found = store
            .find_by_key(&RecordKey::new("Doe", "Jane"))
            .unwrap()
            .unwrap();
        assert_eq!(found.position, RecordPosition(0));
        assert_eq!(found.record.phone_number, 5551234);
    }

    #[test]
    fn test_find_on_empty_store_does_not_mutate() {
        let mut store = memory_store();
        assert!(store.find_by_key(&RecordKey::new("X", "Y")).unwrap().is_none());
        assert!(store.into_inner().into_inner().is_empty());
    }

    #[test]
    fn test_doe_roe_scenario() {
        let mut store = memory_store();
        store.append(&doe()).unwrap();
        store.append(&roe()).unwrap();

        let all: Vec<_> = store
            .records()
            .unwrap()
            .map(|r| r.unwrap().record)
            .collect();
        assert_eq!(all, vec![doe(), roe()]);

        let rick = RecordKey::new("Roe", "Rick");
        let jane = RecordKey::new("Doe", "Jane");
        assert_eq!(store.find_by_key(&rick).unwrap().unwrap().record.phone_number, 5559999);

        store.update_by_key(&jane, 1110000).unwrap().unwrap();
        assert_eq!(store.find_by_key(&jane).unwrap().unwrap().record.phone_number, 1110000);
        assert_eq!(store.find_by_key(&rick).unwrap().unwrap().record.phone_number, 5559999);
    }

    #[test]
    fn test_update_isolation() {
        let layout = RecordLayout::default();
        let width = layout.record_width();
        let mut store = memory_store();
        store.append(&doe()).unwrap();
        store.append(&roe()).unwrap();
        store.append(&ClientRecord::new("Poe", "Edgar", 1849)).unwrap();

        let before = store.into_inner().into_inner();
        let mut store = FileStore::from_backing(Cursor::new(before.clone()), layout).unwrap();

        let updated = store
            .update_by_key(&RecordKey::new("Roe", "Rick"), 123)
            .unwrap()
            .unwrap();
        assert_eq!(updated.position, RecordPosition(1));
        assert_eq!(updated.record.key(), roe().key());

        let after = store.into_inner().into_inner();
        assert_eq!(after.len(), before.len());
        assert_eq!(&after[..width], &before[..width]);
        assert_eq!(&after[2 * width..], &before[2 * width..]);
        // Names untouched, only the phone bytes differ
        assert_eq!(&after[width..2 * width - 8], &before[width..2 * width - 8]);
        assert_eq!(&after[2 * width - 8..2 * width], &123i64.to_ne_bytes());
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut store = memory_store();
        store.append(&doe()).unwrap();
        store.append(&roe()).unwrap();
        let key = RecordKey::new("Doe", "Jane");

        store.update_by_key(&key, 777).unwrap().unwrap();
        let once = store.into_inner().into_inner();

        let mut store = FileStore::from_backing(Cursor::new(once.clone()), RecordLayout::default()).unwrap();
        store.update_by_key(&key, 777).unwrap().unwrap();
        assert_eq!(store.into_inner().into_inner(), once);
    }

    #[test]
    fn test_update_missing_key_writes_nothing() {
        let mut store = memory_store();
        store.append(&doe()).unwrap();
        let before = store.into_inner().into_inner();

        let mut store = FileStore::from_backing(Cursor::new(before.clone()), RecordLayout::default()).unwrap();
        assert!(store
            .update_by_key(&RecordKey::new("Roe", "Rick"), 1)
            .unwrap()
            .is_none());
        assert_eq!(store.into_inner().into_inner(), before);
    }

    #[test]
    fn test_update_after_append_targets_matched_slot() {
        // Appending leaves the handle at end of file; the update must still
        // land on the matched slot and not next to the last write.
        let mut store = memory_store();
        store.append(&doe()).unwrap();
        store.append(&roe()).unwrap();
        store.append(&ClientRecord::new("Poe", "Edgar", 1849)).unwrap();

        store.update_by_key(&RecordKey::new("Doe", "Jane"), 5).unwrap();

        let all: Vec<_> = store
            .records()
            .unwrap()
            .map(|r| r.unwrap().record)
            .collect();
        assert_eq!(all[0], doe().with_phone(5));
        assert_eq!(all[1], roe());
        assert_eq!(all[2].phone_number, 1849);
    }

    #[test]
    fn test_partial_tail_is_ignored_then_overwritten() {
        let layout = RecordLayout::default();
        let mut data = layout.encode(&doe()).unwrap();
        data.extend_from_slice(&[0xAB; 5]);

        let mut store = FileStore::from_backing(Cursor::new(data), layout).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.records().unwrap().count(), 1);

        let stored = store.append(&roe()).unwrap();
        assert_eq!(stored.position, RecordPosition(1));
        let bytes = store.into_inner().into_inner();
        assert_eq!(bytes.len(), 2 * layout.record_width());
        let mut reopened = FileStore::from_backing(Cursor::new(bytes), layout).unwrap();
        let all: Vec<_> = reopened
            .records()
            .unwrap()
            .map(|r| r.unwrap().record)
            .collect();
        assert_eq!(all, vec![doe(), roe()]);
    }

    #[test]
    fn test_short_write_fails_and_rolls_back() {
        let layout = RecordLayout::default();
        let backing = FullDisk {
            inner: Cursor::new(Vec::new()),
            capacity: layout.record_width() + 10,
        };
        let mut store = FileStore::from_backing(backing, layout).unwrap();

        store.append(&doe()).unwrap();
        let err = store.append(&roe()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::ShortWrite);

        assert_eq!(store.len().unwrap(), 1);
        let disk = store.into_inner();
        assert_eq!(disk.inner.get_ref().len(), layout.record_width());
    }

    #[test]
    fn test_get_and_rewrite_bounds() {
        let mut store = memory_store();
        store.append(&doe()).unwrap();

        assert_eq!(store.get(RecordPosition(0)).unwrap().unwrap().record, doe());
        assert!(store.get(RecordPosition(1)).unwrap().is_none());

        let err = store.rewrite(RecordPosition(1), &roe()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidPosition);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_sort_and_bisect() {
        let mut store = memory_store();
        store.append(&roe()).unwrap();
        store.append(&doe()).unwrap();
        store.append(&ClientRecord::new("Doe", "Jane", 2)).unwrap();
        store.append(&ClientRecord::new("Abel", "Zoe", 3)).unwrap();

        let rewritten = store.sort_by_name().unwrap();
        assert_eq!(rewritten, 2);

        let all: Vec<_> = store
            .records()
            .unwrap()
            .map(|r| r.unwrap().record)
            .collect();
        assert_eq!(
            all,
            vec![
                ClientRecord::new("Abel", "Zoe", 3),
                doe(),
                ClientRecord::new("Doe", "Jane", 2),
                roe(),
            ]
        );
        assert_eq!(store.sort_by_name().unwrap(), 0);

        let found = store
            .bisect_by_key(&RecordKey::new("Doe", "Jane"))
            .unwrap()
            .unwrap();
        assert_eq!(found.position, RecordPosition(1));
        assert_eq!(found.record.phone_number, 5551234);
        assert!(store
            .bisect_by_key(&RecordKey::new("Moe", "Ann"))
            .unwrap()
            .is_none());
        assert!(store
            .bisect_by_key(&RecordKey::new("Zed", "Zed"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_latin1_names_survive_update_and_sort() {
        let layout = RecordLayout::default();
        let width = layout.record_width();
        let helene: &[u8] = &[b'H', 0xE9, b'l', 0xE8, b'n', b'e'];
        let zoe = raw_slot(&[b'Z', 0xE9], b"Ana", 1);
        let mut data = zoe.clone();
        data.extend_from_slice(&raw_slot(helene, b"Mo", 2));
        let mut store = FileStore::from_backing(Cursor::new(data), layout).unwrap();

        // 0xE8 and 0xE9 are different names even though neither is UTF-8
        assert!(store
            .find_by_key(&RecordKey::new(vec![b'Z', 0xE8], "Ana"))
            .unwrap()
            .is_none());

        let key = store.get(RecordPosition(1)).unwrap().unwrap().record.key();
        let updated = store.update_by_key(&key, 3).unwrap().unwrap();
        assert_eq!(updated.position, RecordPosition(1));
        assert_eq!(updated.record.last_name, helene);

        assert_eq!(store.sort_by_name().unwrap(), 2);
        let bytes = store.into_inner().into_inner();
        assert_eq!(&bytes[..width], &raw_slot(helene, b"Mo", 3)[..]);
        assert_eq!(&bytes[width..], &zoe[..]);
    }

    #[test]
    fn test_torn_rewrite_restores_slot() {
        let layout = RecordLayout::default();
        let mut data = layout.encode(&doe()).unwrap();
        data.extend_from_slice(&layout.encode(&roe()).unwrap());
        let backing = TornWrite {
            inner: Cursor::new(data.clone()),
            remaining: None,
        };
        let mut store = FileStore::from_backing(backing, layout).unwrap();

        // Stop halfway through the phone field
        store.backing.remaining = Some(2 * layout.name_width + 4);
        let err = store
            .update_by_key(&RecordKey::new("Doe", "Jane"), -1)
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::ShortWrite);

        assert_eq!(store.get(RecordPosition(0)).unwrap().unwrap().record, doe());
        assert_eq!(store.into_inner().inner.into_inner(), data);
    }

    #[test]
    fn test_sync_on_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sync.dat");
        let mut store = FileStore::open_or_create(&path, RecordLayout::default()).unwrap();
        store.append(&doe()).unwrap();
        store.sync().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 48);
    }
}
