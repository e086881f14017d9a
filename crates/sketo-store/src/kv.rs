//! The storage engine proper: a sorted in-memory table over a write-ahead
//! log.
//!
//! All writes append to the log (fsynced) before touching the table, so a
//! crash at any point replays to a prefix of the acknowledged history.
//! Reads and prefix scans are served from the table and never touch disk.
//! Overwritten and deleted records accumulate in the log as garbage until
//! [`Store::compact`] rewrites it from live state.
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

use crate::wal::{Record, Wal, record_len};
use crate::{MAX_LIST_LIMIT, MAX_LIST_OFFSET, Result, StoreError};

// Chunk size for prefix deletion, bounding write-batch memory.
const DELETE_CHUNK: usize = 10_000;

/// Handle to an open store. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

struct Inner {
    mem: RwLock<BTreeMap<Vec<u8>, Bytes>>,
    // Writers serialize on this lock so the log and the table apply
    // mutations in the same order. Readers never take it.
    wal: Mutex<Wal>,
}

impl Store {
    /// Open a store at `dir`, creating it if needed and replaying the
    /// write-ahead log.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let mut mem = BTreeMap::new();
        let mut wal = Wal::open(dir.as_ref(), |record| match record {
            Record::Set { key, value } => {
                mem.insert(key, value);
            }
            Record::Delete { key } => {
                mem.remove(&key);
            }
        })?;
        wal.live_bytes = mem
            .iter()
            .map(|(key, value)| record_len(key, value))
            .sum();
        tracing::info!(
            dir = %dir.as_ref().display(),
            entries = mem.len(),
            log_bytes = wal.total_bytes,
            "store opened"
        );
        Ok(Self {
            inner: Arc::new(Inner {
                mem: RwLock::new(mem),
                wal: Mutex::new(wal),
            }),
        })
    }

    /// Point lookup. Returns [`StoreError::NotFound`] for a missing key.
    pub fn get(&self, key: &[u8]) -> Result<Bytes> {
        self.inner
            .mem
            .read()
            .get(key)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    /// Atomic single-key write.
    pub fn set(&self, key: &[u8], value: impl Into<Bytes>) -> Result<()> {
        self.batch_set(vec![(key.to_vec(), value.into())])
    }

    /// Idempotent single-key delete; a missing key is not an error.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.batch_delete(vec![key.to_vec()])
    }

    /// Write a group of pairs with one log append and one fsync.
    pub fn batch_set(&self, pairs: Vec<(Vec<u8>, Bytes)>) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let records: Vec<Record> = pairs
            .into_iter()
            .map(|(key, value)| Record::Set { key, value })
            .collect();
        self.apply(records)
    }

    /// Delete a group of keys with one log append and one fsync.
    pub fn batch_delete(&self, keys: Vec<Vec<u8>>) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let records: Vec<Record> = keys
            .into_iter()
            .map(|key| Record::Delete { key })
            .collect();
        self.apply(records)
    }

    fn apply(&self, records: Vec<Record>) -> Result<()> {
        let mut wal = self.inner.wal.lock();
        wal.append(&records)?;
        let mut mem = self.inner.mem.write();
        for record in records {
            match record {
                Record::Set { key, value } => {
                    if let Some(old) = mem.get(&key) {
                        wal.live_bytes -= record_len(&key, old);
                    }
                    wal.live_bytes += record_len(&key, &value);
                    mem.insert(key, value);
                }
                Record::Delete { key } => {
                    if let Some(old) = mem.remove(&key) {
                        wal.live_bytes -= record_len(&key, &old);
                    }
                }
            }
        }
        Ok(())
    }

    /// Visit every `(key, value)` under `prefix` in ascending key order.
    /// The callback returns `false` to stop early.
    pub fn scan_prefix<E, F>(&self, prefix: &[u8], mut f: F) -> std::result::Result<(), E>
    where
        F: FnMut(&[u8], &Bytes) -> std::result::Result<bool, E>,
    {
        let mem = self.inner.mem.read();
        for (key, value) in mem
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
        {
            if !f(key, value)? {
                break;
            }
        }
        Ok(())
    }

    /// Page through keys under `base + filter`, then dereference each found
    /// suffix against `base` with a second point lookup.
    ///
    /// The indirection is what makes index-only keys work: an index entry
    /// stores no value, but its trailing `i/<id>/` component re-keys to the
    /// primary document when appended to `base`. Dangling entries (index
    /// without document) are skipped.
    ///
    /// `offset` must be at most [`MAX_LIST_OFFSET`]; a `limit` of `-1` (or
    /// anything above [`MAX_LIST_LIMIT`]) means the cap.
    pub fn list(
        &self,
        base: &[u8],
        filter: &[u8],
        offset: i64,
        limit: i64,
    ) -> Result<Vec<(Vec<u8>, Bytes)>> {
        if offset > MAX_LIST_OFFSET {
            return Err(StoreError::OffsetTooLarge);
        }
        let offset = offset.max(0);
        let limit = if limit == -1 || limit > MAX_LIST_LIMIT {
            MAX_LIST_LIMIT
        } else {
            limit
        };
        if limit <= 0 {
            return Ok(Vec::new());
        }

        let scan_prefix: Vec<u8> = [base, filter].concat();
        let mut suffixes = Vec::new();
        {
            let mem = self.inner.mem.read();
            let mut pos: i64 = 0;
            for (key, _) in mem
                .range::<[u8], _>((Bound::Included(scan_prefix.as_slice()), Bound::Unbounded))
                .take_while(|(key, _)| key.starts_with(&scan_prefix))
            {
                if pos >= offset {
                    suffixes.push(key[scan_prefix.len()..].to_vec());
                    if pos - offset + 1 >= limit {
                        break;
                    }
                }
                pos += 1;
            }
        }

        let mut out = Vec::with_capacity(suffixes.len());
        for suffix in suffixes {
            let doc_key: Vec<u8> = [base, suffix.as_slice()].concat();
            match self.get(&doc_key) {
                Ok(value) => out.push((suffix, value)),
                Err(StoreError::NotFound) => {
                    tracing::warn!(
                        key = %String::from_utf8_lossy(&doc_key),
                        "index entry without document; skipping"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }

    /// Number of keys under `prefix`.
    pub fn count(&self, prefix: &[u8]) -> Result<i64> {
        let mem = self.inner.mem.read();
        let count = mem
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .count();
        Ok(count as i64)
    }

    /// Delete every key under `prefix`, in chunks to bound batch memory.
    pub fn delete_by_prefix(&self, prefix: &[u8]) -> Result<()> {
        let keys: Vec<Vec<u8>> = {
            let mem = self.inner.mem.read();
            mem.range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
                .take_while(|(key, _)| key.starts_with(prefix))
                .map(|(key, _)| key.clone())
                .collect()
        };
        for chunk in keys.chunks(DELETE_CHUNK) {
            self.batch_delete(chunk.to_vec())?;
            tracing::debug!(deleted = chunk.len(), "prefix delete chunk");
        }
        Ok(())
    }

    /// Truncate the entire store.
    pub fn drop_all(&self) -> Result<()> {
        let mut wal = self.inner.wal.lock();
        wal.reset()?;
        self.inner.mem.write().clear();
        Ok(())
    }

    /// Run one round of value-log garbage collection. Returns `true` when a
    /// rewrite happened, so callers loop until no work remains; `false` when
    /// less than half the log is garbage.
    pub fn compact(&self) -> Result<bool> {
        let mut wal = self.inner.wal.lock();
        let dead = wal.total_bytes.saturating_sub(wal.live_bytes);
        if dead == 0 || dead * 2 <= wal.total_bytes {
            return Ok(false);
        }
        let mem = self.inner.mem.read();
        wal.rewrite(mem.iter())?;
        tracing::info!(
            reclaimed = dead,
            log_bytes = wal.total_bytes,
            "compacted value log"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::fs::OpenOptions;
    use std::io::Write;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, Store) {
        let dir = TempDir::new().expect("tempdir");
        let store = Store::open(dir.path()).expect("open");
        (dir, store)
    }

    #[test]
    fn set_get_delete_round_trip() {
        let (_dir, store) = open_temp();
        store.set(b"k1", Bytes::from_static(b"v1")).expect("set");
        assert_eq!(store.get(b"k1").expect("get"), Bytes::from_static(b"v1"));
        store.set(b"k1", Bytes::from_static(b"v2")).expect("set");
        assert_eq!(store.get(b"k1").expect("get"), Bytes::from_static(b"v2"));
        store.delete(b"k1").expect("delete");
        assert!(store.get(b"k1").unwrap_err().is_not_found());
    }

    #[test]
    fn missing_key_is_not_found_and_delete_is_idempotent() {
        let (_dir, store) = open_temp();
        assert!(store.get(b"nope").unwrap_err().is_not_found());
        store.delete(b"nope").expect("first delete");
        store.delete(b"nope").expect("second delete");
    }

    #[test]
    fn scan_is_ordered_and_prefix_bounded() {
        let (_dir, store) = open_temp();
        store
            .batch_set(vec![
                (b"a/2/".to_vec(), Bytes::from_static(b"2")),
                (b"a/1/".to_vec(), Bytes::from_static(b"1")),
                (b"b/1/".to_vec(), Bytes::from_static(b"x")),
                (b"a/3/".to_vec(), Bytes::from_static(b"3")),
            ])
            .expect("batch");
        let mut seen = Vec::new();
        store
            .scan_prefix::<Infallible, _>(b"a/", |key, value| {
                seen.push((key.to_vec(), value.clone()));
                Ok(true)
            })
            .expect("scan");
        let keys: Vec<_> = seen.iter().map(|(k, _)| k.as_slice()).collect();
        assert_eq!(keys, vec![&b"a/1/"[..], &b"a/2/"[..], &b"a/3/"[..]]);
    }

    #[test]
    fn scan_stops_when_callback_returns_false() {
        let (_dir, store) = open_temp();
        for i in 0..10u8 {
            store
                .set(format!("p/{i}/").as_bytes(), Bytes::from(vec![i]))
                .expect("set");
        }
        let mut visited = 0;
        store
            .scan_prefix::<Infallible, _>(b"p/", |_, _| {
                visited += 1;
                Ok(visited < 3)
            })
            .expect("scan");
        assert_eq!(visited, 3);
    }

    #[test]
    fn list_dereferences_index_suffixes() {
        let (_dir, store) = open_temp();
        // Primary document plus two index-only keys pointing at it.
        store
            .set(b"ex/po/i/p1/", Bytes::from_static(b"{\"id\":\"p1\"}"))
            .expect("doc");
        store
            .batch_set(vec![
                (b"ex/po/s/u1/r/r1/a/a1/i/p1/".to_vec(), Bytes::new()),
                (b"ex/po/s//r//a//i/p1/".to_vec(), Bytes::new()),
            ])
            .expect("index");
        let rows = store
            .list(b"ex/po/", b"s/u1/r/r1/a/a1/", 0, -1)
            .expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, b"i/p1/".to_vec());
        assert_eq!(rows[0].1, Bytes::from_static(b"{\"id\":\"p1\"}"));
    }

    #[test]
    fn list_skips_dangling_index_entries() {
        let (_dir, store) = open_temp();
        store
            .set(b"ex/po/s//r//a//i/ghost/", Bytes::new())
            .expect("index");
        let rows = store.list(b"ex/po/", b"s//r//a//", 0, -1).expect("list");
        assert!(rows.is_empty());
    }

    #[test]
    fn list_offset_and_limit_window() {
        let (_dir, store) = open_temp();
        for i in 0..7u8 {
            let id = format!("i/{i}/");
            store
                .set(format!("ro/{id}").as_bytes(), Bytes::from(vec![i]))
                .expect("doc");
        }
        let rows = store.list(b"ro/", b"", 2, 3).expect("list");
        let suffixes: Vec<_> = rows
            .iter()
            .map(|(k, _)| String::from_utf8_lossy(k).into_owned())
            .collect();
        assert_eq!(suffixes, vec!["i/2/", "i/3/", "i/4/"]);
    }

    #[test]
    fn list_rejects_oversized_offset() {
        let (_dir, store) = open_temp();
        let err = store.list(b"x/", b"", MAX_LIST_OFFSET + 1, -1).unwrap_err();
        assert!(matches!(err, StoreError::OffsetTooLarge));
    }

    #[test]
    fn list_clamps_limit_to_cap() {
        let (_dir, store) = open_temp();
        for i in 0..150u32 {
            store
                .set(format!("c/i/{i:04}/").as_bytes(), Bytes::from_static(b"v"))
                .expect("doc");
        }
        assert_eq!(store.list(b"c/", b"", 0, -1).expect("list").len(), 100);
        assert_eq!(store.list(b"c/", b"", 0, 500).expect("list").len(), 100);
        assert_eq!(store.list(b"c/", b"", 0, 5).expect("list").len(), 5);
    }

    #[test]
    fn count_by_prefix() {
        let (_dir, store) = open_temp();
        store.set(b"a/1/", Bytes::new()).expect("set");
        store.set(b"a/2/", Bytes::new()).expect("set");
        store.set(b"b/1/", Bytes::new()).expect("set");
        assert_eq!(store.count(b"a/").expect("count"), 2);
        assert_eq!(store.count(b"b/").expect("count"), 1);
        assert_eq!(store.count(b"c/").expect("count"), 0);
    }

    #[test]
    fn delete_by_prefix_and_drop_all() {
        let (_dir, store) = open_temp();
        store.set(b"a/1/", Bytes::from_static(b"1")).expect("set");
        store.set(b"a/2/", Bytes::from_static(b"2")).expect("set");
        store.set(b"b/1/", Bytes::from_static(b"3")).expect("set");
        store.delete_by_prefix(b"a/").expect("delete prefix");
        assert_eq!(store.count(b"a/").expect("count"), 0);
        assert_eq!(store.count(b"b/").expect("count"), 1);
        store.drop_all().expect("drop all");
        assert_eq!(store.count(b"").expect("count"), 0);
    }

    #[test]
    fn reopen_replays_log() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = Store::open(dir.path()).expect("open");
            store.set(b"k1", Bytes::from_static(b"v1")).expect("set");
            store.set(b"k2", Bytes::from_static(b"v2")).expect("set");
            store.delete(b"k1").expect("delete");
            store.set(b"k2", Bytes::from_static(b"v2b")).expect("set");
        }
        let store = Store::open(dir.path()).expect("reopen");
        assert!(store.get(b"k1").unwrap_err().is_not_found());
        assert_eq!(store.get(b"k2").expect("get"), Bytes::from_static(b"v2b"));
    }

    #[test]
    fn reopen_truncates_torn_tail() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = Store::open(dir.path()).expect("open");
            store.set(b"good", Bytes::from_static(b"v")).expect("set");
        }
        // Simulate a crash mid-append: a partial record at the tail.
        let log = dir.path().join("wal.log");
        let mut file = OpenOptions::new().append(true).open(&log).expect("log");
        file.write_all(&[1u8, 200, 0, 0]).expect("torn write");
        drop(file);

        let store = Store::open(dir.path()).expect("reopen");
        assert_eq!(store.get(b"good").expect("get"), Bytes::from_static(b"v"));
        // The store stays writable after truncation.
        store.set(b"after", Bytes::from_static(b"w")).expect("set");
        drop(store);
        let store = Store::open(dir.path()).expect("reopen again");
        assert_eq!(store.get(b"after").expect("get"), Bytes::from_static(b"w"));
    }

    #[test]
    fn compact_reclaims_garbage_and_preserves_data() {
        let dir = TempDir::new().expect("tempdir");
        let store = Store::open(dir.path()).expect("open");
        // Overwrite the same keys repeatedly so most of the log is garbage.
        for round in 0..10u8 {
            for i in 0..20u8 {
                store
                    .set(
                        format!("key/{i}/").as_bytes(),
                        Bytes::from(vec![round; 64]),
                    )
                    .expect("set");
            }
        }
        store.delete(b"key/0/").expect("delete");

        assert!(store.compact().expect("compact"), "first pass reclaims");
        assert!(!store.compact().expect("compact"), "second pass is a no-op");

        assert!(store.get(b"key/0/").unwrap_err().is_not_found());
        for i in 1..20u8 {
            assert_eq!(
                store.get(format!("key/{i}/").as_bytes()).expect("get"),
                Bytes::from(vec![9u8; 64])
            );
        }

        // The compacted log must replay to the same state.
        drop(store);
        let store = Store::open(dir.path()).expect("reopen");
        assert_eq!(store.count(b"key/").expect("count"), 19);
    }
}
