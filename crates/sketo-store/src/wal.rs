// Write-ahead log: a single append-only file of length-prefixed set/delete
// records. Replayed in full on open; rewritten from live state on compaction.
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::{Result, StoreError};

const OP_SET: u8 = 1;
const OP_DELETE: u8 = 2;

// Header is op byte plus two u32 little-endian lengths.
const HEADER_LEN: u64 = 9;

// Guard against nonsense lengths in a damaged log.
const MAX_FIELD_LEN: u32 = 1 << 30;

pub(crate) const LOG_FILE: &str = "wal.log";
const COMPACT_FILE: &str = "wal.log.compact";

/// Size a record occupies in the log.
pub(crate) fn record_len(key: &[u8], value: &[u8]) -> u64 {
    HEADER_LEN + key.len() as u64 + value.len() as u64
}

pub(crate) enum Record {
    Set { key: Vec<u8>, value: Bytes },
    Delete { key: Vec<u8> },
}

pub(crate) struct Wal {
    path: PathBuf,
    file: File,
    /// Total bytes in the log file.
    pub(crate) total_bytes: u64,
    /// Bytes of records that still back a live entry; the rest is garbage
    /// reclaimable by compaction.
    pub(crate) live_bytes: u64,
}

impl Wal {
    /// Open (or create) the log and replay it into `apply`. A torn record at
    /// the tail, left by a crash mid-write, is truncated away; everything
    /// before it is recovered.
    pub(crate) fn open<F>(dir: &Path, mut apply: F) -> Result<Self>
    where
        F: FnMut(Record),
    {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(LOG_FILE);
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;
        let mut offset: u64 = 0;
        loop {
            match read_record(&mut reader) {
                Ok(Some(record)) => {
                    offset += match &record {
                        Record::Set { key, value } => record_len(key, value),
                        Record::Delete { key } => record_len(key, &[]),
                    };
                    apply(record);
                }
                Ok(None) => break,
                Err(StoreError::Corrupt) => {
                    tracing::warn!(
                        path = %path.display(),
                        offset,
                        "truncating torn tail of write-ahead log"
                    );
                    file.set_len(offset)?;
                    file.sync_data()?;
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(Self {
            path,
            file,
            total_bytes: offset,
            live_bytes: 0,
        })
    }

    /// Append a group of records as one buffered write followed by one fsync.
    pub(crate) fn append(&mut self, records: &[Record]) -> Result<()> {
        let mut buf = Vec::new();
        for record in records {
            match record {
                Record::Set { key, value } => encode(&mut buf, OP_SET, key, value),
                Record::Delete { key } => encode(&mut buf, OP_DELETE, key, &[]),
            }
        }
        self.file.write_all(&buf)?;
        self.file.sync_data()?;
        self.total_bytes += buf.len() as u64;
        Ok(())
    }

    /// Rewrite the log to contain exactly the given live entries and swap it
    /// into place. Resets the garbage accounting.
    pub(crate) fn rewrite<'a, I>(&mut self, live: I) -> Result<()>
    where
        I: Iterator<Item = (&'a Vec<u8>, &'a Bytes)>,
    {
        let tmp_path = self.path.with_file_name(COMPACT_FILE);
        let tmp = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        let mut writer = BufWriter::new(tmp);
        let mut written: u64 = 0;
        let mut buf = Vec::new();
        for (key, value) in live {
            buf.clear();
            encode(&mut buf, OP_SET, key, value);
            writer.write_all(&buf)?;
            written += buf.len() as u64;
        }
        writer.flush()?;
        writer.get_ref().sync_data()?;
        drop(writer);

        std::fs::rename(&tmp_path, &self.path)?;
        self.file = OpenOptions::new().append(true).open(&self.path)?;
        self.total_bytes = written;
        self.live_bytes = written;
        Ok(())
    }

    /// Truncate the log to empty.
    pub(crate) fn reset(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.sync_data()?;
        self.total_bytes = 0;
        self.live_bytes = 0;
        Ok(())
    }
}

fn encode(buf: &mut Vec<u8>, op: u8, key: &[u8], value: &[u8]) {
    buf.push(op);
    buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buf.extend_from_slice(key);
    buf.extend_from_slice(value);
}

/// Read one record. `Ok(None)` is a clean end of log; `StoreError::Corrupt`
/// marks a torn or damaged record.
fn read_record(reader: &mut BufReader<File>) -> Result<Option<Record>> {
    let mut header = [0u8; HEADER_LEN as usize];
    match read_exact_or_eof(reader, &mut header)? {
        Filled::Empty => return Ok(None),
        Filled::Partial => return Err(StoreError::Corrupt),
        Filled::Full => {}
    }
    let op = header[0];
    let key_len = u32::from_le_bytes(header[1..5].try_into().unwrap());
    let value_len = u32::from_le_bytes(header[5..9].try_into().unwrap());
    if key_len > MAX_FIELD_LEN || value_len > MAX_FIELD_LEN {
        return Err(StoreError::Corrupt);
    }
    if op != OP_SET && op != OP_DELETE {
        return Err(StoreError::Corrupt);
    }

    let mut key = vec![0u8; key_len as usize];
    if reader.read_exact(&mut key).is_err() {
        return Err(StoreError::Corrupt);
    }
    if op == OP_DELETE {
        if value_len != 0 {
            return Err(StoreError::Corrupt);
        }
        return Ok(Some(Record::Delete { key }));
    }
    let mut value = vec![0u8; value_len as usize];
    if reader.read_exact(&mut value).is_err() {
        return Err(StoreError::Corrupt);
    }
    Ok(Some(Record::Set {
        key,
        value: Bytes::from(value),
    }))
}

enum Filled {
    Empty,
    Partial,
    Full,
}

fn read_exact_or_eof(reader: &mut BufReader<File>, buf: &mut [u8]) -> Result<Filled> {
    let mut read = 0;
    while read < buf.len() {
        let n = reader.read(&mut buf[read..])?;
        if n == 0 {
            return Ok(if read == 0 { Filled::Empty } else { Filled::Partial });
        }
        read += n;
    }
    Ok(Filled::Full)
}
