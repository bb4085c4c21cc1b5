//! An append-only single-file key/value log.
//!
//! ### Format
//!
//! The file is a sequence of records:
//!
//! ```text
//! [key_len: u32 le][val_len: u32 le][key: key_len bytes][val: val_len bytes]
//! ```
//!
//! A `val_len` of `u32::MAX` marks a tombstone: the key was deleted and no
//! value bytes follow. A later record for a key supersedes earlier ones.
//!
//! ### Implementation
//!
//! - On open, the log is replayed into an in-memory index of
//!   `(offset, length)` references to the live value of each key. Values
//!   themselves stay on disk.
//! - A torn record at the tail (a crash mid-write) is truncated away.
//! - Writes append and `sync_data`.
//! - [LogFile::compact] copies only live values into a tempfile in the same
//!   directory, then atomically renames it over the log.

use super::Backend;
use bytes::{Buf, BufMut};
use hornet_api::{HornetError, HornetResult};
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const HEADER_LEN: u64 = 8;
const TOMBSTONE: u32 = u32::MAX;

/// A reference to a value previously written to the log.
#[derive(Debug, Clone, Copy)]
struct EntryRef {
    offset: u64,
    length: u32,
}

/// Durable single-file [Backend].
#[derive(Debug)]
pub struct LogFile {
    path: PathBuf,
    file: std::fs::File,
    index: HashMap<String, EntryRef>,
    end: u64,
}

fn io_err(ctx: &str, path: &Path, e: std::io::Error) -> HornetError {
    HornetError::other_src(format!("{ctx} {}", path.display()), e)
}

/// Read exactly `buf.len()` bytes, or report how many were available.
fn read_full(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut got = 0;
    while got < buf.len() {
        match r.read(&mut buf[got..]) {
            Ok(0) => return Ok(false),
            Ok(n) => got += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => (),
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

fn encode_record(key: &str, value: Option<&[u8]>) -> HornetResult<Vec<u8>> {
    let key_len = u32::try_from(key.len())
        .map_err(|e| HornetError::other_src("cache key too long", e))?;
    let val_len = match value {
        None => TOMBSTONE,
        Some(v) => match u32::try_from(v.len()) {
            Ok(l) if l != TOMBSTONE => l,
            _ => return Err(HornetError::other("cache value too long")),
        },
    };

    let mut buf = Vec::with_capacity(
        HEADER_LEN as usize + key.len() + value.map_or(0, <[u8]>::len),
    );
    buf.put_u32_le(key_len);
    buf.put_u32_le(val_len);
    buf.put_slice(key.as_bytes());
    if let Some(v) = value {
        buf.put_slice(v);
    }
    Ok(buf)
}

impl LogFile {
    /// Open (creating if needed) the log at `path` and replay it.
    pub fn open(path: impl AsRef<Path>) -> HornetResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| io_err("failed to open cache", &path, e))?;

        let mut out = Self {
            path,
            file,
            index: HashMap::new(),
            end: 0,
        };
        out.replay()?;
        Ok(out)
    }

    /// The path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn replay(&mut self) -> HornetResult<()> {
        let len = self
            .file
            .metadata()
            .map_err(|e| io_err("failed to stat cache", &self.path, e))?
            .len();
        let mut reader = std::io::BufReader::new(&self.file);
        reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| io_err("failed to seek cache", &self.path, e))?;

        let mut pos = 0u64;
        let mut header = [0u8; HEADER_LEN as usize];
        loop {
            let complete = read_full(&mut reader, &mut header)
                .map_err(|e| io_err("failed to read cache", &self.path, e))?;
            if !complete {
                break;
            }
            let mut h = &header[..];
            let key_len = h.get_u32_le();
            let val_len = h.get_u32_le();

            let body_len = key_len as u64
                + if val_len == TOMBSTONE { 0 } else { val_len as u64 };
            if pos + HEADER_LEN + body_len > len {
                break;
            }

            let mut key = vec![0u8; key_len as usize];
            let complete = read_full(&mut reader, &mut key)
                .map_err(|e| io_err("failed to read cache", &self.path, e))?;
            if !complete {
                break;
            }
            let key = String::from_utf8(key).map_err(|e| {
                HornetError::other_src(
                    format!("non utf8 key in cache {}", self.path.display()),
                    e,
                )
            })?;

            let value_offset = pos + HEADER_LEN + key_len as u64;
            if val_len == TOMBSTONE {
                self.index.remove(&key);
            } else {
                reader
                    .seek_relative(val_len as i64)
                    .map_err(|e| {
                        io_err("failed to seek cache", &self.path, e)
                    })?;
                self.index.insert(
                    key,
                    EntryRef {
                        offset: value_offset,
                        length: val_len,
                    },
                );
            }
            pos += HEADER_LEN + body_len;
        }

        if pos < len {
            tracing::warn!(
                path = %self.path.display(),
                valid = pos,
                len,
                "truncating torn record at end of cache"
            );
            self.file
                .set_len(pos)
                .map_err(|e| {
                    io_err("failed to truncate cache", &self.path, e)
                })?;
        }
        self.end = pos;

        Ok(())
    }

    fn append(&mut self, record: &[u8]) -> HornetResult<u64> {
        let offset = self.end;
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.write_all(record))
            .and_then(|_| self.file.sync_data())
            .map_err(|e| io_err("failed to write cache", &self.path, e))?;
        self.end += record.len() as u64;
        Ok(offset)
    }

    fn read_at(&self, r: EntryRef) -> std::io::Result<bytes::Bytes> {
        let mut reader = &self.file;
        reader.seek(SeekFrom::Start(r.offset))?;
        let mut buf = vec![0u8; r.length as usize];
        reader.read_exact(&mut buf)?;
        Ok(buf.into())
    }
}

impl Backend for LogFile {
    fn keys(&self) -> Vec<String> {
        self.index.keys().cloned().collect()
    }

    fn get(&self, key: &str) -> HornetResult<Option<bytes::Bytes>> {
        match self.index.get(key) {
            None => Ok(None),
            Some(r) => self
                .read_at(*r)
                .map(Some)
                .map_err(|e| io_err("failed to read cache", &self.path, e)),
        }
    }

    fn put(&mut self, key: &str, value: &[u8]) -> HornetResult<()> {
        let record = encode_record(key, Some(value))?;
        let offset = self.append(&record)?;
        self.index.insert(
            key.to_string(),
            EntryRef {
                offset: offset + HEADER_LEN + key.len() as u64,
                length: value.len() as u32,
            },
        );
        Ok(())
    }

    fn delete(&mut self, key: &str) -> HornetResult<()> {
        if self.index.remove(key).is_some() {
            let record = encode_record(key, None)?;
            self.append(&record)?;
        }
        Ok(())
    }

    fn compact(&mut self) -> HornetResult<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| {
                io_err("failed to create compaction file in", &dir, e)
            })?;

        let mut keys = self.keys();
        keys.sort();

        let mut index = HashMap::with_capacity(keys.len());
        let mut pos = 0u64;
        for key in keys {
            let Some(r) = self.index.get(&key).copied() else {
                continue;
            };
            let value = self
                .read_at(r)
                .map_err(|e| io_err("failed to read cache", &self.path, e))?;
            let record = encode_record(&key, Some(&value))?;
            tmp.write_all(&record)
                .map_err(|e| io_err("failed to write", tmp.path(), e))?;
            index.insert(
                key.clone(),
                EntryRef {
                    offset: pos + HEADER_LEN + key.len() as u64,
                    length: r.length,
                },
            );
            pos += record.len() as u64;
        }

        tmp.as_file()
            .sync_all()
            .map_err(|e| io_err("failed to sync", tmp.path(), e))?;
        let file = tmp.persist(&self.path).map_err(|e| {
            HornetError::other_src(
                format!("failed to replace cache {}", self.path.display()),
                e.error,
            )
        })?;

        tracing::debug!(
            path = %self.path.display(),
            before = self.end,
            after = pos,
            "compacted cache"
        );

        self.file = file;
        self.index = index;
        self.end = pos;
        Ok(())
    }
}
