//! Log Store
//!
//! Append-only upsert log with an in-memory key index — the embedded engine
//! backing one node.
//!
//! ## Design
//! - `put` appends a CRC-checked record; the index maps each key to the
//!   offset of its newest record (last write wins)
//! - `get` seeks straight to the indexed record and reads it back
//! - `open` rebuilds the index by scanning the log, truncating a torn or
//!   corrupt tail so a crashed writer never poisons later runs
//! - `commit` is `sync_data` on the log file

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{Result, ShardError};

use super::{NodeStore, LOG_HEADER_SIZE, MAGIC, MAX_RECORD_FIELD, RECORD_HEADER_SIZE, VERSION};

/// Name of the log file inside a node's root directory
const DATA_FILENAME: &str = "data.log";

/// Append-only log engine for a single node
pub struct LogStore {
    /// Node root directory
    root: PathBuf,

    /// Log file handle, used for both appends and indexed reads
    file: File,

    /// Key → offset of the newest record for that key
    index: BTreeMap<Vec<u8>, u64>,

    /// Next append position
    tail: u64,

    /// Uncommitted writes since the last sync
    dirty: bool,

    /// Set by `close`; all operations fail afterwards
    closed: bool,
}

impl LogStore {
    /// Open or create a node log rooted at `root`.
    ///
    /// Idempotent across process restarts: reopening the same root rebuilds
    /// the key index from the log. A partial record at the tail (torn write
    /// from a crashed process) is truncated away with a warning; everything
    /// before it survives.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        let data_path = root.join(DATA_FILENAME);

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&data_path)?;

        let file_len = file.metadata()?.len();

        if file_len == 0 {
            // Fresh log: write the header
            file.write_all(MAGIC)?;
            file.write_all(&VERSION.to_le_bytes())?;
            file.sync_data()?;

            return Ok(Self {
                root: root.to_path_buf(),
                file,
                index: BTreeMap::new(),
                tail: LOG_HEADER_SIZE,
                dirty: false,
                closed: false,
            });
        }

        // Validate header
        let mut header = [0u8; LOG_HEADER_SIZE as usize];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(ShardError::CorruptDocument(format!(
                "invalid log magic in {}: {:?}",
                data_path.display(),
                &header[0..4]
            )));
        }

        let version = u16::from_le_bytes(header[4..6].try_into().unwrap());
        if version != VERSION {
            return Err(ShardError::CorruptDocument(format!(
                "unsupported log version: {}",
                version
            )));
        }

        let (index, tail) = Self::scan(&file, file_len)?;

        // Drop anything after the last valid record
        if tail < file_len {
            warn!(
                path = %data_path.display(),
                valid = tail,
                total = file_len,
                "truncating torn log tail"
            );
            file.set_len(tail)?;
            file.sync_data()?;
        }

        debug!(
            path = %data_path.display(),
            entries = index.len(),
            "opened node log"
        );

        Ok(Self {
            root: root.to_path_buf(),
            file,
            index,
            tail,
            dirty: false,
            closed: false,
        })
    }

    /// Scan the log, returning the rebuilt index and the offset just past
    /// the last valid record.
    fn scan(file: &File, file_len: u64) -> Result<(BTreeMap<Vec<u8>, u64>, u64)> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(LOG_HEADER_SIZE))?;

        let mut index = BTreeMap::new();
        let mut pos = LOG_HEADER_SIZE;

        while pos + RECORD_HEADER_SIZE as u64 <= file_len {
            let mut header = [0u8; RECORD_HEADER_SIZE];
            reader.read_exact(&mut header)?;

            let key_len = u32::from_le_bytes(header[0..4].try_into().unwrap());
            let val_len = u32::from_le_bytes(header[4..8].try_into().unwrap());
            let crc = u32::from_le_bytes(header[8..12].try_into().unwrap());

            // A header with absurd lengths is corruption, stop here
            if key_len > MAX_RECORD_FIELD || val_len > MAX_RECORD_FIELD {
                break;
            }

            let body_len = key_len as u64 + val_len as u64;
            if pos + RECORD_HEADER_SIZE as u64 + body_len > file_len {
                // Torn write: the record ran past the end of the file
                break;
            }

            let mut key = vec![0u8; key_len as usize];
            reader.read_exact(&mut key)?;
            let mut value = vec![0u8; val_len as usize];
            reader.read_exact(&mut value)?;

            let mut hasher = crc32fast::Hasher::new();
            hasher.update(&key);
            hasher.update(&value);
            if hasher.finalize() != crc {
                break;
            }

            index.insert(key, pos);
            pos += RECORD_HEADER_SIZE as u64 + body_len;
        }

        Ok((index, pos))
    }

    /// Number of live keys in this node's shard
    pub fn entry_count(&self) -> usize {
        self.index.len()
    }

    /// Node root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(ShardError::Closed);
        }
        Ok(())
    }
}

impl NodeStore for LogStore {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_open()?;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(key);
        hasher.update(value);
        let crc = hasher.finalize();

        // Assemble the record once so it lands with a single write
        let mut record = Vec::with_capacity(RECORD_HEADER_SIZE + key.len() + value.len());
        record.extend_from_slice(&(key.len() as u32).to_le_bytes());
        record.extend_from_slice(&(value.len() as u32).to_le_bytes());
        record.extend_from_slice(&crc.to_le_bytes());
        record.extend_from_slice(key);
        record.extend_from_slice(value);

        self.file.seek(SeekFrom::Start(self.tail))?;
        self.file.write_all(&record)?;

        self.index.insert(key.to_vec(), self.tail);
        self.tail += record.len() as u64;
        self.dirty = true;

        Ok(())
    }

    fn get(&mut self, key: &[u8]) -> Result<Bytes> {
        self.ensure_open()?;

        let offset = match self.index.get(key) {
            Some(&off) => off,
            None => {
                return Err(ShardError::KeyNotFound {
                    key: String::from_utf8_lossy(key).into_owned(),
                })
            }
        };

        self.file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; RECORD_HEADER_SIZE];
        self.file.read_exact(&mut header)?;

        let key_len = u32::from_le_bytes(header[0..4].try_into().unwrap()) as usize;
        let val_len = u32::from_le_bytes(header[4..8].try_into().unwrap()) as usize;
        let crc = u32::from_le_bytes(header[8..12].try_into().unwrap());

        if key_len != key.len() {
            return Err(ShardError::CorruptDocument(format!(
                "record key length {} does not match requested key length {}",
                key_len,
                key.len()
            )));
        }

        let mut stored_key = vec![0u8; key_len];
        self.file.read_exact(&mut stored_key)?;
        if stored_key != key {
            return Err(ShardError::CorruptDocument(
                "record key does not match requested key".to_string(),
            ));
        }

        let mut value = vec![0u8; val_len];
        self.file.read_exact(&mut value)?;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&stored_key);
        hasher.update(&value);
        if hasher.finalize() != crc {
            return Err(ShardError::CorruptDocument(
                "record checksum mismatch".to_string(),
            ));
        }

        Ok(Bytes::from(value))
    }

    fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;

        if self.dirty {
            self.file.sync_data()?;
            self.dirty = false;
        }

        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        if self.dirty {
            self.file.sync_data()?;
            self.dirty = false;
        }

        self.closed = true;
        Ok(())
    }
}
