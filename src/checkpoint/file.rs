//! File-Backed Checkpoint Store
//!
//! All checkpoints live in one small file that is replaced wholesale on
//! every commit.
//!
//! File format:
//! - Magic: 4 bytes "PKCP"
//! - Version: 1 byte
//! - Entry count: 4 bytes
//! - Entries: [key_len (4) + key + value (8)]*

use bytes::{Buf, BufMut, Bytes, BytesMut};
use hashbrown::HashMap;
use parking_lot::RwLock;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use super::CheckpointStore;
use crate::error::CheckpointError;

const CHECKPOINT_MAGIC: &[u8] = b"PKCP";
const CHECKPOINT_VERSION: u8 = 1;
/// Smallest possible entry: key length + empty key + value
const MIN_ENTRY_LEN: usize = 4 + 8;

/// Checkpoint store persisted to a single file
#[derive(Debug)]
pub struct FileCheckpointStore {
    path: PathBuf,
    values: RwLock<HashMap<String, i64>>,
}

impl FileCheckpointStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, CheckpointError> {
        let path = path.into();
        let values = match fs::read(&path) {
            Ok(data) => decode(Bytes::from(data))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), entries = values.len(), "Opened checkpoint file");

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of every stored value
    pub fn entries(&self) -> HashMap<String, i64> {
        self.values.read().clone()
    }

    /// Write `values` to a sibling temp file, then rename it over the target
    fn write_atomic(&self, values: &HashMap<String, i64>) -> Result<(), CheckpointError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut temp_file = NamedTempFile::new_in(parent)?;
        temp_file.write_all(&encode(values))?;
        temp_file.as_file().sync_all()?;
        temp_file
            .persist(&self.path)
            .map_err(|e| CheckpointError::Io(e.error))?;
        Ok(())
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.values.read().get(key).copied().unwrap_or(default)
    }

    fn commit(&self, writes: &[(String, i64)]) -> Result<(), CheckpointError> {
        let mut values = self.values.write();
        let mut next = values.clone();
        for (key, value) in writes {
            next.insert(key.clone(), *value);
        }

        self.write_atomic(&next)?;
        *values = next;
        debug!(path = %self.path.display(), writes = writes.len(), "Committed checkpoints");
        Ok(())
    }
}

fn encode(values: &HashMap<String, i64>) -> Bytes {
    // Sorted so identical contents always produce identical files
    let mut entries: Vec<_> = values.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut buf = BytesMut::new();
    buf.put_slice(CHECKPOINT_MAGIC);
    buf.put_u8(CHECKPOINT_VERSION);
    buf.put_u32_le(entries.len() as u32);

    for (key, value) in entries {
        buf.put_u32_le(key.len() as u32);
        buf.put_slice(key.as_bytes());
        buf.put_i64_le(*value);
    }

    buf.freeze()
}

fn decode(mut buf: Bytes) -> Result<HashMap<String, i64>, CheckpointError> {
    if buf.remaining() < CHECKPOINT_MAGIC.len() + 1 + 4 {
        return Err(CheckpointError::Truncated);
    }
    let magic = buf.split_to(CHECKPOINT_MAGIC.len());
    if magic.as_ref() != CHECKPOINT_MAGIC {
        return Err(CheckpointError::BadMagic);
    }
    let version = buf.get_u8();
    if version != CHECKPOINT_VERSION {
        return Err(CheckpointError::UnsupportedVersion(version));
    }

    let count = buf.get_u32_le() as usize;
    if count.saturating_mul(MIN_ENTRY_LEN) > buf.remaining() {
        return Err(CheckpointError::Truncated);
    }
    let mut values = HashMap::with_capacity(count);
    for _ in 0..count {
        if buf.remaining() < 4 {
            return Err(CheckpointError::Truncated);
        }
        let key_len = buf.get_u32_le() as usize;
        if buf.remaining() < key_len.saturating_add(8) {
            return Err(CheckpointError::Truncated);
        }
        let key = buf.split_to(key_len);
        let key = String::from_utf8(key.to_vec()).map_err(|_| CheckpointError::InvalidKey)?;
        let value = buf.get_i64_le();
        values.insert(key, value);
    }

    Ok(values)
}
