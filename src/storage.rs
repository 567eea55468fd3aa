// Key-value persistence backends

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Durable string storage addressed by key
///
/// Mirrors the get/set/remove surface of browser local storage. `remove` on a
/// missing key is not an error.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<S: Storage + ?Sized> Storage for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Check that a key is usable as a storage key (and as a file name)
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Storage key cannot be empty"));
    }
    if key.len() > 128 {
        return Err(eyre!("Storage key too long: {} chars (max 128)", key.len()));
    }
    if key.starts_with('.') {
        return Err(eyre!("Invalid storage key: {} (cannot start with '.')", key));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        return Err(eyre!(
            "Invalid storage key: {} (must be ASCII alphanumeric with . _ -)",
            key
        ));
    }
    Ok(())
}

// ============================================================================
// In-memory storage
// ============================================================================

/// In-memory storage with optional failure injection
///
/// Failure switches simulate a disabled or full backend (quota exceeded).
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    fail_reads: bool,
    fail_writes: bool,
    fail_removes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key, bypassing failure injection
    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    pub fn fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn fail_removes(&mut self, fail: bool) {
        self.fail_removes = fail;
    }

    /// Raw stored value, bypassing failure injection
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads {
            return Err(eyre!("Storage read failed for key {}: storage disabled", key));
        }
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes {
            return Err(eyre!("Storage write failed for key {}: quota exceeded", key));
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.fail_removes {
            return Err(eyre!("Storage remove failed for key {}: storage disabled", key));
        }
        self.entries.remove(key);
        Ok(())
    }
}

// ============================================================================
// File-backed storage
// ============================================================================

/// Directory-backed storage: one `<key>.json` file per key
///
/// Writes go to a temporary file under an exclusive lock and are renamed into
/// place, so readers never observe a partially written value.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Open or create a storage directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create storage directory")?;
        Ok(Self { base_path })
    }

    /// Get the base path of this storage
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(format!("{}.json", key)))
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!(".{}.lock", key))
    }

    fn lock(&self, key: &str) -> Result<File> {
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path(key))
            .context("Failed to open lock file")?;

        lock_file.lock_exclusive().context("Failed to acquire file lock")?;
        Ok(lock_file)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).wrap_err_with(|| format!("Failed to read {}", path.display())),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp_path = self.base_path.join(format!(".{}.json.tmp", key));

        // Lock is released when the guard is dropped
        let _guard = self.lock(key)?;

        if let Err(e) = write_and_rename(&tmp_path, &path, value) {
            if let Err(cleanup) = fs::remove_file(&tmp_path)
                && cleanup.kind() != ErrorKind::NotFound
            {
                warn!(key, error = ?cleanup, "Failed to remove temporary file");
            }
            return Err(e);
        }

        debug!(key, bytes = value.len(), "Wrote storage entry");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let _guard = self.lock(key)?;

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "Removed storage entry");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).wrap_err_with(|| format!("Failed to remove {}", path.display())),
        }
    }
}

fn write_and_rename(tmp_path: &Path, path: &Path, value: &str) -> Result<()> {
    let mut tmp = File::create(tmp_path).context("Failed to create temporary file")?;
    tmp.write_all(value.as_bytes())?;
    tmp.sync_all()?;

    fs::rename(tmp_path, path).wrap_err_with(|| format!("Failed to move value into {}", path.display()))
}
