//! File-based local storage for Ocean Notes.
//!
//! Each key is stored as one file in the root directory:
//!
//! ```text
//! .ocean-notes/
//!   .lock                    # Lock file for atomic writes
//!   notes_app_v1             # JSON array of notes
//! ```

use fs2::FileExt;
use log::debug;
use ocean_core::{Error, KeyValueStore, LocalStorageProvider};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// The note provider backed by a storage directory.
pub type FilesProvider = LocalStorageProvider<FileStorage>;

/// Key-value storage where every key is a file under `root`.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open a storage directory, creating it if it doesn't exist.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, Error> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(&root)
            .map_err(|e| Error::Storage(format!("Failed to create storage dir: {}", e)))?;

        Ok(Self { root })
    }

    /// Acquire an exclusive lock on the storage directory.
    fn lock(&self) -> Result<FileLock, Error> {
        let lock_path = self.root.join(".lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| Error::Storage(format!("Failed to open lock file: {}", e)))?;

        file.lock_exclusive()
            .map_err(|e| Error::Storage(format!("Failed to acquire lock: {}", e)))?;

        Ok(FileLock { file })
    }

    /// Get the path for a key, rejecting keys that aren't plain file names.
    fn item_path(&self, key: &str) -> Result<PathBuf, Error> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(Error::Validation(format!("invalid storage key: {:?}", key)));
        }
        Ok(self.root.join(key))
    }

    /// Write a file atomically via a temp file and rename.
    /// Keys never start with a dot, so the temp name can't clash with one.
    fn write_atomic(&self, key: &str, path: &Path, contents: &str) -> Result<(), Error> {
        let temp_path = self.root.join(format!(".{}.tmp", key));

        let mut file = File::create(&temp_path)
            .map_err(|e| Error::Storage(format!("Failed to create temp file: {}", e)))?;

        file.write_all(contents.as_bytes())
            .map_err(|e| Error::Storage(format!("Failed to write temp file: {}", e)))?;

        file.sync_all()
            .map_err(|e| Error::Storage(format!("Failed to sync temp file: {}", e)))?;

        fs::rename(&temp_path, path)
            .map_err(|e| Error::Storage(format!("Failed to rename temp file: {}", e)))?;

        Ok(())
    }
}

/// RAII guard for file locking.
struct FileLock {
    file: File,
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl KeyValueStore for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, Error> {
        let path = self.item_path(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!("Failed to read {}: {}", key, e))),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), Error> {
        let path = self.item_path(key)?;
        let _lock = self.lock()?;
        self.write_atomic(key, &path, value)?;
        debug!("wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), Error> {
        let path = self.item_path(key)?;
        let _lock = self.lock()?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("Failed to remove {}: {}", key, e))),
        }
    }
}

/// Open the note provider for a storage directory.
pub fn open_provider<P: AsRef<Path>>(root: P) -> Result<FilesProvider, Error> {
    Ok(LocalStorageProvider::new(FileStorage::open(root)?))
}
