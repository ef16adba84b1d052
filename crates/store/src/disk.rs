//! On-disk backing store with one directory per session and one file per page.
//!
//! Session directories are named by the lowercase hex of the session id bytes,
//! so caller-supplied ids can never escape the store root. Page files are
//! written through a temporary file and renamed into place.

use crate::data_store::DataStore;
use crate::error::StoreResult;
use page_model::PageId;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Durable backing store keeping serialized pages as plain files.
///
/// The directory layout is `<root>/<hex session id>/<page id>.page`; the file
/// content is the raw serialized payload. Data written by one instance is
/// visible to any later instance constructed over the same root, which is
/// what carries page state across process restarts.
#[derive(Debug, Clone)]
pub struct DiskDataStore {
    root: PathBuf,
}

impl DiskDataStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, session_id: &str) -> PathBuf {
        let mut name = String::with_capacity(session_id.len() * 2);
        for byte in session_id.bytes() {
            let _ = write!(name, "{byte:02x}");
        }
        self.root.join(name)
    }

    fn page_path(&self, session_id: &str, page_id: PageId) -> PathBuf {
        self.session_dir(session_id).join(format!("{:016x}.page", page_id.0))
    }
}

impl DataStore for DiskDataStore {
    fn store_data(&self, session_id: &str, page_id: PageId, data: &[u8]) -> StoreResult<()> {
        let path = self.page_path(session_id, page_id);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        // Write through a sibling temp file so a crash mid-write never leaves
        // a truncated page behind.
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, data)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn get_data(&self, session_id: &str, page_id: PageId) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.page_path(session_id, page_id)) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn remove_data(&self, session_id: &str, page_id: PageId) -> StoreResult<()> {
        match fs::remove_file(self.page_path(session_id, page_id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn remove_session(&self, session_id: &str) -> StoreResult<()> {
        match fs::remove_dir_all(self.session_dir(session_id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn is_replicated(&self) -> bool {
        false
    }
}
