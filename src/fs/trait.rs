//! FileSystem trait definition

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Regular files under a root, in walk order
pub type FileWalk = Box<dyn Iterator<Item = Result<PathBuf>>>;

/// Abstraction over the file system reads the pipeline performs
pub trait FileSystem: Send + Sync {
    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a regular file
    fn is_file(&self, path: &Path) -> bool;

    /// Check if path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Walk every regular file under `root`
    ///
    /// Entries are sorted by file name within each directory and symlinks are not
    /// followed. A missing root yields nothing.
    fn walk_files(&self, root: &Path) -> FileWalk;

    /// Read raw file bytes
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Read file contents as string, replacing invalid UTF-8
    fn read_to_string_lossy(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
