//! Repository file discovery
//!
//! Walks a tree lazily and yields every regular file whose extension is on the
//! allow-list, already read and fingerprinted. The walk is deterministic (entries
//! are sorted by file name within each directory) which is what makes resume
//! cursors meaningful across runs.

use crate::cache::ContentDigest;
use crate::fs::{FileSystem, FileWalk, RealFileSystem};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Source extensions analysed by default
pub const DEFAULT_EXTENSIONS: [&str; 13] = [
    "js", "py", "cpp", "c", "java", "rb", "go", "ts", "php", "cs", "swift", "rs", "kt",
];

/// Case-insensitive set of accepted file extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionAllowList {
    extensions: BTreeSet<String>,
}

impl ExtensionAllowList {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Returns the normalized extension (with leading dot) if `path` is accepted
    pub fn match_path(&self, path: &Path) -> Option<String> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.extensions
            .contains(&ext)
            .then(|| format!(".{}", ext))
    }

    pub fn allows(&self, path: &Path) -> bool {
        self.match_path(path).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

impl Default for ExtensionAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

/// A source file read from the repository, immutable once created
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Location on disk
    pub path: PathBuf,
    /// Repository-relative path with `/` separators
    pub relative_path: String,
    /// Final path component
    pub file_name: String,
    /// Lowercased extension including the leading dot
    pub extension: String,
    /// File content, invalid UTF-8 replaced
    pub content: String,
    /// Fingerprint of the raw bytes
    pub digest: ContentDigest,
}

impl FileRecord {
    pub fn from_bytes(root: &Path, path: &Path, extension: String, bytes: &[u8]) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            path: path.to_path_buf(),
            relative_path: relative_path(root, path),
            file_name,
            extension,
            content: String::from_utf8_lossy(bytes).into_owned(),
            digest: ContentDigest::of(bytes),
        }
    }
}

/// Renders `path` relative to `root` with forward slashes
pub fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Lazy, single-use walk over a repository
///
/// A fresh `Discovery` is needed for every pass. Symlinks are not followed, so
/// symlinked files are not emitted and link cycles cannot occur.
pub struct Discovery {
    root: PathBuf,
    allow_list: ExtensionAllowList,
    file_system: Arc<dyn FileSystem>,
    files: FileWalk,
}

impl Discovery {
    /// Walks `root` on the real file system
    pub fn new(root: impl Into<PathBuf>, allow_list: ExtensionAllowList) -> Self {
        Self::with_file_system(Arc::new(RealFileSystem), root, allow_list)
    }

    pub fn with_file_system(
        file_system: Arc<dyn FileSystem>,
        root: impl Into<PathBuf>,
        allow_list: ExtensionAllowList,
    ) -> Self {
        let root = root.into();
        let files = file_system.walk_files(&root);

        Self {
            root,
            allow_list,
            file_system,
            files,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Iterator for Discovery {
    type Item = FileRecord;

    fn next(&mut self) -> Option<FileRecord> {
        loop {
            let path = match self.files.next()? {
                Ok(path) => path,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };

            let Some(extension) = self.allow_list.match_path(&path) else {
                debug!(path = %path.display(), "Skipping (not a programming file)");
                continue;
            };

            match self.file_system.read(&path) {
                Ok(bytes) => {
                    return Some(FileRecord::from_bytes(&self.root, &path, extension, &bytes));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                }
            }
        }
    }
}
