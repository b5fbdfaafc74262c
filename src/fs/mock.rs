use super::{FileSystem, FileWalk};
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// In-memory file tree; relative paths are resolved against `root`
pub struct MockFileSystem {
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
    dirs: RwLock<HashSet<PathBuf>>,
    root: PathBuf,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::with_root(PathBuf::from("/mock"))
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            dirs: RwLock::new(HashSet::new()),
            root,
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: &str) {
        self.add_bytes(path, content.as_bytes());
    }

    pub fn add_bytes(&self, path: impl AsRef<Path>, content: &[u8]) {
        let path = self.normalize_path(path.as_ref());
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.files.write().unwrap().insert(path, content.to_vec());
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = self.normalize_path(path.as_ref());
        let mut dirs = self.dirs.write().unwrap();
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            dirs.insert(current.clone());
        }
    }

    fn normalize_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        self.files.read().unwrap().contains_key(&path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        self.dirs.read().unwrap().contains(&path)
    }

    fn walk_files(&self, root: &Path) -> FileWalk {
        let root = self.normalize_path(root);
        // Component-wise path ordering matches a name-sorted depth-first walk
        let mut files: Vec<PathBuf> = self
            .files
            .read()
            .unwrap()
            .keys()
            .filter(|path| path.starts_with(&root))
            .cloned()
            .collect();
        files.sort();
        Box::new(files.into_iter().map(Ok))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = self.normalize_path(path);
        self.files
            .read()
            .unwrap()
            .get(&path)
            .cloned()
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }
}
