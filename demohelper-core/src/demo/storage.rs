use std::path::{Path, PathBuf};

/// Answers "is there already a file at this path?" for demo numbering.
pub trait StorageProbe: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
}

/// The game's demos folder on the local disk.
#[derive(Debug, Clone)]
pub struct DemosFolder {
    root: PathBuf,
}

impl DemosFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `record <name>` writes its file.
    pub fn demo_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.dem"))
    }

    pub fn is_present(&self) -> bool {
        self.root.is_dir()
    }
}

impl StorageProbe for DemosFolder {
    fn exists(&self, path: &Path) -> bool {
        path.try_exists().unwrap_or(false)
    }
}
