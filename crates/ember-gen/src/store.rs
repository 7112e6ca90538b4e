//! Artifact storage for generated images
//!
//! The orchestrator hands raw bytes to an `ArtifactStore` and gets back an
//! absolute path. Names are always fresh; nothing is ever overwritten.

use ember_core::{EmberError, Result};
use std::path::{Path, PathBuf};

/// Durable write of generated bytes, keyed by a suggested file stem
pub trait ArtifactStore: Send + Sync {
    /// Store PNG bytes under a fresh name derived from `stem` and return
    /// the absolute path of the written artifact.
    fn store(&self, stem: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Filesystem-backed store writing into a single output directory
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at the given directory (created on demand)
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ArtifactStore for FsStore {
    fn store(&self, stem: &str, bytes: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.root)?;

        // Fresh name: append a counter if the stem is already taken
        let mut path = self.root.join(format!("{}.png", stem));
        let mut counter = 1u32;
        while path.exists() {
            path = self.root.join(format!("{}_{}.png", stem, counter));
            counter += 1;
        }

        std::fs::write(&path, bytes)?;

        std::fs::canonicalize(&path).map_err(|e| {
            EmberError::StoreError(format!(
                "Failed to resolve absolute path for {}: {}",
                path.display(),
                e
            ))
        })
    }
}

/// In-memory store capturing artifacts for tests
#[derive(Default)]
pub struct MemoryStore {
    artifacts: std::sync::Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything stored so far, in write order
    pub fn artifacts(&self) -> Vec<(String, Vec<u8>)> {
        self.artifacts.lock().unwrap().clone()
    }
}

impl ArtifactStore for MemoryStore {
    fn store(&self, stem: &str, bytes: &[u8]) -> Result<PathBuf> {
        let mut artifacts = self
            .artifacts
            .lock()
            .map_err(|_| EmberError::StoreError("memory store poisoned".to_string()))?;
        artifacts.push((stem.to_string(), bytes.to_vec()));
        Ok(PathBuf::from(format!("/memory/{}.png", stem)))
    }
}
