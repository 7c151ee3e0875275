//! Durable list of auto-indexed projects.
//!
//! Persisted as a JSON array of `{"name", "path", "hash"}` objects. The file is
//! always rewritten whole; insertion order is significant because the first
//! registered project wins when tracked paths are nested.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::RegistryError;
use crate::fingerprint::Fingerprint;

/// One tracked project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoIndexEntry {
    pub name: String,
    pub path: PathBuf,
    /// Fingerprint of `path` when the index engine last completed for `name`.
    #[serde(rename = "hash")]
    pub fingerprint: Fingerprint,
}

/// Ordered registry of tracked projects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoIndexRegistry {
    entries: Vec<AutoIndexEntry>,
}

impl AutoIndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the state file. A missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => {
                return Err(RegistryError::CorruptState {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };

        // Older writers stored an empty registry as `null`
        let entries: Option<Vec<AutoIndexEntry>> =
            serde_json::from_slice(&bytes).map_err(|e| RegistryError::CorruptState {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let entries = entries.unwrap_or_default();

        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.name == entry.name) {
                return Err(RegistryError::CorruptState {
                    path: path.to_path_buf(),
                    reason: format!("duplicate project name '{}'", entry.name),
                });
            }
        }

        Ok(Self { entries })
    }

    /// Rewrite the whole state file.
    ///
    /// Writes to a temporary file next to the target and renames it into place,
    /// so a crash mid-write leaves the previous state intact.
    pub fn save(&self, path: &Path) -> Result<(), RegistryError> {
        let encoded = serde_json::to_vec_pretty(&self.entries)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let persistence = |source| RegistryError::Persistence {
            path: path.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(&dir).map_err(persistence)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(persistence)?;
        tmp.write_all(&encoded).map_err(persistence)?;
        tmp.write_all(b"\n").map_err(persistence)?;
        tmp.as_file().sync_all().map_err(persistence)?;
        tmp.persist(path).map_err(|e| persistence(e.error))?;
        Ok(())
    }

    pub fn entries(&self) -> &[AutoIndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&AutoIndexEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Append a project. The path must be an existing directory; it is stored
    /// in canonical absolute form.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        path: &Path,
        fingerprint: Fingerprint,
    ) -> Result<&AutoIndexEntry, RegistryError> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(RegistryError::DuplicateName(name));
        }

        let path = path
            .canonicalize()
            .map_err(|e| RegistryError::MissingPath {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if !path.is_dir() {
            return Err(RegistryError::MissingPath {
                path,
                reason: "not a directory".to_string(),
            });
        }

        self.entries.push(AutoIndexEntry {
            name,
            path,
            fingerprint,
        });
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Remove a project by name. Returns whether it was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.name != name);
        self.entries.len() != before
    }

    /// Replace the stored fingerprint of `name`. Returns false for unknown names.
    pub fn set_fingerprint(&mut self, name: &str, fingerprint: Fingerprint) -> bool {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => {
                entry.fingerprint = fingerprint;
                true
            }
            None => false,
        }
    }

    /// First project, in insertion order, whose path contains `path`.
    pub fn owner_of(&self, path: &Path) -> Option<&AutoIndexEntry> {
        self.entries.iter().find(|e| is_within(&e.path, path))
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Whether `child` is `parent` or lies beneath it.
///
/// Equivalent to making `child` relative to `parent` and rejecting any result
/// that climbs out through a `..` component. Names that merely contain dots
/// (`a..b`) are fine.
pub fn is_within(parent: &Path, child: &Path) -> bool {
    if parent.is_absolute() != child.is_absolute() {
        return false;
    }
    normalize(child).starts_with(normalize(parent))
}
