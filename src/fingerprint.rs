//! Directory fingerprinting.
//!
//! A fingerprint summarizes the contents of a whole tree so the orchestrator
//! can tell whether a project changed since it was last indexed.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use walkdir::WalkDir;

/// Opaque, comparable summary of a directory's contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Cannot fingerprint {path}: not a directory")]
    NotADirectory { path: PathBuf },

    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Computes fingerprints for directory trees.
pub trait Fingerprinter: Send + Sync {
    fn fingerprint(&self, dir: &Path) -> Result<Fingerprint, FingerprintError>;
}

/// Hashes every regular file in a tree.
///
/// The digest covers one `<sha256 of file>  <relative path>\n` line per file,
/// sorted by path, so renames and content edits both change the result.
/// Symlinks are not followed.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirHasher;

impl DirHasher {
    pub fn new() -> Self {
        Self
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Hash one file. `None` when it disappeared after the walk listed it.
fn hash_file(path: &Path) -> Result<Option<String>, FingerprintError> {
    let mut file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(FingerprintError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|source| FingerprintError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(hex(&hasher.finalize())))
}

fn is_not_found(err: &walkdir::Error) -> bool {
    err.io_error()
        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}

impl Fingerprinter for DirHasher {
    fn fingerprint(&self, dir: &Path) -> Result<Fingerprint, FingerprintError> {
        if !dir.is_dir() {
            return Err(FingerprintError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                // Removed while walking; the root itself was checked above
                Err(e) if e.depth() > 0 && is_not_found(&e) => continue,
                Err(source) => {
                    return Err(FingerprintError::Walk {
                        path: dir.to_path_buf(),
                        source,
                    });
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if let Some(hash) = hash_file(entry.path())? {
                files.push((relative, hash));
            }
        }
        files.sort();

        let mut summary = Sha256::new();
        for (relative, hash) in &files {
            summary.update(format!("{hash}  {relative}\n").as_bytes());
        }
        Ok(Fingerprint(format!("h1:{}", hex(&summary.finalize()))))
    }
}
