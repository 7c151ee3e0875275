//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod add;
pub mod index;
pub mod list;
pub mod remove;
pub mod serve;

use std::path::Path;

use anyhow::Context;

/// Default project name: the directory's final path component.
pub(crate) fn default_name(dir: &Path) -> anyhow::Result<String> {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("cannot derive a project name from {}; pass --name", dir.display()))
}

/// Canonical form of a user-supplied directory.
pub(crate) fn resolve_dir(dir: &Path) -> anyhow::Result<std::path::PathBuf> {
    let dir = dir
        .canonicalize()
        .with_context(|| format!("cannot access {}", dir.display()))?;
    anyhow::ensure!(dir.is_dir(), "{} is not a directory", dir.display());
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_name_is_last_component() {
        assert_eq!(default_name(Path::new("/src/github.com/org/repo")).unwrap(), "repo");
        assert!(default_name(Path::new("/")).is_err());
    }

    #[test]
    fn test_resolve_dir_rejects_files() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, "x").unwrap();

        assert!(resolve_dir(dir.path()).is_ok());
        assert!(resolve_dir(&file).is_err());
        assert!(resolve_dir(&dir.path().join("missing")).is_err());
    }
}
