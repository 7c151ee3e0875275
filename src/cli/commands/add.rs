//! Add command - register a directory for auto-indexing.

use std::path::PathBuf;

use anyhow::Context;

use super::{default_name, resolve_dir};
use crate::autoindex::AutoIndexRegistry;
use crate::config::Settings;
use crate::fingerprint::{DirHasher, Fingerprinter};
use crate::indexer::{IndexEngine, ManifestEngine};

/// Index `dir` now and record it, with its fingerprint, in the state file.
///
/// Nothing is written to the state file if indexing fails.
pub fn run(dir: PathBuf, name: Option<String>, settings: &Settings) -> anyhow::Result<()> {
    let dir = resolve_dir(&dir)?;
    let name = match name {
        Some(name) => name,
        None => default_name(&dir)?,
    };

    let state_path = settings.autoindex_path();
    let mut registry = AutoIndexRegistry::load(&state_path)?;
    let fingerprint = DirHasher::new()
        .fingerprint(&dir)
        .with_context(|| format!("failed to fingerprint {}", dir.display()))?;
    registry.register(&name, &dir, fingerprint)?;

    let index = ManifestEngine::new(settings.index_dir())
        .index(&name, &dir)
        .with_context(|| format!("failed to index {}", dir.display()))?;
    registry.save(&state_path)?;

    crate::log_event!("autoindex", "registered", "{name} -> {}", dir.display());
    println!("Added {name} ({} files indexed)", index.file_count());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::IndexStore;
    use tempfile::TempDir;

    fn settings(data: &TempDir) -> Settings {
        Settings {
            data_dir: data.path().to_path_buf(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_add_registers_and_indexes() {
        let data = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        std::fs::write(source.path().join("README.md"), "# Intro\n").unwrap();
        let settings = settings(&data);

        run(source.path().to_path_buf(), Some("proj".into()), &settings).unwrap();

        let registry = AutoIndexRegistry::load(&settings.autoindex_path()).unwrap();
        let entry = registry.get("proj").unwrap();
        assert_eq!(entry.path, source.path().canonicalize().unwrap());
        assert_eq!(
            entry.fingerprint,
            DirHasher::new().fingerprint(&entry.path).unwrap()
        );
        assert!(IndexStore::new(settings.index_dir()).get("proj").is_ok());
    }

    #[test]
    fn test_add_duplicate_name_fails_without_changing_state() {
        let data = TempDir::new().unwrap();
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let settings = settings(&data);

        run(first.path().to_path_buf(), Some("proj".into()), &settings).unwrap();
        let before = std::fs::read_to_string(settings.autoindex_path()).unwrap();

        assert!(run(second.path().to_path_buf(), Some("proj".into()), &settings).is_err());
        let after = std::fs::read_to_string(settings.autoindex_path()).unwrap();
        assert_eq!(before, after);
    }
}
