//! List command - registered projects and their staleness.

use crate::autoindex::{AutoIndexEntry, AutoIndexRegistry};
use crate::config::Settings;
use crate::fingerprint::{DirHasher, Fingerprinter};

/// Freshness of one registered project.
#[derive(Debug, PartialEq, Eq)]
pub enum Status {
    UpToDate,
    Stale,
    Unavailable(String),
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UpToDate => f.write_str("up to date"),
            Self::Stale => f.write_str("stale"),
            Self::Unavailable(reason) => write!(f, "unavailable: {reason}"),
        }
    }
}

pub fn status(entry: &AutoIndexEntry, fingerprinter: &dyn Fingerprinter) -> Status {
    match fingerprinter.fingerprint(&entry.path) {
        Ok(current) if current == entry.fingerprint => Status::UpToDate,
        Ok(_) => Status::Stale,
        Err(e) => Status::Unavailable(e.to_string()),
    }
}

pub fn run(settings: &Settings) -> anyhow::Result<()> {
    let registry = AutoIndexRegistry::load(&settings.autoindex_path())?;
    if registry.is_empty() {
        println!("No registered projects. Use `doctree add <DIR>` to register one.");
        return Ok(());
    }

    let hasher = DirHasher::new();
    let width = registry.entries().iter().map(|e| e.name.len()).max().unwrap_or(0);
    for entry in registry.entries() {
        println!(
            "{:<width$}  {}  [{}]",
            entry.name,
            entry.path.display(),
            status(entry, &hasher)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Fingerprint;
    use tempfile::TempDir;

    #[test]
    fn test_status_tracks_tree_changes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.md"), "one").unwrap();
        let hasher = DirHasher::new();
        let mut entry = AutoIndexEntry {
            name: "a".into(),
            path: dir.path().to_path_buf(),
            fingerprint: hasher.fingerprint(dir.path()).unwrap(),
        };

        assert_eq!(status(&entry, &hasher), Status::UpToDate);

        std::fs::write(dir.path().join("a.md"), "two").unwrap();
        assert_eq!(status(&entry, &hasher), Status::Stale);

        entry.path = dir.path().join("gone");
        entry.fingerprint = Fingerprint::new("h1:0");
        assert!(matches!(status(&entry, &hasher), Status::Unavailable(_)));
    }
}
