//! Remove command - stop tracking a project.

use crate::autoindex::AutoIndexRegistry;
use crate::config::Settings;

/// Drop `name` from the state file. Its index is left in place.
pub fn run(name: &str, settings: &Settings) -> anyhow::Result<()> {
    let state_path = settings.autoindex_path();
    let mut registry = AutoIndexRegistry::load(&state_path)?;

    if !registry.unregister(name) {
        anyhow::bail!("no registered project named '{name}'");
    }
    registry.save(&state_path)?;

    crate::log_event!("autoindex", "unregistered", "{name}");
    println!("Removed {name}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Fingerprint;
    use tempfile::TempDir;

    #[test]
    fn test_remove_keeps_other_entries() {
        let data = TempDir::new().unwrap();
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let settings = Settings {
            data_dir: data.path().to_path_buf(),
            ..Settings::default()
        };

        let mut registry = AutoIndexRegistry::new();
        registry.register("a", a.path(), Fingerprint::new("h1:a")).unwrap();
        registry.register("b", b.path(), Fingerprint::new("h1:b")).unwrap();
        registry.save(&settings.autoindex_path()).unwrap();

        run("a", &settings).unwrap();

        let registry = AutoIndexRegistry::load(&settings.autoindex_path()).unwrap();
        assert!(registry.get("a").is_none());
        assert!(registry.get("b").is_some());
        assert!(run("a", &settings).is_err());
    }
}
