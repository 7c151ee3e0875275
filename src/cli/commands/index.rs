//! Index command - one-shot indexing without registration.

use std::path::PathBuf;

use anyhow::Context;

use super::{default_name, resolve_dir};
use crate::config::Settings;
use crate::indexer::{IndexEngine, ManifestEngine};

pub fn run(dir: PathBuf, name: Option<String>, settings: &Settings) -> anyhow::Result<()> {
    let dir = resolve_dir(&dir)?;
    let name = match name {
        Some(name) => name,
        None => default_name(&dir)?,
    };

    let index = ManifestEngine::new(settings.index_dir())
        .index(&name, &dir)
        .with_context(|| format!("failed to index {}", dir.display()))?;

    let languages: Vec<&str> = index.languages.iter().map(|l| l.language.as_str()).collect();
    println!(
        "Indexed {name}: {} files ({})",
        index.file_count(),
        languages.join(", ")
    );
    Ok(())
}
