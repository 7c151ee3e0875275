//! Index engine: turns a source tree into a persisted documentation index.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use sha2::{Digest, Sha256};

use super::error::{IndexError, IndexResult};
use super::types::{IndexedFile, LanguageIndex, ProjectIndex, Section, language_for_extension};

/// File name of a project's index inside its storage directory.
pub const INDEX_FILE: &str = "index.json";

/// Files larger than this are listed but not scanned for sections.
const MAX_SCAN_BYTES: u64 = 1024 * 1024;

/// (Re)computes and persists the index for one project.
///
/// Implementations must replace the previous index atomically so readers never
/// observe a partially written one. Invocations are idempotent.
pub trait IndexEngine: Send + Sync {
    fn index(&self, name: &str, path: &Path) -> IndexResult<ProjectIndex>;
}

/// Directory holding the index of `name` under `index_dir`.
///
/// Names like `github.com/org/repo` are flattened into one path segment; the
/// hash suffix keeps two names that flatten the same way apart.
pub fn project_dir(index_dir: &Path, name: &str) -> PathBuf {
    let flat: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let digest = Sha256::digest(name.as_bytes());
    let suffix: String = digest[..4].iter().map(|b| format!("{b:02x}")).collect();
    index_dir.join(format!("{flat}-{suffix}"))
}

/// Builds a manifest of documentation-relevant files grouped by language,
/// with markdown headings recorded as sections.
#[derive(Debug, Clone)]
pub struct ManifestEngine {
    index_dir: PathBuf,
}

impl ManifestEngine {
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
        }
    }

    fn collect(&self, root: &Path) -> IndexResult<BTreeMap<&'static str, Vec<IndexedFile>>> {
        let mut by_language: BTreeMap<&'static str, Vec<IndexedFile>> = BTreeMap::new();

        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .git_exclude(true)
            .follow_links(false)
            .require_git(false)
            .build();

        for entry in walker {
            let entry = entry.map_err(|e| IndexError::Walk {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            let Some(language) = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(language_for_extension)
            else {
                continue;
            };

            let bytes = entry
                .metadata()
                .map(|m| m.len())
                .map_err(|e| IndexError::Walk {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;

            let sections = if language == "markdown" && bytes <= MAX_SCAN_BYTES {
                let content = std::fs::read(path).map_err(|source| IndexError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                markdown_sections(&String::from_utf8_lossy(&content))
            } else {
                Vec::new()
            };

            let relative = path.strip_prefix(root).unwrap_or(path);
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            by_language.entry(language).or_default().push(IndexedFile {
                path: relative,
                bytes,
                sections,
            });
        }

        for files in by_language.values_mut() {
            files.sort_by(|a, b| a.path.cmp(&b.path));
        }
        Ok(by_language)
    }

    fn persist(&self, index: &ProjectIndex) -> IndexResult<()> {
        let dir = project_dir(&self.index_dir, &index.name);
        std::fs::create_dir_all(&dir).map_err(|source| IndexError::Io {
            path: dir.clone(),
            source,
        })?;

        let encoded = serde_json::to_vec_pretty(index).map_err(|source| IndexError::Serialize {
            project: index.name.clone(),
            source,
        })?;

        let io_err = |source| IndexError::Io {
            path: dir.clone(),
            source,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(&encoded).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(dir.join(INDEX_FILE))
            .map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

impl IndexEngine for ManifestEngine {
    fn index(&self, name: &str, path: &Path) -> IndexResult<ProjectIndex> {
        if !path.is_dir() {
            return Err(IndexError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        let languages = self
            .collect(path)?
            .into_iter()
            .map(|(language, files)| LanguageIndex {
                language: language.to_string(),
                files,
            })
            .collect();

        let index = ProjectIndex {
            name: name.to_string(),
            path: path.display().to_string(),
            indexed_at: chrono::Utc::now().to_rfc3339(),
            languages,
        };
        self.persist(&index)?;

        crate::debug_event!(
            "indexer",
            "wrote",
            "{name}: {} files in {} languages",
            index.file_count(),
            index.languages.len()
        );
        Ok(index)
    }
}

/// ATX headings outside fenced code blocks.
pub fn markdown_sections(content: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut in_fence = false;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || !trimmed.starts_with('#') {
            continue;
        }

        let level = trimmed.chars().take_while(|&c| c == '#').count();
        let rest = &trimmed[level..];
        if level > 6 || !(rest.is_empty() || rest.starts_with(' ')) {
            continue;
        }
        let title = rest.trim().trim_end_matches('#').trim();
        if title.is_empty() {
            continue;
        }
        sections.push(Section {
            level: level as u8,
            title: title.to_string(),
        });
    }

    sections
}
