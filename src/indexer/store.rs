//! Read side of the persisted indexes, used by the HTTP layer.

use std::path::{Path, PathBuf};

use super::engine::{INDEX_FILE, project_dir};
use super::error::{IndexError, IndexResult};
use super::types::{IndexSummary, ProjectIndex, SearchResult};

/// Upper bound on search results returned for one query.
pub const MAX_SEARCH_RESULTS: usize = 100;

const SECTION_SCORE: u32 = 10;
const PATH_SCORE: u32 = 5;

/// Read-only view over `<data-dir>/index`.
#[derive(Debug, Clone)]
pub struct IndexStore {
    index_dir: PathBuf,
}

impl IndexStore {
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
        }
    }

    fn read_index(path: &Path) -> IndexResult<ProjectIndex> {
        let bytes = std::fs::read(path).map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| IndexError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load every project index. Unreadable entries are skipped with a warning.
    fn load_all(&self) -> IndexResult<Vec<ProjectIndex>> {
        let entries = match std::fs::read_dir(&self.index_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(IndexError::Io {
                    path: self.index_dir.clone(),
                    source,
                });
            }
        };

        let mut indexes = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| IndexError::Io {
                path: self.index_dir.clone(),
                source,
            })?;
            let file = entry.path().join(INDEX_FILE);
            if !file.is_file() {
                continue;
            }
            match Self::read_index(&file) {
                Ok(index) => indexes.push(index),
                Err(e) => tracing::warn!("[store] skipping {}: {e}", file.display()),
            }
        }
        indexes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(indexes)
    }

    /// Summaries of all indexed projects, sorted by name.
    pub fn list(&self) -> IndexResult<Vec<IndexSummary>> {
        Ok(self.load_all()?.iter().map(ProjectIndex::summary).collect())
    }

    /// The full index of one project.
    pub fn get(&self, name: &str) -> IndexResult<ProjectIndex> {
        let file = project_dir(&self.index_dir, name).join(INDEX_FILE);
        if !file.is_file() {
            return Err(IndexError::NotFound(name.to_string()));
        }
        Self::read_index(&file)
    }

    /// Files and sections whose path or title contains every query term.
    pub fn search(&self, query: &str) -> IndexResult<Vec<SearchResult>> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let matches_all = |haystack: &str| {
            let haystack = haystack.to_lowercase();
            terms.iter().all(|t| haystack.contains(t.as_str()))
        };

        let mut results = Vec::new();
        for index in self.load_all()? {
            for lang in &index.languages {
                for file in &lang.files {
                    if matches_all(&file.path) {
                        results.push(SearchResult {
                            project: index.name.clone(),
                            language: lang.language.clone(),
                            path: file.path.clone(),
                            section: None,
                            score: PATH_SCORE,
                        });
                    }
                    for section in &file.sections {
                        if matches_all(&section.title) {
                            results.push(SearchResult {
                                project: index.name.clone(),
                                language: lang.language.clone(),
                                path: file.path.clone(),
                                section: Some(section.title.clone()),
                                // Shallower headings rank higher
                                score: SECTION_SCORE + (6 - section.level.min(6)) as u32,
                            });
                        }
                    }
                }
            }
        }

        results.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.project.cmp(&b.project))
                .then_with(|| a.path.cmp(&b.path))
        });
        results.truncate(MAX_SEARCH_RESULTS);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{IndexEngine, ManifestEngine};
    use std::fs;
    use tempfile::TempDir;

    fn indexed_store() -> (TempDir, TempDir, IndexStore) {
        let source = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        fs::write(
            source.path().join("README.md"),
            "# Widget Toolkit\n## Installing widgets\n### Advanced install\n",
        )
        .unwrap();
        fs::create_dir(source.path().join("src")).unwrap();
        fs::write(source.path().join("src/widget.rs"), "pub struct Widget;\n").unwrap();

        let engine = ManifestEngine::new(data.path());
        engine.index("github.com/acme/widgets", source.path()).unwrap();
        engine.index("other", source.path()).unwrap();
        let store = IndexStore::new(data.path());
        (source, data, store)
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let data = TempDir::new().unwrap();
        let store = IndexStore::new(data.path().join("index"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_sorted_by_name() {
        let (_source, _data, store) = indexed_store();
        let names: Vec<_> = store.list().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["github.com/acme/widgets", "other"]);
    }

    #[test]
    fn test_get_by_name() {
        let (_source, _data, store) = indexed_store();
        let index = store.get("github.com/acme/widgets").unwrap();
        assert_eq!(index.file_count(), 2);

        assert!(matches!(store.get("missing"), Err(IndexError::NotFound(_))));
    }

    #[test]
    fn test_search_requires_all_terms() {
        let (_source, _data, store) = indexed_store();
        let results = store.search("install widgets").unwrap();
        assert_eq!(results.len(), 2, "one section hit per project");
        assert!(results.iter().all(|r| r.section.as_deref() == Some("Installing widgets")));

        assert!(store.search("install missing").unwrap().is_empty());
        assert!(store.search("   ").unwrap().is_empty());
    }

    #[test]
    fn test_search_ranks_sections_above_paths() {
        let (_source, _data, store) = indexed_store();
        let results = store.search("WIDGET").unwrap();
        assert!(!results.is_empty());
        assert!(results[0].section.is_some());
        assert!(results.iter().any(|r| r.path == "src/widget.rs" && r.section.is_none()));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_corrupt_index_is_skipped_in_listing() {
        let (_source, data, store) = indexed_store();
        let bad = data.path().join("broken");
        fs::create_dir(&bad).unwrap();
        fs::write(bad.join(INDEX_FILE), "{not json").unwrap();

        assert_eq!(store.list().unwrap().len(), 2);
    }
}
