//! Persisted index model shared by the engine (writer) and the store (reader).

use serde::{Deserialize, Serialize};

/// Everything indexed for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectIndex {
    pub name: String,
    pub path: String,
    /// RFC 3339 timestamp of the run that produced this index.
    pub indexed_at: String,
    pub languages: Vec<LanguageIndex>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageIndex {
    pub language: String,
    pub files: Vec<IndexedFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedFile {
    /// Path relative to the project root, `/`-separated.
    pub path: String,
    pub bytes: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,
}

/// A heading inside a documentation file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub level: u8,
    pub title: String,
}

/// One element of the project listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub name: String,
    pub path: String,
    pub indexed_at: String,
    pub languages: Vec<String>,
    pub files: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub project: String,
    pub language: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub score: u32,
}

impl ProjectIndex {
    pub fn file_count(&self) -> usize {
        self.languages.iter().map(|l| l.files.len()).sum()
    }

    pub fn summary(&self) -> IndexSummary {
        IndexSummary {
            name: self.name.clone(),
            path: self.path.clone(),
            indexed_at: self.indexed_at.clone(),
            languages: self.languages.iter().map(|l| l.language.clone()).collect(),
            files: self.file_count(),
        }
    }
}

/// Language id for a file extension. Unknown extensions are not indexed.
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let lang = match ext.to_ascii_lowercase().as_str() {
        "md" | "markdown" | "mdx" => "markdown",
        "rst" => "restructuredtext",
        "txt" => "text",
        "rs" => "rust",
        "go" => "go",
        "py" | "pyi" => "python",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "php" => "php",
        "swift" => "swift",
        "lua" => "lua",
        "zig" => "zig",
        "elm" => "elm",
        _ => return None,
    };
    Some(lang)
}
