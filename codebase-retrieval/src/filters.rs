use crate::result::SearchResult;
use coderag_code_chunker::{ChunkType, CodeChunk};
use serde::{Deserialize, Serialize};

/// Post-filter on search results.
///
/// Dimensions are conjunctive: a chunk must pass every non-empty one. An empty
/// dimension passes everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Language names, compared case-insensitively
    #[serde(default)]
    pub languages: Vec<String>,

    #[serde(default)]
    pub chunk_types: Vec<ChunkType>,

    /// Path prefixes; a chunk passes if any prefix matches
    #[serde(default)]
    pub file_paths: Vec<String>,

    /// Path substrings; a chunk fails if any is contained in its path
    #[serde(default)]
    pub exclude_dirs: Vec<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
            && self.chunk_types.is_empty()
            && self.file_paths.is_empty()
            && self.exclude_dirs.is_empty()
    }

    pub fn matches(&self, chunk: &CodeChunk) -> bool {
        if !self.languages.is_empty()
            && !self
                .languages
                .iter()
                .any(|lang| lang.eq_ignore_ascii_case(&chunk.language))
        {
            return false;
        }

        if !self.chunk_types.is_empty() && !self.chunk_types.contains(&chunk.chunk_type) {
            return false;
        }

        if !self.file_paths.is_empty()
            && !self
                .file_paths
                .iter()
                .any(|prefix| chunk.file_path.starts_with(prefix.as_str()))
        {
            return false;
        }

        !self
            .exclude_dirs
            .iter()
            .any(|dir| chunk.file_path.contains(dir.as_str()))
    }

    /// Keep only matching results, preserving order.
    pub fn apply(&self, results: Vec<SearchResult>) -> Vec<SearchResult> {
        if self.is_empty() {
            return results;
        }
        results
            .into_iter()
            .filter(|result| self.matches(&result.chunk))
            .collect()
    }
}

/// Apply optional filters.
pub(crate) fn apply_filters(
    filters: Option<&SearchFilters>,
    results: Vec<SearchResult>,
) -> Vec<SearchResult> {
    match filters {
        Some(filters) => filters.apply(results),
        None => results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(path: &str, language: &str, kind: Option<&str>) -> CodeChunk {
        let chunk = CodeChunk::new(path, 1, 10, "body", language, 30);
        match kind {
            Some(kind) => chunk.with_symbol("sym", kind),
            None => chunk,
        }
    }

    #[test]
    fn test_empty_filters_pass_everything() {
        let filters = SearchFilters::default();
        assert!(filters.is_empty());
        assert!(filters.matches(&chunk("src/a.go", "go", None)));
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let filters = SearchFilters {
            languages: vec!["Go".into()],
            chunk_types: vec![ChunkType::Function],
            file_paths: vec!["internal/".into()],
            exclude_dirs: vec!["testdata".into()],
        };

        assert!(filters.matches(&chunk("internal/config.go", "go", Some("function"))));
        // each dimension can reject on its own
        assert!(!filters.matches(&chunk("internal/config.py", "python", Some("function"))));
        assert!(!filters.matches(&chunk("internal/config.go", "go", Some("class"))));
        assert!(!filters.matches(&chunk("cmd/main.go", "go", Some("function"))));
        assert!(!filters.matches(&chunk(
            "internal/testdata/x.go",
            "go",
            Some("function")
        )));
    }

    #[test]
    fn test_any_prefix_matches() {
        let filters = SearchFilters {
            file_paths: vec!["src/".into(), "lib/".into()],
            ..Default::default()
        };
        assert!(filters.matches(&chunk("lib/util.rs", "rust", None)));
        assert!(!filters.matches(&chunk("tests/util.rs", "rust", None)));
    }
}
