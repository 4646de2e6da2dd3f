//! # Coderag Code Chunker
//!
//! Splits source files into line-addressed fragments for semantic search.
//!
//! ## Philosophy
//!
//! A chunk is the unit of retrieval. The chunker keeps chunks:
//! - Aligned with symbol boundaries whenever a symbol index knows them
//! - Bounded in size so one chunk never dominates a prompt budget
//! - Large enough to carry meaning (tiny fragments are dropped)
//! - Stably addressed, so re-indexing a file yields the same ids
//!
//! ## Architecture
//!
//! ```text
//! Source Text + Symbols
//!     │
//!     ├──> Language Detection (extension)
//!     │
//!     ├──> Symbols known?
//!     │    ├─> yes: one chunk per symbol range
//!     │    └─> no:  accumulate lines up to the token budget
//!     │
//!     └──> Chunk Generation
//!          ├─> Estimate tokens (pluggable estimator)
//!          ├─> Drop chunks under the minimum
//!          └─> Emit CodeChunk[]
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use coderag_code_chunker::{Chunker, ChunkerConfig, SymbolInfo};
//!
//! # fn main() -> Result<(), coderag_code_chunker::ChunkerError> {
//! let chunker = Chunker::new(ChunkerConfig::default())?;
//!
//! let code = "fn process_data(input: &str) -> String {\n    input.trim().to_uppercase()\n}\n";
//! let symbols = vec![SymbolInfo::new("process_data", "function", 1, 3)];
//!
//! let chunks = chunker.chunk_file("src/lib.rs", code, &symbols);
//! println!("Generated {} chunks", chunks.len());
//! # Ok(())
//! # }
//! ```

mod chunker;
mod config;
mod error;
mod language;
mod strategy;

pub use chunker::Chunker;
pub use config::ChunkerConfig;
pub use error::ChunkerError;
pub use language::Language;
pub use strategy::CharTokenEstimator;
pub use strategy::TokenEstimator;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A contiguous, line-addressed fragment of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChunk {
    /// Stable id derived from `file_path:start_line:end_line`
    pub id: String,

    /// Source file path, relative to the project root
    pub file_path: String,

    /// The code content
    pub content: String,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    pub chunk_type: ChunkType,

    /// Symbol name (function name, class name, etc.)
    pub symbol_name: Option<String>,

    /// Symbol kind as reported by the symbol index
    pub symbol_kind: Option<String>,

    /// Programming language name
    pub language: String,

    /// Estimated token count
    pub token_count: usize,

    /// Digest of `content`, used for change detection
    pub hash: String,
}

impl CodeChunk {
    /// Create an anonymous block chunk. Id and hash are derived here.
    pub fn new(
        file_path: impl Into<String>,
        start_line: usize,
        end_line: usize,
        content: impl Into<String>,
        language: impl Into<String>,
        token_count: usize,
    ) -> Self {
        let file_path = file_path.into();
        let content = content.into();
        Self {
            id: chunk_id(&file_path, start_line, end_line),
            hash: content_hash(&content),
            file_path,
            content,
            start_line,
            end_line,
            chunk_type: ChunkType::Block,
            symbol_name: None,
            symbol_kind: None,
            language: language.into(),
            token_count,
        }
    }

    /// Attach symbol information; the chunk type follows the symbol kind.
    pub fn with_symbol(mut self, name: impl Into<String>, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        self.chunk_type = ChunkType::from_symbol_kind(&kind);
        self.symbol_name = Some(name.into());
        self.symbol_kind = Some(kind);
        self
    }

    /// Number of lines covered by this chunk
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// Type of code chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    Function,
    Method,
    Class,
    Block,
}

impl ChunkType {
    /// Map a symbol-index kind onto a chunk type. Unknown kinds are blocks.
    pub fn from_symbol_kind(kind: &str) -> Self {
        match kind.to_lowercase().as_str() {
            "function" | "func" | "fn" => ChunkType::Function,
            "method" => ChunkType::Method,
            "class" | "struct" => ChunkType::Class,
            _ => ChunkType::Block,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChunkType::Function => "function",
            ChunkType::Method => "method",
            ChunkType::Class => "class",
            ChunkType::Block => "block",
        }
    }

    /// Functions and methods are the most focused retrieval units.
    pub fn is_callable(self) -> bool {
        matches!(self, ChunkType::Function | ChunkType::Method)
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Symbol boundaries handed to the chunker by a symbol index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub kind: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl SymbolInfo {
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        start_line: usize,
        end_line: usize,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            start_line,
            end_line,
        }
    }
}

/// Stable chunk id: first 8 bytes of SHA-256 over `path:start:end`, hex encoded.
pub fn chunk_id(file_path: &str, start_line: usize, end_line: usize) -> String {
    short_digest(format!("{file_path}:{start_line}:{end_line}").as_bytes(), 8)
}

/// Content digest: first 16 bytes of SHA-256, hex encoded.
pub fn content_hash(content: &str) -> String {
    short_digest(content.as_bytes(), 16)
}

/// Hex encode the first `len` bytes of the SHA-256 digest of `data`.
pub fn short_digest(data: &[u8], len: usize) -> String {
    let digest = Sha256::digest(data);
    digest.iter().take(len).map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chunk_type_from_symbol_kind() {
        assert_eq!(ChunkType::from_symbol_kind("function"), ChunkType::Function);
        assert_eq!(ChunkType::from_symbol_kind("func"), ChunkType::Function);
        assert_eq!(ChunkType::from_symbol_kind("Fn"), ChunkType::Function);
        assert_eq!(ChunkType::from_symbol_kind("method"), ChunkType::Method);
        assert_eq!(ChunkType::from_symbol_kind("class"), ChunkType::Class);
        assert_eq!(ChunkType::from_symbol_kind("struct"), ChunkType::Class);
        assert_eq!(ChunkType::from_symbol_kind("interface"), ChunkType::Block);
    }

    #[test]
    fn test_chunk_id_is_stable() {
        let a = chunk_id("src/main.rs", 10, 40);
        let b = chunk_id("src/main.rs", 10, 40);
        let c = chunk_id("src/main.rs", 10, 41);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
        assert_eq!(content_hash("fn main() {}").len(), 32);
    }

    #[test]
    fn test_with_symbol_sets_chunk_type() {
        let chunk = CodeChunk::new("a.go", 1, 3, "func parse() {}", "go", 25)
            .with_symbol("parse", "func");
        assert_eq!(chunk.chunk_type, ChunkType::Function);
        assert_eq!(chunk.symbol_name.as_deref(), Some("parse"));
        assert_eq!(chunk.line_count(), 3);
    }
}
