use crate::config::ChunkerConfig;
use crate::language::Language;
use crate::{CodeChunk, SymbolInfo};
use log::debug;
use std::fmt::Debug;

/// Estimates how many language-model tokens a piece of text costs.
///
/// Chunk boundaries and context budgets are both computed through this trait,
/// so swapping in a real tokenizer keeps the two consistent.
pub trait TokenEstimator: Debug + Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

/// Character heuristic: one token per four characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharTokenEstimator;

impl TokenEstimator for CharTokenEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count() / 4
    }
}

/// One chunk per symbol range; oversized symbols are split into blocks.
///
/// Lines no emitted symbol covers (imports, constants, top-level statements)
/// are chunked by size into block chunks.
pub struct SymbolChunkingStrategy<'a> {
    config: &'a ChunkerConfig,
    estimator: &'a dyn TokenEstimator,
    language: Language,
}

impl<'a> SymbolChunkingStrategy<'a> {
    pub fn new(
        config: &'a ChunkerConfig,
        estimator: &'a dyn TokenEstimator,
        language: Language,
    ) -> Self {
        Self {
            config,
            estimator,
            language,
        }
    }

    pub fn chunk(&self, lines: &[&str], file_path: &str, symbols: &[SymbolInfo]) -> Vec<CodeChunk> {
        let mut chunks = Vec::with_capacity(symbols.len() + 1);
        let mut covered = vec![false; lines.len()];

        for symbol in symbols {
            if symbol.start_line < 1
                || symbol.end_line > lines.len()
                || symbol.start_line > symbol.end_line
            {
                debug!(
                    "Skipping symbol {} with range {}-{} in {} ({} lines)",
                    symbol.name,
                    symbol.start_line,
                    symbol.end_line,
                    file_path,
                    lines.len()
                );
                continue;
            }

            let symbol_lines = &lines[symbol.start_line - 1..symbol.end_line];
            let content = symbol_lines.join("\n");
            let token_count = self.estimator.estimate(&content);
            if token_count < self.config.min_chunk_tokens {
                continue;
            }

            if token_count > self.config.max_chunk_tokens {
                debug!(
                    "Splitting symbol {} in {} ({} tokens)",
                    symbol.name, file_path, token_count
                );
                let parts = SizeChunkingStrategy::new(self.config, self.estimator, self.language)
                    .chunk_lines(symbol_lines, symbol.start_line, file_path);
                chunks.extend(parts.into_iter().map(|mut part| {
                    part.symbol_name = Some(symbol.name.clone());
                    part.symbol_kind = Some(symbol.kind.clone());
                    part
                }));
            } else {
                chunks.push(
                    CodeChunk::new(
                        file_path,
                        symbol.start_line,
                        symbol.end_line,
                        content,
                        self.language.name(),
                        token_count,
                    )
                    .with_symbol(&symbol.name, &symbol.kind),
                );
            }
            covered[symbol.start_line - 1..symbol.end_line].fill(true);
        }

        chunks.extend(self.chunk_uncovered(lines, &covered, file_path));
        chunks.sort_by_key(|chunk| chunk.start_line);
        chunks
    }

    /// Size-chunk each run of lines outside the emitted symbols.
    fn chunk_uncovered(&self, lines: &[&str], covered: &[bool], file_path: &str) -> Vec<CodeChunk> {
        let sizer = SizeChunkingStrategy::new(self.config, self.estimator, self.language);
        let mut chunks = Vec::new();
        let mut run_start = None;

        for (idx, is_covered) in covered.iter().copied().chain([true]).enumerate() {
            match (run_start, is_covered) {
                (None, false) => run_start = Some(idx),
                (Some(start), true) => {
                    chunks.extend(sizer.chunk_lines(&lines[start..idx], start + 1, file_path));
                    run_start = None;
                }
                _ => {}
            }
        }

        chunks
    }
}

/// Line accumulation bounded by `max_chunk_tokens`.
pub struct SizeChunkingStrategy<'a> {
    config: &'a ChunkerConfig,
    estimator: &'a dyn TokenEstimator,
    language: Language,
}

impl<'a> SizeChunkingStrategy<'a> {
    pub fn new(
        config: &'a ChunkerConfig,
        estimator: &'a dyn TokenEstimator,
        language: Language,
    ) -> Self {
        Self {
            config,
            estimator,
            language,
        }
    }

    pub fn chunk(&self, lines: &[&str], file_path: &str) -> Vec<CodeChunk> {
        self.chunk_lines(lines, 1, file_path)
    }

    /// Chunk `lines`, the first of which is line `first_line` of the file.
    ///
    /// Each closed chunk hands its trailing `overlap_tokens` worth of lines
    /// to the next one, unless that would push the next one over budget.
    pub fn chunk_lines(&self, lines: &[&str], first_line: usize, file_path: &str) -> Vec<CodeChunk> {
        let mut chunks = Vec::with_capacity(lines.len() / 50 + 1);
        let mut buffer = String::new();
        // index into `lines` where the open chunk starts
        let mut current_start = 0;

        for (idx, line) in lines.iter().enumerate() {
            let has_lines = idx > current_start;
            let previous_len = buffer.len();
            if has_lines {
                buffer.push('\n');
            }
            buffer.push_str(line);

            if has_lines && self.estimator.estimate(&buffer) > self.config.max_chunk_tokens {
                buffer.truncate(previous_len);
                self.emit(
                    &mut chunks,
                    file_path,
                    first_line + current_start,
                    first_line + idx - 1,
                    std::mem::take(&mut buffer),
                );

                current_start = self.overlap_start(lines, current_start, idx);
                buffer = lines[current_start..=idx].join("\n");
                if current_start < idx
                    && self.estimator.estimate(&buffer) > self.config.max_chunk_tokens
                {
                    current_start = idx;
                    buffer = (*line).to_string();
                }
            }
        }

        if current_start < lines.len() {
            self.emit(
                &mut chunks,
                file_path,
                first_line + current_start,
                first_line + lines.len() - 1,
                buffer,
            );
        }

        chunks
    }

    /// First index of the trailing lines of `lines[start..end]` that fit in
    /// `overlap_tokens`; `end` when nothing is carried over.
    fn overlap_start(&self, lines: &[&str], start: usize, end: usize) -> usize {
        if self.config.overlap_tokens == 0 {
            return end;
        }
        let mut tokens = 0;
        let mut overlap = end;
        for idx in (start + 1..end).rev() {
            let line_tokens = self.estimator.estimate(lines[idx]);
            if tokens + line_tokens > self.config.overlap_tokens {
                break;
            }
            tokens += line_tokens;
            overlap = idx;
        }
        overlap
    }

    fn emit(
        &self,
        chunks: &mut Vec<CodeChunk>,
        file_path: &str,
        start_line: usize,
        end_line: usize,
        content: String,
    ) {
        let token_count = self.estimator.estimate(&content);
        if token_count < self.config.min_chunk_tokens {
            return;
        }
        chunks.push(CodeChunk::new(
            file_path,
            start_line,
            end_line,
            content,
            self.language.name(),
            token_count,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChunkType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_char_estimator() {
        let estimator = CharTokenEstimator;
        assert_eq!(estimator.estimate(""), 0);
        assert_eq!(estimator.estimate("abc"), 0);
        assert_eq!(estimator.estimate("abcdefgh"), 2);
        // counts characters, not bytes
        assert_eq!(estimator.estimate("ääää"), 1);
    }

    #[test]
    fn test_size_chunking_respects_budget() {
        let config = ChunkerConfig {
            max_chunk_tokens: 50,
            min_chunk_tokens: 5,
            overlap_tokens: 0,
        };
        let strategy = SizeChunkingStrategy::new(&config, &CharTokenEstimator, Language::Rust);

        let owned: Vec<String> = (0..40).map(|i| format!("let value_{i:02} = {i};")).collect();
        let lines: Vec<&str> = owned.iter().map(String::as_str).collect();

        let chunks = strategy.chunk(&lines, "test.rs");
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.token_count <= 50));
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks.last().map(|c| c.end_line), Some(40));
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end_line + 1, pair[1].start_line);
        }
    }

    #[test]
    fn test_size_chunking_drops_small_tail() {
        let config = ChunkerConfig {
            max_chunk_tokens: 10,
            min_chunk_tokens: 8,
            overlap_tokens: 0,
        };
        let strategy = SizeChunkingStrategy::new(&config, &CharTokenEstimator, Language::Go);
        let lines = vec!["x := computeSomethingBig(a)", "y", "return x"];

        let chunks = strategy.chunk(&lines, "a.go");
        assert!(chunks.iter().all(|c| c.token_count >= 8));
        assert!(chunks.iter().all(|c| c.end_line <= 3));
    }

    #[test]
    fn test_oversized_symbol_is_split_within_its_range() {
        let config = ChunkerConfig {
            max_chunk_tokens: 40,
            // keeps the one-line preamble out
            min_chunk_tokens: 3,
            overlap_tokens: 0,
        };
        let strategy = SymbolChunkingStrategy::new(&config, &CharTokenEstimator, Language::Rust);
        let mut owned = vec!["// preamble".to_string(), "fn big() {".to_string()];
        owned.extend((0..30).map(|i| format!("    let v{i:02} = {i} * 2;")));
        owned.push("}".to_string());
        let lines: Vec<&str> = owned.iter().map(String::as_str).collect();
        let symbols = vec![SymbolInfo::new("big", "function", 2, 33)];

        let chunks = strategy.chunk(&lines, "big.rs", &symbols);

        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].start_line, 2);
        assert_eq!(chunks.last().map(|c| c.end_line), Some(33));
        for chunk in &chunks {
            assert_eq!(chunk.symbol_name.as_deref(), Some("big"));
            assert!(chunk.token_count <= 40);
        }
    }

    #[test]
    fn test_symbol_chunking_skips_bad_ranges() {
        let config = ChunkerConfig {
            max_chunk_tokens: 512,
            min_chunk_tokens: 1,
            overlap_tokens: 0,
        };
        let strategy = SymbolChunkingStrategy::new(&config, &CharTokenEstimator, Language::Go);
        let lines = vec!["func a() {", "    return doSomething()", "}"];
        let symbols = vec![
            SymbolInfo::new("a", "function", 1, 3),
            SymbolInfo::new("zero", "function", 0, 2),
            SymbolInfo::new("past_end", "function", 2, 9),
            SymbolInfo::new("inverted", "function", 3, 2),
        ];

        let chunks = strategy.chunk(&lines, "a.go", &symbols);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].symbol_name.as_deref(), Some("a"));
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 3));
    }

    #[test]
    fn test_size_chunks_carry_overlap() {
        let config = ChunkerConfig {
            max_chunk_tokens: 50,
            min_chunk_tokens: 5,
            overlap_tokens: 10,
        };
        let strategy = SizeChunkingStrategy::new(&config, &CharTokenEstimator, Language::Rust);

        // 4 tokens per line
        let owned: Vec<String> = (0..40).map(|i| format!("let v_{i:02} = {i:04};")).collect();
        let lines: Vec<&str> = owned.iter().map(String::as_str).collect();

        let chunks = strategy.chunk(&lines, "test.rs");
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.token_count <= 50));
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks.last().map(|c| c.end_line), Some(40));
        for pair in chunks.windows(2) {
            // two 4-token lines fit in the overlap, a third would not
            assert_eq!(pair[1].start_line, pair[0].end_line - 1);
            let first = lines[pair[1].start_line - 1];
            assert!(pair[0].content.contains(first));
        }
    }

    #[test]
    fn test_lines_outside_symbols_become_blocks() {
        let config = ChunkerConfig {
            max_chunk_tokens: 512,
            min_chunk_tokens: 20,
            overlap_tokens: 0,
        };
        let strategy = SymbolChunkingStrategy::new(&config, &CharTokenEstimator, Language::Go);
        let mut owned: Vec<String> = (1..=30)
            .map(|i| format!("const Limit{i:02} = {i:04}"))
            .collect();
        owned.push("func run() {".to_string());
        owned.extend((0..10).map(|i| format!("\tstep{i}(ctx, Limit{i:02})")));
        owned.push("}".to_string());
        owned.push("// tiny".to_string());
        let lines: Vec<&str> = owned.iter().map(String::as_str).collect();
        let symbols = vec![SymbolInfo::new("run", "function", 31, 42)];

        let chunks = strategy.chunk(&lines, "limits.go", &symbols);

        let ranges: Vec<(usize, usize)> = chunks.iter().map(|c| (c.start_line, c.end_line)).collect();
        // the one-line trailer is under the minimum
        assert_eq!(ranges, vec![(1, 30), (31, 42)]);
        assert_eq!(chunks[0].chunk_type, ChunkType::Block);
        assert_eq!(chunks[0].symbol_name, None);
        assert!(chunks[0].content.starts_with("const Limit01"));
        assert_eq!(chunks[1].symbol_name.as_deref(), Some("run"));
    }

    #[test]
    fn test_symbol_below_minimum_joins_surrounding_code() {
        let config = ChunkerConfig {
            max_chunk_tokens: 512,
            min_chunk_tokens: 10,
            overlap_tokens: 0,
        };
        let strategy = SymbolChunkingStrategy::new(&config, &CharTokenEstimator, Language::Go);
        let lines = vec![
            "import \"strings\"",
            "func id() {}",
            "var names = strings.Fields(\"a b c\")",
        ];
        let symbols = vec![SymbolInfo::new("id", "function", 2, 2)];

        let chunks = strategy.chunk(&lines, "names.go", &symbols);
        assert_eq!(chunks.len(), 1);
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 3));
        assert_eq!(chunks[0].chunk_type, ChunkType::Block);
    }
}
