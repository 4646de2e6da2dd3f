use coderag_code_chunker::CodeChunk;
use coderag_codebase_retrieval::SearchResult;
use log::debug;

/// Tokens a chunk costs against the budget.
///
/// Falls back to a quarter of the content length when the chunk carries no
/// estimate.
pub fn chunk_tokens(chunk: &CodeChunk) -> usize {
    if chunk.token_count == 0 {
        chunk.content.len() / 4
    } else {
        chunk.token_count
    }
}

/// Greedy selection in ranked order.
///
/// A chunk that would overflow the budget is skipped and later, smaller
/// chunks are still considered. Returns the selection and the tokens it uses.
pub fn select_within_budget(
    results: Vec<SearchResult>,
    token_budget: usize,
) -> (Vec<CodeChunk>, usize) {
    let mut selected = Vec::new();
    let mut tokens_used = 0;

    for result in results {
        let tokens = chunk_tokens(&result.chunk);
        if tokens_used + tokens > token_budget {
            debug!(
                "Skipping {}:{} ({tokens} tokens, {tokens_used}/{token_budget} used)",
                result.chunk.file_path, result.chunk.start_line
            );
            continue;
        }
        tokens_used += tokens;
        selected.push(result.chunk);
    }

    (selected, tokens_used)
}

/// Presentation order: file path, then start line.
pub fn sort_for_presentation(chunks: &mut [CodeChunk]) {
    chunks.sort_by(|a, b| {
        a.file_path
            .cmp(&b.file_path)
            .then(a.start_line.cmp(&b.start_line))
    });
}
