use coderag_code_chunker::CodeChunk;
use std::fmt::Write;

/// Render chunks as a Markdown prompt section.
///
/// A `### File:` header opens each run of chunks from the same file, so the
/// input is expected in presentation order. Empty input renders nothing.
pub fn build_context_prompt(chunks: &[CodeChunk]) -> String {
    if chunks.is_empty() {
        return String::new();
    }

    let mut out = String::from("## Relevant Code Context\n\n");
    let mut current_file: Option<&str> = None;

    for chunk in chunks {
        if current_file != Some(chunk.file_path.as_str()) {
            if current_file.is_some() {
                out.push('\n');
            }
            let _ = writeln!(out, "### File: {}", chunk.file_path);
            current_file = Some(chunk.file_path.as_str());
        }

        match chunk.symbol_name.as_deref().filter(|name| !name.is_empty()) {
            Some(name) => {
                let kind = chunk.symbol_kind.as_deref().unwrap_or_default();
                let _ = writeln!(
                    out,
                    "\n#### {kind} {name} (lines {}-{})",
                    chunk.start_line, chunk.end_line
                );
            }
            None => {
                let _ = writeln!(out, "\n#### Lines {}-{}", chunk.start_line, chunk.end_line);
            }
        }

        let _ = writeln!(out, "```{}\n{}\n```", chunk.language, chunk.content);
    }

    out
}
