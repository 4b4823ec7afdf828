//! Prompt templates for the agent stages.

use crate::context::PackedChunk;
use crate::core::SearchResult;

/// Chunk preview length in the verifier prompt.
const VERIFY_PREVIEW_CHARS: usize = 200;

/// Prompt asking the oracle for a search plan.
#[must_use]
pub fn planner_prompt(question: &str) -> String {
    format!(
        r#"You are a code analyst planning how to answer a question about a codebase.

Question: {question}

Your task is to create a search plan. Output a JSON object with:
- "reasoning": Brief explanation of your approach
- "search_queries": List of 2-4 specific search queries to find relevant code
- "expected_files": List of file patterns you expect to find (e.g., "auth.py", "middleware")

Make queries specific and diverse. Good examples:
- "authentication middleware setup"
- "request validation logic"
- "database connection initialization"

Bad examples (too vague):
- "authentication"
- "code"

Output ONLY valid JSON, no other text:
{{
  "reasoning": "your reasoning here",
  "search_queries": ["query1", "query2", "query3"],
  "expected_files": ["file1.py", "file2.js"]
}}"#
    )
}

/// Prompt asking the oracle to draft an answer from the packed chunks.
#[must_use]
pub fn synthesizer_prompt(question: &str, packed: &[PackedChunk]) -> String {
    let mut chunks_text = String::new();
    for (i, chunk) in packed.iter().enumerate() {
        let result = &chunk.result;
        chunks_text.push_str(&format!(
            "\n--- Chunk {}: {}:{}-{}",
            i + 1,
            result.file_path,
            result.start_line,
            result.end_line
        ));
        if let Some(symbol) = &result.symbol_name {
            chunks_text.push_str(&format!(" (Symbol: {symbol})"));
        }
        chunks_text.push_str(" ---\n");
        chunks_text.push_str(&result.text);
        chunks_text.push('\n');
    }

    format!(
        r#"Answer the question using ONLY the provided code chunks below.

Question: {question}

Retrieved Code:
{chunks_text}

CRITICAL RULES:
1. Cite EVERY claim with [file_path:start_line-end_line] format
2. Only make claims supported by the retrieved code
3. If information is not in the chunks, say "Not found in retrieved code"
4. Be specific about file paths and line numbers
5. Do not make assumptions about code you haven't seen

Example citation formats:
- [src/auth/middleware.py:45-67] (preferred)
- [src/auth/middleware.py:45] (single line)

IMPORTANT: If you reference code from the chunks above, you MUST cite it
using the exact file path and line numbers shown in the chunk headers.

Answer:"#
    )
}

/// Prompt asking the oracle to check a draft for groundedness.
#[must_use]
pub fn verifier_prompt(question: &str, draft_answer: &str, chunks: &[SearchResult]) -> String {
    let chunks_text = chunks
        .iter()
        .map(|chunk| {
            let preview: String = chunk.text.chars().take(VERIFY_PREVIEW_CHARS).collect();
            format!(
                "- {}:{}-{}: {}...",
                chunk.file_path, chunk.start_line, chunk.end_line, preview
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Verify if the answer is fully supported by the retrieved code chunks.

Question: {question}

Answer to verify:
{draft_answer}

Retrieved Code Chunks:
{chunks_text}

For each claim in the answer:
1. Is it supported by a code chunk?
2. Does the citation match actual content?
3. Are there unsupported claims or hallucinations?

Output ONLY valid JSON:
{{
  "is_grounded": true or false,
  "unsupported_claims": ["claim1", "claim2"],
  "missing_information": ["what additional info would help answer better"],
  "follow_up_queries": ["specific query 1", "specific query 2"]
}}

If the answer is well-supported, set is_grounded to true and leave the lists empty.
If there are gaps, provide specific follow-up queries to fill them.

Output ONLY valid JSON, no other text:"#
    )
}

/// Prompt asking the oracle for a short summary of the draft.
#[must_use]
pub fn summary_prompt(draft_answer: &str) -> String {
    format!(
        r"Summarize the following answer in one or two sentences. Keep file
references out of the summary; state only what the code does.

Answer:
{draft_answer}

Summary:"
    )
}
