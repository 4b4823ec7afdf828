//! Finalizer stage: hydrate citations and assemble the answer document.

use std::path::Path;

use tracing::debug;

use super::prompts::summary_prompt;
use crate::citation::{format_references, hydrate_citations, SNIPPET_UNAVAILABLE};
use crate::config::{Config, SUMMARY_TEMPERATURE};
use crate::core::AgentState;
use crate::oracle::Oracle;

/// Code-example snippets included in the structured document.
const MAX_CODE_EXAMPLES: usize = 3;

/// Shape of the finalized answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinalizerMode {
    /// Summary / Detailed Explanation / Code Examples / References.
    #[default]
    Structured,
    /// The draft followed by the reference section.
    Plain,
}

/// Hydrates citations from the repository tree and formats the final
/// answer.
pub async fn finalize(
    oracle: &dyn Oracle,
    config: &Config,
    repo_root: &Path,
    mode: FinalizerMode,
    state: &mut AgentState,
) {
    let citations = std::mem::take(&mut state.citations);
    let hydrated = hydrate_citations(citations, repo_root, config.snippet_length);
    let draft = state.draft_answer.clone().unwrap_or_default();

    let references = format_references(&hydrated);

    let final_answer = match mode {
        FinalizerMode::Plain => format!("{draft}{references}"),
        FinalizerMode::Structured => {
            let summary = summarize(oracle, &draft).await;
            let mut document = format!("## Summary\n{summary}\n\n## Detailed Explanation\n{draft}");

            let examples: Vec<String> = hydrated
                .iter()
                .filter(|c| !c.text_snippet.is_empty() && c.text_snippet != SNIPPET_UNAVAILABLE)
                .take(MAX_CODE_EXAMPLES)
                .map(|c| {
                    format!(
                        "`{}:{}-{}`\n```\n{}\n```",
                        c.file_path, c.start_line, c.end_line, c.text_snippet
                    )
                })
                .collect();
            if !examples.is_empty() {
                document.push_str("\n\n## Code Examples\n");
                document.push_str(&examples.join("\n\n"));
            }

            document.push_str(&references);
            document
        }
    };

    debug!(citations = hydrated.len(), "finalized answer");
    state.trace("Finalized answer with enhanced citations");
    state.citations = hydrated;
    state.final_answer = Some(final_answer);
}

/// Short summary of the draft: the oracle at the summarization
/// temperature, or the draft's leading sentences when the oracle is
/// unavailable.
async fn summarize(oracle: &dyn Oracle, draft: &str) -> String {
    match oracle.complete(&summary_prompt(draft), SUMMARY_TEMPERATURE).await {
        Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
        _ => leading_sentences(draft, 2),
    }
}

/// First `n` sentences of a text.
fn leading_sentences(text: &str, n: usize) -> String {
    let mut sentences = Vec::new();
    let mut rest = text.trim();
    for _ in 0..n {
        match rest.find(['.', '!', '?']) {
            Some(pos) => {
                let (sentence, tail) = rest.split_at(pos + 1);
                sentences.push(sentence.trim());
                rest = tail.trim_start();
                if rest.is_empty() {
                    break;
                }
            }
            None => {
                if !rest.is_empty() {
                    sentences.push(rest);
                }
                break;
            }
        }
    }
    sentences.join(" ")
}
