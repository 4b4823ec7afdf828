//! Verifier stage: judge whether the draft is grounded in the chunks.

use tracing::debug;

use super::prompts::verifier_prompt;
use crate::config::ANALYTIC_TEMPERATURE;
use crate::core::{AgentState, Verification};
use crate::oracle::{json, Oracle};

/// Asks the oracle to check the draft against the retrieved chunks.
///
/// Fails open: an oracle failure or unparseable response verifies as
/// grounded with empty lists, so a broken verifier can never spin the
/// loop forever.
pub async fn verify(oracle: &dyn Oracle, state: &mut AgentState) {
    let draft = state.draft_answer.clone().unwrap_or_default();
    let prompt = verifier_prompt(&state.question, &draft, &state.retrieved_chunks);

    let verification = match oracle.complete(&prompt, ANALYTIC_TEMPERATURE).await {
        Ok(response) => parse_verification(&response),
        Err(e) => {
            debug!(error = %e, "verifier oracle failed, accepting draft");
            Verification::default()
        }
    };

    state.trace(format!(
        "Verification: grounded={}, unsupported_claims={}",
        verification.is_grounded,
        verification.unsupported_claims.len()
    ));
    state.verification = Some(verification);
}

fn parse_verification(response: &str) -> Verification {
    json::extract_object(response)
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}
