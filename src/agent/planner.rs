//! Planner stage: turn the question into a search plan.

use tracing::debug;

use super::prompts::planner_prompt;
use crate::config::ANALYTIC_TEMPERATURE;
use crate::core::{AgentState, Plan};
use crate::oracle::{json, Oracle};

/// Asks the oracle for a plan; any failure degrades to the fallback plan
/// (search the question verbatim).
///
/// Initializes the retrieval iteration counter to 0.
pub async fn plan(oracle: &dyn Oracle, state: &mut AgentState) {
    let prompt = planner_prompt(&state.question);

    let plan = match oracle.complete(&prompt, ANALYTIC_TEMPERATURE).await {
        Ok(response) => parse_plan(&response, &state.question),
        Err(e) => {
            debug!(error = %e, "planner oracle failed, using fallback plan");
            Plan::fallback(&state.question)
        }
    };

    state.trace(format!("Plan: {}", plan.reasoning));
    state.plan = Some(plan);
    state.retrieval_iteration = 0;
}

/// Parses the oracle's plan, patching empty fields.
fn parse_plan(response: &str, question: &str) -> Plan {
    let Some(value) = json::extract_object(response) else {
        return Plan::fallback(question);
    };

    let mut plan: Plan = serde_json::from_value(value).unwrap_or_else(|_| Plan::fallback(question));

    plan.search_queries.retain(|q| !q.trim().is_empty());
    if plan.search_queries.is_empty() {
        plan.search_queries = vec![question.to_string()];
    }
    if plan.reasoning.is_empty() {
        plan.reasoning = "Direct search for question keywords".to_string();
    }

    plan
}
