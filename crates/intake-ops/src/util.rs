use serde::Serialize;
use tracing::debug;

use intake_core::{ChatMessage, Result, Team};
use intake_llm::LLMRegistry;

use crate::config::CallConfig;

/// Send one prompt pair to the provider configured for an operation.
pub(crate) async fn complete(
    registry: &LLMRegistry,
    call: &CallConfig,
    system: String,
    prompt: String,
    operation: &'static str,
) -> Result<String> {
    let llm = registry.resolve(&call.llm)?;
    let messages = vec![ChatMessage::system(system), ChatMessage::user(prompt)];

    let response = llm.complete(&messages, Some(&call.llm_config())).await?;
    debug!(
        operation,
        provider = llm.provider_name(),
        chars = response.content.len(),
        "LLM reply received"
    );
    Ok(response.content)
}

#[derive(Debug, Serialize)]
pub(crate) struct TeamOption {
    id: String,
    name: String,
    subtypes: Vec<SubtypeOption>,
}

#[derive(Debug, Serialize)]
struct SubtypeOption {
    id: String,
    name: String,
}

/// Catalog summary for prompts, without template bodies.
pub(crate) fn team_options(teams: Vec<Team>) -> Vec<TeamOption> {
    teams
        .into_iter()
        .map(|team| TeamOption {
            subtypes: team
                .subtypes
                .into_iter()
                .map(|s| SubtypeOption {
                    id: s.id,
                    name: s.name,
                })
                .collect(),
            id: team.id,
            name: team.name,
        })
        .collect()
}

/// Remove a surrounding ``` fence some models put around markdown output.
pub(crate) fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    match body.find('\n') {
        Some(newline) if !body[..newline].contains(' ') => body[newline + 1..].trim(),
        _ => body.trim(),
    }
}
