//! Team classification: keyword rules first, LLM fallback

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use intake_core::{IntakeError, Result, SelectedTeam, TemplateCatalog};
use intake_llm::{Envelope, LLMRegistry, optional_id, parse_envelope};
use minijinja::context;

use crate::config::ClassifierConfig;
use crate::prompts::{PromptKind, PromptRenderer};
use crate::util::{complete, team_options};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassificationEnvelope {
    #[serde(default)]
    team_id: Option<String>,
    #[serde(default)]
    subtype_id: Option<String>,
}

impl Envelope for ClassificationEnvelope {}

pub struct TeamClassifier {
    config: ClassifierConfig,
    llm_registry: Arc<LLMRegistry>,
    catalog: Arc<dyn TemplateCatalog>,
    prompts: Arc<PromptRenderer>,
}

impl TeamClassifier {
    pub fn new(
        config: ClassifierConfig,
        llm_registry: Arc<LLMRegistry>,
        catalog: Arc<dyn TemplateCatalog>,
        prompts: Arc<PromptRenderer>,
    ) -> Self {
        Self {
            config,
            llm_registry,
            catalog,
            prompts,
        }
    }

    /// Deterministic pass over the leading characters of `text`.
    ///
    /// Rules are tried in order and the first rule with any matching phrase decides.
    /// Rules naming a team the catalog does not have are skipped.
    pub fn match_keywords(&self, text: &str) -> Option<SelectedTeam> {
        let prefix: String = text
            .chars()
            .take(self.config.prefix_chars)
            .collect::<String>()
            .to_lowercase();

        for rule in &self.config.rules {
            let Some(pattern) = rule
                .patterns
                .iter()
                .find(|p| prefix.contains(&p.to_lowercase()))
            else {
                continue;
            };

            match self.catalog.select(&rule.team, rule.subtype.as_deref()) {
                Some(selected) => {
                    debug!(pattern = %pattern, team = %selected, "Keyword match");
                    return Some(selected);
                }
                None => {
                    warn!(team = %rule.team, subtype = ?rule.subtype, "Keyword rule targets unknown team");
                }
            }
        }
        None
    }

    /// Keyword rules, then one LLM call. `Ok(None)` means the team could not be
    /// determined and the user should pick one.
    pub async fn classify(&self, text: &str) -> Result<Option<SelectedTeam>> {
        if let Some(selected) = self.match_keywords(text) {
            return Ok(Some(selected));
        }

        let prompt = self.prompts.render(
            PromptKind::Classify,
            context! { text => text, teams => team_options(self.catalog.teams()) },
        )?;
        let content = complete(
            &self.llm_registry,
            &self.config.call,
            "Ты классифицируешь задачи по командам. Отвечай только валидным JSON.".to_string(),
            prompt,
            "classify",
        )
        .await?;

        let envelope: ClassificationEnvelope = parse_envelope(&content)
            .map_err(|e| IntakeError::malformed("classification", e.to_string()))?;

        let Some(team_id) = optional_id(envelope.team_id) else {
            info!("LLM could not determine team");
            return Ok(None);
        };
        let subtype_id = optional_id(envelope.subtype_id);

        let selected = self
            .catalog
            .select(&team_id, subtype_id.as_deref())
            .or_else(|| self.catalog.select(&team_id, None));
        match &selected {
            Some(team) => info!(team = %team, "LLM classified team"),
            None => warn!(team = %team_id, "LLM returned unknown team"),
        }
        Ok(selected)
    }
}
