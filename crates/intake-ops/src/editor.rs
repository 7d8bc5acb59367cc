//! Natural-language editing of a generated ticket

use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use intake_core::{Result, SelectedTeam, TemplateCatalog};
use intake_llm::{Envelope, LLMRegistry, optional_id, parse_envelope};
use minijinja::context;

use crate::config::CallConfig;
use crate::prompts::{PromptKind, PromptRenderer};
use crate::types::EditOutcome;
use crate::util::{complete, team_options};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditEnvelope {
    #[serde(default)]
    edited_task: Option<String>,
    #[serde(default)]
    new_team_id: Option<String>,
    #[serde(default)]
    new_subtype_id: Option<String>,
}

impl Envelope for EditEnvelope {
    fn validate(&self) -> std::result::Result<(), String> {
        match self.edited_task.as_deref().map(str::trim) {
            Some(task) if !task.is_empty() => Ok(()),
            _ => Err("editedTask is missing or empty".to_string()),
        }
    }
}

pub struct TicketEditor {
    config: CallConfig,
    llm_registry: Arc<LLMRegistry>,
    catalog: Arc<dyn TemplateCatalog>,
    prompts: Arc<PromptRenderer>,
}

impl TicketEditor {
    pub fn new(
        config: CallConfig,
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

    /// Apply `instruction` to `current_task`.
    ///
    /// Transport errors propagate. A reply that cannot be parsed returns the original
    /// ticket with `applied == false`.
    pub async fn edit(
        &self,
        current_task: &str,
        instruction: &str,
        current_team: &SelectedTeam,
    ) -> Result<EditOutcome> {
        let prompt = self.prompts.render(
            PromptKind::Edit,
            context! {
                current_task => current_task,
                instruction => instruction,
                team => format!("{} ({})", self.catalog.display_name(current_team), current_team),
                teams => team_options(self.catalog.teams()),
            },
        )?;
        let system = format!(
            "{}\n\nОтвечай только валидным JSON.",
            self.prompts.system()?
        );
        let content = complete(&self.llm_registry, &self.config, system, prompt, "edit").await?;

        let envelope: EditEnvelope = match parse_envelope(&content) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Edit reply unparseable, keeping original ticket");
                return Ok(EditOutcome::unchanged(current_task));
            }
        };

        let new_team = self.team_change(envelope.new_team_id, envelope.new_subtype_id, current_team);
        info!(team_changed = new_team.is_some(), "Ticket edited");
        Ok(EditOutcome {
            edited_task: envelope.edited_task.unwrap_or_default().trim().to_string(),
            new_team,
            applied: true,
        })
    }

    fn team_change(
        &self,
        team_id: Option<String>,
        subtype_id: Option<String>,
        current: &SelectedTeam,
    ) -> Option<SelectedTeam> {
        let team_id = optional_id(team_id)?;
        let subtype_id = optional_id(subtype_id);

        let Some(selected) = self
            .catalog
            .select(&team_id, subtype_id.as_deref())
            .or_else(|| self.catalog.select(&team_id, None))
        else {
            warn!(team = %team_id, "Edit named unknown team, ignoring");
            return None;
        };
        (selected != *current).then_some(selected)
    }
}
