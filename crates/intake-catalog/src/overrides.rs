//! User-edited templates layered over the built-in catalog

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use intake_core::{IntakeError, Result, SelectedTeam};

/// Template text keyed by `team` or `team/subtype`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateOverrides {
    #[serde(default)]
    pub templates: BTreeMap<String, String>,
}

impl TemplateOverrides {
    pub fn key(team_id: &str, subtype_id: Option<&str>) -> String {
        match subtype_id {
            Some(subtype) => SelectedTeam::with_subtype(team_id, subtype).to_string(),
            None => team_id.to_string(),
        }
    }

    pub fn get(&self, team_id: &str, subtype_id: Option<&str>) -> Option<&str> {
        self.templates
            .get(&Self::key(team_id, subtype_id))
            .map(|s| s.as_str())
    }

    pub fn set(&mut self, team_id: &str, subtype_id: Option<&str>, template: String) {
        self.templates.insert(Self::key(team_id, subtype_id), template);
    }

    pub fn remove(&mut self, team_id: &str, subtype_id: Option<&str>) -> bool {
        self.templates
            .remove(&Self::key(team_id, subtype_id))
            .is_some()
    }

    /// Missing file means no overrides.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| {
            IntakeError::Config(format!(
                "Invalid template overrides {}: {}",
                path.display(),
                e
            ))
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_yaml::to_string(self)
            .map_err(|e| IntakeError::Persistence(format!("Failed to encode overrides: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
