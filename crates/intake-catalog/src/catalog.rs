use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

use intake_core::{IntakeError, Result, Team, TemplateCatalog};

use crate::overrides::TemplateOverrides;

const DEFAULT_CATALOG: &str = include_str!("../catalog/default.yaml");

/// On-disk catalog shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub teams: Vec<Team>,
}

impl CatalogDocument {
    pub fn parse(yaml: &str) -> Result<Self> {
        let doc: Self = serde_yaml::from_str(yaml)
            .map_err(|e| IntakeError::Config(format!("Invalid team catalog: {}", e)))?;
        doc.validate()?;
        Ok(doc)
    }

    fn validate(&self) -> Result<()> {
        if self.teams.is_empty() {
            return Err(IntakeError::Config("Team catalog is empty".into()));
        }

        let mut seen = HashSet::new();
        for team in &self.teams {
            if !seen.insert(team.id.as_str()) {
                return Err(IntakeError::Config(format!("Duplicate team id: {}", team.id)));
            }
            if !team.is_valid() {
                return Err(IntakeError::Config(format!(
                    "Team '{}' needs a template or at least one subtype",
                    team.id
                )));
            }
            let mut subtypes = HashSet::new();
            for subtype in &team.subtypes {
                if !subtypes.insert(subtype.id.as_str()) {
                    return Err(IntakeError::Config(format!(
                        "Duplicate subtype '{}' in team '{}'",
                        subtype.id, team.id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// In-memory catalog with optional persisted template overrides
pub struct TeamCatalog {
    defaults: Vec<Team>,
    overrides: RwLock<TemplateOverrides>,
    overrides_path: Option<PathBuf>,
}

impl std::fmt::Debug for TeamCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamCatalog")
            .field("teams", &self.defaults.len())
            .field("overrides", &self.overrides.read().templates.len())
            .field("overrides_path", &self.overrides_path)
            .finish()
    }
}

impl TeamCatalog {
    pub fn new(document: CatalogDocument) -> Self {
        Self {
            defaults: document.teams,
            overrides: RwLock::new(TemplateOverrides::default()),
            overrides_path: None,
        }
    }

    /// Catalog bundled with the crate.
    pub fn embedded() -> Result<Self> {
        Ok(Self::new(CatalogDocument::parse(DEFAULT_CATALOG)?))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            IntakeError::Config(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        Ok(Self::new(CatalogDocument::parse(&content)?))
    }

    /// Load (or later create) an overrides file layered on top of the defaults.
    pub fn with_overrides_file(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let overrides = TemplateOverrides::load(&path)?;
        info!(
            path = %path.display(),
            templates = overrides.templates.len(),
            "Loaded template overrides"
        );
        self.overrides = RwLock::new(overrides);
        self.overrides_path = Some(path);
        Ok(self)
    }

    fn find(&self, team_id: &str) -> Option<&Team> {
        self.defaults.iter().find(|t| t.id == team_id)
    }

    /// Overrides for teams without subtypes are keyed by team id alone.
    fn override_subtype<'a>(&self, team_id: &str, subtype_id: Option<&'a str>) -> Option<&'a str> {
        match self.find(team_id) {
            Some(team) if team.has_subtypes() => subtype_id,
            _ => None,
        }
    }

    fn default_template(&self, team_id: &str, subtype_id: Option<&str>) -> Option<&str> {
        let team = self.find(team_id)?;
        if team.has_subtypes() {
            team.subtype(subtype_id?).map(|s| s.template.as_str())
        } else {
            team.template.as_deref()
        }
    }

    pub fn update_template(
        &self,
        team_id: &str,
        subtype_id: Option<&str>,
        template: impl Into<String>,
    ) -> Result<()> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(IntakeError::InvalidInput("Template must not be empty".into()));
        }
        if self.default_template(team_id, subtype_id).is_none() {
            return Err(IntakeError::TemplateNotFound {
                team_id: team_id.to_string(),
                subtype_id: subtype_id.map(String::from),
            });
        }

        let subtype_id = self.override_subtype(team_id, subtype_id);
        let mut overrides = self.overrides.write();
        overrides.set(team_id, subtype_id, template);
        self.persist(&overrides)?;
        info!(team = team_id, subtype = ?subtype_id, "Template updated");
        Ok(())
    }

    /// Drop a user override. Returns `false` when the template was already the default.
    pub fn reset_template(&self, team_id: &str, subtype_id: Option<&str>) -> Result<bool> {
        let subtype_id = self.override_subtype(team_id, subtype_id);
        let mut overrides = self.overrides.write();
        let removed = overrides.remove(team_id, subtype_id);
        if removed {
            self.persist(&overrides)?;
            info!(team = team_id, subtype = ?subtype_id, "Template reset to default");
        }
        Ok(removed)
    }

    pub fn is_overridden(&self, team_id: &str, subtype_id: Option<&str>) -> bool {
        let subtype_id = self.override_subtype(team_id, subtype_id);
        self.overrides.read().get(team_id, subtype_id).is_some()
    }

    fn persist(&self, overrides: &TemplateOverrides) -> Result<()> {
        match &self.overrides_path {
            Some(path) => overrides.save(path),
            None => Ok(()),
        }
    }
}

impl TemplateCatalog for TeamCatalog {
    fn teams(&self) -> Vec<Team> {
        let overrides = self.overrides.read();
        self.defaults
            .iter()
            .cloned()
            .map(|mut team| {
                if let Some(t) = overrides.get(&team.id, None) {
                    team.template = Some(t.to_string());
                }
                for subtype in &mut team.subtypes {
                    if let Some(t) = overrides.get(&team.id, Some(&subtype.id)) {
                        subtype.template = t.to_string();
                    }
                }
                team
            })
            .collect()
    }

    fn template(&self, team_id: &str, subtype_id: Option<&str>) -> Option<String> {
        let default = self.default_template(team_id, subtype_id)?;
        let key_subtype = self.override_subtype(team_id, subtype_id);

        Some(
            self.overrides
                .read()
                .get(team_id, key_subtype)
                .unwrap_or(default)
                .to_string(),
        )
    }

}
