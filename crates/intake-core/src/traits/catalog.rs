//! Template catalog lookup

use crate::types::{SelectedTeam, Team};

/// Read access to the team/template catalog.
///
/// Lookups are synchronous; implementations keep the catalog in memory.
pub trait TemplateCatalog: Send + Sync {
    /// All teams in display order.
    fn teams(&self) -> Vec<Team>;

    /// Template for a team, or for one of its subtypes.
    ///
    /// Returns `None` when the team is unknown, when a subtype is required but missing,
    /// or when the subtype is not part of the team.
    fn template(&self, team_id: &str, subtype_id: Option<&str>) -> Option<String>;

    fn team(&self, team_id: &str) -> Option<Team> {
        self.teams().into_iter().find(|t| t.id == team_id)
    }

    /// Validate a team reference and fill in the default subtype.
    ///
    /// A team with subtypes and no subtype given resolves to its first subtype; a
    /// subtype given for a team without subtypes is dropped. Unknown ids yield `None`.
    fn select(&self, team_id: &str, subtype_id: Option<&str>) -> Option<SelectedTeam> {
        let team = self.team(team_id)?;
        if !team.has_subtypes() {
            return Some(SelectedTeam::new(team.id));
        }
        let subtype = match subtype_id {
            Some(id) => team.subtype(id)?,
            None => team.default_subtype()?,
        };
        Some(SelectedTeam::with_subtype(&team.id, &subtype.id))
    }

    /// Match free text against team names (substring) or ids (exact).
    fn find_by_text(&self, text: &str) -> Option<SelectedTeam> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let team = self
            .teams()
            .into_iter()
            .find(|t| t.id == needle || t.name.to_lowercase().contains(&needle))?;
        self.select(&team.id, None)
    }

    /// Team and subtype display names, falling back to ids for unknown entries.
    fn names(&self, selected: &SelectedTeam) -> (String, Option<String>) {
        let Some(team) = self.team(&selected.team_id) else {
            return (selected.team_id.clone(), selected.subtype_id.clone());
        };
        let subtype = selected.subtype_id.as_deref().map(|id| {
            team.subtype(id)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| id.to_string())
        });
        (team.name, subtype)
    }

    /// "Разработка - Задача" style label.
    fn display_name(&self, selected: &SelectedTeam) -> String {
        match self.names(selected) {
            (team, Some(subtype)) => format!("{} - {}", team, subtype),
            (team, None) => team,
        }
    }
}
