//! Team and ticket template catalog

mod catalog;
mod overrides;

pub use catalog::{CatalogDocument, TeamCatalog};
pub use overrides::TemplateOverrides;
