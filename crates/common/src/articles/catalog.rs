//! Category catalog
//!
//! The enumerated set of `(themeId, category)` pairs an article may belong to.
//! Loaded from configuration so new themes do not need a release.

use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Reserved theme key meaning "no filter"
pub const ALL_THEMES: &str = "all";

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    /// Machine key, stored as `themeId`
    pub id: String,

    /// Human-readable label, stored as `category`
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl CategoryEntry {
    pub fn new(id: &str, name: &str, icon: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.map(String::from),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    entries: Vec<CategoryEntry>,
}

impl CategoryCatalog {
    /// Build a catalog, rejecting blank, reserved or duplicated keys and labels
    ///
    /// Ids and names are trimmed first, matching how article input is read.
    pub fn new(entries: Vec<CategoryEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(AppError::Configuration {
                message: "category catalog must contain at least one entry".to_string(),
            });
        }

        let entries: Vec<CategoryEntry> = entries
            .into_iter()
            .map(|entry| CategoryEntry {
                id: entry.id.trim().to_string(),
                name: entry.name.trim().to_string(),
                icon: entry.icon,
            })
            .collect();

        let mut ids = HashSet::new();
        let mut names = HashSet::new();

        for entry in &entries {
            if entry.id.is_empty() || entry.name.is_empty() {
                return Err(AppError::Configuration {
                    message: "category entries need a non-empty id and name".to_string(),
                });
            }
            if entry.id == ALL_THEMES {
                return Err(AppError::Configuration {
                    message: format!("'{}' is reserved and cannot be a category id", ALL_THEMES),
                });
            }
            if !ids.insert(entry.id.as_str()) {
                return Err(AppError::Configuration {
                    message: format!("duplicate category id '{}'", entry.id),
                });
            }
            if !names.insert(entry.name.as_str()) {
                return Err(AppError::Configuration {
                    message: format!("duplicate category name '{}'", entry.name),
                });
            }
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CategoryEntry] {
        &self.entries
    }

    /// Look up an entry by its theme key
    pub fn by_theme(&self, theme_id: &str) -> Option<&CategoryEntry> {
        self.entries.iter().find(|e| e.id == theme_id)
    }

    /// Look up an entry by its label
    pub fn by_name(&self, name: &str) -> Option<&CategoryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// True when `(category, theme_id)` is exactly one catalog entry
    pub fn contains_pair(&self, category: &str, theme_id: &str) -> bool {
        self.by_theme(theme_id)
            .map(|e| e.name == category)
            .unwrap_or(false)
    }
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self {
            entries: default_entries(),
        }
    }
}

/// The themes the site launched with
pub fn default_entries() -> Vec<CategoryEntry> {
    vec![
        CategoryEntry::new("arquitetos-do-poder", "Arquitetos do Poder", Some("🏛️")),
        CategoryEntry::new("rockefeller", "Rockefeller", Some("🛢️")),
        CategoryEntry::new("sistema-autoperpetuante", "Sistema Monetário", Some("💰")),
        CategoryEntry::new("brics", "BRICS", Some("🌍")),
        CategoryEntry::new("ww2", "Segunda Guerra", Some("⚔️")),
    ]
}
