use crate::error::{ConsoleError, ConsoleResult};
use crate::forms::FormFields;
use crate::store::{LocalStore, SETTINGS_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsoleSettings {
    pub site_name: String,
    pub items_per_page: u32,
    pub default_export: String,
    pub notifications_enabled: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            site_name: "MovieMind".to_string(),
            items_per_page: DEFAULT_PAGE_SIZE,
            default_export: "movies".to_string(),
            notifications_enabled: true,
        }
    }
}

impl ConsoleSettings {
    pub fn from_form(fields: &FormFields) -> ConsoleResult<Self> {
        let defaults = Self::default();
        let items_per_page = match fields.text("itemsPerPage") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| (1..=100).contains(n))
                .ok_or_else(|| {
                    ConsoleError::Validation("Items per page must be between 1 and 100".into())
                })?,
            None => defaults.items_per_page,
        };
        let default_export = fields
            .text("defaultExport")
            .unwrap_or(defaults.default_export);
        if !matches!(default_export.as_str(), "movies" | "users" | "quizzes") {
            return Err(ConsoleError::Validation(format!(
                "Unknown export type '{}'",
                default_export
            )));
        }
        Ok(Self {
            site_name: fields.text("siteName").unwrap_or(defaults.site_name),
            items_per_page,
            default_export,
            notifications_enabled: fields.checked("notificationsEnabled"),
        })
    }
}

/// Settings blob in the local store. A cache, not an authority: anything
/// unreadable falls back to defaults.
#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn LocalStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> ConsoleSettings {
        let Some(raw) = self.store.get(SETTINGS_KEY) else {
            return ConsoleSettings::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Stored settings unreadable, using defaults: {}", e);
            ConsoleSettings::default()
        })
    }

    pub fn save(&self, settings: &ConsoleSettings) -> ConsoleResult<()> {
        let raw = serde_json::to_string(settings)
            .map_err(|e| ConsoleError::Storage(e.to_string()))?;
        self.store
            .set(SETTINGS_KEY, &raw)
            .map_err(|e| ConsoleError::Storage(e.to_string()))
    }

    pub fn page_size(&self) -> u32 {
        self.load().items_per_page.clamp(1, 100)
    }
}
