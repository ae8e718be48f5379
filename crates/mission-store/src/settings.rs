use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::documents::{write_doc, DocumentStore};
use crate::error::Result;
use crate::types::{AppSettings, SettingsPatch};

pub const SETTINGS_KEY: &str = "settings";

/// Stored form; every field optional so older or hand-edited documents
/// still load.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSettings {
    operator_nickname: Option<String>,
    agent_nickname: Option<String>,
    openclaw_workspace_dir: Option<String>,
}

/// Dashboard settings on top of the document store.
pub struct SettingsStore {
    docs: Arc<dyn DocumentStore>,
}

impl SettingsStore {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self { docs }
    }

    /// Current settings with blanks replaced by defaults. A missing or
    /// unreadable document yields the defaults.
    pub fn get(&self) -> AppSettings {
        let stored = match self.docs.read(SETTINGS_KEY) {
            Ok(Some(value)) => serde_json::from_value::<StoredSettings>(value).unwrap_or_else(|e| {
                warn!("settings document unreadable, using defaults: {e}");
                StoredSettings::default()
            }),
            Ok(None) => StoredSettings::default(),
            Err(e) => {
                warn!("settings read failed, using defaults: {e}");
                StoredSettings::default()
            }
        };

        let defaults = AppSettings::default();
        AppSettings {
            operator_nickname: non_blank(stored.operator_nickname)
                .unwrap_or(defaults.operator_nickname),
            agent_nickname: non_blank(stored.agent_nickname).unwrap_or(defaults.agent_nickname),
            openclaw_workspace_dir: non_blank(stored.openclaw_workspace_dir)
                .unwrap_or(defaults.openclaw_workspace_dir),
        }
    }

    /// Merge `patch` into the current settings and persist the result.
    ///
    /// Blank nicknames are ignored. The workspace directory may be cleared by
    /// sending an empty string.
    pub fn save(&self, patch: SettingsPatch) -> Result<AppSettings> {
        let current = self.get();
        let next = AppSettings {
            operator_nickname: non_blank(patch.operator_nickname)
                .unwrap_or(current.operator_nickname),
            agent_nickname: non_blank(patch.agent_nickname).unwrap_or(current.agent_nickname),
            openclaw_workspace_dir: patch
                .openclaw_workspace_dir
                .map(|dir| dir.trim().to_string())
                .unwrap_or(current.openclaw_workspace_dir),
        };
        write_doc(self.docs.as_ref(), SETTINGS_KEY, &next)?;
        info!("settings saved");
        Ok(next)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
