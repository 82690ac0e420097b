use std::{collections::HashMap, fs, path::PathBuf};

use tracing::warn;

pub const SETTINGS_FILE: &str = "orgchart-server.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_bind: String,
    /// Bearer token every request must carry. `None` disables the check.
    pub token: Option<String>,
    /// JSON seed of the directory; the bundled demo seed when unset.
    pub seed_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            token: None,
            seed_path: None,
        }
    }
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string(SETTINGS_FILE).ok();
    resolve_settings(file.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then the TOML file contents, then environment variables.
pub(crate) fn resolve_settings(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        match toml::from_str::<HashMap<String, String>>(raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("bind_addr") {
                    settings.server_bind = v.clone();
                }
                if let Some(v) = file_cfg.get("token") {
                    settings.token = non_empty(v);
                }
                if let Some(v) = file_cfg.get("seed_path") {
                    settings.seed_path = non_empty(v).map(PathBuf::from);
                }
            }
            Err(error) => warn!(%error, file = SETTINGS_FILE, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("ORGCHART__BIND_ADDR") {
        settings.server_bind = v;
    }
    if let Some(v) = env("ORGCHART__SERVER_TOKEN") {
        settings.token = non_empty(&v);
    }
    if let Some(v) = env("ORGCHART__SEED_PATH") {
        settings.seed_path = non_empty(&v).map(PathBuf::from);
    }

    settings
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
