use std::{fs, path::Path, time::Duration};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use url::Url;

use crate::coordinator::EditPolicy;

pub const DEFAULT_SETTINGS_FILE: &str = "orgchart.toml";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_url: String,
    pub token: Option<String>,
    pub edit_policy: EditPolicy,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080".into(),
            token: None,
            edit_policy: EditPolicy::LastWriteWins,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    token: Option<String>,
    edit_policy: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// Defaults, then `path` (or `orgchart.toml` when present), then
/// `ORGCHART__*` environment variables.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    let file_path = path.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_FILE));
    match fs::read_to_string(file_path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("invalid settings file '{}'", file_path.display()))?;
            apply_file_settings(&mut settings, file_cfg)?;
        }
        Err(err) if path.is_some() => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", file_path.display()));
        }
        Err(_) => {}
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    settings.api_url = normalize_api_url(&settings.api_url)?;
    Ok(settings)
}

fn apply_file_settings(settings: &mut ClientSettings, file_cfg: FileSettings) -> anyhow::Result<()> {
    if let Some(v) = file_cfg.api_url {
        settings.api_url = v;
    }
    if let Some(v) = file_cfg.token {
        settings.token = non_empty(v);
    }
    if let Some(v) = file_cfg.edit_policy {
        settings.edit_policy = v.parse()?;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout = Duration::from_secs(v);
    }
    Ok(())
}

pub(crate) fn apply_env_overrides<F>(settings: &mut ClientSettings, lookup: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("ORGCHART__API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = lookup("ORGCHART__TOKEN") {
        settings.token = non_empty(v);
    }
    if let Some(v) = lookup("ORGCHART__EDIT_POLICY") {
        settings.edit_policy = v.parse()?;
    }
    if let Some(v) = lookup("ORGCHART__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout = Duration::from_secs(parsed);
        }
    }
    Ok(())
}

/// Validate the base URL and strip any trailing slash, so routes can be
/// appended verbatim.
pub fn normalize_api_url(raw: &str) -> anyhow::Result<String> {
    let parsed = Url::parse(raw.trim()).with_context(|| format!("invalid api url '{raw}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!(
            "api url must use http or https, got '{}'",
            parsed.scheme()
        ));
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
