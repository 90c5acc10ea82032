use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClientSettings {
    pub base_url: String,
    pub division: Option<String>,
    pub access_token: Option<String>,
    pub request_timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "https://start.exactonline.nl".into(),
            division: None,
            access_token: None,
            request_timeout_seconds: 30,
            user_agent: concat!("odata-entity-client/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid base url '{}'", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "base url '{}' must use http or https",
                self.base_url
            ));
        }
        if self.request_timeout_seconds == 0 {
            return Err(anyhow!("request timeout must be at least one second"));
        }
        Ok(())
    }

    fn apply_file_values(&mut self, file_cfg: &HashMap<String, String>) {
        if let Some(v) = file_cfg.get("base_url") {
            self.base_url = v.clone();
        }
        if let Some(v) = file_cfg.get("division") {
            self.division = Some(v.clone());
        }
        if let Some(v) = file_cfg.get("access_token") {
            self.access_token = Some(v.clone());
        }
        if let Some(v) = file_cfg.get("request_timeout_seconds") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.request_timeout_seconds = parsed;
            }
        }
        if let Some(v) = file_cfg.get("user_agent") {
            self.user_agent = v.clone();
        }
    }

    fn apply_env_values(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("ODATA_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("APP__BASE_URL") {
            self.base_url = v;
        }

        if let Some(v) = lookup("ODATA_DIVISION") {
            self.division = Some(v);
        }
        if let Some(v) = lookup("APP__DIVISION") {
            self.division = Some(v);
        }

        if let Some(v) = lookup("ODATA_ACCESS_TOKEN") {
            self.access_token = Some(v);
        }
        if let Some(v) = lookup("APP__ACCESS_TOKEN") {
            self.access_token = Some(v);
        }

        if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECONDS") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.request_timeout_seconds = parsed;
            }
        }
    }
}

/// Defaults, then `client.toml` in the working directory, then the environment.
pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            settings.apply_file_values(&file_cfg);
        }
    }

    settings.apply_env_values(lookup);
    settings
}
