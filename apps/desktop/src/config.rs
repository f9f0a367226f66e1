use std::{collections::HashMap, fs, time::Duration};

use anyhow::{Context, Result};
use client_core::ClientConfig;
use ledger_integration::rest::DEFAULT_NODE_URL;
use shared::protocol::DEFAULT_MODULE_ADDRESS;
use url::Url;

pub const SETTINGS_FILE: &str = "notes.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub node_url: String,
    pub signer_url: Option<String>,
    pub database_url: String,
    pub module_address: String,
    pub confirmation_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub connect_timeout_secs: Option<u64>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            node_url: DEFAULT_NODE_URL.into(),
            signer_url: None,
            database_url: "sqlite://./data/notes.db".into(),
            module_address: DEFAULT_MODULE_ADDRESS.into(),
            confirmation_timeout_secs: 20,
            poll_interval_ms: 500,
            connect_timeout_secs: Some(120),
        }
    }
}

impl ClientSettings {
    pub fn node_url(&self) -> Result<Url> {
        Url::parse(&self.node_url).with_context(|| format!("invalid node url '{}'", self.node_url))
    }

    pub fn signer_url(&self) -> Result<Option<Url>> {
        self.signer_url
            .as_deref()
            .map(|raw| Url::parse(raw).with_context(|| format!("invalid signer url '{raw}'")))
            .transpose()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        let module_address = self
            .module_address
            .parse()
            .with_context(|| format!("invalid module address '{}'", self.module_address))?;
        let mut config = ClientConfig::new(module_address);
        config.orchestrator.confirmation_timeout =
            Duration::from_secs(self.confirmation_timeout_secs);
        config.connect_timeout = self.connect_timeout_secs.map(Duration::from_secs);
        Ok(config)
    }
}

/// Defaults, then `notes.toml`, then `APP__*` environment variables.
pub fn load_settings() -> ClientSettings {
    let mut settings = ClientSettings::default();
    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut ClientSettings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        tracing::warn!("config: ignoring malformed {SETTINGS_FILE}");
        return;
    };
    let lookup = |key: &str| {
        file_cfg.get(key).map(|value| match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    };
    apply(settings, lookup);
}

fn apply_env(settings: &mut ClientSettings, env: impl Fn(&str) -> Option<String>) {
    apply(settings, |key| env(&format!("APP__{}", key.to_ascii_uppercase())));
}

fn apply(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("node_url") {
        settings.node_url = v;
    }
    if let Some(v) = lookup("signer_url") {
        settings.signer_url = Some(v);
    }
    if let Some(v) = lookup("database_url") {
        settings.database_url = v;
    }
    if let Some(v) = lookup("module_address") {
        settings.module_address = v;
    }
    if let Some(parsed) = positive(&lookup, "confirmation_timeout_secs") {
        settings.confirmation_timeout_secs = parsed;
    }
    if let Some(parsed) = positive(&lookup, "poll_interval_ms") {
        settings.poll_interval_ms = parsed;
    }
    if let Some(parsed) = positive(&lookup, "connect_timeout_secs") {
        settings.connect_timeout_secs = Some(parsed);
    }
}

/// Zero and unparsable values are treated as malformed and skipped.
fn positive(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            tracing::warn!(key, value = %raw, "config: ignoring malformed value");
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
