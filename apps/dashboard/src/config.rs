use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use client_core::PollPolicy;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "newsdesk.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
    pub export_dir: PathBuf,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            request_timeout_secs: 120,
            poll_interval_ms: 3000,
            poll_max_attempts: 30,
            export_dir: PathBuf::from("."),
            log_level: "info".into(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.poll_max_attempts,
        }
    }
}

/// Keys accepted in `newsdesk.toml`; all optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
    poll_max_attempts: Option<u32>,
    export_dir: Option<PathBuf>,
    log_level: Option<String>,
}

/// Defaults, then the config file, then environment variables.
///
/// An explicit `path` must exist; the default `newsdesk.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_with_env(path, |key| std::env::var(key).ok())
}

pub fn load_settings_with_env(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let file_cfg = match path {
        Some(path) => Some(read_file_settings(path)?),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                Some(read_file_settings(default_path)?)
            } else {
                None
            }
        }
    };
    if let Some(file_cfg) = file_cfg {
        apply_file(&mut settings, file_cfg);
    }

    apply_env(&mut settings, env)?;
    Ok(settings)
}

fn read_file_settings(path: &Path) -> anyhow::Result<FileSettings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("invalid config file '{}'", path.display()))
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.poll_interval_ms {
        settings.poll_interval_ms = v;
    }
    if let Some(v) = file_cfg.poll_max_attempts {
        settings.poll_max_attempts = v;
    }
    if let Some(v) = file_cfg.export_dir {
        settings.export_dir = v;
    }
    if let Some(v) = file_cfg.log_level {
        settings.log_level = v;
    }
}

/// `APP__<KEY>` wins over `NEWSDESK_<KEY>`. Blank values count as unset.
fn env_value(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    let lookup = |name: String| env(&name).filter(|v| !v.trim().is_empty());
    lookup(format!("APP__{key}")).or_else(|| lookup(format!("NEWSDESK_{key}")))
}

fn env_number<N: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> anyhow::Result<Option<N>>
where
    N::Err: std::error::Error + Send + Sync + 'static,
{
    env_value(env, key)
        .map(|v| {
            v.trim()
                .parse::<N>()
                .with_context(|| format!("invalid value '{v}' for {key}"))
        })
        .transpose()
}

fn apply_env(
    settings: &mut Settings,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = env_value(&env, "SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env_number(&env, "REQUEST_TIMEOUT_SECS")? {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = env_number(&env, "POLL_INTERVAL_MS")? {
        settings.poll_interval_ms = v;
    }
    if let Some(v) = env_number(&env, "POLL_MAX_ATTEMPTS")? {
        settings.poll_max_attempts = v;
    }
    if let Some(v) = env_value(&env, "EXPORT_DIR") {
        settings.export_dir = PathBuf::from(v);
    }
    if let Some(v) = env_value(&env, "LOG_LEVEL") {
        settings.log_level = v;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
