use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::relay::{ModelEntry, ModelRegistry};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub backend: BackendConfig,
    pub relay: RelayConfig,
    pub models: Vec<ModelEntry>,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Without a key the server only serves the scripted mode.
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Pause before each scripted event.
    pub script_delay: Duration,
    /// Upper bound on one streamed response.
    pub max_stream_duration: Duration,
    /// Model label that selects the scripted source instead of the backend.
    pub scripted_label: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            script_delay: Duration::from_millis(default_script_delay_ms()),
            max_stream_duration: Duration::from_secs(default_max_stream_secs()),
            scripted_label: default_scripted_label(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    backend: BackendSection,
    #[serde(default)]
    relay: RelaySection,
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BackendSection {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default = "default_base_url")]
    base_url: String,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RelaySection {
    #[serde(default = "default_script_delay_ms")]
    script_delay_ms: u64,
    #[serde(default = "default_max_stream_secs")]
    max_stream_secs: u64,
    #[serde(default = "default_scripted_label")]
    scripted_label: String,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            script_delay_ms: default_script_delay_ms(),
            max_stream_secs: default_max_stream_secs(),
            scripted_label: default_scripted_label(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_base_url() -> String {
    "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string()
}

fn default_script_delay_ms() -> u64 {
    500
}

fn default_max_stream_secs() -> u64 {
    300
}

fn default_scripted_label() -> String {
    "test".to_string()
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.parse::<T>().ok())
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        if let Some(path) = config_path() {
            return Self::load_from_path(&path);
        }

        Ok(Self::from_env())
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path.display(), err))?;
        Self::from_toml_str(&contents)
            .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), err))
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let parsed: FileConfig = toml::from_str(contents)?;

        // Keys are secrets; let the environment supply one the file leaves out.
        let api_key = parsed
            .backend
            .api_key
            .filter(|key| !key.is_empty())
            .or_else(|| env::var("OPENAI_API_KEY").ok().filter(|key| !key.is_empty()));

        let models = if parsed.models.is_empty() {
            ModelRegistry::default_entries()
        } else {
            parsed.models
        };

        Ok(Self {
            host: parsed.server.host,
            port: parsed.server.port,
            backend: BackendConfig {
                api_key,
                base_url: parsed.backend.base_url,
            },
            relay: RelayConfig {
                script_delay: Duration::from_millis(parsed.relay.script_delay_ms),
                max_stream_duration: Duration::from_secs(parsed.relay.max_stream_secs),
                scripted_label: parsed.relay.scripted_label,
            },
            models,
        })
    }

    fn from_env() -> Self {
        let host = env::var("CHATRELAY_SERVER_HOST").unwrap_or_else(|_| default_host());
        let port = env_parsed("CHATRELAY_SERVER_PORT").unwrap_or_else(default_port);
        let api_key = env::var("OPENAI_API_KEY").ok().filter(|key| !key.is_empty());
        let base_url = env::var("OPENAI_BASE_URL").unwrap_or_else(|_| default_base_url());
        let script_delay_ms =
            env_parsed("CHATRELAY_SCRIPT_DELAY_MS").unwrap_or_else(default_script_delay_ms);
        let max_stream_secs =
            env_parsed("CHATRELAY_MAX_STREAM_SECS").unwrap_or_else(default_max_stream_secs);
        let scripted_label =
            env::var("CHATRELAY_SCRIPTED_LABEL").unwrap_or_else(|_| default_scripted_label());

        Self {
            host,
            port,
            backend: BackendConfig { api_key, base_url },
            relay: RelayConfig {
                script_delay: Duration::from_millis(script_delay_ms),
                max_stream_duration: Duration::from_secs(max_stream_secs),
                scripted_label,
            },
            models: ModelRegistry::default_entries(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn config_path() -> Option<String> {
    if let Ok(path) = env::var("CHATRELAY_SERVER_CONFIG") {
        return Some(path);
    }
    if Path::new("server.toml").exists() {
        return Some("server.toml".to_string());
    }
    None
}
