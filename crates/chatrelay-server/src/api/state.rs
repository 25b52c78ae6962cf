use chatrelay_ai::{LlmClient, OpenAIClient};
use std::sync::Arc;

use crate::config::{RelayConfig, ServerConfig};
use crate::knowledge::KnowledgeBaseStore;
use crate::relay::{ModelRegistry, ScriptLibrary, ScriptPicker, ThreadRngPicker};

/// Everything request handlers need. Only the knowledge-base store is
/// mutable; the relay pieces are read-only after startup.
pub struct AppCore {
    pub registry: ModelRegistry,
    pub scripts: ScriptLibrary,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub picker: Arc<dyn ScriptPicker>,
    pub relay: RelayConfig,
    pub knowledge_bases: KnowledgeBaseStore,
}

/// Application state shared across all API handlers
pub type AppState = Arc<AppCore>;

impl AppCore {
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let registry = ModelRegistry::new(config.models.clone())?;
        let scripts = ScriptLibrary::builtin()?;

        let llm: Option<Arc<dyn LlmClient>> = match &config.backend.api_key {
            Some(key) => Some(Arc::new(
                OpenAIClient::new(key).with_base_url(&config.backend.base_url),
            )),
            None => {
                tracing::warn!("No backend API key configured; only scripted mode is available");
                None
            }
        };

        Ok(Self {
            registry,
            scripts,
            llm,
            picker: Arc::new(ThreadRngPicker),
            relay: config.relay.clone(),
            knowledge_bases: KnowledgeBaseStore::seeded(),
        })
    }

    pub fn with_llm_client(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_picker(mut self, picker: Arc<dyn ScriptPicker>) -> Self {
        self.picker = picker;
        self
    }
}
