//! Wiring shared by the commands: config, provider, index, tools, session.

use codewright_agent::{AgentSession, ModelSelectionPolicy};
use codewright_config::AppConfig;
use codewright_core::event::EventBus;
use codewright_core::provider::Provider;
use codewright_core::tool::ToolRegistry;
use codewright_index::{ModelDescriber, ModelEmbedder, RetrievalIndex, WalkOptions};
use codewright_tools::ToolContext;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct Runtime {
    pub config: AppConfig,
    pub provider: Arc<dyn Provider>,
    pub index: Arc<RetrievalIndex>,
    pub events: Arc<EventBus>,
}

impl Runtime {
    /// Load the config and open the repository's index. Fails early on a
    /// bad config, a missing API key, or a corrupted cache.
    pub fn open(repo: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
        let provider = codewright_providers::build_from_config(&config)?;
        let events = Arc::new(EventBus::default());

        let describer = Arc::new(ModelDescriber::new(
            provider.clone(),
            &config.model,
            config.index.description_max_chars,
        ));
        let embedder = Arc::new(ModelEmbedder::new(provider.clone(), &config.embedding_model));
        let index = RetrievalIndex::open(
            repo,
            &config.index.resolved_cache_dir(),
            WalkOptions::from(&config.index),
            describer,
            embedder,
        )?
        .with_events(events.clone());

        debug!(provider = %config.provider, model = %config.model, "Runtime ready");
        Ok(Self {
            config,
            provider,
            index: Arc::new(index),
            events,
        })
    }

    pub fn tool_context(&self) -> Arc<ToolContext> {
        Arc::new(
            ToolContext::new(self.index.repository_root(), self.provider.clone(), &self.config.model)
                .with_index(self.index.clone())
                .with_linter(self.config.linter.clone())
                .with_max_prompt_chars(self.config.index.description_max_chars),
        )
    }

    pub fn registry(&self) -> Result<ToolRegistry, codewright_core::Error> {
        codewright_tools::default_registry(self.tool_context(), &self.config.tools)
    }

    pub fn session(&self) -> Result<AgentSession, codewright_core::Error> {
        let agent = &self.config.agent;
        let mut policy = ModelSelectionPolicy::new(
            self.provider.clone(),
            &self.config.model,
            Duration::from_secs(agent.decision_timeout_secs),
        )
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens)
        .with_history_budget(agent.history_token_budget);
        if let Some(preamble) = &agent.system_prompt_override {
            policy = policy.with_preamble(preamble);
        }

        Ok(AgentSession::new(Arc::new(self.registry()?), Arc::new(policy), agent)
            .with_index(self.index.clone())
            .with_events(self.events.clone()))
    }
}
