use std::sync::Arc;

use crate::alerts::SeverityPolicy;
use crate::analysis::llm::LlmClient;
use crate::config::DashboardConfig;
use crate::db::DashboardDb;

pub type SharedState = Arc<DashboardState>;

pub struct DashboardState {
    pub config: DashboardConfig,
    pub db: Arc<DashboardDb>,
    pub policy: SeverityPolicy,
    /// `None` until an LLM endpoint is configured; analysis requests fail
    /// fast in that case.
    pub llm: Option<LlmClient>,
}

impl DashboardState {
    pub fn new(config: DashboardConfig, db: DashboardDb) -> anyhow::Result<Self> {
        let llm = LlmClient::from_config(&config)?;
        Ok(Self {
            config,
            db: Arc::new(db),
            policy: SeverityPolicy::default(),
            llm,
        })
    }
}
