pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

use crate::config::EffectiveIdentitySettings;
use crate::models::{EffectiveIdentity, ReportReference};
use crate::services::EmbedService;
use std::sync::Arc;

/// Shared application state: read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub embed_service: Arc<EmbedService>,
    pub report: ReportReference,
    pub identity: Option<Arc<EffectiveIdentitySettings>>,
    pub sdk_script_url: String,
}

impl AppState {
    pub fn new(
        embed_service: Arc<EmbedService>,
        report: ReportReference,
        identity: Option<EffectiveIdentitySettings>,
        sdk_script_url: String,
    ) -> Self {
        Self {
            embed_service,
            report,
            identity: identity.map(Arc::new),
            sdk_script_url,
        }
    }

    /// Row-level-security identity for the current request, if configured.
    pub fn effective_identity(&self) -> Option<EffectiveIdentity> {
        self.identity.as_ref().map(|settings| settings.to_identity())
    }
}
