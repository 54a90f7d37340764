use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// The report to embed, fixed per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportReference {
    pub workspace_id: Uuid,
    pub report_id: Uuid,
}

/// Row-level-security identity the embed token is scoped to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveIdentity {
    pub username: String,
    pub dataset_ids: BTreeSet<String>,
    pub roles: BTreeSet<String>,
    pub custom_data: Option<String>,
}

impl EffectiveIdentity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn with_dataset(mut self, dataset_id: impl Into<String>) -> Self {
        self.dataset_ids.insert(dataset_id.into());
        self
    }

    pub fn with_custom_data(mut self, custom_data: impl Into<String>) -> Self {
        self.custom_data = Some(custom_data.into());
        self
    }
}

/// Payload handed to the browser: everything the embedding SDK needs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportEmbedData {
    pub report_id: String,
    pub embed_url: String,
    pub token: String,
}

impl fmt::Debug for ReportEmbedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportEmbedData")
            .field("report_id", &self.report_id)
            .field("embed_url", &self.embed_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl ReportEmbedData {
    /// JSON safe to place inside a `<script type="application/json">` element.
    ///
    /// `<`, `>` and `&` are emitted as unicode escapes so the payload can never
    /// close the surrounding script tag.
    pub fn to_script_json(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(json
            .replace('<', "\\u003c")
            .replace('>', "\\u003e")
            .replace('&', "\\u0026"))
    }
}
