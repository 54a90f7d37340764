use crate::error::EmbedError;
use secrecy::{ExposeSecret, Secret};
use uuid::Uuid;

/// Public cloud identity provider host.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Application identity used for the client-credentials exchange.
///
/// Built once at startup from configuration and shared read-only.
#[derive(Debug, Clone)]
pub struct ServiceCredential {
    pub tenant_id: Uuid,
    pub client_id: String,
    pub client_secret: Secret<String>,
    /// Resource audience of the BI service API, e.g. `https://analysis.windows.net/powerbi/api`.
    pub resource_id: String,
    pub authority_host: String,
}

impl ServiceCredential {
    pub fn new(
        tenant_id: &str,
        client_id: impl Into<String>,
        client_secret: Secret<String>,
        resource_id: impl Into<String>,
    ) -> Result<Self, EmbedError> {
        let tenant_id = Uuid::parse_str(tenant_id.trim()).map_err(|e| {
            EmbedError::Configuration(format!("tenant id is not a valid identifier: {}", e))
        })?;

        let credential = Self {
            tenant_id,
            client_id: client_id.into(),
            client_secret,
            resource_id: resource_id.into(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
        };
        credential.ensure_complete()?;
        Ok(credential)
    }

    pub fn with_authority_host(mut self, authority_host: impl Into<String>) -> Self {
        self.authority_host = authority_host.into();
        self
    }

    /// Reject credentials that cannot possibly be exchanged.
    pub fn ensure_complete(&self) -> Result<(), EmbedError> {
        if self.tenant_id.is_nil() {
            return Err(EmbedError::Configuration("tenant id is missing".into()));
        }
        if self.client_id.trim().is_empty() {
            return Err(EmbedError::Configuration("client id is missing".into()));
        }
        if self.client_secret.expose_secret().is_empty() {
            return Err(EmbedError::Configuration("client secret is missing".into()));
        }
        if self.resource_id.trim().is_empty() {
            return Err(EmbedError::Configuration(
                "BI service resource id is missing".into(),
            ));
        }
        if !self.authority_host.starts_with("https://")
            && !self.authority_host.starts_with("http://")
        {
            return Err(EmbedError::Configuration(format!(
                "authority host '{}' is not an absolute URL",
                self.authority_host
            )));
        }
        Ok(())
    }

    /// Tenant-scoped authority, e.g. `https://login.microsoftonline.com/<tenant>`.
    pub fn authority(&self) -> String {
        format!("{}/{}", self.authority_host.trim_end_matches('/'), self.tenant_id)
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority())
    }

    /// The `.default` scope of the BI resource audience.
    pub fn default_scope(&self) -> String {
        format!("{}/.default", self.resource_id)
    }
}

/// Application access token for the BI service. Never cached or logged.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: Secret<String>,
    pub token_type: String,
    pub expires_in: Option<u64>,
}

impl AccessToken {
    pub fn secret(&self) -> &str {
        self.value.expose_secret()
    }
}
