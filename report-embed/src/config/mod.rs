use crate::error::EmbedError;
use crate::models::{EffectiveIdentity, ReportReference, ServiceCredential};
use secrecy::Secret;
use serde::Deserialize;
use service_core::observability::TelemetrySettings;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub azure_ad: AzureAdSettings,
    pub power_bi: PowerBiSettings,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Directory served under `/static`. Relative paths resolve against the crate directory.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

/// `AzureAd:*` keys: the service principal.
#[derive(Deserialize, Clone, Validate)]
pub struct AzureAdSettings {
    #[validate(length(min = 1, message = "AzureAd tenant id is required"))]
    pub tenant_id: String,
    #[validate(length(min = 1, message = "AzureAd client id is required"))]
    pub client_id: String,
    pub client_secret: Secret<String>,
    #[serde(default = "default_authority_host")]
    #[validate(url)]
    pub authority_host: String,
}

fn default_authority_host() -> String {
    crate::models::credential::DEFAULT_AUTHORITY_HOST.to_string()
}

/// `PowerBi:*` keys: the report and the service API.
#[derive(Deserialize, Clone, Validate)]
pub struct PowerBiSettings {
    #[validate(length(min = 1, message = "PowerBi workspace id is required"))]
    pub workspace_id: String,
    #[validate(length(min = 1, message = "PowerBi report id is required"))]
    pub report_id: String,
    /// e.g. `https://api.powerbi.com/`
    #[validate(url)]
    pub service_api_root: String,
    /// e.g. `https://analysis.windows.net/powerbi/api`
    #[validate(length(min = 1, message = "PowerBi service API resource id is required"))]
    pub service_api_resource_id: String,
    /// Scope every embed token to this row-level-security identity.
    #[serde(default)]
    pub effective_identity: Option<EffectiveIdentitySettings>,
    #[serde(default = "default_embed_origin")]
    pub embed_origin: String,
    #[serde(default = "default_sdk_script_url")]
    pub sdk_script_url: String,
}

fn default_embed_origin() -> String {
    "https://app.powerbi.com".to_string()
}

fn default_sdk_script_url() -> String {
    "https://cdn.jsdelivr.net/npm/powerbi-client@2.23.1/dist/powerbi.min.js".to_string()
}

#[derive(Deserialize, Clone, Debug)]
pub struct EffectiveIdentitySettings {
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Dataset ids the identity applies to. Empty means the report's own dataset.
    #[serde(default)]
    pub datasets: Vec<String>,
    #[serde(default)]
    pub custom_data: Option<String>,
}

impl EffectiveIdentitySettings {
    /// A fresh identity for one request.
    pub fn to_identity(&self) -> EffectiveIdentity {
        let mut identity = EffectiveIdentity::new(self.username.clone());
        identity.roles.extend(self.roles.iter().cloned());
        identity.dataset_ids.extend(self.datasets.iter().cloned());
        identity.custom_data = self.custom_data.clone();
        identity
    }
}

#[derive(Deserialize, Clone)]
pub struct HttpSettings {
    /// Upper bound for each remote call.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Settings {
    /// Check every required key and identifier format.
    pub fn validate(&self) -> Result<(), EmbedError> {
        self.azure_ad.validate()?;
        self.power_bi.validate()?;
        if self.http.timeout_seconds == 0 {
            return Err(EmbedError::Configuration(
                "http timeout must be greater than zero".into(),
            ));
        }
        if let Some(identity) = &self.power_bi.effective_identity {
            if identity.username.trim().is_empty() {
                return Err(EmbedError::Configuration(
                    "effective identity username is required".into(),
                ));
            }
        }
        self.service_credential()?;
        self.report_reference()?;
        Ok(())
    }

    pub fn service_credential(&self) -> Result<ServiceCredential, EmbedError> {
        Ok(ServiceCredential::new(
            &self.azure_ad.tenant_id,
            self.azure_ad.client_id.clone(),
            self.azure_ad.client_secret.clone(),
            self.power_bi.service_api_resource_id.clone(),
        )?
        .with_authority_host(self.azure_ad.authority_host.clone()))
    }

    pub fn report_reference(&self) -> Result<ReportReference, EmbedError> {
        Ok(ReportReference {
            workspace_id: parse_id("workspace", &self.power_bi.workspace_id)?,
            report_id: parse_id("report", &self.power_bi.report_id)?,
        })
    }
}

fn parse_id(name: &str, value: &str) -> Result<Uuid, EmbedError> {
    Uuid::parse_str(value.trim()).map_err(|e| {
        EmbedError::Configuration(format!(
            "{} id '{}' is not a valid identifier: {}",
            name, value, e
        ))
    })
}

/// Load `config/base.yaml` plus `APP_*` environment overrides and validate the result.
pub fn get_configuration() -> Result<Settings, EmbedError> {
    let base_path = std::env::current_dir().map_err(|e| {
        EmbedError::Configuration(format!("Failed to determine the current directory: {}", e))
    })?;

    // Check if we're already in the crate directory or at the workspace root
    let crate_directory = if base_path.ends_with("report-embed") {
        base_path
    } else {
        base_path.join("report-embed")
    };

    load_from(&crate_directory)
}

/// `APP_*` overrides, e.g. `APP_POWER_BI__EFFECTIVE_IDENTITY__ROLES=Region_East,Region_West`.
fn environment() -> config::Environment {
    config::Environment::with_prefix("APP")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("power_bi.effective_identity.roles")
        .with_list_parse_key("power_bi.effective_identity.datasets")
}

pub fn load_from(crate_directory: &Path) -> Result<Settings, EmbedError> {
    let settings = config::Config::builder()
        .add_source(
            config::File::from(crate_directory.join("config").join("base.yaml")).required(true),
        )
        .add_source(environment())
        .build()?;

    let mut settings = settings.try_deserialize::<Settings>()?;
    if settings.server.static_dir.is_relative() {
        settings.server.static_dir = crate_directory.join(&settings.server.static_dir);
    }

    settings.validate()?;
    Ok(settings)
}
