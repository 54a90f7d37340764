pub mod credential;
pub mod embed;
pub mod power_bi;

pub use credential::{AccessToken, ServiceCredential};
pub use embed::{EffectiveIdentity, ReportEmbedData, ReportReference};
