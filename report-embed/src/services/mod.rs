pub mod embed;
pub mod metrics;
pub mod power_bi_client;
pub mod token_provider;

pub use embed::EmbedService;
pub use power_bi_client::PowerBiClient;
pub use token_provider::{AzureAdTokenProvider, TokenProvider};
