pub mod domain;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod pricing;
pub mod time;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub market_data_base_url: Option<String>,
        pub market_data_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                market_data_base_url: std::env::var("MARKET_DATA_BASE_URL").ok(),
                market_data_api_key: std::env::var("MARKET_DATA_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_market_data_base_url(&self) -> anyhow::Result<&str> {
            self.market_data_base_url
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .context("MARKET_DATA_BASE_URL is required")
        }
    }
}
