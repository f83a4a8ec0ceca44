use crate::config::Settings;
use crate::domain::option::{ContractType, OptionQuote};
use crate::error::RecommendError;
use crate::ingest::types::{validate_row, OptionChainResponse, SpotQuoteResponse};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;
// Backoff doubles per attempt up to 2^6 = 64s.
const MAX_BACKOFF_EXPONENT: u32 = 6;

#[async_trait::async_trait]
pub trait MarketDataSource: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_spot_price(&self, ticker: &str) -> Result<f64>;

    /// Fails with [`RecommendError::ChainNotListed`] when nothing is listed for the date.
    async fn fetch_chain(
        &self,
        ticker: &str,
        expiration: NaiveDate,
        contract_type: ContractType,
    ) -> Result<Vec<OptionQuote>>;
}

#[derive(Debug, Clone)]
pub struct HttpJsonMarketData {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    retries: u32,
}

#[derive(Debug)]
enum Fetched<T> {
    Found(T),
    NotFound,
}

impl HttpJsonMarketData {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_market_data_base_url()?.to_string();
        let api_key = settings.market_data_api_key.clone();

        let timeout_secs = std::env::var("MARKET_DATA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("MARKET_DATA_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES)
            .max(1);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build market data http client")?;

        Ok(Self::with_client(http, base_url, api_key, retries))
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        retries: u32,
    ) -> Self {
        Self {
            http,
            base_url,
            api_key,
            retries: retries.max(1),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Fetched<T>> {
        let res = self
            .http
            .get(self.url(path))
            .headers(self.headers()?)
            .query(query)
            .send()
            .await
            .context("market data request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read market data response")?;
        classify_response(status, &text)
    }

    async fn get_with_retry<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Fetched<T>> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.get_once(path, query).await {
                Ok(fetched) => return Ok(fetched),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = backoff_for(attempt);
                    tracing::warn!(attempt, ?backoff, %path, error = %err, "market data fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl MarketDataSource for HttpJsonMarketData {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    async fn fetch_spot_price(&self, ticker: &str) -> Result<f64> {
        let path = format!("/v1/quotes/{ticker}");
        let quote = match self.get_with_retry::<SpotQuoteResponse>(&path, &[]).await? {
            Fetched::Found(quote) => quote,
            Fetched::NotFound => anyhow::bail!("no spot quote for {ticker}"),
        };

        anyhow::ensure!(
            quote.ticker.eq_ignore_ascii_case(ticker),
            "spot quote ticker mismatch: expected {ticker}, got {}",
            quote.ticker
        );
        anyhow::ensure!(
            quote.price.is_finite() && quote.price > 0.0,
            "spot price must be positive (got {})",
            quote.price
        );
        Ok(quote.price)
    }

    async fn fetch_chain(
        &self,
        ticker: &str,
        expiration: NaiveDate,
        contract_type: ContractType,
    ) -> Result<Vec<OptionQuote>> {
        let path = format!("/v1/options/{ticker}/chain");
        let query = [
            ("expiration", expiration.format("%Y-%m-%d").to_string()),
            ("type", contract_type.as_str().to_string()),
        ];
        let fetched = self.get_with_retry::<OptionChainResponse>(&path, &query).await?;
        chain_into_quotes(fetched, ticker, expiration, contract_type)
    }
}

/// 404 means nothing is listed and is never retried; other non-2xx statuses are errors.
fn classify_response<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<Fetched<T>> {
    if status == StatusCode::NOT_FOUND {
        return Ok(Fetched::NotFound);
    }
    if !status.is_success() {
        anyhow::bail!("market data HTTP {status}: {text}");
    }

    let parsed = serde_json::from_str::<T>(text)
        .with_context(|| format!("unexpected market data response shape: {text}"))?;
    Ok(Fetched::Found(parsed))
}

fn chain_into_quotes(
    fetched: Fetched<OptionChainResponse>,
    ticker: &str,
    expiration: NaiveDate,
    contract_type: ContractType,
) -> Result<Vec<OptionQuote>> {
    let not_listed = || RecommendError::ChainNotListed {
        ticker: ticker.to_string(),
        expiration,
        contract_type,
    };

    let chain = match fetched {
        Fetched::Found(chain) => chain,
        Fetched::NotFound => return Err(not_listed().into()),
    };

    validate_chain(&chain, expiration, contract_type)?;
    if chain.rows.is_empty() {
        return Err(not_listed().into());
    }

    Ok(chain
        .rows
        .into_iter()
        .map(|row| row.into_quote(expiration))
        .collect())
}

fn backoff_for(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    Duration::from_secs(1u64 << exponent)
}

fn validate_chain(
    chain: &OptionChainResponse,
    expiration: NaiveDate,
    contract_type: ContractType,
) -> Result<()> {
    anyhow::ensure!(
        chain.expiration_date == expiration,
        "chain expiration mismatch: expected {expiration}, got {}",
        chain.expiration_date
    );
    anyhow::ensure!(
        chain.contract_type == contract_type,
        "chain contract type mismatch: expected {contract_type}, got {}",
        chain.contract_type
    );
    for row in &chain.rows {
        validate_row(row).with_context(|| format!("invalid row in {expiration} chain"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chain(v: serde_json::Value) -> OptionChainResponse {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn accepts_matching_chain() {
        let expiration = NaiveDate::from_ymd_opt(2020, 8, 21).unwrap();
        let c = chain(json!({
            "ticker": "WMT",
            "expiration_date": "2020-08-21",
            "contract_type": "put",
            "rows": [{"strike": 140.0, "ask": 2.0, "implied_volatility": "30.1%"}]
        }));
        assert!(validate_chain(&c, expiration, ContractType::Put).is_ok());
    }

    #[test]
    fn rejects_chain_for_another_expiration_or_side() {
        let expiration = NaiveDate::from_ymd_opt(2020, 8, 21).unwrap();
        let c = chain(json!({
            "ticker": "WMT",
            "expiration_date": "2020-08-28",
            "contract_type": "call",
            "rows": []
        }));
        assert!(validate_chain(&c, expiration, ContractType::Call).is_err());

        let c = chain(json!({
            "ticker": "WMT",
            "expiration_date": "2020-08-21",
            "contract_type": "call",
            "rows": []
        }));
        assert!(validate_chain(&c, expiration, ContractType::Put).is_err());
    }

    #[test]
    fn url_joins_without_double_slash() {
        let settings = Settings {
            market_data_base_url: Some("https://data.example.com/".to_string()),
            market_data_api_key: None,
            sentry_dsn: None,
        };
        let client = HttpJsonMarketData::from_settings(&settings).unwrap();
        assert_eq!(
            client.url("/v1/quotes/WMT"),
            "https://data.example.com/v1/quotes/WMT"
        );
    }

    fn friday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 8, 21).unwrap()
    }

    fn chain_body(rows: serde_json::Value) -> String {
        json!({
            "ticker": "WMT",
            "expiration_date": "2020-08-21",
            "contract_type": "call",
            "rows": rows
        })
        .to_string()
    }

    #[test]
    fn not_found_status_classifies_as_not_listed() {
        let fetched = classify_response::<OptionChainResponse>(StatusCode::NOT_FOUND, "").unwrap();
        assert!(matches!(fetched, Fetched::NotFound));

        let err = chain_into_quotes(fetched, "WMT", friday(), ContractType::Call).unwrap_err();
        assert!(RecommendError::is_chain_not_listed(&err));
    }

    #[test]
    fn empty_row_list_classifies_as_not_listed() {
        let body = chain_body(json!([]));
        let fetched = classify_response::<OptionChainResponse>(StatusCode::OK, &body).unwrap();

        let err = chain_into_quotes(fetched, "WMT", friday(), ContractType::Call).unwrap_err();
        assert!(RecommendError::is_chain_not_listed(&err));
    }

    #[test]
    fn listed_rows_become_quotes_tagged_with_the_expiration() {
        let body = chain_body(json!([
            {"strike": 130.0, "ask": 1.5, "implied_volatility": "22.07%"},
            {"strike": 134.0, "ask": 0.5}
        ]));
        let fetched = classify_response::<OptionChainResponse>(StatusCode::OK, &body).unwrap();

        let quotes = chain_into_quotes(fetched, "WMT", friday(), ContractType::Call).unwrap();
        assert_eq!(quotes.len(), 2);
        assert!(quotes.iter().all(|q| q.expiration_date == friday()));
        assert_eq!(quotes[0].implied_volatility, Some(22.07));
    }

    #[test]
    fn server_errors_and_bad_payloads_are_not_treated_as_missing_chains() {
        let err = classify_response::<OptionChainResponse>(
            StatusCode::SERVICE_UNAVAILABLE,
            "upstream down",
        )
        .unwrap_err();
        assert!(!RecommendError::is_chain_not_listed(&err));
        assert!(err.to_string().contains("503"));

        let err = classify_response::<OptionChainResponse>(StatusCode::OK, "<html>").unwrap_err();
        assert!(!RecommendError::is_chain_not_listed(&err));
    }

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff_for(1), Duration::from_secs(1));
        assert_eq!(backoff_for(3), Duration::from_secs(4));
        assert_eq!(backoff_for(7), Duration::from_secs(64));
        assert_eq!(backoff_for(100), Duration::from_secs(64));
        assert_eq!(backoff_for(u32::MAX), Duration::from_secs(64));
    }

    mod canned_server {
        use super::*;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        /// Answers every request with the same status and body; counts requests served.
        async fn serve(status_line: &'static str, body: String) -> (String, Arc<AtomicUsize>) {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let hits = Arc::new(AtomicUsize::new(0));
            let counter = hits.clone();

            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    counter.fetch_add(1, Ordering::SeqCst);

                    let mut buf = vec![0u8; 8192];
                    let mut read = 0;
                    while read < buf.len() {
                        let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        read += n;
                        if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }

                    let response = format!(
                        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });

            (format!("http://{addr}"), hits)
        }

        fn client(base_url: String, retries: u32) -> HttpJsonMarketData {
            let http = reqwest::Client::builder()
                .no_proxy()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap();
            HttpJsonMarketData::with_client(http, base_url, None, retries)
        }

        #[tokio::test]
        async fn not_found_is_reported_once_without_retrying() {
            let (base_url, hits) = serve("404 Not Found", "{}".to_string()).await;
            let source = client(base_url, 3);

            let err = source
                .fetch_chain("WMT", friday(), ContractType::Call)
                .await
                .unwrap_err();

            assert!(RecommendError::is_chain_not_listed(&err));
            assert_eq!(hits.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn empty_chain_is_reported_as_not_listed() {
            let (base_url, hits) = serve("200 OK", chain_body(json!([]))).await;
            let source = client(base_url, 3);

            let err = source
                .fetch_chain("WMT", friday(), ContractType::Call)
                .await
                .unwrap_err();

            assert!(RecommendError::is_chain_not_listed(&err));
            assert_eq!(hits.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn listed_chain_is_returned() {
            let body = chain_body(json!([{"strike": 130.0, "ask": 1.5, "implied_volatility": 22.0}]));
            let (base_url, _hits) = serve("200 OK", body).await;
            let source = client(base_url, 3);

            let quotes = source
                .fetch_chain("WMT", friday(), ContractType::Call)
                .await
                .unwrap();
            assert_eq!(quotes.len(), 1);
            assert_eq!(quotes[0].strike, 130.0);
        }

        #[tokio::test]
        async fn server_errors_are_retried_then_propagated() {
            let (base_url, hits) = serve("503 Service Unavailable", "upstream down".to_string()).await;
            let source = client(base_url, 2);

            let err = source
                .fetch_chain("WMT", friday(), ContractType::Call)
                .await
                .unwrap_err();

            assert!(!RecommendError::is_chain_not_listed(&err));
            assert!(format!("{err:#}").contains("503"));
            assert_eq!(hits.load(Ordering::SeqCst), 2);
        }
    }
}
