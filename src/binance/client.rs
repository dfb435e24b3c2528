//! Binance REST Client
//!
//! HTTP client for the spot and USDⓈ-M futures market data endpoints, with
//! HMAC-SHA256 request signing for the endpoints that need it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::Sha256;
use tracing::debug;

use super::endpoints;
use super::models::{ApiErrorBody, ExchangeInfo, ForceOrderRow, OpenInterestHistRow};
use super::source::MarketDataSource;
use crate::config::BinanceConfig;
use crate::error::FetchError;
use crate::types::{Candle, LiquidationEvent, Market, OpenInterestSample, TimeWindow, TradeRecord};

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `payload` keyed by the API secret
pub fn sign_query(secret: &str, payload: &str) -> Result<String, FetchError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| FetchError::Malformed(format!("invalid HMAC key: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// `limit` for the force orders endpoint, capped at its maximum
pub fn force_orders_limit(limit: u32) -> u32 {
    limit.min(endpoints::MAX_FORCE_ORDERS_LIMIT)
}

/// Error for a non-2xx response: the API's `{code, msg}` body when present,
/// otherwise the raw status and body
fn map_error_response(endpoint: &str, status: u16, body: String) -> FetchError {
    match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(err) => FetchError::Api {
            code: err.code,
            message: err.msg,
        },
        Err(_) => FetchError::Status {
            endpoint: endpoint.to_string(),
            status,
            body,
        },
    }
}

/// Body of a 2xx response
fn parse_body<R: DeserializeOwned>(body: &str) -> Result<R, FetchError> {
    Ok(serde_json::from_str(body)?)
}

/// Binance API client. Holds its own configuration; nothing is read from
/// globals after construction.
pub struct BinanceClient {
    client: Client,
    config: BinanceConfig,
}

impl BinanceClient {
    pub fn new(config: BinanceConfig) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn base_url(&self, market: Market) -> &str {
        match market {
            Market::Spot => &self.config.spot_base_url,
            Market::Futures => &self.config.futures_base_url,
        }
    }

    fn build_url(&self, base: &str, endpoint: &str, params: &[(&str, String)]) -> Result<Url, FetchError> {
        Url::parse_with_params(&format!("{}{}", base, endpoint), params)
            .map_err(|e| FetchError::Malformed(format!("invalid URL for {}: {}", endpoint, e)))
    }

    /// Unsigned GET. The API key header is still sent; it raises rate limits.
    async fn get<R: DeserializeOwned>(
        &self,
        base: &str,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<R, FetchError> {
        let url = self.build_url(base, endpoint, params)?;
        self.send(endpoint, url).await
    }

    /// GET with `timestamp`, `recvWindow` and `signature` appended
    async fn get_signed<R: DeserializeOwned>(
        &self,
        base: &str,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<R, FetchError> {
        let mut all_params = params.to_vec();
        all_params.push(("recvWindow", self.config.recv_window.to_string()));
        all_params.push(("timestamp", Utc::now().timestamp_millis().to_string()));

        let mut url = self.build_url(base, endpoint, &all_params)?;
        let signature = sign_query(self.config.credentials.api_secret(), url.query().unwrap_or_default())?;
        url.query_pairs_mut().append_pair("signature", &signature);

        self.send(endpoint, url).await
    }

    async fn send<R: DeserializeOwned>(&self, endpoint: &str, url: Url) -> Result<R, FetchError> {
        debug!("GET {}", endpoint);

        let response = self
            .client
            .get(url)
            .header("X-MBX-APIKEY", self.config.credentials.api_key())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(map_error_response(endpoint, status.as_u16(), body));
        }

        parse_body(&body)
    }
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    async fn stable_quoted_symbols(&self) -> Result<Vec<String>, FetchError> {
        let info: ExchangeInfo = self
            .get(&self.config.futures_base_url, endpoints::FUTURES_EXCHANGE_INFO, &[])
            .await?;
        let symbols = info.stable_quoted_symbols();
        debug!("Discovered {} stable-quoted futures symbols", symbols.len());
        Ok(symbols)
    }

    async fn open_interest_history(
        &self,
        symbol: &str,
        period: &str,
        limit: u32,
    ) -> Result<Vec<OpenInterestSample>, FetchError> {
        let params = [
            ("symbol", symbol.to_string()),
            ("period", period.to_string()),
            ("limit", limit.to_string()),
        ];
        let rows: Vec<OpenInterestHistRow> = self
            .get(&self.config.futures_base_url, endpoints::OPEN_INTEREST_HIST, &params)
            .await?;

        rows.into_iter().map(|row| row.into_sample(symbol)).collect()
    }

    async fn liquidation_orders(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<LiquidationEvent>, FetchError> {
        let params = [
            ("symbol", symbol.to_string()),
            ("startTime", start.timestamp_millis().to_string()),
            ("endTime", end.timestamp_millis().to_string()),
            ("limit", force_orders_limit(limit).to_string()),
        ];
        let rows: Vec<ForceOrderRow> = self
            .get_signed(&self.config.futures_base_url, endpoints::FORCE_ORDERS, &params)
            .await?;

        rows.into_iter().map(|row| row.into_event(symbol)).collect()
    }

    async fn candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
        market: Market,
    ) -> Result<Vec<Candle>, FetchError> {
        let params = [
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];
        let rows: Vec<Vec<Value>> = self
            .get(self.base_url(market), endpoints::klines(market), &params)
            .await?;

        rows.iter().map(|row| Candle::try_from(row.as_slice())).collect()
    }

    async fn trades_in_window(
        &self,
        symbol: &str,
        window: &TimeWindow,
        market: Market,
        limit: u32,
    ) -> Result<Vec<TradeRecord>, FetchError> {
        let params = [
            ("symbol", symbol.to_string()),
            ("startTime", window.start_ms().to_string()),
            ("endTime", window.end_ms().to_string()),
            ("limit", limit.to_string()),
        ];
        self.get(self.base_url(market), endpoints::agg_trades(market), &params)
            .await
    }
}
