//! Binance USDT-M futures REST client
//!
//! Every call is a signed request against `/fapi/v1/order`: parameters are
//! form-encoded, `recvWindow` and `timestamp` appended, and the query string
//! signed with HMAC-SHA256 using the API secret.

use super::{
    Broker, BrokerError, CancelOutcome, OrderAck, OrderId, OrderRequest, OrderStatus,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method};
use ring::hmac;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Futures testnet base URL
pub const TESTNET_URL: &str = "https://testnet.binancefuture.com";
/// Futures production base URL
pub const LIVE_URL: &str = "https://fapi.binance.com";

const ORDER_PATH: &str = "/fapi/v1/order";
const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// API-key format invalid, key/IP/permission rejected, signature invalid
const AUTH_ERROR_CODES: [i64; 3] = [-2014, -2015, -1022];
/// "Unknown order sent" / "Order does not exist": the order is no longer open
const ALREADY_CLOSED_CODES: [i64; 2] = [-2011, -2013];

/// Trading environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Sandbox with no real capital
    Testnet,
    /// Production
    Live,
}

impl Environment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Testnet => TESTNET_URL,
            Environment::Live => LIVE_URL,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Environment::Live)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Testnet => write!(f, "TESTNET"),
            Environment::Live => write!(f, "LIVE"),
        }
    }
}

/// API credentials
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Configuration for the Binance client
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    /// REST base URL (defaults to the environment's URL)
    pub base_url: String,
    /// Signed request validity window in milliseconds
    pub recv_window_ms: u64,
    /// Per-request HTTP timeout
    pub timeout: Duration,
}

impl BinanceConfig {
    /// Create a config for the given environment
    pub fn new(environment: Environment) -> Self {
        Self {
            base_url: environment.base_url().to_string(),
            recv_window_ms: 5000,
            timeout: Duration::from_secs(10),
        }
    }

    /// Override the base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the recvWindow
    pub fn with_recv_window(mut self, ms: u64) -> Self {
        self.recv_window_ms = ms;
        self
    }

    /// Set the HTTP timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Signed REST client for the futures order endpoints
pub struct BinanceClient {
    config: BinanceConfig,
    credentials: Credentials,
    http: Client,
}

impl BinanceClient {
    /// Create a client. Fails when either credential is empty.
    pub fn new(credentials: Credentials, config: BinanceConfig) -> Result<Self, BrokerError> {
        if credentials.api_key.trim().is_empty() || credentials.api_secret.trim().is_empty() {
            return Err(BrokerError::Authentication(
                "API key and secret must both be set".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BrokerError::Transport(e.to_string()))?;

        Ok(Self {
            config,
            credentials,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    async fn signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        mut params: Vec<(&'static str, String)>,
    ) -> Result<T, BrokerError> {
        params.push(("recvWindow", self.config.recv_window_ms.to_string()));
        params.push(("timestamp", Utc::now().timestamp_millis().to_string()));

        let query = encode_params(&params);
        let signature = sign_query(&self.credentials.api_secret, &query);
        let url = format!(
            "{}{}?{}&signature={}",
            self.config.base_url, ORDER_PATH, query, signature
        );

        tracing::debug!(method = %method, path = ORDER_PATH, "Sending signed request");

        let started = Instant::now();
        let response = self
            .http
            .request(method, &url)
            .header(API_KEY_HEADER, &self.credentials.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis(),
            "Received response"
        );

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| BrokerError::Decode(format!("{e}: {body}")))
    }
}

#[async_trait]
impl Broker for BinanceClient {
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderAck, BrokerError> {
        let response: OrderResponse = self
            .signed_request(Method::POST, order_params(request))
            .await?;
        Ok(response.into_ack())
    }

    async fn order_status(
        &self,
        symbol: &str,
        order_id: OrderId,
    ) -> Result<OrderStatus, BrokerError> {
        let params = vec![("symbol", symbol.to_string()), ("orderId", order_id.to_string())];
        let response: OrderResponse = self.signed_request(Method::GET, params).await?;
        response
            .status
            .ok_or_else(|| BrokerError::Decode(format!("order {order_id} response has no status")))
    }

    async fn cancel_order(
        &self,
        symbol: &str,
        order_id: OrderId,
    ) -> Result<CancelOutcome, BrokerError> {
        let params = vec![("symbol", symbol.to_string()), ("orderId", order_id.to_string())];
        match self
            .signed_request::<OrderResponse>(Method::DELETE, params)
            .await
        {
            Ok(_) => Ok(CancelOutcome::Cancelled),
            Err(BrokerError::Api { code, message, .. }) if ALREADY_CLOSED_CODES.contains(&code) => {
                tracing::debug!(%order_id, code, %message, "Order already closed");
                Ok(CancelOutcome::AlreadyClosed)
            }
            Err(e) => Err(e),
        }
    }
}

/// HMAC-SHA256 signature of a query string, lowercase hex
pub fn sign_query(secret: &str, query: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let tag = hmac::sign(&key, query.as_bytes());
    tag.as_ref().iter().map(|b| format!("{b:02x}")).collect()
}

fn encode_params(params: &[(&str, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
        .finish()
}

fn format_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Request parameters for an order placement, in API field names
fn order_params(request: &OrderRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("symbol", request.symbol.clone()),
        ("side", request.side.as_str().to_string()),
        ("type", request.order_type.as_str().to_string()),
    ];
    if let Some(tif) = request.time_in_force {
        params.push(("timeInForce", tif.as_str().to_string()));
    }
    params.push(("quantity", format_decimal(request.quantity)));
    if let Some(price) = request.price {
        params.push(("price", format_decimal(price)));
    }
    if let Some(stop_price) = request.stop_price {
        params.push(("stopPrice", format_decimal(stop_price)));
    }
    params.push(("newClientOrderId", request.client_order_id.clone()));
    params
}

/// Map a non-2xx response to a broker error
fn classify_error(status: u16, body: &str) -> BrokerError {
    let (code, message) = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(err) => (err.code, err.msg),
        Err(_) => (0, body.to_string()),
    };

    if status == 401 || status == 403 || AUTH_ERROR_CODES.contains(&code) {
        return BrokerError::Authentication(message);
    }

    BrokerError::Api {
        status,
        code,
        message,
    }
}

/// Error body returned by the API
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

/// Order response (placement, query and cancel share the shape)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: Option<u64>,
    client_order_id: Option<String>,
    status: Option<OrderStatus>,
    executed_qty: Option<String>,
}

impl OrderResponse {
    fn into_ack(self) -> OrderAck {
        OrderAck {
            order_id: self.order_id.map(OrderId),
            client_order_id: self.client_order_id,
            status: self.status,
            executed_quantity: self
                .executed_qty
                .as_deref()
                .and_then(|q| Decimal::from_str(q).ok()),
        }
    }
}
