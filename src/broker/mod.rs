//! Broker module
//!
//! Order placement, status lookup and cancellation against the futures
//! REST API (testnet or live), plus an in-memory paper broker.

mod binance;
mod error;
mod paper;
mod types;

pub use binance::{sign_query, BinanceClient, BinanceConfig, Credentials, Environment};
pub use error::BrokerError;
pub use paper::PaperBroker;
pub use types::{
    CancelOutcome, OrderAck, OrderHandle, OrderId, OrderRequest, OrderStatus, OrderType, Side,
    TimeInForce,
};

use async_trait::async_trait;

/// The three capabilities the strategy runners need from a broker
#[async_trait]
pub trait Broker: Send + Sync {
    /// Submit an order
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderAck, BrokerError>;
    /// Look up the current status of an order
    async fn order_status(&self, symbol: &str, order_id: OrderId)
        -> Result<OrderStatus, BrokerError>;
    /// Cancel an order. Cancelling an order that already filled or was
    /// cancelled succeeds with [`CancelOutcome::AlreadyClosed`].
    async fn cancel_order(&self, symbol: &str, order_id: OrderId)
        -> Result<CancelOutcome, BrokerError>;
}
