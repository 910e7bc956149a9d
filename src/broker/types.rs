//! Broker-facing order types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Exchange-assigned order identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Wire representation ("BUY" / "SELL")
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    /// Accepts exactly "BUY" or "SELL"; callers upper-case user input first
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(other.to_string()),
        }
    }
}

/// Order type as understood by the futures API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Fill immediately at the best available price
    Market,
    /// Rest on the book at a fixed price
    Limit,
    /// Limit order armed once the stop price trades
    Stop,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::Stop => "STOP",
        }
    }
}

/// Time in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-til-cancelled
    #[serde(rename = "GTC")]
    Gtc,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Gtc => "GTC",
        }
    }
}

/// An order to be submitted. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    /// Limit price (LIMIT and STOP)
    pub price: Option<Decimal>,
    /// Trigger price (STOP)
    pub stop_price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
    /// Client-side id, lets a placement be reconciled even if the response is lost
    pub client_order_id: String,
}

impl OrderRequest {
    fn base(symbol: &str, side: Side, order_type: OrderType, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type,
            quantity,
            price: None,
            stop_price: None,
            time_in_force: None,
            client_order_id: Uuid::new_v4().to_string(),
        }
    }

    /// Market order
    pub fn market(symbol: &str, side: Side, quantity: Decimal) -> Self {
        Self::base(symbol, side, OrderType::Market, quantity)
    }

    /// GTC limit order
    pub fn limit(symbol: &str, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Self {
            price: Some(price),
            time_in_force: Some(TimeInForce::Gtc),
            ..Self::base(symbol, side, OrderType::Limit, quantity)
        }
    }

    /// GTC stop-limit order: rests at `price` once `stop_price` trades
    pub fn stop(
        symbol: &str,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        stop_price: Decimal,
    ) -> Self {
        Self {
            price: Some(price),
            stop_price: Some(stop_price),
            time_in_force: Some(TimeInForce::Gtc),
            ..Self::base(symbol, side, OrderType::Stop, quantity)
        }
    }
}

/// Order status reported by the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
    ExpiredInMatch,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    pub fn is_filled(&self) -> bool {
        matches!(self, OrderStatus::Filled)
    }

    /// Whether the order can no longer trade
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Canceled
                | OrderStatus::Rejected
                | OrderStatus::Expired
                | OrderStatus::ExpiredInMatch
        )
    }
}

/// Broker acknowledgement of an order placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Absent when the broker accepted the call but returned no usable id
    pub order_id: Option<OrderId>,
    pub client_order_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub executed_quantity: Option<Decimal>,
}

/// A live order owned by the runner that placed it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHandle {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: Side,
}

/// Result of a cancel request that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelOutcome {
    /// The order was open and is now cancelled
    Cancelled,
    /// The order had already filled or been cancelled
    AlreadyClosed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_from_str() {
        assert_eq!("BUY".parse::<Side>(), Ok(Side::Buy));
        assert_eq!("SELL".parse::<Side>(), Ok(Side::Sell));
        assert!("buy".parse::<Side>().is_err());
        assert!("HOLD".parse::<Side>().is_err());
    }

    #[test]
    fn test_side_display() {
        assert_eq!(Side::Buy.to_string(), "BUY");
        assert_eq!(Side::Sell.to_string(), "SELL");
    }

    #[test]
    fn test_market_request() {
        let req = OrderRequest::market("BTCUSDT", Side::Buy, dec!(0.01));
        assert_eq!(req.order_type, OrderType::Market);
        assert!(req.price.is_none());
        assert!(req.stop_price.is_none());
        assert!(req.time_in_force.is_none());
        assert_eq!(req.client_order_id.len(), 36);
    }

    #[test]
    fn test_limit_request_is_gtc() {
        let req = OrderRequest::limit("ETHUSDT", Side::Sell, dec!(1), dec!(2000));
        assert_eq!(req.order_type, OrderType::Limit);
        assert_eq!(req.price, Some(dec!(2000)));
        assert_eq!(req.time_in_force, Some(TimeInForce::Gtc));
    }

    #[test]
    fn test_stop_request_carries_both_prices() {
        let req = OrderRequest::stop("ETHUSDT", Side::Sell, dec!(1), dec!(1800), dec!(1800));
        assert_eq!(req.order_type, OrderType::Stop);
        assert_eq!(req.price, Some(dec!(1800)));
        assert_eq!(req.stop_price, Some(dec!(1800)));
    }

    #[test]
    fn test_client_order_ids_are_unique() {
        let a = OrderRequest::market("BTCUSDT", Side::Buy, dec!(1));
        let b = OrderRequest::market("BTCUSDT", Side::Buy, dec!(1));
        assert_ne!(a.client_order_id, b.client_order_id);
    }

    #[test]
    fn test_order_status_deserialize() {
        let status: OrderStatus = serde_json::from_str("\"PARTIALLY_FILLED\"").unwrap();
        assert_eq!(status, OrderStatus::PartiallyFilled);
        let status: OrderStatus = serde_json::from_str("\"EXPIRED_IN_MATCH\"").unwrap();
        assert_eq!(status, OrderStatus::ExpiredInMatch);
        let status: OrderStatus = serde_json::from_str("\"PENDING_NEW\"").unwrap();
        assert_eq!(status, OrderStatus::Unknown);
    }

    #[test]
    fn test_order_status_terminal() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(!OrderStatus::New.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
        assert!(!OrderStatus::Canceled.is_filled());
    }
}
