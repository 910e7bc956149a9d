//! Strategy runners
//!
//! Validate-then-place runners for market, limit and stop-limit orders, the
//! client-side OCO monitor and the TWAP slicer. Every runner returns a typed
//! result; turning it into user-facing output is the caller's job.

mod oco;
mod poll;
mod simple;
mod twap;

pub use oco::{CancelResult, OcoOrder, OcoOutcome, OcoResolution, OcoRunner};
pub use poll::{poll_until, PollConfig, PollOutcome, Sleeper, TokioSleeper};
pub use simple::{OrderRunner, OrderTicket, PlacedOrder};
pub use twap::{FinalSlice, TwapPlan, TwapReport, TwapRunner, TwapStatus, SLICE_DECIMALS};

use crate::broker::{Broker, BrokerError, OrderAck, OrderHandle, OrderId, OrderRequest, OrderStatus};
use crate::config::ConfigError;
use crate::telemetry::{increment, record_latency, CounterMetric, LatencyMetric};
use crate::validation::ValidationError;
use rust_decimal::Decimal;
use std::time::Instant;
use thiserror::Error;

/// Strategy run failures
#[derive(Debug, Error)]
pub enum StrategyError {
    /// A caller-supplied value failed validation; nothing was sent
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// Credentials missing or rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The broker accepted the call but returned no usable order id
    #[error("Broker accepted the {order} order but returned no order id (client order id {client_order_id})")]
    Placement {
        order: String,
        client_order_id: String,
    },

    /// Transport or API-level rejection
    #[error("Broker error: {0}")]
    Broker(BrokerError),

    /// Environment settings that cannot be interpreted
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A status query failed while both OCO legs were open
    #[error("OCO monitoring failed, take-profit {take_profit} and stop-loss {stop_loss} may still be open: {source}")]
    MonitorFailed {
        take_profit: OrderId,
        stop_loss: OrderId,
        source: BrokerError,
    },

    /// A TWAP slice failed; earlier slices were already executed
    #[error("TWAP slice {slice} failed after {completed} completed slices ({executed_quantity} executed): {source}")]
    SliceFailed {
        slice: u32,
        completed: u32,
        executed_quantity: Decimal,
        source: Box<StrategyError>,
    },
}

impl From<BrokerError> for StrategyError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::Authentication(msg) => StrategyError::Authentication(msg),
            other => StrategyError::Broker(other),
        }
    }
}

impl From<ConfigError> for StrategyError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingCredentials => StrategyError::Authentication(err.to_string()),
            ConfigError::InvalidFlag { .. } => StrategyError::Configuration(err.to_string()),
        }
    }
}

/// Submit an order and require a usable order id in the acknowledgement
pub(crate) async fn place(
    broker: &dyn Broker,
    request: &OrderRequest,
    label: &str,
) -> Result<(OrderHandle, OrderAck), StrategyError> {
    let started = Instant::now();
    let ack = broker.create_order(request).await;
    record_latency(LatencyMetric::OrderSubmission, started.elapsed());
    let ack = ack?;

    let Some(order_id) = ack.order_id else {
        tracing::error!(
            order = label,
            client_order_id = %request.client_order_id,
            response = ?ack,
            "Order response missing orderId"
        );
        return Err(StrategyError::Placement {
            order: label.to_string(),
            client_order_id: request.client_order_id.clone(),
        });
    };

    increment(CounterMetric::OrdersPlaced, request.order_type.as_str());
    tracing::info!(
        order = label,
        %order_id,
        client_order_id = %request.client_order_id,
        status = ?ack.status,
        "Order placed"
    );

    let handle = OrderHandle {
        order_id,
        symbol: request.symbol.clone(),
        side: request.side,
    };
    Ok((handle, ack))
}

/// Look up an order's status, timing the round trip
pub(crate) async fn query_status(
    broker: &dyn Broker,
    handle: &OrderHandle,
) -> Result<OrderStatus, BrokerError> {
    let started = Instant::now();
    let status = broker.order_status(&handle.symbol, handle.order_id).await;
    record_latency(LatencyMetric::StatusQuery, started.elapsed());
    status
}
