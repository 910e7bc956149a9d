//! Client-side OCO (one-cancels-the-other)
//!
//! Places a LIMIT take-profit and a STOP stop-loss on the same side, then
//! polls both until one fills and cancels the other. Nothing on the exchange
//! links the two legs; the link only exists while this runner is polling.

use super::poll::{poll_until, PollConfig, PollOutcome, Sleeper, TokioSleeper};
use super::{place, query_status, StrategyError};
use crate::broker::{Broker, BrokerError, CancelOutcome, OrderHandle, OrderRequest, Side};
use crate::telemetry::{increment, record_latency, CounterMetric, LatencyMetric};
use crate::validation::{
    validate_oco_prices, validate_price, validate_quantity, validate_side, validate_symbol,
    ValidationError,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// A validated OCO exit
#[derive(Debug, Clone, PartialEq)]
pub struct OcoOrder {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub take_profit_price: Decimal,
    pub stop_loss_price: Decimal,
}

impl OcoOrder {
    pub fn new(
        symbol: &str,
        side: &str,
        quantity: Decimal,
        take_profit_price: Decimal,
        stop_loss_price: Decimal,
    ) -> Result<Self, ValidationError> {
        validate_symbol(symbol)?;
        let side = validate_side(side)?;
        validate_quantity(quantity)?;
        validate_price(take_profit_price)?;
        validate_price(stop_loss_price)?;
        validate_oco_prices(side, take_profit_price, stop_loss_price)?;

        Ok(Self {
            symbol: symbol.to_string(),
            side,
            quantity,
            take_profit_price,
            stop_loss_price,
        })
    }

    fn take_profit_request(&self) -> OrderRequest {
        OrderRequest::limit(
            &self.symbol,
            self.side,
            self.quantity,
            self.take_profit_price,
        )
    }

    fn stop_loss_request(&self) -> OrderRequest {
        OrderRequest::stop(
            &self.symbol,
            self.side,
            self.quantity,
            self.stop_loss_price,
            self.stop_loss_price,
        )
    }
}

/// What happened to a best-effort cancel of one leg
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelResult {
    Cancelled,
    /// Filled or cancelled before the request arrived
    AlreadyClosed,
    /// The request failed; the leg may still be open
    Failed(String),
}

impl CancelResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, CancelResult::Failed(_))
    }
}

impl From<Result<CancelOutcome, BrokerError>> for CancelResult {
    fn from(result: Result<CancelOutcome, BrokerError>) -> Self {
        match result {
            Ok(CancelOutcome::Cancelled) => CancelResult::Cancelled,
            Ok(CancelOutcome::AlreadyClosed) => CancelResult::AlreadyClosed,
            Err(e) => CancelResult::Failed(e.to_string()),
        }
    }
}

/// How the pair was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcoResolution {
    TakeProfitFilled {
        stop_loss_cancel: CancelResult,
    },
    StopLossFilled {
        take_profit_cancel: CancelResult,
    },
    /// Poll budget spent with neither leg filled; both legs were cancelled
    TimedOut {
        take_profit_cancel: CancelResult,
        stop_loss_cancel: CancelResult,
    },
    /// Cancellation requested; both legs were cancelled
    Aborted {
        take_profit_cancel: CancelResult,
        stop_loss_cancel: CancelResult,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OcoOutcome {
    pub take_profit: OrderHandle,
    pub stop_loss: OrderHandle,
    pub polls: u32,
    pub resolution: OcoResolution,
}

impl OcoOutcome {
    /// Whether one of the legs filled
    pub fn is_filled(&self) -> bool {
        matches!(
            self.resolution,
            OcoResolution::TakeProfitFilled { .. } | OcoResolution::StopLossFilled { .. }
        )
    }

    /// Whether any cancel failed, leaving a leg possibly open
    pub fn has_cancel_failure(&self) -> bool {
        match &self.resolution {
            OcoResolution::TakeProfitFilled { stop_loss_cancel } => stop_loss_cancel.is_failed(),
            OcoResolution::StopLossFilled { take_profit_cancel } => take_profit_cancel.is_failed(),
            OcoResolution::TimedOut {
                take_profit_cancel,
                stop_loss_cancel,
            }
            | OcoResolution::Aborted {
                take_profit_cancel,
                stop_loss_cancel,
            } => take_profit_cancel.is_failed() || stop_loss_cancel.is_failed(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    TakeProfit,
    StopLoss,
}

impl Leg {
    fn label(self) -> &'static str {
        match self {
            Leg::TakeProfit => "take-profit",
            Leg::StopLoss => "stop-loss",
        }
    }
}

/// One status probe of both legs. Take-profit wins if both report FILLED.
async fn probe_legs(
    broker: &dyn Broker,
    take_profit: &OrderHandle,
    stop_loss: &OrderHandle,
    poll: u32,
) -> Result<Option<Leg>, BrokerError> {
    let tp_status = query_status(broker, take_profit).await?;
    let sl_status = query_status(broker, stop_loss).await?;
    tracing::debug!(poll, take_profit = ?tp_status, stop_loss = ?sl_status, "OCO status poll");

    if tp_status.is_filled() {
        return Ok(Some(Leg::TakeProfit));
    }
    if sl_status.is_filled() {
        return Ok(Some(Leg::StopLoss));
    }

    for (leg, handle, status) in [
        (Leg::TakeProfit, take_profit, tp_status),
        (Leg::StopLoss, stop_loss, sl_status),
    ] {
        if status.is_terminal() {
            tracing::warn!(
                leg = leg.label(),
                order_id = %handle.order_id,
                ?status,
                "OCO leg closed without filling"
            );
        }
    }
    Ok(None)
}

/// Runs one OCO pair to resolution
pub struct OcoRunner {
    broker: Arc<dyn Broker>,
    sleeper: Arc<dyn Sleeper>,
    poll: PollConfig,
}

impl OcoRunner {
    pub fn new(broker: Arc<dyn Broker>, poll: PollConfig) -> Self {
        Self {
            broker,
            sleeper: Arc::new(TokioSleeper),
            poll,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Place both legs, poll until one fills, then cancel the other.
    ///
    /// On timeout or cancellation both legs are cancelled. Cancel failures
    /// are reported in the outcome rather than raised.
    pub async fn run(
        &self,
        order: &OcoOrder,
        cancel: &CancellationToken,
    ) -> Result<OcoOutcome, StrategyError> {
        tracing::info!(
            symbol = %order.symbol,
            side = %order.side,
            quantity = %order.quantity,
            take_profit = %order.take_profit_price,
            stop_loss = %order.stop_loss_price,
            "Placing OCO orders (client-side)"
        );

        let broker = &*self.broker;
        let (take_profit, _) = place(broker, &order.take_profit_request(), "take-profit").await?;

        let stop_loss = match place(broker, &order.stop_loss_request(), "stop-loss").await {
            Ok((handle, _)) => handle,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    take_profit = %take_profit.order_id,
                    "Stop-loss placement failed, cancelling take-profit"
                );
                self.cancel_leg(Leg::TakeProfit, &take_profit).await;
                return Err(err);
            }
        };

        tracing::info!(
            take_profit = %take_profit.order_id,
            stop_loss = %stop_loss.order_id,
            interval_secs = self.poll.interval.as_secs_f64(),
            "Monitoring OCO orders"
        );

        let (tp, sl) = (&take_profit, &stop_loss);
        let outcome = poll_until(&self.poll, &*self.sleeper, cancel, move |poll| {
            probe_legs(broker, tp, sl, poll)
        })
        .await
        .map_err(|source| StrategyError::MonitorFailed {
            take_profit: take_profit.order_id,
            stop_loss: stop_loss.order_id,
            source,
        })?;

        let polls = outcome.polls();
        let resolution = match outcome {
            PollOutcome::Ready {
                value: Leg::TakeProfit,
                ..
            } => {
                tracing::info!("Take-profit order filled, cancelling stop-loss order");
                OcoResolution::TakeProfitFilled {
                    stop_loss_cancel: self.cancel_leg(Leg::StopLoss, &stop_loss).await,
                }
            }
            PollOutcome::Ready {
                value: Leg::StopLoss,
                ..
            } => {
                tracing::info!("Stop-loss order filled, cancelling take-profit order");
                OcoResolution::StopLossFilled {
                    take_profit_cancel: self.cancel_leg(Leg::TakeProfit, &take_profit).await,
                }
            }
            PollOutcome::TimedOut { .. } => {
                tracing::warn!(polls, "OCO timed out with neither leg filled, cancelling both");
                OcoResolution::TimedOut {
                    take_profit_cancel: self.cancel_leg(Leg::TakeProfit, &take_profit).await,
                    stop_loss_cancel: self.cancel_leg(Leg::StopLoss, &stop_loss).await,
                }
            }
            PollOutcome::Cancelled { .. } => {
                tracing::warn!(polls, "OCO aborted, cancelling both legs");
                OcoResolution::Aborted {
                    take_profit_cancel: self.cancel_leg(Leg::TakeProfit, &take_profit).await,
                    stop_loss_cancel: self.cancel_leg(Leg::StopLoss, &stop_loss).await,
                }
            }
        };

        tracing::info!(polls, ?resolution, "OCO execution completed");
        Ok(OcoOutcome {
            take_profit,
            stop_loss,
            polls,
            resolution,
        })
    }

    async fn cancel_leg(&self, leg: Leg, handle: &OrderHandle) -> CancelResult {
        let started = Instant::now();
        let result = self
            .broker
            .cancel_order(&handle.symbol, handle.order_id)
            .await;
        record_latency(LatencyMetric::Cancellation, started.elapsed());

        let result = CancelResult::from(result);
        match &result {
            CancelResult::Cancelled => {
                increment(CounterMetric::OrdersCancelled, leg.label());
                tracing::info!(leg = leg.label(), order_id = %handle.order_id, "Order cancelled");
            }
            CancelResult::AlreadyClosed => {
                tracing::info!(
                    leg = leg.label(),
                    order_id = %handle.order_id,
                    "Order already closed, nothing to cancel"
                );
            }
            CancelResult::Failed(error) => {
                tracing::error!(
                    leg = leg.label(),
                    order_id = %handle.order_id,
                    error = %error,
                    "Failed to cancel order, it may still be open"
                );
            }
        }
        result
    }
}
