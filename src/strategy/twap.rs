//! TWAP execution
//!
//! Splits a total quantity into equal market-order slices sent at a fixed
//! interval. Slice size is `round(total / slices, 8)`; by default every
//! slice uses that size, so the executed total can drift from the request
//! by the rounding error. [`FinalSlice::Remainder`] puts the difference on
//! the last slice instead.

use super::poll::{Sleeper, TokioSleeper};
use super::{place, StrategyError};
use crate::broker::{Broker, OrderHandle, OrderRequest, Side};
use crate::validation::{
    validate_interval, validate_quantity, validate_side, validate_slice_quantity,
    validate_slices, validate_symbol, ValidationError,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Decimal places a slice quantity is rounded to
pub const SLICE_DECIMALS: u32 = 8;

/// Sizing policy for the last slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FinalSlice {
    /// Every slice is the rounded slice quantity
    #[default]
    Uniform,
    /// The last slice absorbs the rounding difference
    Remainder,
}

/// A validated TWAP schedule
#[derive(Debug, Clone, PartialEq)]
pub struct TwapPlan {
    pub symbol: String,
    pub side: Side,
    pub total_quantity: Decimal,
    pub num_slices: u32,
    pub interval: Duration,
    pub slice_quantity: Decimal,
    pub final_slice: FinalSlice,
}

impl TwapPlan {
    pub fn new(
        symbol: &str,
        side: &str,
        total_quantity: Decimal,
        num_slices: i64,
        interval_secs: u64,
        final_slice: FinalSlice,
    ) -> Result<Self, ValidationError> {
        validate_symbol(symbol)?;
        let side = validate_side(side)?;
        validate_quantity(total_quantity)?;
        let num_slices = validate_slices(num_slices)?;
        validate_interval(interval_secs)?;

        let slice_quantity =
            (total_quantity / Decimal::from(num_slices)).round_dp(SLICE_DECIMALS);
        validate_slice_quantity(slice_quantity, total_quantity, num_slices)?;

        let plan = Self {
            symbol: symbol.to_string(),
            side,
            total_quantity,
            num_slices,
            interval: Duration::from_secs(interval_secs),
            slice_quantity,
            final_slice,
        };
        validate_slice_quantity(
            plan.quantity_for_slice(num_slices),
            total_quantity,
            num_slices,
        )?;
        Ok(plan)
    }

    /// Quantity of slice `index` (1-based)
    pub fn quantity_for_slice(&self, index: u32) -> Decimal {
        match self.final_slice {
            FinalSlice::Remainder if index == self.num_slices => {
                self.total_quantity - self.slice_quantity * Decimal::from(self.num_slices - 1)
            }
            _ => self.slice_quantity,
        }
    }

    /// Sum of all slice quantities
    pub fn planned_total(&self) -> Decimal {
        (1..=self.num_slices)
            .map(|i| self.quantity_for_slice(i))
            .sum()
    }

    /// Wall time from first to last slice, excluding order latency
    pub fn duration(&self) -> Duration {
        self.interval * (self.num_slices - 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwapStatus {
    Completed,
    /// Stopped between slices by cancellation
    Aborted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TwapReport {
    pub status: TwapStatus,
    pub slices_completed: u32,
    pub executed_quantity: Decimal,
    pub orders: Vec<OrderHandle>,
}

/// Sends the slices of a [`TwapPlan`]
pub struct TwapRunner {
    broker: Arc<dyn Broker>,
    sleeper: Arc<dyn Sleeper>,
}

impl TwapRunner {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self {
            broker,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Send every slice, sleeping only between slices.
    ///
    /// A failed slice stops the run; the error carries how much had already
    /// executed. Cancellation is honoured between slices, never mid-order.
    pub async fn run(
        &self,
        plan: &TwapPlan,
        cancel: &CancellationToken,
    ) -> Result<TwapReport, StrategyError> {
        tracing::info!(
            symbol = %plan.symbol,
            side = %plan.side,
            total = %plan.total_quantity,
            slices = plan.num_slices,
            slice_quantity = %plan.slice_quantity,
            interval_secs = plan.interval.as_secs(),
            "Starting TWAP"
        );

        let mut orders = Vec::new();
        let mut executed = Decimal::ZERO;
        let report = |status, orders: Vec<OrderHandle>, executed| TwapReport {
            status,
            slices_completed: orders.len() as u32,
            executed_quantity: executed,
            orders,
        };

        for slice in 1..=plan.num_slices {
            if cancel.is_cancelled() {
                tracing::warn!(completed = orders.len(), "TWAP aborted");
                return Ok(report(TwapStatus::Aborted, orders, executed));
            }

            let quantity = plan.quantity_for_slice(slice);
            tracing::info!(
                slice,
                of = plan.num_slices,
                %quantity,
                "TWAP slice: placing market order"
            );

            let request = OrderRequest::market(&plan.symbol, plan.side, quantity);
            match place(&*self.broker, &request, "TWAP slice").await {
                Ok((handle, _)) => {
                    orders.push(handle);
                    executed += quantity;
                }
                Err(err) => {
                    tracing::error!(
                        slice,
                        completed = orders.len(),
                        executed = %executed,
                        error = %err,
                        "TWAP slice failed, stopping"
                    );
                    return Err(StrategyError::SliceFailed {
                        slice,
                        completed: orders.len() as u32,
                        executed_quantity: executed,
                        source: Box::new(err),
                    });
                }
            }

            if slice < plan.num_slices {
                tokio::select! {
                    () = cancel.cancelled() => {
                        tracing::warn!(completed = orders.len(), "TWAP aborted");
                        return Ok(report(TwapStatus::Aborted, orders, executed));
                    }
                    () = self.sleeper.sleep(plan.interval) => {}
                }
            }
        }

        tracing::info!(executed = %executed, "TWAP execution completed");
        Ok(report(TwapStatus::Completed, orders, executed))
    }
}
