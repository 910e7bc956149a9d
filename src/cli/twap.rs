//! TWAP command implementation

use super::{uppercase, Completion, Session};
use crate::config::TwapConfig;
use crate::strategy::{FinalSlice, StrategyError, TwapPlan, TwapRunner, TwapStatus};
use crate::validation::ValidationError;
use clap::Args;
use rust_decimal::Decimal;

#[derive(Args, Debug)]
#[command(allow_negative_numbers = true)]
pub struct TwapArgs {
    /// Trading symbol, e.g. BTCUSDT
    #[arg(value_parser = uppercase)]
    pub symbol: String,

    /// BUY or SELL
    #[arg(value_parser = uppercase)]
    pub side: String,

    /// Total quantity across all slices
    pub total_quantity: Decimal,

    /// Number of market orders
    pub num_slices: i64,

    /// Seconds between slices
    pub interval_seconds: u64,

    /// Size the last slice uniformly or make it absorb rounding
    #[arg(long, value_enum)]
    pub final_slice: Option<FinalSlice>,
}

impl TwapArgs {
    /// Validated schedule; `--final-slice` overrides the file setting
    pub fn plan(&self, config: &TwapConfig) -> Result<TwapPlan, ValidationError> {
        TwapPlan::new(
            &self.symbol,
            &self.side,
            self.total_quantity,
            self.num_slices,
            self.interval_seconds,
            self.final_slice.unwrap_or(config.final_slice),
        )
    }
}

pub(super) async fn run(plan: &TwapPlan, session: &Session) -> Result<Completion, StrategyError> {
    let report = TwapRunner::new(session.broker.clone())
        .run(plan, &session.cancel)
        .await?;

    match report.status {
        TwapStatus::Completed => {
            println!(
                "✅ TWAP order completed successfully: {} slices, {} {} executed",
                report.slices_completed, report.executed_quantity, plan.symbol
            );
            Ok(Completion::Done)
        }
        TwapStatus::Aborted => {
            println!(
                "⚠️ TWAP aborted after {} of {} slices ({} {} executed)",
                report.slices_completed,
                plan.num_slices,
                report.executed_quantity,
                plan.symbol
            );
            Ok(Completion::Incomplete)
        }
    }
}
