//! OCO command implementation

use super::{uppercase, Completion, Session};
use crate::config::OcoConfig;
use crate::strategy::{OcoOrder, OcoResolution, OcoRunner, PollConfig, StrategyError};
use crate::validation::{validate_interval, validate_max_polls, ValidationError};
use clap::Args;
use rust_decimal::Decimal;
use std::time::Duration;

#[derive(Args, Debug)]
#[command(allow_negative_numbers = true)]
pub struct OcoArgs {
    /// Trading symbol, e.g. ETHUSDT
    #[arg(value_parser = uppercase)]
    pub symbol: String,

    /// Side of both exit orders: BUY or SELL
    #[arg(value_parser = uppercase)]
    pub side: String,

    /// Quantity of each leg
    pub quantity: Decimal,

    /// LIMIT price of the take-profit leg
    pub take_profit_price: Decimal,

    /// Trigger and limit price of the stop-loss leg
    pub stop_loss_price: Decimal,

    /// Seconds between status polls
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Stop monitoring after this many polls
    #[arg(long)]
    pub max_polls: Option<u32>,

    /// Stop monitoring after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl OcoArgs {
    /// File settings with command-line overrides applied
    pub fn poll_config(&self, config: &OcoConfig) -> Result<PollConfig, ValidationError> {
        let mut poll = config.poll_config();
        if let Some(secs) = self.poll_interval {
            poll.interval = Duration::from_secs(secs);
        }
        if let Some(max) = self.max_polls {
            poll.max_polls = Some(max);
        }
        if let Some(secs) = self.timeout {
            poll.timeout = Some(Duration::from_secs(secs));
        }
        validate_interval(poll.interval.as_secs())?;
        validate_max_polls(poll.max_polls)?;
        Ok(poll)
    }

    pub fn order(&self) -> Result<OcoOrder, ValidationError> {
        OcoOrder::new(
            &self.symbol,
            &self.side,
            self.quantity,
            self.take_profit_price,
            self.stop_loss_price,
        )
    }
}

pub(super) async fn run(
    order: &OcoOrder,
    poll: PollConfig,
    session: &Session,
) -> Result<Completion, StrategyError> {
    let outcome = OcoRunner::new(session.broker.clone(), poll)
        .run(order, &session.cancel)
        .await?;

    match &outcome.resolution {
        OcoResolution::TakeProfitFilled { .. } => println!(
            "✅ OCO order completed successfully: take-profit {} filled, stop-loss {} closed",
            outcome.take_profit.order_id, outcome.stop_loss.order_id
        ),
        OcoResolution::StopLossFilled { .. } => println!(
            "✅ OCO order completed successfully: stop-loss {} filled, take-profit {} closed",
            outcome.stop_loss.order_id, outcome.take_profit.order_id
        ),
        OcoResolution::TimedOut { .. } => println!(
            "⚠️ OCO timed out after {} polls with neither leg filled; both legs cancelled",
            outcome.polls
        ),
        OcoResolution::Aborted { .. } => println!(
            "⚠️ OCO aborted after {} polls; both legs cancelled",
            outcome.polls
        ),
    }
    if outcome.has_cancel_failure() {
        println!("⚠️ A cancel request failed and an order may still be open. Check bot.log for details.");
    }

    Ok(if outcome.is_filled() {
        Completion::Done
    } else {
        Completion::Incomplete
    })
}
