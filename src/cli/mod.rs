//! CLI interface for futures-bot
//!
//! Provides subcommands for:
//! - `market`: Place a market order
//! - `limit`: Place a GTC limit order
//! - `stop_limit`: Place a GTC stop-limit order
//! - `oco`: Place a take-profit/stop-loss pair and monitor it client-side
//! - `twap`: Split a quantity into timed market-order slices

mod limit;
mod market;
mod oco;
mod session;
mod stop_limit;
mod twap;

pub use limit::LimitArgs;
pub use market::MarketArgs;
pub use oco::OcoArgs;
pub use session::Session;
pub use stop_limit::StopLimitArgs;
pub use twap::TwapArgs;

use crate::broker::OrderType;
use crate::config::Config;
use crate::strategy::{OcoOrder, OrderRunner, OrderTicket, PollConfig, StrategyError, TwapPlan};
use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "futures-bot")]
#[command(about = "Order placement and client-side OCO/TWAP for Binance USDT-M futures")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    /// Simulate orders in memory instead of calling the exchange
    #[arg(long, global = true)]
    pub paper: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Place a market order
    Market(MarketArgs),
    /// Place a GTC limit order
    Limit(LimitArgs),
    /// Place a GTC stop-limit order
    #[command(name = "stop_limit", alias = "stop-limit")]
    StopLimit(StopLimitArgs),
    /// Place a take-profit and stop-loss pair; the first fill cancels the other
    Oco(OcoArgs),
    /// Execute a quantity as equal market orders spread over time
    Twap(TwapArgs),
}

/// How a command that did not fail ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Done,
    /// Stopped short of its goal (timed out or aborted)
    Incomplete,
}

impl Completion {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Completion::Done => ExitCode::SUCCESS,
            Completion::Incomplete => ExitCode::FAILURE,
        }
    }
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Market(_) => "market",
            Commands::Limit(_) => "limit",
            Commands::StopLimit(_) => "stop_limit",
            Commands::Oco(_) => "oco",
            Commands::Twap(_) => "twap",
        }
    }

    /// User-facing line printed when the command fails
    pub fn failure_message(&self) -> &'static str {
        match self {
            Commands::Market(_) => "Failed to place market order",
            Commands::Limit(_) => "Failed to place limit order",
            Commands::StopLimit(_) => "Failed to place stop-limit order",
            Commands::Oco(_) => "OCO execution failed",
            Commands::Twap(_) => "TWAP execution failed",
        }
    }

    /// Validate every input. Nothing here touches credentials or the network.
    pub fn prepare(&self, config: &Config) -> Result<Prepared, StrategyError> {
        let prepared = match self {
            Commands::Market(args) => Prepared::Order(args.ticket()?),
            Commands::Limit(args) => Prepared::Order(args.ticket()?),
            Commands::StopLimit(args) => Prepared::Order(args.ticket()?),
            Commands::Oco(args) => Prepared::Oco {
                order: args.order()?,
                poll: args.poll_config(&config.oco)?,
            },
            Commands::Twap(args) => Prepared::Twap(args.plan(&config.twap)?),
        };
        Ok(prepared)
    }

    /// Validate, then connect. Invalid input fails before credentials are read.
    pub fn launch(
        &self,
        config: Config,
        paper: bool,
    ) -> Result<(Prepared, Session), StrategyError> {
        let prepared = self.prepare(&config)?;
        let session = Session::connect(config, paper)?;
        Ok((prepared, session))
    }

    pub async fn execute(&self, session: &Session) -> Result<Completion, StrategyError> {
        self.prepare(&session.config)?.run(session).await
    }
}

/// A command whose inputs passed validation
#[derive(Debug)]
pub enum Prepared {
    Order(OrderTicket),
    Oco { order: OcoOrder, poll: PollConfig },
    Twap(TwapPlan),
}

impl Prepared {
    pub async fn run(&self, session: &Session) -> Result<Completion, StrategyError> {
        match self {
            Prepared::Order(ticket) => {
                let placed = OrderRunner::new(session.broker.clone())
                    .submit(ticket)
                    .await?;
                let title = match placed.order_type {
                    OrderType::Market => "Market",
                    OrderType::Limit => "Limit",
                    OrderType::Stop => "Stop-Limit",
                };
                println!(
                    "✅ {} order placed successfully (order id {})",
                    title, placed.handle.order_id
                );
                Ok(Completion::Done)
            }
            Prepared::Oco { order, poll } => oco::run(order, *poll, session).await,
            Prepared::Twap(plan) => twap::run(plan, session).await,
        }
    }
}

/// Symbols and sides are accepted in any case
pub(crate) fn uppercase(value: &str) -> Result<String, String> {
    Ok(value.to_ascii_uppercase())
}
