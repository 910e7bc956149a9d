//! Stop-limit command implementation

use super::uppercase;
use crate::strategy::OrderTicket;
use crate::validation::ValidationError;
use clap::Args;
use rust_decimal::Decimal;

#[derive(Args, Debug)]
#[command(allow_negative_numbers = true)]
pub struct StopLimitArgs {
    /// Trading symbol, e.g. BTCUSDT
    #[arg(value_parser = uppercase)]
    pub symbol: String,

    /// BUY or SELL
    #[arg(value_parser = uppercase)]
    pub side: String,

    /// Order quantity
    pub quantity: Decimal,

    /// Price the order rests at once triggered
    pub limit_price: Decimal,

    /// Trigger price: at or above the limit for BUY, at or below for SELL
    pub stop_price: Decimal,
}

impl StopLimitArgs {
    pub fn ticket(&self) -> Result<OrderTicket, ValidationError> {
        OrderTicket::stop_limit(
            &self.symbol,
            &self.side,
            self.quantity,
            self.limit_price,
            self.stop_price,
        )
    }
}
