//! Market command implementation

use super::uppercase;
use crate::strategy::OrderTicket;
use crate::validation::ValidationError;
use clap::Args;
use rust_decimal::Decimal;

#[derive(Args, Debug)]
#[command(allow_negative_numbers = true)]
pub struct MarketArgs {
    /// Trading symbol, e.g. BTCUSDT
    #[arg(value_parser = uppercase)]
    pub symbol: String,

    /// BUY or SELL
    #[arg(value_parser = uppercase)]
    pub side: String,

    /// Order quantity
    pub quantity: Decimal,
}

impl MarketArgs {
    pub fn ticket(&self) -> Result<OrderTicket, ValidationError> {
        OrderTicket::market(&self.symbol, &self.side, self.quantity)
    }
}
