//! Single-order runners: market, limit and stop-limit

use super::{place, StrategyError};
use crate::broker::{Broker, OrderHandle, OrderRequest, OrderStatus, OrderType};
use crate::validation::{
    validate_price, validate_quantity, validate_side, validate_stop_price, validate_symbol,
    ValidationError,
};
use rust_decimal::Decimal;
use std::sync::Arc;

/// An order the broker accepted
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub handle: OrderHandle,
    pub order_type: OrderType,
    /// Status reported in the placement response, if any
    pub status: Option<OrderStatus>,
    pub client_order_id: String,
}

/// A validated single order, ready to submit
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTicket {
    pub request: OrderRequest,
    label: &'static str,
}

impl OrderTicket {
    pub fn market(symbol: &str, side: &str, quantity: Decimal) -> Result<Self, ValidationError> {
        validate_symbol(symbol)?;
        let side = validate_side(side)?;
        validate_quantity(quantity)?;

        Ok(Self {
            request: OrderRequest::market(symbol, side, quantity),
            label: "market",
        })
    }

    pub fn limit(
        symbol: &str,
        side: &str,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<Self, ValidationError> {
        validate_symbol(symbol)?;
        let side = validate_side(side)?;
        validate_quantity(quantity)?;
        validate_price(price)?;

        Ok(Self {
            request: OrderRequest::limit(symbol, side, quantity, price),
            label: "limit",
        })
    }

    /// Stop-limit: rests at `price` once `stop_price` trades. The stop must
    /// sit at or above the limit for BUY, at or below it for SELL.
    pub fn stop_limit(
        symbol: &str,
        side: &str,
        quantity: Decimal,
        price: Decimal,
        stop_price: Decimal,
    ) -> Result<Self, ValidationError> {
        validate_symbol(symbol)?;
        let side = validate_side(side)?;
        validate_quantity(quantity)?;
        validate_price(price)?;
        validate_stop_price(stop_price, price, side)?;

        Ok(Self {
            request: OrderRequest::stop(symbol, side, quantity, price, stop_price),
            label: "stop-limit",
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

/// Places exactly one validated order
pub struct OrderRunner {
    broker: Arc<dyn Broker>,
}

impl OrderRunner {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker }
    }

    pub async fn market(
        &self,
        symbol: &str,
        side: &str,
        quantity: Decimal,
    ) -> Result<PlacedOrder, StrategyError> {
        self.submit(&OrderTicket::market(symbol, side, quantity)?)
            .await
    }

    pub async fn limit(
        &self,
        symbol: &str,
        side: &str,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<PlacedOrder, StrategyError> {
        self.submit(&OrderTicket::limit(symbol, side, quantity, price)?)
            .await
    }

    pub async fn stop_limit(
        &self,
        symbol: &str,
        side: &str,
        quantity: Decimal,
        price: Decimal,
        stop_price: Decimal,
    ) -> Result<PlacedOrder, StrategyError> {
        self.submit(&OrderTicket::stop_limit(
            symbol, side, quantity, price, stop_price,
        )?)
        .await
    }

    pub async fn submit(&self, ticket: &OrderTicket) -> Result<PlacedOrder, StrategyError> {
        let request = &ticket.request;
        tracing::info!(
            symbol = %request.symbol,
            side = %request.side,
            order_type = request.order_type.as_str(),
            quantity = %request.quantity,
            price = ?request.price,
            stop_price = ?request.stop_price,
            "Placing order"
        );

        let (handle, ack) = place(&*self.broker, request, ticket.label).await?;
        Ok(PlacedOrder {
            handle,
            order_type: request.order_type,
            status: ack.status,
            client_order_id: request.client_order_id.clone(),
        })
    }
}
