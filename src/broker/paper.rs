//! Paper trading broker with simulated fills

use super::{
    Broker, BrokerError, CancelOutcome, OrderAck, OrderId, OrderRequest, OrderStatus, OrderType,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A resting paper order
#[derive(Debug, Clone)]
struct PaperOrder {
    request: OrderRequest,
    status: OrderStatus,
    /// Statuses to report on upcoming queries, oldest first
    script: VecDeque<OrderStatus>,
}

#[derive(Debug, Default)]
struct PaperState {
    orders: HashMap<OrderId, PaperOrder>,
    /// Scripts registered before the order was placed
    pending_scripts: HashMap<OrderId, VecDeque<OrderStatus>>,
    submitted: Vec<OrderRequest>,
    cancelled: Vec<OrderId>,
    status_queries: usize,
}

/// In-memory broker. MARKET orders fill immediately, LIMIT and STOP orders
/// rest as NEW until filled or cancelled.
pub struct PaperBroker {
    next_id: AtomicU64,
    state: Arc<RwLock<PaperState>>,
    placement_limit: Option<usize>,
    omit_order_ids: bool,
}

impl PaperBroker {
    /// Create a new paper broker
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state: Arc::new(RwLock::new(PaperState::default())),
            placement_limit: None,
            omit_order_ids: false,
        }
    }

    /// Reject placements once `limit` orders have been accepted
    pub fn with_placement_limit(mut self, limit: usize) -> Self {
        self.placement_limit = Some(limit);
        self
    }

    /// Acknowledge placements without an order id
    pub fn without_order_ids(mut self) -> Self {
        self.omit_order_ids = true;
        self
    }

    /// Queue statuses to be reported by the next status queries for an
    /// order. The last scripted status sticks. Ids are handed out from 1 in
    /// placement order, so an order can be scripted before it is placed.
    pub async fn script_statuses(
        &self,
        order_id: OrderId,
        statuses: impl IntoIterator<Item = OrderStatus>,
    ) {
        let mut state = self.state.write().await;
        match state.orders.get_mut(&order_id) {
            Some(order) => order.script.extend(statuses),
            None => state
                .pending_scripts
                .entry(order_id)
                .or_default()
                .extend(statuses),
        }
    }

    /// Mark a resting order as filled
    pub async fn fill(&self, order_id: OrderId) {
        let mut state = self.state.write().await;
        if let Some(order) = state.orders.get_mut(&order_id) {
            order.status = OrderStatus::Filled;
            order.script.clear();
        }
    }

    /// All accepted order requests, in submission order
    pub async fn submitted(&self) -> Vec<OrderRequest> {
        self.state.read().await.submitted.clone()
    }

    /// Orders cancelled through [`Broker::cancel_order`]
    pub async fn cancelled(&self) -> Vec<OrderId> {
        self.state.read().await.cancelled.clone()
    }

    /// Number of status queries served
    pub async fn status_queries(&self) -> usize {
        self.state.read().await.status_queries
    }
}

impl Default for PaperBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderAck, BrokerError> {
        let mut state = self.state.write().await;

        if let Some(limit) = self.placement_limit {
            if state.submitted.len() >= limit {
                return Err(BrokerError::Api {
                    status: 400,
                    code: -2019,
                    message: "Margin is insufficient.".to_string(),
                });
            }
        }

        let order_id = OrderId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let status = match request.order_type {
            OrderType::Market => OrderStatus::Filled,
            OrderType::Limit | OrderType::Stop => OrderStatus::New,
        };

        let script = state.pending_scripts.remove(&order_id).unwrap_or_default();
        state.orders.insert(
            order_id,
            PaperOrder {
                request: request.clone(),
                status,
                script,
            },
        );
        state.submitted.push(request.clone());

        tracing::info!(
            %order_id,
            symbol = %request.symbol,
            side = %request.side,
            order_type = request.order_type.as_str(),
            quantity = %request.quantity,
            "Paper order accepted"
        );

        Ok(OrderAck {
            order_id: (!self.omit_order_ids).then_some(order_id),
            client_order_id: Some(request.client_order_id.clone()),
            status: Some(status),
            executed_quantity: Some(if status.is_filled() {
                request.quantity
            } else {
                rust_decimal::Decimal::ZERO
            }),
        })
    }

    async fn order_status(
        &self,
        symbol: &str,
        order_id: OrderId,
    ) -> Result<OrderStatus, BrokerError> {
        let mut state = self.state.write().await;
        state.status_queries += 1;

        let order = state
            .orders
            .get_mut(&order_id)
            .filter(|o| o.request.symbol == symbol)
            .ok_or(BrokerError::OrderNotFound(order_id))?;

        if let Some(next) = order.script.pop_front() {
            order.status = next;
        }
        Ok(order.status)
    }

    async fn cancel_order(
        &self,
        symbol: &str,
        order_id: OrderId,
    ) -> Result<CancelOutcome, BrokerError> {
        let mut state = self.state.write().await;

        let Some(order) = state
            .orders
            .get_mut(&order_id)
            .filter(|o| o.request.symbol == symbol)
        else {
            return Ok(CancelOutcome::AlreadyClosed);
        };

        if order.status.is_terminal() {
            return Ok(CancelOutcome::AlreadyClosed);
        }

        order.status = OrderStatus::Canceled;
        order.script.clear();
        state.cancelled.push(order_id);

        tracing::info!(%order_id, "Paper order cancelled");
        Ok(CancelOutcome::Cancelled)
    }
}
