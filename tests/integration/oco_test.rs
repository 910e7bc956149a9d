//! Integration tests for client-side OCO monitoring

use async_trait::async_trait;
use futures_bot::broker::{
    Broker, BrokerError, CancelOutcome, OrderAck, OrderId, OrderRequest, OrderStatus, OrderType,
    PaperBroker,
};
use futures_bot::strategy::{
    CancelResult, OcoOrder, OcoResolution, OcoRunner, PollConfig, Sleeper, StrategyError,
};
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TP: OrderId = OrderId(1);
const SL: OrderId = OrderId(2);

#[derive(Default)]
struct CountingSleeper(AtomicUsize);

impl CountingSleeper {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sleeper for CountingSleeper {
    async fn sleep(&self, _duration: Duration) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Paper broker that fails selected calls
#[derive(Default)]
struct FaultyBroker {
    inner: PaperBroker,
    /// Status queries beyond this many fail with a transport error
    status_budget: Option<usize>,
    reject_cancels: bool,
    status_calls: AtomicUsize,
}

#[async_trait]
impl Broker for FaultyBroker {
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderAck, BrokerError> {
        self.inner.create_order(request).await
    }

    async fn order_status(
        &self,
        symbol: &str,
        order_id: OrderId,
    ) -> Result<OrderStatus, BrokerError> {
        let calls = self.status_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.status_budget.is_some_and(|budget| calls > budget) {
            return Err(BrokerError::Transport("connection reset by peer".to_string()));
        }
        self.inner.order_status(symbol, order_id).await
    }

    async fn cancel_order(
        &self,
        symbol: &str,
        order_id: OrderId,
    ) -> Result<CancelOutcome, BrokerError> {
        if self.reject_cancels {
            return Err(BrokerError::Authentication(
                "Invalid API-key, IP, or permissions for action.".to_string(),
            ));
        }
        self.inner.cancel_order(symbol, order_id).await
    }
}

fn sell_oco() -> OcoOrder {
    OcoOrder::new("ETHUSDT", "SELL", dec!(1), dec!(2000), dec!(1800)).unwrap()
}

#[tokio::test]
async fn test_sell_oco_take_profit_fills() {
    let broker = Arc::new(PaperBroker::new());
    broker
        .script_statuses(TP, [OrderStatus::New, OrderStatus::New, OrderStatus::Filled])
        .await;
    let sleeper = Arc::new(CountingSleeper::default());
    let runner = OcoRunner::new(broker.clone(), PollConfig::default()).with_sleeper(sleeper.clone());

    let outcome = runner
        .run(&sell_oco(), &CancellationToken::new())
        .await
        .unwrap();

    let submitted = broker.submitted().await;
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0].order_type, OrderType::Limit);
    assert_eq!(submitted[0].price, Some(dec!(2000)));
    assert_eq!(submitted[1].order_type, OrderType::Stop);
    assert_eq!(submitted[1].price, Some(dec!(1800)));
    assert_eq!(submitted[1].stop_price, Some(dec!(1800)));

    assert_eq!(outcome.polls, 3);
    assert_eq!(sleeper.count(), 2);
    assert_eq!(
        outcome.resolution,
        OcoResolution::TakeProfitFilled {
            stop_loss_cancel: CancelResult::Cancelled
        }
    );
    assert_eq!(broker.cancelled().await, vec![SL]);
}

#[test]
fn test_inverted_sell_prices_rejected_before_placement() {
    let result = OcoOrder::new("ETHUSDT", "SELL", dec!(1), dec!(1800), dec!(2000));
    tokio_test::assert_err!(result);
}

#[tokio::test]
async fn test_status_failure_leaves_legs_open() {
    let broker = Arc::new(FaultyBroker {
        status_budget: Some(2),
        ..FaultyBroker::default()
    });
    let runner = OcoRunner::new(broker.clone(), PollConfig::default())
        .with_sleeper(Arc::new(CountingSleeper::default()));

    let err = runner
        .run(&sell_oco(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        StrategyError::MonitorFailed {
            take_profit,
            stop_loss,
            source,
        } => {
            assert_eq!(take_profit, TP);
            assert_eq!(stop_loss, SL);
            assert!(matches!(source, BrokerError::Transport(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(broker.inner.cancelled().await.is_empty());
}

#[tokio::test]
async fn test_cancel_failure_is_surfaced() {
    let broker = Arc::new(FaultyBroker {
        reject_cancels: true,
        ..FaultyBroker::default()
    });
    broker.inner.script_statuses(SL, [OrderStatus::Filled]).await;
    let runner = OcoRunner::new(broker.clone(), PollConfig::default())
        .with_sleeper(Arc::new(CountingSleeper::default()));

    let outcome = runner
        .run(&sell_oco(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.is_filled());
    assert!(outcome.has_cancel_failure());
    match outcome.resolution {
        OcoResolution::StopLossFilled {
            take_profit_cancel: CancelResult::Failed(message),
        } => assert!(message.contains("Invalid API-key")),
        other => panic!("unexpected resolution: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_cancels_both_legs() {
    let broker = Arc::new(PaperBroker::new());
    let poll = PollConfig::every(Duration::from_secs(5)).with_timeout(Duration::from_secs(30));
    let runner = OcoRunner::new(broker.clone(), poll);

    let outcome = tokio_test::assert_ok!(runner.run(&sell_oco(), &CancellationToken::new()).await);

    // probes at 0, 5, 10, 15, 20, 25 and 30 seconds
    assert_eq!(outcome.polls, 7);
    assert_eq!(
        outcome.resolution,
        OcoResolution::TimedOut {
            take_profit_cancel: CancelResult::Cancelled,
            stop_loss_cancel: CancelResult::Cancelled,
        }
    );
    assert_eq!(broker.cancelled().await, vec![TP, SL]);
}

#[tokio::test(start_paused = true)]
async fn test_abort_while_monitoring() {
    let broker = Arc::new(PaperBroker::new());
    let runner = OcoRunner::new(broker.clone(), PollConfig::default());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        trigger.cancel();
    });

    let outcome = runner.run(&sell_oco(), &cancel).await.unwrap();

    assert_eq!(outcome.polls, 3);
    assert!(matches!(outcome.resolution, OcoResolution::Aborted { .. }));
    assert_eq!(broker.cancelled().await, vec![TP, SL]);
}
