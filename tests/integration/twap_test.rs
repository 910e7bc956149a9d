//! Integration tests for TWAP execution against the REST client

use async_trait::async_trait;
use futures_bot::broker::{BinanceClient, BinanceConfig, BrokerError, Credentials, Environment, PaperBroker};
use futures_bot::strategy::{FinalSlice, Sleeper, StrategyError, TwapPlan, TwapRunner, TwapStatus};
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct CountingSleeper(AtomicUsize);

#[async_trait]
impl Sleeper for CountingSleeper {
    async fn sleep(&self, _duration: Duration) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn client_for(server: &MockServer) -> Arc<BinanceClient> {
    let config = BinanceConfig::new(Environment::Testnet).with_base_url(server.uri());
    Arc::new(BinanceClient::new(Credentials::new("test-key", "test-secret"), config).unwrap())
}

fn filled(order_id: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "orderId": order_id,
        "symbol": "BTCUSDT",
        "status": "FILLED"
    }))
}

#[tokio::test]
async fn test_five_slices_over_rest() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fapi/v1/order"))
        .and(query_param("type", "MARKET"))
        .and(query_param("quantity", "0.002"))
        .respond_with(filled(1))
        .expect(5)
        .mount(&server)
        .await;

    let sleeper = Arc::new(CountingSleeper::default());
    let runner = TwapRunner::new(client_for(&server)).with_sleeper(sleeper.clone());
    let plan = TwapPlan::new("BTCUSDT", "BUY", dec!(0.01), 5, 2, FinalSlice::Uniform).unwrap();

    let report = runner.run(&plan, &CancellationToken::new()).await.unwrap();

    assert_eq!(report.status, TwapStatus::Completed);
    assert_eq!(report.slices_completed, 5);
    assert_eq!(report.executed_quantity, dec!(0.01));
    assert_eq!(sleeper.0.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_rejected_slice_reports_completed_slices() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fapi/v1/order"))
        .respond_with(filled(7))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/fapi/v1/order"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": -2019,
            "msg": "Margin is insufficient."
        })))
        .mount(&server)
        .await;

    let runner = TwapRunner::new(client_for(&server))
        .with_sleeper(Arc::new(CountingSleeper::default()));
    let plan = TwapPlan::new("BTCUSDT", "BUY", dec!(1), 4, 1, FinalSlice::Uniform).unwrap();

    let err = runner
        .run(&plan, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        StrategyError::SliceFailed {
            slice,
            completed,
            executed_quantity,
            source,
        } => {
            assert_eq!(slice, 3);
            assert_eq!(completed, 2);
            assert_eq!(executed_quantity, dec!(0.5));
            assert!(matches!(
                *source,
                StrategyError::Broker(BrokerError::Api { code: -2019, .. })
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_slice_without_order_id_stops_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fapi/v1/order"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "NEW"})))
        .expect(1)
        .mount(&server)
        .await;

    let runner = TwapRunner::new(client_for(&server))
        .with_sleeper(Arc::new(CountingSleeper::default()));
    let plan = TwapPlan::new("BTCUSDT", "SELL", dec!(0.3), 3, 1, FinalSlice::Uniform).unwrap();

    let err = runner
        .run(&plan, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StrategyError::SliceFailed { slice: 1, completed: 0, ref source, .. }
            if matches!(**source, StrategyError::Placement { .. })
    ));
}

#[tokio::test]
async fn test_rejected_key_is_authentication_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fapi/v1/order"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": -2015,
            "msg": "Invalid API-key, IP, or permissions for action."
        })))
        .mount(&server)
        .await;

    let runner = TwapRunner::new(client_for(&server))
        .with_sleeper(Arc::new(CountingSleeper::default()));
    let plan = TwapPlan::new("BTCUSDT", "BUY", dec!(0.01), 2, 1, FinalSlice::Uniform).unwrap();

    let err = runner
        .run(&plan, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StrategyError::SliceFailed { ref source, .. }
            if matches!(**source, StrategyError::Authentication(_))
    ));
}

#[tokio::test]
async fn test_remainder_policy_executes_exact_total() {
    let broker = Arc::new(PaperBroker::new());
    let runner = TwapRunner::new(broker.clone()).with_sleeper(Arc::new(CountingSleeper::default()));
    let plan = TwapPlan::new("BTCUSDT", "BUY", dec!(1), 3, 1, FinalSlice::Remainder).unwrap();

    let report = runner.run(&plan, &CancellationToken::new()).await.unwrap();

    let quantities: Vec<_> = broker
        .submitted()
        .await
        .iter()
        .map(|r| r.quantity)
        .collect();
    assert_eq!(
        quantities,
        vec![dec!(0.33333333), dec!(0.33333333), dec!(0.33333334)]
    );
    assert_eq!(report.executed_quantity, dec!(1));
}
