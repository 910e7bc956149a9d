//! End-to-end integration tests: parsed command line through a paper session

use clap::Parser;
use futures_bot::broker::{OrderId, OrderType, PaperBroker, Side};
use futures_bot::cli::{Cli, Completion, Prepared, Session};
use futures_bot::config::{Config, ExecutionMode};
use futures_bot::strategy::{FinalSlice, StrategyError};
use futures_bot::validation::ValidationError;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn paper_session() -> (Arc<PaperBroker>, Session) {
    let broker = Arc::new(PaperBroker::new());
    let session = Session::new(broker.clone(), Config::default());
    (broker, session)
}

fn parse(args: &[&str]) -> Cli {
    let argv = std::iter::once("futures-bot").chain(args.iter().copied());
    Cli::try_parse_from(argv).unwrap()
}

async fn run(args: &[&str], session: &Session) -> Result<Completion, StrategyError> {
    parse(args).command.execute(session).await
}

#[test]
fn test_config_example_loads() {
    let config = Config::load("config.toml.example").unwrap();
    assert_eq!(config.broker.mode, ExecutionMode::Live);
    assert_eq!(config.oco.poll_interval_secs, 5);
    assert_eq!(config.twap.final_slice, FinalSlice::Uniform);
    assert_eq!(config.telemetry.log_level, "info");
}

#[test]
fn test_invalid_input_wins_over_missing_credentials() {
    std::env::remove_var("BINANCE_API_KEY");
    std::env::remove_var("BINANCE_API_SECRET");

    let err = parse(&["market", "BTC-USDT", "BUY", "0.01"])
        .command
        .launch(Config::default(), false)
        .unwrap_err();
    assert!(matches!(
        err,
        StrategyError::InvalidInput(ValidationError::InvalidSymbol(_))
    ));

    let err = parse(&["oco", "ETHUSDT", "SELL", "1", "1800", "2000"])
        .command
        .launch(Config::default(), false)
        .unwrap_err();
    assert!(matches!(
        err,
        StrategyError::InvalidInput(ValidationError::SellOcoPriceOrder { .. })
    ));

    // valid input gets as far as the credential check
    let err = parse(&["market", "BTCUSDT", "BUY", "0.01"])
        .command
        .launch(Config::default(), false)
        .unwrap_err();
    assert!(matches!(err, StrategyError::Authentication(_)));
}

#[test]
fn test_paper_launch_prepares_and_connects() {
    let (prepared, session) = parse(&["twap", "BTCUSDT", "BUY", "0.01", "5", "2"])
        .command
        .launch(Config::default(), true)
        .unwrap();
    assert!(matches!(prepared, Prepared::Twap(ref plan) if plan.num_slices == 5));
    assert!(!session.cancel.is_cancelled());
}

#[tokio::test]
async fn test_market_order_scenario() {
    let (broker, session) = paper_session();

    let completion = run(&["market", "BTCUSDT", "BUY", "0.01"], &session)
        .await
        .unwrap();

    assert_eq!(completion, Completion::Done);
    let submitted = broker.submitted().await;
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].symbol, "BTCUSDT");
    assert_eq!(submitted[0].side, Side::Buy);
    assert_eq!(submitted[0].order_type, OrderType::Market);
    assert_eq!(submitted[0].quantity, dec!(0.01));
}

#[tokio::test]
async fn test_lowercase_arguments_are_accepted() {
    let (broker, session) = paper_session();

    run(&["limit", "ethusdt", "sell", "1", "2000"], &session)
        .await
        .unwrap();

    let submitted = broker.submitted().await;
    assert_eq!(submitted[0].symbol, "ETHUSDT");
    assert_eq!(submitted[0].side, Side::Sell);
}

#[tokio::test]
async fn test_inverted_oco_places_nothing() {
    let (broker, session) = paper_session();

    let err = run(&["oco", "ETHUSDT", "SELL", "1", "1800", "2000"], &session)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StrategyError::InvalidInput(ValidationError::SellOcoPriceOrder { .. })
    ));
    assert!(broker.submitted().await.is_empty());
}

#[tokio::test]
async fn test_hyphenated_symbol_rejected() {
    let (broker, session) = paper_session();

    let err = run(&["market", "BTC-USDT", "BUY", "0.01"], &session)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StrategyError::InvalidInput(ValidationError::InvalidSymbol(_))
    ));
    assert!(broker.submitted().await.is_empty());
}

#[tokio::test]
async fn test_buy_stop_limit_with_stop_below_limit_rejected() {
    let (broker, session) = paper_session();

    let err = run(
        &["stop_limit", "BTCUSDT", "BUY", "0.01", "30000", "29000"],
        &session,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, StrategyError::InvalidInput(_)));
    assert!(broker.submitted().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_oco_without_fill_times_out_incomplete() {
    let (broker, session) = paper_session();

    let completion = run(
        &[
            "oco",
            "ETHUSDT",
            "SELL",
            "1",
            "2000",
            "1800",
            "--poll-interval",
            "1",
            "--max-polls",
            "3",
        ],
        &session,
    )
    .await
    .unwrap();

    assert_eq!(completion, Completion::Incomplete);
    assert_eq!(broker.cancelled().await, vec![OrderId(1), OrderId(2)]);
}

#[tokio::test(start_paused = true)]
async fn test_twap_scenario() {
    let (broker, session) = paper_session();

    let completion = run(&["twap", "BTCUSDT", "BUY", "0.01", "5", "2"], &session)
        .await
        .unwrap();

    assert_eq!(completion, Completion::Done);
    let submitted = broker.submitted().await;
    assert_eq!(submitted.len(), 5);
    assert!(submitted.iter().all(|r| r.quantity == dec!(0.002)));
}

#[tokio::test]
async fn test_twap_negative_slices_reach_validation() {
    let (broker, session) = paper_session();

    let err = run(&["twap", "BTCUSDT", "BUY", "0.01", "-1", "2"], &session)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StrategyError::InvalidInput(ValidationError::NonPositiveSlices(-1))
    ));
    assert!(broker.submitted().await.is_empty());
}

#[tokio::test]
async fn test_oco_zero_max_polls_rejected() {
    let (broker, session) = paper_session();

    let err = run(
        &["oco", "ETHUSDT", "SELL", "1", "2000", "1800", "--max-polls", "0"],
        &session,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        StrategyError::InvalidInput(ValidationError::ZeroMaxPolls)
    ));
    assert!(broker.submitted().await.is_empty());
}

#[tokio::test]
async fn test_twap_zero_slices_rejected() {
    let (broker, session) = paper_session();

    let err = run(&["twap", "BTCUSDT", "BUY", "0.01", "0", "2"], &session)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StrategyError::InvalidInput(ValidationError::NonPositiveSlices(0))
    ));
    assert!(broker.submitted().await.is_empty());
}
