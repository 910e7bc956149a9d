//! Prometheus metrics

use std::net::SocketAddr;
use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Order placement round trip
    OrderSubmission,
    /// Order status lookup round trip
    StatusQuery,
    /// Order cancellation round trip
    Cancellation,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Orders accepted by the broker
    OrdersPlaced,
    /// Orders cancelled by a runner
    OrdersCancelled,
    /// Strategy runs that ended in an error
    StrategyFailures,
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::OrderSubmission => "futures_bot_order_submission_latency_ms",
        LatencyMetric::StatusQuery => "futures_bot_status_query_latency_ms",
        LatencyMetric::Cancellation => "futures_bot_cancellation_latency_ms",
    };

    let value_ms = duration.as_secs_f64() * 1000.0;
    metrics::histogram!(metric_name).record(value_ms);
    tracing::trace!(metric = metric_name, value_ms, "Recording latency");
}

/// Increment a counter, labelled with what produced it (order type or strategy)
pub fn increment(metric: CounterMetric, label: &'static str) {
    let metric_name = match metric {
        CounterMetric::OrdersPlaced => "futures_bot_orders_placed_total",
        CounterMetric::OrdersCancelled => "futures_bot_orders_cancelled_total",
        CounterMetric::StrategyFailures => "futures_bot_strategy_failures_total",
    };

    metrics::counter!(metric_name, "kind" => label).increment(1);
}

/// Serve metrics for scraping on the given port
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;

    tracing::info!(%addr, "Prometheus metrics exporter listening");
    Ok(())
}
