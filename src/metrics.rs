//! Prometheus metrics for the thread digest.
//!
//! Exposes:
//! - `telegram_threads_command_duration_seconds` (histogram)
//! - `telegram_threads_command_total` (counter with status)
//! - `telegram_threads_command_inflight` (gauge)
//! - `telegram_threads_messages_total` (counter, kept/skipped)
//! - `telegram_threads_threads_total` (counter, aggregated/reported)
//! - process metrics via `process` collector

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram_vec, register_int_counter_vec, register_int_gauge_vec,
    Encoder, HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static COMMAND_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // History paging dominates; 100ms up to ~7 minutes.
    let buckets =
        prometheus::exponential_buckets(0.1, 2.0, 13).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "telegram_threads_command_duration_seconds",
        "Digest run duration in seconds",
        &["command"],
        buckets
    )
    .expect("failed to register command duration histogram")
});

static COMMAND_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "telegram_threads_command_total",
        "Total digest runs by status",
        &["command", "status"]
    )
    .expect("failed to register command counter")
});

static COMMAND_INFLIGHT: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "telegram_threads_command_inflight",
        "Number of in-flight digest runs",
        &["command"]
    )
    .expect("failed to register inflight gauge")
});

static MESSAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "telegram_threads_messages_total",
        "Fetched messages by outcome",
        &["outcome"]
    )
    .expect("failed to register messages counter")
});

static THREADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "telegram_threads_threads_total",
        "Threads by pipeline stage",
        &["stage"]
    )
    .expect("failed to register threads counter")
});

/// Ensure collectors are registered.
fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&COMMAND_DURATION);
    Lazy::force(&COMMAND_TOTAL);
    Lazy::force(&COMMAND_INFLIGHT);
    Lazy::force(&MESSAGES_TOTAL);
    Lazy::force(&THREADS_TOTAL);
}

/// Increment inflight gauge for a command.
pub fn record_command_start(command: &'static str) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).inc();
}

/// Record command completion with duration and status.
pub fn record_command_result(command: &'static str, duration: Duration, success: bool) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).dec();
    COMMAND_DURATION
        .with_label_values(&[command])
        .observe(duration.as_secs_f64());
    COMMAND_TOTAL
        .with_label_values(&[command, if success { "ok" } else { "error" }])
        .inc();
}

/// Count fetched messages that entered the pipeline or were skipped.
pub fn record_messages(kept: usize, skipped: usize) {
    init_collectors();
    MESSAGES_TOTAL.with_label_values(&["kept"]).inc_by(kept as u64);
    MESSAGES_TOTAL.with_label_values(&["skipped"]).inc_by(skipped as u64);
}

/// Count threads before and after the discussion filter.
pub fn record_threads(aggregated: usize, reported: usize) {
    init_collectors();
    THREADS_TOTAL.with_label_values(&["aggregated"]).inc_by(aggregated as u64);
    THREADS_TOTAL.with_label_values(&["reported"]).inc_by(reported as u64);
}

fn plain_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::from(body));
    *response.status_mut() = status;
    response
}

async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        return Ok(plain_response(StatusCode::INTERNAL_SERVER_ERROR, "encode error"));
    }

    let mut response = Response::new(Full::from(buffer));
    if let Ok(content_type) = encoder.format_type().parse() {
        response
            .headers_mut()
            .insert(hyper::header::CONTENT_TYPE, content_type);
    }
    Ok(response)
}

async fn handle_request(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    match req.uri().path() {
        "/metrics" => metrics_response().await,
        _ => Ok(plain_response(StatusCode::NOT_FOUND, "")),
    }
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prometheus metrics endpoint started");

    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(io, service_fn(handle_request))
                .await
            {
                warn!(?peer, "Metrics connection error: {}", err);
            }
        });
    }
}

/// Spawn the metrics HTTP endpoint on the given address.
pub fn spawn_metrics_server(addr: SocketAddr) {
    init_collectors();
    tokio::spawn(async move {
        if let Err(err) = serve(addr).await {
            error!(%addr, "Metrics server failed: {}", err);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_text(response: Response<Full<Bytes>>) -> String {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect metrics body")
            .to_bytes();
        String::from_utf8(bytes.to_vec()).expect("utf-8 metrics body")
    }

    #[test]
    fn records_successful_command_metrics() {
        let cmd = "test_threads_success";

        record_command_start(cmd);
        assert_eq!(COMMAND_INFLIGHT.with_label_values(&[cmd]).get(), 1);

        record_command_result(cmd, Duration::from_millis(120), true);

        assert_eq!(COMMAND_INFLIGHT.with_label_values(&[cmd]).get(), 0);
        assert_eq!(COMMAND_TOTAL.with_label_values(&[cmd, "ok"]).get(), 1);
        assert_eq!(
            COMMAND_DURATION.with_label_values(&[cmd]).get_sample_count(),
            1
        );
    }

    #[test]
    fn records_failed_command_metrics() {
        let cmd = "test_threads_error";

        record_command_start(cmd);
        record_command_result(cmd, Duration::from_secs(2), false);

        assert_eq!(COMMAND_TOTAL.with_label_values(&[cmd, "error"]).get(), 1);
    }

    #[test]
    fn pipeline_counters_accumulate() {
        let kept_before = MESSAGES_TOTAL.with_label_values(&["kept"]).get();
        let reported_before = THREADS_TOTAL.with_label_values(&["reported"]).get();

        record_messages(40, 3);
        record_threads(12, 5);

        assert!(MESSAGES_TOTAL.with_label_values(&["kept"]).get() >= kept_before + 40);
        assert!(MESSAGES_TOTAL.with_label_values(&["skipped"]).get() >= 3);
        assert!(THREADS_TOTAL.with_label_values(&["aggregated"]).get() >= 12);
        assert!(THREADS_TOTAL.with_label_values(&["reported"]).get() >= reported_before + 5);
    }

    #[tokio::test]
    async fn metrics_response_contains_registered_metrics() {
        let cmd = "test_threads_response";
        record_command_start(cmd);
        record_command_result(cmd, Duration::from_millis(10), true);
        record_messages(1, 0);

        let response = metrics_response().await.expect("metrics response");
        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response
            .headers()
            .get(hyper::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        assert!(content_type.is_some_and(|ct| ct.starts_with("text/")));

        let text = body_text(response).await;
        assert!(text.contains("telegram_threads_command_total"));
        assert!(text.contains("telegram_threads_messages_total"));
        assert!(text.contains(cmd));
    }

    #[test]
    fn init_collectors_can_be_called_multiple_times() {
        init_collectors();
        init_collectors();
    }
}
