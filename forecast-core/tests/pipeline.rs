use async_trait::async_trait;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use forecast_core::{
    ApiReply, ApiRequest, CachingTransport, ChartRenderer, Config, DiskCache, FetchError,
    HtmlRenderer, RetryPolicy, RetryTransport, Transport, YAxis, build_forecast, fetch_table,
};

/// Fails the first `failures` calls, then serves a week of hourly data.
#[derive(Debug, Clone)]
struct FlakyNetwork {
    failures: usize,
    calls: Arc<AtomicUsize>,
}

impl FlakyNetwork {
    fn new(failures: usize) -> Self {
        Self { failures, calls: Arc::new(AtomicUsize::new(0)) }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FlakyNetwork {
    async fn get(&self, request: &ApiRequest) -> Result<ApiReply, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(FetchError::Network {
                url: request.url.clone(),
                message: format!("simulated failure {}", n + 1),
            });
        }
        Ok(ApiReply { status: 200, body: week_body() })
    }
}

fn week_body() -> String {
    // 2024-01-01T00:00:00Z
    let start = 1_704_067_200i64;
    let time: Vec<i64> = (0..168).map(|i| start + i * 3600).collect();
    let temperature: Vec<f64> = (0..168).map(|i| 5.0 + (i % 24) as f64 / 2.0).collect();
    let humidity: Vec<f64> = (0..168).map(|i| 30.0 + (i % 60) as f64).collect();

    serde_json::json!({
        "latitude": 35.62,
        "longitude": 139.88,
        "utc_offset_seconds": 32400,
        "timezone": "Asia/Tokyo",
        "hourly_units": {"time": "unixtime", "temperature_2m": "°C", "relative_humidity_2m": "%"},
        "hourly": {
            "time": time,
            "temperature_2m": temperature,
            "relative_humidity_2m": humidity
        }
    })
    .to_string()
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy { backoff_factor: Duration::ZERO, ..RetryPolicy::default() }
}

#[tokio::test]
async fn recovers_after_two_failures_and_builds_chart() {
    let network = FlakyNetwork::new(2);
    let transport = RetryTransport::new(network.clone(), fast_retry());

    let figure = build_forecast(&Config::default(), &transport).await.unwrap();

    assert_eq!(network.calls(), 3);
    assert_eq!(figure.traces.len(), 2);
    assert_eq!(figure.traces[0].axis, YAxis::Primary);
    assert_eq!(figure.traces[1].axis, YAxis::Secondary);
    assert_eq!(figure.x_axis.tick_spacing, chrono::Duration::hours(6));

    let html = HtmlRenderer::default().render(&figure).unwrap();
    assert!(html.contains("Tokyo Disneyland"));
}

#[tokio::test]
async fn five_failures_is_fatal() {
    let network = FlakyNetwork::new(5);
    let transport = RetryTransport::new(network.clone(), fast_retry());

    let result = fetch_table(&Config::default(), &transport).await;

    assert!(result.is_err());
    assert_eq!(network.calls(), 5);
}

#[tokio::test]
async fn cached_stack_hits_the_network_once() {
    let dir = tempfile::tempdir().unwrap();
    let network = FlakyNetwork::new(1);
    let cache = DiskCache::open(dir.path().to_path_buf(), Duration::from_secs(3600)).unwrap();
    let transport = CachingTransport::new(RetryTransport::new(network.clone(), fast_retry()), cache);

    let first = fetch_table(&Config::default(), &transport).await.unwrap();
    let second = fetch_table(&Config::default(), &transport).await.unwrap();

    assert_eq!(network.calls(), 2);
    assert_eq!(first, second);
    assert_eq!(first.len(), 168);
}
