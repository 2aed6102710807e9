//! Scripted transport for network-free tests.

use async_trait::async_trait;
use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{
    error::FetchError,
    transport::{ApiReply, ApiRequest, Transport},
};

/// Replays scripted outcomes in order; `Err` strings become network failures.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    script: Arc<Mutex<VecDeque<Result<ApiReply, String>>>>,
    calls: Arc<AtomicUsize>,
}

impl FakeTransport {
    pub fn new(script: Vec<Result<ApiReply, String>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, request: &ApiRequest) -> Result<ApiReply, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();

        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(FetchError::Network { url: request.url.clone(), message }),
            None => Err(FetchError::Network {
                url: request.url.clone(),
                message: "no scripted reply left".to_string(),
            }),
        }
    }
}

pub fn ok_reply(body: &str) -> ApiReply {
    ApiReply { status: 200, body: body.to_string() }
}

/// Open-Meteo style JSON (`timeformat=unixtime`) for `hours` hourly samples from `start`.
pub fn open_meteo_body(start: i64, hours: usize) -> String {
    let time: Vec<i64> = (0..hours as i64).map(|i| start + i * 3600).collect();
    let temperature: Vec<f64> = (0..hours).map(|i| 10.0 + (i % 24) as f64 * 0.5).collect();
    let humidity: Vec<f64> = (0..hours).map(|i| 40.0 + (i % 48) as f64).collect();

    serde_json::json!({
        "latitude": 35.62,
        "longitude": 139.88,
        "generationtime_ms": 0.05,
        "utc_offset_seconds": 32400,
        "timezone": "Asia/Tokyo",
        "timezone_abbreviation": "JST",
        "elevation": 3.0,
        "hourly_units": {
            "time": "unixtime",
            "temperature_2m": "°C",
            "relative_humidity_2m": "%"
        },
        "hourly": {
            "time": time,
            "temperature_2m": temperature,
            "relative_humidity_2m": humidity
        }
    })
    .to_string()
}
