use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::{
    error::{DecodeError, FetchError},
    model::{ForecastRequest, HourlyBlock, RawForecast, VariableSeries},
    transport::{ApiRequest, Transport},
};

/// Interval assumed when the API returns a single hourly sample.
const HOURLY_SECS: i64 = 3600;

/// Client for the Open-Meteo forecast endpoint.
#[derive(Debug)]
pub struct OpenMeteoClient<'a> {
    endpoint: String,
    transport: &'a dyn Transport,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    utc_offset_seconds: i32,
    #[serde(default)]
    timezone: String,
    #[serde(default)]
    hourly_units: BTreeMap<String, String>,
    hourly: OmHourly,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<i64>,
    #[serde(flatten)]
    variables: BTreeMap<String, Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct OmError {
    reason: String,
}

impl<'a> OpenMeteoClient<'a> {
    pub fn new(endpoint: impl Into<String>, transport: &'a dyn Transport) -> Self {
        Self { endpoint: endpoint.into(), transport }
    }

    pub fn build_request(&self, params: &ForecastRequest) -> ApiRequest {
        let mut request = ApiRequest::new(self.endpoint.as_str())
            .param("latitude", params.latitude)
            .param("longitude", params.longitude)
            .param("hourly", params.hourly.join(","))
            .param("timezone", &params.timezone)
            .param("timeformat", "unixtime");

        if let Some(days) = params.forecast_days {
            request = request.param("forecast_days", days);
        }
        request
    }

    /// Fetch the hourly forecast. The body is parsed but not validated against the request.
    pub async fn fetch(&self, params: &ForecastRequest) -> anyhow::Result<RawForecast> {
        let request = self.build_request(params);
        info!(
            latitude = params.latitude,
            longitude = params.longitude,
            variables = %params.hourly.join(","),
            "requesting hourly forecast"
        );

        let reply = self.transport.get(&request).await?;

        if !reply.is_success() {
            let reason = serde_json::from_str::<OmError>(&reply.body)
                .map(|e| e.reason)
                .unwrap_or_else(|_| truncate_body(&reply.body));
            return Err(FetchError::Api { status: reply.status, reason }.into());
        }

        parse_forecast(&reply.body)
    }
}

/// Map an Open-Meteo JSON body onto the columnar raw model.
pub fn parse_forecast(body: &str) -> anyhow::Result<RawForecast> {
    let parsed: OmResponse = serde_json::from_str(body).map_err(FetchError::from)?;
    let (start, end, interval) = time_axis(&parsed.hourly.time)?;

    let variables = parsed
        .hourly
        .variables
        .into_iter()
        .map(|(name, values)| VariableSeries {
            unit: parsed.hourly_units.get(&name).cloned(),
            values: values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
            name,
        })
        .collect();

    Ok(RawForecast {
        latitude: parsed.latitude,
        longitude: parsed.longitude,
        timezone: parsed.timezone,
        utc_offset_seconds: parsed.utc_offset_seconds,
        hourly: HourlyBlock { start, end, interval, variables },
    })
}

/// Reduce an explicit timestamp array to (start, end, interval), end exclusive.
fn time_axis(time: &[i64]) -> Result<(i64, i64, i64), DecodeError> {
    match time {
        [] => Ok((0, 0, HOURLY_SECS)),
        [only] => {
            let end = only
                .checked_add(HOURLY_SECS)
                .ok_or(DecodeError::TimestampOutOfRange(*only))?;
            Ok((*only, end, HOURLY_SECS))
        }
        [first, second, ..] => {
            let interval = second
                .checked_sub(*first)
                .ok_or(DecodeError::TimestampOutOfRange(*second))?;
            if interval <= 0 {
                return Err(DecodeError::NonPositiveInterval(interval));
            }
            if let Some(index) = time
                .windows(2)
                .position(|w| w[1].checked_sub(w[0]) != Some(interval))
            {
                return Err(DecodeError::UnevenTimeAxis { index: index + 1 });
            }
            let last = time[time.len() - 1];
            let end = last
                .checked_add(interval)
                .ok_or(DecodeError::TimestampOutOfRange(last))?;
            Ok((*first, end, interval))
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
