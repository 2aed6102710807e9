//! Core library for the `forecast` CLI.
//!
//! This crate defines:
//! - Configuration with documented defaults
//! - A transport stack: HTTP, retry with backoff, on-disk response cache
//! - The Open-Meteo client and the decoder into a time-indexed table
//! - A renderer-independent chart model and an HTML renderer
//!
//! It is used by `forecast-cli`, but the pipeline can be driven with any
//! [`Transport`], which keeps it testable without network access.

pub mod cache;
pub mod chart;
pub mod config;
pub mod decode;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod render;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{CachingTransport, DiskCache};
pub use chart::{ChartOptions, Figure, Trace, YAxis, build_figure};
pub use config::Config;
pub use decode::{decode_forecast, decode_hourly, time_index};
pub use error::{ChartError, DecodeError, FetchError};
pub use model::{Column, ForecastRequest, HourlyBlock, RawForecast, TimeSeriesTable};
pub use pipeline::{build_forecast, fetch_table};
pub use provider::OpenMeteoClient;
pub use render::{ChartRenderer, HtmlRenderer};
pub use transport::{
    ApiReply, ApiRequest, HttpTransport, RetryPolicy, RetryTransport, Transport,
    transport_from_config,
};
