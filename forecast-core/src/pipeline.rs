use anyhow::{Context, Result};
use tracing::info;

use crate::{
    Config,
    chart::{Figure, build_figure},
    decode::decode_forecast,
    model::TimeSeriesTable,
    provider::OpenMeteoClient,
    transport::Transport,
};

/// Fetch the configured forecast and decode it into a table.
pub async fn fetch_table(config: &Config, transport: &dyn Transport) -> Result<TimeSeriesTable> {
    let params = config.forecast_request();
    let client = OpenMeteoClient::new(config.request.endpoint.as_str(), transport);

    let raw = client
        .fetch(&params)
        .await
        .with_context(|| format!("Failed to fetch forecast for {}", config.location.name))?;

    let table = decode_forecast(&raw, &params.hourly)
        .context("Open-Meteo response does not match the requested variables")?;

    info!(
        rows = table.len(),
        first = ?table.timestamps().first(),
        last = ?table.timestamps().last(),
        "forecast table ready"
    );
    Ok(table)
}

/// The whole fetch, decode, chart pipeline; nothing is produced if any step fails.
pub async fn build_forecast(config: &Config, transport: &dyn Transport) -> Result<Figure> {
    let table = fetch_table(config, transport).await?;
    let figure = build_figure(&table, &config.chart_options()).context("Failed to build chart")?;
    Ok(figure)
}
