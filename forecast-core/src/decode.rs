use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    error::DecodeError,
    model::{Column, HourlyBlock, RawForecast, TimeSeriesTable},
};

/// Timestamps `start, start + interval, ...` strictly before `end`.
pub fn time_index(start: i64, end: i64, interval: i64) -> Result<Vec<DateTime<Utc>>, DecodeError> {
    if interval <= 0 {
        return Err(DecodeError::NonPositiveInterval(interval));
    }
    if end < start {
        return Err(DecodeError::EndBeforeStart { start, end });
    }
    if DateTime::<Utc>::from_timestamp(start, 0).is_none() {
        return Err(DecodeError::TimestampOutOfRange(start));
    }
    if DateTime::<Utc>::from_timestamp(end, 0).is_none() {
        return Err(DecodeError::TimestampOutOfRange(end));
    }
    let span = end.checked_sub(start).ok_or(DecodeError::TimestampOutOfRange(end))?;
    if span % interval != 0 {
        return Err(DecodeError::PartialInterval { start, end, interval });
    }

    let count = span / interval;
    (0..count)
        .map(|i| {
            let secs = start + i * interval;
            DateTime::<Utc>::from_timestamp(secs, 0).ok_or(DecodeError::TimestampOutOfRange(secs))
        })
        .collect()
}

/// Build the table from an hourly block, one column per requested variable in request order.
pub fn decode_hourly(
    block: &HourlyBlock,
    requested: &[String],
    utc_offset_seconds: i32,
) -> Result<TimeSeriesTable, DecodeError> {
    let timestamps = time_index(block.start, block.end, block.interval)?;

    let columns = requested
        .iter()
        .map(|name| {
            let series = block
                .variables
                .iter()
                .find(|v| &v.name == name)
                .ok_or_else(|| DecodeError::MissingVariable(name.clone()))?;

            if series.values.len() != timestamps.len() {
                return Err(DecodeError::LengthMismatch {
                    variable: name.clone(),
                    expected: timestamps.len(),
                    actual: series.values.len(),
                });
            }

            Ok(Column {
                name: name.clone(),
                unit: series.unit.clone(),
                values: series.values.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(rows = timestamps.len(), columns = columns.len(), "decoded hourly table");
    Ok(TimeSeriesTable::new(timestamps, columns, block.interval, utc_offset_seconds))
}

pub fn decode_forecast(raw: &RawForecast, requested: &[String]) -> Result<TimeSeriesTable, DecodeError> {
    decode_hourly(&raw.hourly, requested, raw.utc_offset_seconds)
}
