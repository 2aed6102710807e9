use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};

/// Parameters of one forecast request. Built once from config, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Hourly variable names, e.g. "temperature_2m", in table column order.
    pub hourly: Vec<String>,
    pub timezone: String,
    pub forecast_days: Option<u8>,
}

/// Decoded but not yet validated API payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RawForecast {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub utc_offset_seconds: i32,
    pub hourly: HourlyBlock,
}

/// Columnar time axis description plus one sample array per variable.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyBlock {
    /// Epoch seconds of the first sample.
    pub start: i64,
    /// Epoch seconds one interval past the last sample.
    pub end: i64,
    /// Seconds between consecutive samples.
    pub interval: i64,
    pub variables: Vec<VariableSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableSeries {
    pub name: String,
    pub unit: Option<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub unit: Option<String>,
    pub values: Vec<f64>,
}

/// Hourly forecast indexed by timestamp, one column per requested variable.
///
/// Timestamps are strictly increasing and evenly spaced by `interval`; every
/// column has exactly one value per timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    timestamps: Vec<DateTime<Utc>>,
    columns: Vec<Column>,
    interval_secs: i64,
    utc_offset_seconds: i32,
}

/// Borrowed view of a single table row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<'a> {
    pub timestamp: DateTime<Utc>,
    table: &'a TimeSeriesTable,
    index: usize,
}

impl Row<'_> {
    pub fn value(&self, column: &str) -> Option<f64> {
        self.table.column(column).map(|c| c.values[self.index])
    }

    pub fn values(&self) -> Vec<f64> {
        self.table.columns.iter().map(|c| c.values[self.index]).collect()
    }
}

impl TimeSeriesTable {
    /// Callers must uphold the row/column invariants; the decoder is the only producer.
    pub(crate) fn new(
        timestamps: Vec<DateTime<Utc>>,
        columns: Vec<Column>,
        interval_secs: i64,
        utc_offset_seconds: i32,
    ) -> Self {
        debug_assert!(columns.iter().all(|c| c.values.len() == timestamps.len()));
        Self { timestamps, columns, interval_secs, utc_offset_seconds }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn interval(&self) -> Duration {
        Duration::seconds(self.interval_secs)
    }

    /// UTC offset of the forecast location, used for local-time display.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_seconds).unwrap_or_else(|| Utc.fix())
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.timestamps
            .get(index)
            .map(|&timestamp| Row { timestamp, table: self, index })
    }
}
