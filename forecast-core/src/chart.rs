//! Renderer-independent description of the dual-axis forecast chart.

use chrono::{DateTime, Duration, FixedOffset, Utc};

use crate::{
    error::ChartError,
    model::{Column, TimeSeriesTable},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub title: String,
    pub tick_spacing: Duration,
    /// chrono format string, applied in the location's local time.
    pub tick_format: String,
    pub tick_angle: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YAxis {
    Primary,
    Secondary,
}

impl YAxis {
    pub fn index(self) -> usize {
        match self {
            YAxis::Primary => 0,
            YAxis::Secondary => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    pub tick_spacing: Duration,
    pub tick_format: String,
    pub tick_angle: i32,
    pub utc_offset: FixedOffset,
}

impl TimeAxis {
    pub fn tick_label(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.utc_offset).format(&self.tick_format).to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueAxis {
    pub title: String,
}

/// A single line series bound to one of the y-axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub name: String,
    pub variable: String,
    pub axis: YAxis,
    pub x: Vec<DateTime<Utc>>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub x_axis: TimeAxis,
    pub primary_y: ValueAxis,
    pub secondary_y: ValueAxis,
    pub traces: Vec<Trace>,
}

/// Human label for an Open-Meteo variable name.
pub fn variable_label(variable: &str) -> String {
    match variable {
        "temperature_2m" => "Temperature".to_string(),
        "relative_humidity_2m" => "Relative humidity".to_string(),
        "dew_point_2m" => "Dew point".to_string(),
        "apparent_temperature" => "Apparent temperature".to_string(),
        "precipitation" => "Precipitation".to_string(),
        other => other.replace('_', " "),
    }
}

fn axis_title(column: &Column) -> String {
    let label = variable_label(&column.name);
    match &column.unit {
        Some(unit) => format!("{label} ({unit})"),
        None => label,
    }
}

/// First table column on the primary axis, second on the secondary axis.
pub fn build_figure(table: &TimeSeriesTable, options: &ChartOptions) -> Result<Figure, ChartError> {
    let [primary, secondary, ..] = table.columns() else {
        return Err(ChartError::NotEnoughColumns(table.columns().len()));
    };
    if options.tick_spacing < Duration::hours(1) {
        return Err(ChartError::InvalidTickSpacing);
    }

    let trace = |column: &Column, axis: YAxis| Trace {
        name: variable_label(&column.name),
        variable: column.name.clone(),
        axis,
        x: table.timestamps().to_vec(),
        y: column.values.clone(),
    };

    Ok(Figure {
        title: options.title.clone(),
        x_axis: TimeAxis {
            tick_spacing: options.tick_spacing,
            tick_format: options.tick_format.clone(),
            tick_angle: options.tick_angle,
            utc_offset: table.utc_offset(),
        },
        primary_y: ValueAxis { title: axis_title(primary) },
        secondary_y: ValueAxis { title: axis_title(secondary) },
        traces: vec![trace(primary, YAxis::Primary), trace(secondary, YAxis::Secondary)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode::decode_hourly, model::HourlyBlock, model::VariableSeries};
    use chrono::TimeZone;

    fn week_table() -> TimeSeriesTable {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().timestamp();
        let block = HourlyBlock {
            start,
            end: start + 168 * 3600,
            interval: 3600,
            variables: vec![
                VariableSeries {
                    name: "temperature_2m".into(),
                    unit: Some("°C".into()),
                    values: (0..168).map(|i| i as f64 / 10.0).collect(),
                },
                VariableSeries {
                    name: "relative_humidity_2m".into(),
                    unit: Some("%".into()),
                    values: (0..168).map(|i| (i % 100) as f64).collect(),
                },
            ],
        };
        let requested = vec!["temperature_2m".to_string(), "relative_humidity_2m".to_string()];
        decode_hourly(&block, &requested, 9 * 3600).unwrap()
    }

    fn options() -> ChartOptions {
        ChartOptions {
            title: "Tokyo Disneyland: hourly temperature and humidity forecast".into(),
            tick_spacing: Duration::hours(6),
            tick_format: "%m/%d(%a) %H:00".into(),
            tick_angle: 60,
        }
    }

    #[test]
    fn week_of_data_gives_two_traces_on_separate_axes() {
        let table = week_table();
        assert_eq!(table.len(), 168);

        let figure = build_figure(&table, &options()).unwrap();

        assert_eq!(figure.traces.len(), 2);
        assert_eq!(figure.traces[0].variable, "temperature_2m");
        assert_eq!(figure.traces[0].axis, YAxis::Primary);
        assert_eq!(figure.traces[1].variable, "relative_humidity_2m");
        assert_eq!(figure.traces[1].axis, YAxis::Secondary);
        assert_eq!(figure.x_axis.tick_spacing, Duration::hours(6));
        assert_eq!(figure.x_axis.tick_angle, 60);
        assert!(figure.traces.iter().all(|t| t.x.len() == 168 && t.y.len() == 168));
    }

    #[test]
    fn axis_titles_carry_units() {
        let figure = build_figure(&week_table(), &options()).unwrap();
        assert_eq!(figure.primary_y.title, "Temperature (°C)");
        assert_eq!(figure.secondary_y.title, "Relative humidity (%)");
        assert_eq!(figure.traces.iter().filter(|t| t.axis == YAxis::Secondary).count(), 1);
    }

    #[test]
    fn tick_labels_use_local_time() {
        let figure = build_figure(&week_table(), &options()).unwrap();
        let midnight_utc = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(figure.x_axis.tick_label(midnight_utc), "01/01(Mon) 09:00");
    }

    #[test]
    fn single_column_table_is_rejected() {
        let block = HourlyBlock {
            start: 0,
            end: 3600,
            interval: 3600,
            variables: vec![VariableSeries {
                name: "temperature_2m".into(),
                unit: None,
                values: vec![1.0],
            }],
        };
        let table = decode_hourly(&block, &["temperature_2m".to_string()], 0).unwrap();
        assert_eq!(build_figure(&table, &options()), Err(ChartError::NotEnoughColumns(1)));
    }

    #[test]
    fn unknown_variables_get_readable_labels() {
        assert_eq!(variable_label("wind_speed_10m"), "wind speed 10m");
    }
}
