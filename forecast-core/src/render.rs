use anyhow::{Result, anyhow};
use charming::component::{Axis, DataZoom, DataZoomType, Grid, Legend, Title};
use charming::element::{
    AxisLabel, AxisPointer, AxisPointerType, AxisType, Formatter, SplitLine, Tooltip, Trigger,
};
use charming::series::Line;
use charming::theme::Theme;
use charming::{Chart, HtmlRenderer as CharmingHtml, df};

use crate::chart::{Figure, TimeAxis, Trace, YAxis};

/// Turns a [`Figure`] into a displayable document.
pub trait ChartRenderer {
    fn render(&self, figure: &Figure) -> Result<String>;
}

/// Standalone ECharts HTML page.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    pub width: u64,
    pub height: u64,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self { width: 1600, height: 800 }
    }
}

impl HtmlRenderer {
    pub fn new(width: u64, height: u64) -> Self {
        Self { width, height }
    }
}

impl ChartRenderer for HtmlRenderer {
    fn render(&self, figure: &Figure) -> Result<String> {
        CharmingHtml::new(figure.title.as_str(), self.width, self.height)
            .theme(Theme::Default)
            .render(&build_chart(figure))
            .map_err(|e| anyhow!("Failed to render chart HTML: {e:?}"))
    }
}

fn build_chart(figure: &Figure) -> Chart {
    let legend: Vec<String> = figure.traces.iter().map(|t| t.name.clone()).collect();

    let mut chart = Chart::new()
        .title(Title::new().text(figure.title.as_str()))
        .legend(Legend::new().inactive_color("#777").data(legend))
        .tooltip(
            Tooltip::new().trigger(Trigger::Axis).axis_pointer(
                AxisPointer::new()
                    .animation(true)
                    .type_(AxisPointerType::Cross),
            ),
        )
        .grid(Grid::new().bottom(140))
        .x_axis(time_axis(&figure.x_axis))
        .y_axis(value_axis(&figure.primary_y.title))
        .y_axis(value_axis(&figure.secondary_y.title))
        .data_zoom(DataZoom::new())
        .data_zoom(DataZoom::new().type_(DataZoomType::Inside));

    for trace in &figure.traces {
        chart = chart.series(line(trace, &figure.x_axis));
    }
    chart
}

fn time_axis(axis: &TimeAxis) -> Axis {
    let interval_ms = axis.tick_spacing.num_milliseconds() as f64;

    Axis::new()
        .type_(AxisType::Time)
        .interval(interval_ms)
        .axis_label(
            AxisLabel::new()
                .rotate(axis.tick_angle as f64)
                .formatter(Formatter::String(echarts_time_template(&axis.tick_format))),
        )
}

fn value_axis(title: &str) -> Axis {
    Axis::new()
        .type_(AxisType::Value)
        .name(title)
        .scale(true)
        .split_line(SplitLine::new().show(false))
}

fn line(trace: &Trace, x_axis: &TimeAxis) -> Line {
    // Local wall-clock strings without offset, so the browser shows location time.
    let data = trace
        .x
        .iter()
        .zip(&trace.y)
        .flat_map(|(at, value)| {
            let local = at
                .with_timezone(&x_axis.utc_offset)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string();
            df![[local, *value]]
        })
        .collect::<Vec<_>>();

    let line = Line::new().name(trace.name.as_str()).data(data);
    match trace.axis {
        YAxis::Primary => line,
        YAxis::Secondary => line.y_axis_index(YAxis::Secondary.index() as f64),
    }
}

/// Translate the chrono directives used for tick labels into ECharts time template tokens.
pub fn echarts_time_template(chrono_format: &str) -> String {
    let mut out = String::with_capacity(chrono_format.len() + 8);
    let mut chars = chrono_format.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('Y') => out.push_str("{yyyy}"),
            Some('y') => out.push_str("{yy}"),
            Some('m') => out.push_str("{MM}"),
            Some('d') => out.push_str("{dd}"),
            Some('e') => out.push_str("{d}"),
            Some('a') => out.push_str("{ee}"),
            Some('A') => out.push_str("{eeee}"),
            Some('b') => out.push_str("{MMM}"),
            Some('B') => out.push_str("{MMMM}"),
            Some('H') => out.push_str("{HH}"),
            Some('I') => out.push_str("{hh}"),
            Some('M') => out.push_str("{mm}"),
            Some('S') => out.push_str("{ss}"),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ValueAxis;
    use chrono::{Duration, FixedOffset, TimeZone, Utc};

    fn figure() -> Figure {
        let x: Vec<_> = (0..12)
            .map(|h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap())
            .collect();
        Figure {
            title: "Tokyo Disneyland forecast".into(),
            x_axis: TimeAxis {
                tick_spacing: Duration::hours(6),
                tick_format: "%m/%d(%a) %H:00".into(),
                tick_angle: 60,
                utc_offset: FixedOffset::east_opt(9 * 3600).unwrap(),
            },
            primary_y: ValueAxis { title: "Temperature (°C)".into() },
            secondary_y: ValueAxis { title: "Relative humidity (%)".into() },
            traces: vec![
                Trace {
                    name: "Temperature".into(),
                    variable: "temperature_2m".into(),
                    axis: YAxis::Primary,
                    x: x.clone(),
                    y: (0..12).map(|i| i as f64).collect(),
                },
                Trace {
                    name: "Relative humidity".into(),
                    variable: "relative_humidity_2m".into(),
                    axis: YAxis::Secondary,
                    x,
                    y: (0..12).map(|i| 50.0 + i as f64).collect(),
                },
            ],
        }
    }

    #[test]
    fn tick_format_translates_to_echarts_tokens() {
        assert_eq!(echarts_time_template("%m/%d(%a) %H:00"), "{MM}/{dd}({ee}) {HH}:00");
        assert_eq!(echarts_time_template("%Y-%m-%d %H:%M"), "{yyyy}-{MM}-{dd} {HH}:{mm}");
        assert_eq!(echarts_time_template("100%%"), "100%");
    }

    #[test]
    fn html_contains_title_and_both_series() {
        let html = HtmlRenderer::default().render(&figure()).unwrap();

        assert!(html.contains("Tokyo Disneyland forecast"));
        assert!(html.contains("Relative humidity"));
        assert!(html.contains("2024-01-01 09:00:00"));
    }

    #[test]
    fn tick_spacing_rotation_and_secondary_axis_reach_the_options() {
        let options = serde_json::to_value(build_chart(&figure())).unwrap();
        let first = |v: &serde_json::Value| v.get(0).cloned().unwrap_or_else(|| v.clone());

        let x_axis = first(&options["xAxis"]);
        assert_eq!(x_axis["type"], "time");
        assert_eq!(x_axis["interval"].as_f64(), Some(21_600_000.0));
        assert_eq!(x_axis["axisLabel"]["rotate"].as_f64(), Some(60.0));
        assert_eq!(x_axis["axisLabel"]["formatter"], "{MM}/{dd}({ee}) {HH}:00");

        assert_eq!(options["yAxis"][1]["name"], "Relative humidity (%)");
        assert!(options["series"][0].get("yAxisIndex").is_none());
        assert_eq!(options["series"][1]["yAxisIndex"].as_f64(), Some(1.0));
    }
}
