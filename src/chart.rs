use plotly::color::Rgb;
use plotly::common::{Mode, Title};
use plotly::layout::{Axis, HoverMode, Layout};
use plotly::{Plot, Scatter};
use serde::Serialize;

use crate::table::SeriesTable;

/// All traces of a figure share one stack group so their y-values render
/// cumulatively.
const STACK_GROUP: &str = "one";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Plotly Express qualitative "Prism" palette.
fn prism_palette() -> Vec<Rgb> {
    vec![
        Rgb::new(95, 70, 144),
        Rgb::new(29, 105, 150),
        Rgb::new(56, 166, 165),
        Rgb::new(15, 133, 84),
        Rgb::new(115, 175, 72),
        Rgb::new(237, 173, 8),
        Rgb::new(225, 124, 5),
        Rgb::new(204, 80, 62),
        Rgb::new(148, 52, 110),
        Rgb::new(111, 64, 112),
        Rgb::new(102, 102, 102),
    ]
}

/// Plotly Express qualitative "Vivid" palette.
fn vivid_palette() -> Vec<Rgb> {
    vec![
        Rgb::new(229, 134, 6),
        Rgb::new(93, 105, 177),
        Rgb::new(82, 188, 163),
        Rgb::new(153, 201, 69),
        Rgb::new(204, 97, 176),
        Rgb::new(36, 121, 108),
        Rgb::new(218, 165, 27),
        Rgb::new(47, 138, 196),
        Rgb::new(118, 78, 159),
        Rgb::new(237, 100, 90),
        Rgb::new(165, 170, 153),
    ]
}

/// Presentation knobs that used to vary between the chart script variants.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub x_title: String,
    pub y_title: String,
    pub colorway: Vec<Rgb>,
    pub plot_background: Rgb,
    pub hover_mode: HoverMode,
    pub height: usize,
}

impl ChartStyle {
    pub fn prism() -> Self {
        Self {
            x_title: "Date".to_string(),
            y_title: "Generation [MW]".to_string(),
            colorway: prism_palette(),
            plot_background: Rgb::new(250, 250, 250),
            hover_mode: HoverMode::XUnified,
            height: 600,
        }
    }

    pub fn vivid() -> Self {
        Self {
            colorway: vivid_palette(),
            ..Self::prism()
        }
    }
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self::prism()
    }
}

/// One stacked-area series: x in row order, y the column values, name the
/// cleaned source label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceSpec {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutSpec {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub colorway: Vec<Rgb>,
    pub plot_background: Rgb,
    pub hover_mode: HoverMode,
    pub height: usize,
}

/// The figure handed to the charting layer: trace list plus layout record.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub traces: Vec<TraceSpec>,
    pub layout: LayoutSpec,
}

/// Marshal a ranked table into a figure. Pure presentation; no numeric
/// transformation happens here.
pub fn emit_chart(table: &SeriesTable, title: &str, style: &ChartStyle) -> ChartSpec {
    let x: Vec<String> = table
        .index
        .iter()
        .map(|ts| ts.format(TIME_FORMAT).to_string())
        .collect();

    let traces = table
        .columns
        .iter()
        .map(|column| TraceSpec {
            name: column.label.clone(),
            x: x.clone(),
            y: column.values.clone(),
        })
        .collect();

    ChartSpec {
        traces,
        layout: LayoutSpec {
            title: title.to_string(),
            x_title: style.x_title.clone(),
            y_title: style.y_title.clone(),
            colorway: style.colorway.clone(),
            plot_background: style.plot_background,
            hover_mode: style.hover_mode.clone(),
            height: style.height,
        },
    }
}

impl ChartSpec {
    /// Build the plotly figure for the web rendering layer.
    pub fn to_plotly(&self) -> Plot {
        let mut plot = Plot::new();
        for trace in &self.traces {
            plot.add_trace(
                Scatter::new(trace.x.clone(), trace.y.clone())
                    .mode(Mode::Lines)
                    .name(trace.name.as_str())
                    .stack_group(STACK_GROUP),
            );
        }

        let layout = Layout::new()
            .title(Title::with_text(self.layout.title.clone()))
            .x_axis(Axis::new().title(Title::with_text(self.layout.x_title.clone())))
            .y_axis(Axis::new().title(Title::with_text(self.layout.y_title.clone())))
            .colorway(self.layout.colorway.clone())
            .plot_background_color(self.layout.plot_background)
            .hover_mode(self.layout.hover_mode.clone())
            .height(self.layout.height);
        plot.set_layout(layout);

        plot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::SeriesColumn;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, hour, 0, 0).unwrap()
    }

    fn three_by_two() -> SeriesTable {
        SeriesTable::new(
            vec![ts(0), ts(1), ts(2)],
            vec![
                SeriesColumn::new("Nuclear", vec![Some(1.0), Some(1.0), Some(1.0)]),
                SeriesColumn::new("Solar", vec![Some(0.0), Some(5.0), None]),
            ],
        )
    }

    #[test]
    fn one_trace_per_column_with_full_rows() {
        let spec = emit_chart(&three_by_two(), "Generation in Germany", &ChartStyle::prism());

        assert_eq!(spec.traces.len(), 2);
        for trace in &spec.traces {
            assert_eq!(trace.x.len(), 3);
            assert_eq!(trace.y.len(), 3);
        }
        assert_eq!(spec.traces[0].name, "Nuclear");
        assert_eq!(spec.traces[0].x[0], "2026-08-01 00:00");
        assert_eq!(spec.traces[1].y, vec![Some(0.0), Some(5.0), None]);
    }

    #[test]
    fn layout_carries_title_and_axis_labels() {
        let spec = emit_chart(&three_by_two(), "Generation in Germany", &ChartStyle::default());

        assert!(!spec.layout.title.is_empty());
        assert!(!spec.layout.x_title.is_empty());
        assert!(!spec.layout.y_title.is_empty());
        assert!(!spec.layout.colorway.is_empty());
        assert_eq!(spec.layout.height, 600);
    }

    #[test]
    fn style_presets_differ_only_in_palette() {
        let prism = ChartStyle::prism();
        let vivid = ChartStyle::vivid();
        assert_ne!(prism.colorway, vivid.colorway);
        assert_eq!(prism.x_title, vivid.x_title);
        assert_eq!(prism.height, vivid.height);
    }

    #[test]
    fn chart_spec_serializes_for_the_rendering_layer() {
        let spec = emit_chart(&three_by_two(), "Generation in Germany", &ChartStyle::prism());
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"title\":\"Generation in Germany\""));
        assert!(json.contains("\"name\":\"Solar\""));
    }

    #[test]
    fn to_plotly_produces_serializable_figure() {
        let spec = emit_chart(&three_by_two(), "Generation in Germany", &ChartStyle::prism());
        let json = spec.to_plotly().to_json();
        assert!(json.contains("Generation in Germany"));
        assert!(json.contains("Nuclear"));
    }
}
