use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Column of a provider response, labelled by the two-level pair the
/// transparency platform uses, e.g. ("Fossil Gas", "Actual Aggregated").
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub source: String,
    pub attribute: String,
    pub values: Vec<Option<f64>>,
}

/// Generation data as returned by the provider: a timestamp index with one
/// column per (source, attribute) pair. Rows a source has no reading for
/// hold `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSeriesTable {
    pub index: Vec<DateTime<Utc>>,
    pub columns: Vec<RawColumn>,
}

impl RawSeriesTable {
    /// Align per-label point maps on the union of their timestamps.
    /// Column order follows the order of `series`.
    pub fn from_points(
        series: Vec<((String, String), BTreeMap<DateTime<Utc>, f64>)>,
    ) -> Self {
        let mut index: Vec<DateTime<Utc>> = series
            .iter()
            .flat_map(|(_, points)| points.keys().copied())
            .collect();
        index.sort();
        index.dedup();

        let columns = series
            .into_iter()
            .map(|((source, attribute), points)| RawColumn {
                source,
                attribute,
                values: index.iter().map(|ts| points.get(ts).copied()).collect(),
            })
            .collect();

        Self { index, columns }
    }
}

/// A single flat-labelled series over the table index.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesColumn {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

impl SeriesColumn {
    pub fn new(label: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }
}

/// Flat table the pipeline steps pass between each other. The reshape,
/// aggregation and rank steps all return this shape; they differ only in
/// which columns survive and in what order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesTable {
    pub index: Vec<DateTime<Utc>>,
    pub columns: Vec<SeriesColumn>,
}

impl SeriesTable {
    pub fn new(index: Vec<DateTime<Utc>>, columns: Vec<SeriesColumn>) -> Self {
        Self { index, columns }
    }

    pub fn column(&self, label: &str) -> Option<&SeriesColumn> {
        self.columns.iter().find(|column| column.label == label)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.label.as_str()).collect()
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }
}
