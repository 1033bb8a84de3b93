use crate::chart::{ChartSpec, ChartStyle, emit_chart};
use crate::entsoe::{EntsoeError, GenerationSource, areas};
use crate::table::{RawSeriesTable, SeriesColumn, SeriesTable};

/// Qualifier words the provider appends to every series label.
const NOISE_WORDS: [&str; 2] = ["Actual", "Aggregated"];

const RENEWABLE_SOURCES: [&str; 5] = [
    "Geothermal",
    "Other renewable",
    "Wind Offshore",
    "Hydro Run-of-river and poundage",
    "Hydro Water Reservoir",
];
const RENEWABLE_LABEL: &str = "Other Renewables";

const FOSSIL_SOURCES: [&str; 3] = ["Fossil Oil", "Fossil Hard coal", "Fossil Gas"];
const FOSSIL_LABEL: &str = "Fossil Oil, Fossil Gas, Hard coal";

const OTHER_SOURCES: [&str; 2] = ["Other", "Waste"];
const OTHER_LABEL: &str = "Other sources";

/// Whether minor sources get merged into coarser categories before ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    #[default]
    None,
    Categories,
}

/// Result of the category-aggregation step. A skip leaves the table
/// untouched but names the columns that blocked the merge, so a schema
/// change upstream is visible instead of silently ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregationOutcome {
    Applied,
    Skipped { missing: Vec<String> },
}

fn normalize(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_noise_words(label: &str) -> String {
    label
        .split_whitespace()
        .filter(|word| !NOISE_WORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse the two-level (source, attribute) labels into flat ones and drop
/// everything consumption-related. No numeric transformation.
pub fn reshape(raw: &RawSeriesTable) -> SeriesTable {
    // First flatten/drop pass over the two-level labels.
    let mut columns: Vec<SeriesColumn> = raw
        .columns
        .iter()
        .map(|column| SeriesColumn {
            label: normalize(&format!("{} {}", column.source, column.attribute)),
            values: column.values.clone(),
        })
        .filter(|column| !column.label.contains("Consumption"))
        .collect();

    // Strip the qualifier words from the remaining labels.
    for column in &mut columns {
        column.label = strip_noise_words(&column.label);
    }

    // Second flatten/drop pass. Label cleanup can leave spacing artifacts
    // and, for source names that themselves contain "Consumption", leave
    // columns the first pass should have caught. Kept deliberately for
    // column-set parity across both passes.
    let columns = columns
        .into_iter()
        .map(|mut column| {
            column.label = normalize(&column.label);
            column
        })
        .filter(|column| !column.label.contains("Consumption"))
        .collect();

    SeriesTable {
        index: raw.index.clone(),
        columns,
    }
}

/// Merge minor sources into the three coarse categories. Atomic: if any of
/// the constituent columns is absent, no merge happens at all and the input
/// passes through with `AggregationOutcome::Skipped`.
pub fn aggregate(table: SeriesTable) -> (SeriesTable, AggregationOutcome) {
    let groups: [(&[&str], &str); 3] = [
        (&RENEWABLE_SOURCES, RENEWABLE_LABEL),
        (&FOSSIL_SOURCES, FOSSIL_LABEL),
        (&OTHER_SOURCES, OTHER_LABEL),
    ];

    let missing: Vec<String> = groups
        .iter()
        .flat_map(|(sources, _)| sources.iter())
        .filter(|source| table.column(source).is_none())
        .map(|source| source.to_string())
        .collect();
    if !missing.is_empty() {
        return (table, AggregationOutcome::Skipped { missing });
    }

    let n_rows = table.n_rows();
    let mut merged = Vec::with_capacity(groups.len());
    for (sources, label) in groups {
        let mut values: Vec<Option<f64>> = vec![Some(0.0); n_rows];
        for source in sources {
            if let Some(column) = table.column(source) {
                for (sum, value) in values.iter_mut().zip(&column.values) {
                    // A missing reading poisons the category sum for that row
                    *sum = match (*sum, value) {
                        (Some(a), Some(b)) => Some(a + b),
                        _ => None,
                    };
                }
            }
        }
        merged.push(SeriesColumn::new(label, values));
    }

    let constituent = |label: &str| {
        groups
            .iter()
            .any(|(sources, _)| sources.contains(&label))
    };
    let mut columns: Vec<SeriesColumn> = table
        .columns
        .into_iter()
        .filter(|column| !constituent(&column.label))
        .collect();
    columns.extend(merged);

    (
        SeriesTable {
            index: table.index,
            columns,
        },
        AggregationOutcome::Applied,
    )
}

/// Sample standard deviation over the non-missing values. Fewer than two
/// observations rank as zero dispersion.
fn sample_std_dev(values: &[Option<f64>]) -> f64 {
    let observed: Vec<f64> = values.iter().flatten().copied().collect();
    if observed.len() < 2 {
        return 0.0;
    }
    let n = observed.len() as f64;
    let mean = observed.iter().sum::<f64>() / n;
    let variance = observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// Reorder columns ascending by dispersion, so near-flat series stack first
/// and the most variable series render on top. Ties keep input order.
pub fn rank(table: SeriesTable) -> SeriesTable {
    let mut keyed: Vec<(f64, SeriesColumn)> = table
        .columns
        .into_iter()
        .map(|column| (sample_std_dev(&column.values), column))
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

    SeriesTable {
        index: table.index,
        columns: keyed.into_iter().map(|(_, column)| column).collect(),
    }
}

/// The one parameterized pipeline: fetch, reshape, optionally aggregate,
/// rank, emit. Replaces what used to be three near-identical scripts.
pub struct GenerationSeriesBuilder<P> {
    provider: P,
    aggregation: Aggregation,
    style: ChartStyle,
}

impl<P: GenerationSource> GenerationSeriesBuilder<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            aggregation: Aggregation::default(),
            style: ChartStyle::default(),
        }
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_style(mut self, style: ChartStyle) -> Self {
        self.style = style;
        self
    }

    /// Ranked series table for the country and lookback window, without the
    /// chart marshaling.
    pub async fn build_table(
        &self,
        country_code: &str,
        days_ago: u32,
    ) -> Result<SeriesTable, EntsoeError> {
        let raw = self.provider.query_generation(country_code, days_ago).await?;
        let table = reshape(&raw);

        let table = match self.aggregation {
            Aggregation::None => table,
            Aggregation::Categories => {
                let (table, outcome) = aggregate(table);
                if let AggregationOutcome::Skipped { missing } = &outcome {
                    tracing::warn!(?missing, "category aggregation skipped, table passed through");
                }
                table
            }
        };

        Ok(rank(table))
    }

    /// Figures for the dashboard, currently a single stacked-area chart.
    pub async fn build_figures(
        &self,
        country_code: &str,
        days_ago: u32,
    ) -> Result<Vec<ChartSpec>, EntsoeError> {
        let table = self.build_table(country_code, days_ago).await?;

        let title = match areas::primary_zone(country_code) {
            Some(zone) => format!("Generation in {}", zone.name),
            None => format!("Generation in {}", country_code),
        };

        Ok(vec![emit_chart(&table, &title, &self.style)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::RawColumn;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, day, 0, 0, 0).unwrap()
    }

    fn raw_table(columns: Vec<(&str, &str, Vec<Option<f64>>)>, n_rows: u32) -> RawSeriesTable {
        RawSeriesTable {
            index: (1..=n_rows).map(ts).collect(),
            columns: columns
                .into_iter()
                .map(|(source, attribute, values)| RawColumn {
                    source: source.to_string(),
                    attribute: attribute.to_string(),
                    values,
                })
                .collect(),
        }
    }

    fn flat_table(columns: Vec<(&str, Vec<Option<f64>>)>, n_rows: u32) -> SeriesTable {
        SeriesTable::new(
            (1..=n_rows).map(ts).collect(),
            columns
                .into_iter()
                .map(|(label, values)| SeriesColumn::new(label, values))
                .collect(),
        )
    }

    /// All nine constituents of the three category merges, one row each.
    fn all_constituents(value: f64) -> Vec<(&'static str, Vec<Option<f64>>)> {
        vec![
            ("Geothermal", vec![Some(value)]),
            ("Other renewable", vec![Some(value)]),
            ("Wind Offshore", vec![Some(value)]),
            ("Hydro Run-of-river and poundage", vec![Some(value)]),
            ("Hydro Water Reservoir", vec![Some(value)]),
            ("Fossil Oil", vec![Some(value)]),
            ("Fossil Hard coal", vec![Some(value)]),
            ("Fossil Gas", vec![Some(value)]),
            ("Other", vec![Some(value)]),
            ("Waste", vec![Some(value)]),
        ]
    }

    #[test]
    fn reshape_flattens_and_drops_consumption() {
        let raw = raw_table(
            vec![
                ("Wind Onshore", "Actual Aggregated", vec![Some(1.0), Some(2.0)]),
                ("Hydro Pumped Storage", "Actual Consumption", vec![Some(3.0), Some(4.0)]),
                ("Fossil Gas", "Actual Aggregated", vec![Some(5.0), Some(6.0)]),
            ],
            2,
        );

        let table = reshape(&raw);

        assert_eq!(table.labels(), vec!["Wind Onshore", "Fossil Gas"]);
        for label in table.labels() {
            assert!(!label.contains("Consumption"));
        }
        // values pass through untouched
        assert_eq!(
            table.column("Wind Onshore").unwrap().values,
            vec![Some(1.0), Some(2.0)]
        );
    }

    #[test]
    fn reshape_handles_empty_attribute() {
        let raw = raw_table(vec![("Solar", "", vec![Some(1.0)])], 1);
        assert_eq!(reshape(&raw).labels(), vec!["Solar"]);
    }

    #[test]
    fn reshape_is_idempotent_on_its_own_output() {
        let raw = raw_table(
            vec![
                ("Wind Onshore", "Actual Aggregated", vec![Some(1.0)]),
                ("Load", "Actual Consumption", vec![Some(2.0)]),
            ],
            1,
        );

        let once = reshape(&raw);
        // Re-enter the reshape with already-clean labels and an empty
        // attribute level.
        let reflattened = RawSeriesTable {
            index: once.index.clone(),
            columns: once
                .columns
                .iter()
                .map(|column| RawColumn {
                    source: column.label.clone(),
                    attribute: String::new(),
                    values: column.values.clone(),
                })
                .collect(),
        };
        let twice = reshape(&reflattened);

        assert_eq!(once, twice);
    }

    #[test]
    fn rank_sorts_ascending_by_std_dev() {
        let table = flat_table(
            vec![
                ("Volatile", vec![Some(0.0), Some(100.0), Some(0.0)]),
                ("Flat", vec![Some(50.0), Some(50.0), Some(50.0)]),
                ("Mild", vec![Some(49.0), Some(51.0), Some(50.0)]),
            ],
            3,
        );

        let ranked = rank(table);
        assert_eq!(ranked.labels(), vec!["Flat", "Mild", "Volatile"]);
    }

    #[test]
    fn rank_is_stable_on_ties() {
        let table = flat_table(
            vec![
                ("B", vec![Some(1.0), Some(1.0)]),
                ("A", vec![Some(2.0), Some(2.0)]),
                ("Single", vec![Some(9.0), None]),
            ],
            2,
        );

        // All three have zero dispersion (all-identical or a single
        // observation), so input order survives.
        let ranked = rank(table);
        assert_eq!(ranked.labels(), vec!["B", "A", "Single"]);
    }

    #[test]
    fn aggregation_is_atomic_when_a_constituent_is_missing() {
        let mut columns = all_constituents(10.0);
        columns.retain(|(label, _)| *label != "Fossil Oil");
        columns.push(("Nuclear", vec![Some(7.0)]));
        let table = flat_table(columns, 1);

        let (out, outcome) = aggregate(table.clone());

        assert_eq!(out, table);
        assert_eq!(
            outcome,
            AggregationOutcome::Skipped {
                missing: vec!["Fossil Oil".to_string()]
            }
        );
    }

    #[test]
    fn aggregation_merges_all_three_categories() {
        let mut columns = all_constituents(10.0);
        columns.push(("Nuclear", vec![Some(7.0)]));
        let table = flat_table(columns, 1);

        let (out, outcome) = aggregate(table);

        assert_eq!(outcome, AggregationOutcome::Applied);
        assert_eq!(
            out.labels(),
            vec![
                "Nuclear",
                "Other Renewables",
                "Fossil Oil, Fossil Gas, Hard coal",
                "Other sources"
            ]
        );
        assert_eq!(out.column("Other Renewables").unwrap().values, vec![Some(50.0)]);
        assert_eq!(
            out.column("Fossil Oil, Fossil Gas, Hard coal").unwrap().values,
            vec![Some(30.0)]
        );
        assert_eq!(out.column("Other sources").unwrap().values, vec![Some(20.0)]);
    }

    #[test]
    fn aggregation_propagates_missing_readings() {
        let mut columns = all_constituents(10.0);
        for (label, values) in &mut columns {
            if *label == "Waste" {
                *values = vec![None];
            }
        }
        let table = flat_table(columns, 1);

        let (out, outcome) = aggregate(table);
        assert_eq!(outcome, AggregationOutcome::Applied);
        assert_eq!(out.column("Other sources").unwrap().values, vec![None]);
        assert_eq!(out.column("Other Renewables").unwrap().values, vec![Some(50.0)]);
    }

    struct FixtureProvider {
        raw: RawSeriesTable,
    }

    impl GenerationSource for FixtureProvider {
        async fn query_generation(
            &self,
            _country_code: &str,
            _days_ago: u32,
        ) -> Result<RawSeriesTable, EntsoeError> {
            Ok(self.raw.clone())
        }
    }

    #[tokio::test]
    async fn end_to_end_germany_two_weeks() {
        // 15 daily rows, wind much more variable than gas
        let wind: Vec<Option<f64>> = (0..15).map(|i| Some((i as f64) * 100.0)).collect();
        let gas: Vec<Option<f64>> = (0..15).map(|i| Some(500.0 + (i % 2) as f64)).collect();
        let load: Vec<Option<f64>> = (0..15).map(|_| Some(60_000.0)).collect();

        let raw = raw_table(
            vec![
                ("Wind Onshore", "Actual Aggregated", wind.clone()),
                ("Fossil Gas", "Actual Aggregated", gas.clone()),
                ("Load", "Actual Consumption", load),
            ],
            15,
        );

        let builder = GenerationSeriesBuilder::new(FixtureProvider { raw });
        let table = builder.build_table("DE", 14).await.unwrap();

        // gas is near-flat so it stacks first, wind last
        assert_eq!(table.labels(), vec!["Fossil Gas", "Wind Onshore"]);
        assert_eq!(table.column("Fossil Gas").unwrap().values, gas);
        assert_eq!(table.column("Wind Onshore").unwrap().values, wind);

        let figures = builder.build_figures("DE", 14).await.unwrap();
        assert_eq!(figures.len(), 1);
        assert_eq!(figures[0].traces.len(), 2);
        assert_eq!(figures[0].traces[0].name, "Fossil Gas");
        assert_eq!(figures[0].traces[0].x.len(), 15);
        assert_eq!(figures[0].layout.title, "Generation in Germany");
    }

    #[tokio::test]
    async fn category_aggregation_toggle_feeds_the_chart() {
        let columns: Vec<(&str, &str, Vec<Option<f64>>)> = all_constituents(10.0)
            .into_iter()
            .map(|(label, values)| (label, "Actual Aggregated", values))
            .collect();
        let raw = raw_table(columns, 1);

        let builder = GenerationSeriesBuilder::new(FixtureProvider { raw })
            .with_aggregation(Aggregation::Categories)
            .with_style(ChartStyle::vivid());

        let table = builder.build_table("DE", 0).await.unwrap();
        assert_eq!(table.columns.len(), 3);
        assert!(table.column("Other Renewables").is_some());
        assert!(table.column("Geothermal").is_none());
    }
}
