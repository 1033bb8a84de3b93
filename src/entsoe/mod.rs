pub(crate) mod areas;

use std::collections::{BTreeMap, HashMap};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::table::RawSeriesTable;

const BASE_URL: &str = "https://web-api.tp.entsoe.eu/api";

#[derive(Error, Debug)]
pub enum EntsoeError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("XML parsing failed: {0}")]
    XmlParsing(#[from] quick_xml::DeError),
    #[error("provider rejected the request: {0}")]
    Rejected(String),
    #[error("no bidding zone known for country code: {0}")]
    UnsupportedCountry(String),
    #[error("invalid resolution format: {0}")]
    InvalidResolution(String),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Seam between the pipeline and the data provider, so tests can swap the
/// network fetch for fixture tables.
#[allow(async_fn_in_trait)]
pub trait GenerationSource {
    /// Per-source generation for `country_code` over the closed window
    /// [today - days_ago, today], days at UTC midnight.
    async fn query_generation(
        &self,
        country_code: &str,
        days_ago: u32,
    ) -> Result<RawSeriesTable, EntsoeError>;
}

// Actual generation per production type (A75) response structure
#[derive(Debug, Deserialize)]
#[serde(rename = "GL_MarketDocument")]
pub struct GlMarketDocument {
    #[serde(rename = "mRID")]
    pub mrid: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(rename = "process.processType")]
    pub process_type: String,
    #[serde(rename = "createdDateTime")]
    pub created_date_time: String,
    #[serde(rename = "time_Period.timeInterval")]
    pub time_period_interval: TimeInterval,
    #[serde(rename = "TimeSeries", default)]
    pub time_series: Vec<TimeSeries>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimeInterval {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize)]
pub struct TimeSeries {
    #[serde(rename = "mRID")]
    pub mrid: String,
    #[serde(rename = "businessType")]
    pub business_type: String,
    #[serde(rename = "inBiddingZone_Domain.mRID")]
    pub in_bidding_zone: Option<AreaId>,
    #[serde(rename = "outBiddingZone_Domain.mRID")]
    pub out_bidding_zone: Option<AreaId>,
    #[serde(rename = "MktPSRType")]
    pub psr_type: Option<MktPsrType>,
    #[serde(rename = "quantity_Measure_Unit.name")]
    pub quantity_measure_unit: String,
    #[serde(rename = "Period")]
    pub period: Period,
}

#[derive(Debug, Deserialize)]
pub struct MktPsrType {
    #[serde(rename = "psrType")]
    pub psr_type: String,
}

#[derive(Debug, Deserialize)]
pub struct AreaId {
    #[serde(rename = "$value")]
    pub value: String,
    #[serde(rename = "@codingScheme")]
    pub coding_scheme: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Period {
    #[serde(rename = "timeInterval")]
    pub time_interval: TimeInterval,
    pub resolution: String,
    #[serde(rename = "Point")]
    pub points: Vec<Point>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Point {
    pub position: u32,
    pub quantity: f64,
}

/// Production source names for the transparency platform PSR type codes.
pub fn psr_type_name(code: &str) -> Option<&'static str> {
    Some(match code {
        "B01" => "Biomass",
        "B02" => "Fossil Brown coal/Lignite",
        "B03" => "Fossil Coal-derived gas",
        "B04" => "Fossil Gas",
        "B05" => "Fossil Hard coal",
        "B06" => "Fossil Oil",
        "B07" => "Fossil Oil shale",
        "B08" => "Fossil Peat",
        "B09" => "Geothermal",
        "B10" => "Hydro Pumped Storage",
        "B11" => "Hydro Run-of-river and poundage",
        "B12" => "Hydro Water Reservoir",
        "B13" => "Marine",
        "B14" => "Nuclear",
        "B15" => "Other renewable",
        "B16" => "Solar",
        "B17" => "Waste",
        "B18" => "Wind Offshore",
        "B19" => "Wind Onshore",
        "B20" => "Other",
        _ => return None,
    })
}

pub struct EntsoeClient {
    client: Client,
    api_key: String,
}

impl EntsoeClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Fetch actual generation per production type (A75, realised) for a
    /// bidding zone. All source types, no psrType filter.
    pub async fn fetch_actual_generation(
        &self,
        in_domain: &str,
        period_start: &str,
        period_end: &str,
    ) -> Result<GlMarketDocument, EntsoeError> {
        tracing::debug!(
            in_domain,
            period_start,
            period_end,
            "querying actual generation per type"
        );
        let url = format!(
            "{}?securityToken={}&documentType=A75&processType=A16&in_Domain={}&periodStart={}&periodEnd={}",
            BASE_URL, self.api_key, in_domain, period_start, period_end
        );

        self.fetch_and_parse(&url).await
    }

    async fn fetch_and_parse(&self, url: &str) -> Result<GlMarketDocument, EntsoeError> {
        let xml = self.client.get(url).send().await?.text().await?;

        // Rejections come back as an Acknowledgement document
        if xml.contains("<Reason>") || xml.contains("<code>") {
            return Err(EntsoeError::Rejected(xml));
        }

        let document: GlMarketDocument = quick_xml::de::from_str(&xml).map_err(|e| {
            tracing::error!(error = %e, "failed to parse generation document");
            e
        })?;

        Ok(document)
    }
}

impl GenerationSource for EntsoeClient {
    async fn query_generation(
        &self,
        country_code: &str,
        days_ago: u32,
    ) -> Result<RawSeriesTable, EntsoeError> {
        let zone = areas::primary_zone(country_code)
            .ok_or_else(|| EntsoeError::UnsupportedCountry(country_code.to_string()))?;

        let today = Utc::now().date_naive();
        let start = today - Duration::days(days_ago as i64);
        let period_start = format!("{}0000", start.format("%Y%m%d"));
        let period_end = format!("{}0000", today.format("%Y%m%d"));

        let document = self
            .fetch_actual_generation(zone.code, &period_start, &period_end)
            .await?;

        document.to_table()
    }
}

/// Parse ISO 8601 duration format (PT15M, PT30M, PT60M, etc.)
fn parse_resolution(resolution: &str) -> Result<Duration, EntsoeError> {
    // Format: PT[n]M where n is minutes
    if !resolution.starts_with("PT") || !resolution.ends_with("M") {
        return Err(EntsoeError::InvalidResolution(resolution.to_string()));
    }

    let minutes_str = &resolution[2..resolution.len() - 1];
    let minutes: i64 = minutes_str
        .parse()
        .map_err(|_| EntsoeError::InvalidResolution(resolution.to_string()))?;

    Ok(Duration::minutes(minutes))
}

fn parse_timestamp(timestamp: &str) -> Result<DateTime<Utc>, EntsoeError> {
    let normalized = if timestamp.len() == 17 && timestamp.ends_with('Z') {
        let mut s = timestamp.to_string();
        s.insert_str(16, ":00"); // add seconds
        s
    } else {
        timestamp.to_string()
    };

    DateTime::parse_from_rfc3339(&normalized)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| EntsoeError::InvalidTimestamp(timestamp.to_string()))
}

impl TimeSeries {
    /// Human-readable source name; unknown codes pass through verbatim.
    fn source_name(&self) -> String {
        match &self.psr_type {
            Some(psr) => psr_type_name(&psr.psr_type)
                .map(str::to_string)
                .unwrap_or_else(|| psr.psr_type.clone()),
            None => String::from("Unknown"),
        }
    }

    /// A series drawing from the zone (outBiddingZone set) records what the
    /// production type consumed, e.g. pumping load. Everything else is net
    /// generation.
    fn attribute(&self) -> &'static str {
        if self.out_bidding_zone.is_some() {
            "Actual Consumption"
        } else {
            "Actual Aggregated"
        }
    }
}

impl Period {
    /// Expand positions to timestamps based on period start and resolution
    pub fn timestamped_points(&self) -> Result<Vec<(DateTime<Utc>, f64)>, EntsoeError> {
        let start_time = parse_timestamp(&self.time_interval.start)?;
        let step = parse_resolution(&self.resolution)?;

        // Position starts at 1
        Ok(self
            .points
            .iter()
            .map(|point| (start_time + step * (point.position as i32 - 1), point.quantity))
            .collect())
    }
}

impl GlMarketDocument {
    /// Align every time series in the document on the union of their
    /// timestamps, one column per (source, attribute) pair. Series for the
    /// same pair (one per day in longer windows) merge into one column.
    pub fn to_table(&self) -> Result<RawSeriesTable, EntsoeError> {
        let mut order: Vec<(String, String)> = Vec::new();
        let mut by_label: HashMap<(String, String), BTreeMap<DateTime<Utc>, f64>> =
            HashMap::new();

        for series in &self.time_series {
            let label = (series.source_name(), series.attribute().to_string());
            if !by_label.contains_key(&label) {
                order.push(label.clone());
            }
            let points = by_label.entry(label).or_default();
            for (timestamp, quantity) in series.period.timestamped_points()? {
                *points.entry(timestamp).or_insert(0.0) += quantity;
            }
        }

        Ok(RawSeriesTable::from_points(
            order
                .into_iter()
                .map(|label| {
                    let points = by_label.remove(&label).unwrap_or_default();
                    (label, points)
                })
                .collect(),
        ))
    }
}
