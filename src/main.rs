mod chart;
mod entsoe;
mod pipeline;
mod table;

use anyhow::{Context, Result};

use crate::chart::ChartStyle;
use crate::entsoe::EntsoeClient;
use crate::pipeline::{Aggregation, GenerationSeriesBuilder};

/// Usage: genmix-rs [country] [days] [--categories]
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let api_key = std::env::var("ENTSOE_API_KEY")
        .context("ENTSOE_API_KEY environment variable not set")?;

    let mut aggregation = Aggregation::None;
    let mut positional = Vec::new();
    for arg in std::env::args().skip(1) {
        if arg == "--categories" {
            aggregation = Aggregation::Categories;
        } else {
            positional.push(arg);
        }
    }
    let country = positional.first().map(String::as_str).unwrap_or("DE");
    let days: u32 = match positional.get(1) {
        Some(raw) => raw.parse().context("days must be a non-negative integer")?,
        None => 14,
    };

    if entsoe::areas::primary_zone(country).is_none() {
        anyhow::bail!(
            "unsupported country code {country}; known codes: {}",
            entsoe::areas::supported_countries().join(", ")
        );
    }

    let builder = GenerationSeriesBuilder::new(EntsoeClient::new(api_key))
        .with_aggregation(aggregation)
        .with_style(ChartStyle::prism());

    let figures = builder.build_figures(country, days).await?;
    for figure in &figures {
        println!("{}", figure.to_plotly().to_json());
    }

    Ok(())
}
