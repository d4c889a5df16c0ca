// Library exports for askchart

pub mod config;
pub mod data;
pub mod error;
pub mod reshape;

// Chart pipeline
pub mod ir;
pub mod compiler;
pub mod vegalite;
pub mod graph;
pub mod palette;

// Conversation glue
pub mod response;
pub mod client;
pub mod session;
pub mod chat;
pub mod settings;

pub use compiler::{build_chart, render};
pub use config::{ChartConfig, ChartKind, SeriesSpec};
pub use data::Table;
pub use error::{BackendError, ConfigError, DecodeError};
pub use ir::ChartSpec;
pub use reshape::{reshape, TidyTable};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Default)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
    #[serde(rename = "vega-lite")]
    VegaLite,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
            OutputFormat::VegaLite => "vl.json",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            format: OutputFormat::Png,
        }
    }
}

/// Serialize a chart in the requested output format
pub fn render_output(chart: &ChartSpec, options: &RenderOptions) -> anyhow::Result<Vec<u8>> {
    match options.format {
        OutputFormat::VegaLite => Ok(vegalite::to_vega_lite_string(chart)?.into_bytes()),
        OutputFormat::Png | OutputFormat::Svg => graph::render_chart(chart, options),
    }
}
