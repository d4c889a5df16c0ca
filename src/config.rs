// Declarative chart description supplied by the backend

use serde::Deserialize;

/// Sentinel the backend sends when no grouping column applies.
const NO_GROUP: &str = "none";

/// Supported chart kinds. Anything else lands in `Unsupported`
/// and is rendered as a placeholder instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    GroupedBar,
    MultiBar,
    StackedBar,
    Pie,
    Line,
    Scatter,
    Unsupported(String),
}

impl From<String> for ChartKind {
    fn from(raw: String) -> Self {
        let lowered = raw.trim().to_lowercase();
        match lowered.as_str() {
            "bar" => ChartKind::Bar,
            "grouped_bar" => ChartKind::GroupedBar,
            "multi_bar" => ChartKind::MultiBar,
            "stacked_bar" => ChartKind::StackedBar,
            "pie" => ChartKind::Pie,
            "line" => ChartKind::Line,
            "scatter" => ChartKind::Scatter,
            _ => ChartKind::Unsupported(lowered),
        }
    }
}

impl From<&str> for ChartKind {
    fn from(raw: &str) -> Self {
        ChartKind::from(raw.to_string())
    }
}

impl Default for ChartKind {
    fn default() -> Self {
        ChartKind::Unsupported(String::new())
    }
}

/// One trace: a label column, a value column and the tag stamped on its rows
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeriesSpec {
    pub label_column: String,
    pub value_column: String,
    pub series_name: String,
}

impl SeriesSpec {
    pub fn new(label_column: &str, value_column: &str, series_name: &str) -> Self {
        Self {
            label_column: label_column.to_string(),
            value_column: value_column.to_string(),
            series_name: series_name.to_string(),
        }
    }
}

/// Complete chart configuration for one backend response.
///
/// Decoding goes through [`RawChartConfig`] so that every key spelling the
/// backend has used is accepted.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "RawChartConfig")]
pub struct ChartConfig {
    pub chart_type: ChartKind,
    pub series: Vec<SeriesSpec>,
    pub group_column: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
}

impl ChartConfig {
    pub fn new(chart_type: impl Into<ChartKind>, series: Vec<SeriesSpec>) -> Self {
        Self {
            chart_type: chart_type.into(),
            series,
            ..Default::default()
        }
    }

    pub fn with_group_column(mut self, column: &str) -> Self {
        self.group_column = Some(column.to_string());
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_subtitle(mut self, subtitle: &str) -> Self {
        self.subtitle = Some(subtitle.to_string());
        self
    }

    /// Parse a chart config from the JSON value embedded in a backend reply
    pub fn from_json(value: &serde_json::Value) -> Result<Self, crate::error::ConfigError> {
        Ok(ChartConfig::deserialize(value)?)
    }

    /// Grouping column, with the `"none"` sentinel (any case) treated as absent
    pub fn group(&self) -> Option<&str> {
        group_column_in_effect(self.group_column.as_deref())
    }

    /// First configured series; supplies default axis titles
    pub fn primary_series(&self) -> Option<&SeriesSpec> {
        self.series.first()
    }
}

/// Resolve the effective grouping column, honouring the `"none"` sentinel.
pub fn group_column_in_effect(column: Option<&str>) -> Option<&str> {
    column.filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case(NO_GROUP))
}

/// Wire form of the chart config, with every alias the backend emits.
#[derive(Debug, Default, Deserialize)]
struct RawChartConfig {
    #[serde(default)]
    chart_type: Option<String>,
    #[serde(default)]
    series: Option<Vec<SeriesSpec>>,
    #[serde(default)]
    chart_series: Option<Vec<SeriesSpec>>,
    #[serde(default)]
    multi_bar_filter_column: Option<String>,
    #[serde(default)]
    group_column: Option<String>,
    #[serde(default)]
    chart_title: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    chart_subtitle: Option<String>,
    #[serde(default)]
    subtitle: Option<String>,
}

impl From<RawChartConfig> for ChartConfig {
    fn from(raw: RawChartConfig) -> Self {
        ChartConfig {
            chart_type: ChartKind::from(raw.chart_type.unwrap_or_default()),
            series: raw.series.or(raw.chart_series).unwrap_or_default(),
            group_column: first_present(raw.multi_bar_filter_column, raw.group_column),
            title: first_present(raw.chart_title, raw.title),
            subtitle: first_present(raw.chart_subtitle, raw.subtitle),
        }
    }
}

// Empty strings count as missing
fn first_present(preferred: Option<String>, fallback: Option<String>) -> Option<String> {
    preferred
        .filter(|s| !s.is_empty())
        .or(fallback.filter(|s| !s.is_empty()))
}
