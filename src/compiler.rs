use tracing::{debug, warn};

use crate::config::{ChartConfig, ChartKind};
use crate::data::Table;
use crate::error::ConfigError;
use crate::ir::{ChartData, ChartSpec, Channel, Encoding, Field, Mark, Stack, TitleBlock};
use crate::reshape::{reshape, TidyTable};

/// Circle area used for scatter marks
const SCATTER_POINT_SIZE: f64 = 100.0;

/// Reshape `table` per `config` and compile the result into a chart.
///
/// Unsupported kinds short-circuit to the placeholder before reshaping.
pub fn build_chart(table: &Table, config: &ChartConfig) -> Result<ChartSpec, ConfigError> {
    if let ChartKind::Unsupported(kind) = &config.chart_type {
        warn!(chart_type = %kind, "unsupported chart type, rendering placeholder");
        return Ok(unsupported_placeholder(kind));
    }

    let tidy = reshape(table, &config.series, config.group())?;
    debug!(rows = tidy.len(), series = config.series.len(), "reshaped result table");
    Ok(render(tidy, config))
}

/// Compile a tidy table into a chart spec for the configured kind
pub fn render(tidy: TidyTable, config: &ChartConfig) -> ChartSpec {
    let (mark, encoding) = match &config.chart_type {
        ChartKind::Bar => bar(config),
        ChartKind::GroupedBar | ChartKind::MultiBar => grouped_bar(config),
        ChartKind::StackedBar => stacked_bar(config),
        ChartKind::Pie => pie(),
        ChartKind::Line => line(config),
        ChartKind::Scatter => scatter(config),
        ChartKind::Unsupported(kind) => return unsupported_placeholder(kind),
    };

    ChartSpec {
        mark,
        encoding,
        title: title_block(config),
        data: ChartData::Tidy(tidy),
    }
}

/// Text-only chart standing in for a kind we cannot draw
pub fn unsupported_placeholder(kind: &str) -> ChartSpec {
    ChartSpec {
        mark: Mark::Text,
        encoding: Encoding {
            text: Some(Channel::nominal(Field::Message)),
            ..Default::default()
        },
        title: None,
        data: ChartData::Notice(format!("⚠️ unsupported chart_type: {}", kind)),
    }
}

// x/y axes titled after the first series' columns
fn label_value_axes(config: &ChartConfig) -> (Channel, Channel) {
    let mut x = Channel::nominal(Field::Label);
    let mut y = Channel::quantitative(Field::Value);
    if let Some(first) = config.primary_series() {
        x = x.titled(&first.label_column);
        y = y.titled(&first.value_column);
    }
    (x, y)
}

fn color_by(field: Field) -> Channel {
    Channel::nominal(field).titled(field.name())
}

fn series_value_tooltip() -> Vec<Channel> {
    vec![
        Channel::nominal(Field::Series),
        Channel::quantitative(Field::Value),
    ]
}

fn bar(config: &ChartConfig) -> (Mark, Encoding) {
    let (x, y) = label_value_axes(config);
    let encoding = Encoding {
        x: Some(x),
        y: Some(y),
        tooltip: vec![
            Channel::nominal(Field::Label),
            Channel::quantitative(Field::Value),
        ],
        ..Default::default()
    };
    (Mark::Bar, encoding)
}

fn grouped_bar(config: &ChartConfig) -> (Mark, Encoding) {
    let (x, y) = label_value_axes(config);
    let color_field = if config.group().is_some() {
        Field::Group
    } else {
        Field::Series
    };
    let encoding = Encoding {
        x: Some(x),
        y: Some(y),
        color: Some(color_by(color_field)),
        tooltip: series_value_tooltip(),
        ..Default::default()
    };
    (Mark::Bar, encoding)
}

fn stacked_bar(config: &ChartConfig) -> (Mark, Encoding) {
    let (x, y) = label_value_axes(config);
    let encoding = Encoding {
        x: Some(x),
        y: Some(y.stacked(Stack::Zero)),
        color: Some(color_by(Field::Series)),
        tooltip: series_value_tooltip(),
        ..Default::default()
    };
    (Mark::Bar, encoding)
}

fn pie() -> (Mark, Encoding) {
    let encoding = Encoding {
        theta: Some(Channel::quantitative(Field::Value)),
        color: Some(Channel::nominal(Field::Label)),
        tooltip: vec![
            Channel::nominal(Field::Label),
            Channel::quantitative(Field::Value),
        ],
        ..Default::default()
    };
    (Mark::Arc, encoding)
}

fn line(config: &ChartConfig) -> (Mark, Encoding) {
    let (x, y) = label_value_axes(config);
    let encoding = Encoding {
        x: Some(x),
        y: Some(y),
        color: Some(color_by(Field::Series)),
        ..Default::default()
    };
    (Mark::Line { point: true }, encoding)
}

fn scatter(config: &ChartConfig) -> (Mark, Encoding) {
    let (x, y) = label_value_axes(config);
    let encoding = Encoding {
        x: Some(x),
        y: Some(y),
        color: Some(color_by(Field::Series)),
        tooltip: series_value_tooltip(),
        ..Default::default()
    };
    (Mark::Circle { size: SCATTER_POINT_SIZE }, encoding)
}

/// A subtitle always comes paired with title text, empty if no title was given
fn title_block(config: &ChartConfig) -> Option<TitleBlock> {
    match (&config.title, &config.subtitle) {
        (title, Some(subtitle)) => Some(TitleBlock {
            text: title.clone().unwrap_or_default(),
            subtitle: Some(subtitle.clone()),
        }),
        (Some(title), None) => Some(TitleBlock {
            text: title.clone(),
            subtitle: None,
        }),
        (None, None) => None,
    }
}
