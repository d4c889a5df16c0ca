//! Vega-Lite JSON writer
//!
//! Converts a [`ChartSpec`] into a self-contained Vega-Lite v5 document with
//! inline data, suitable for vega-embed or any Vega-Lite aware display.
//!
//! - `Mark` → `mark` (object form when the mark carries properties)
//! - `Encoding` channels → `encoding.{x,y,color,theta,text,tooltip}`
//! - `TitleBlock` → `title` as a string, or `{text, subtitle}`

use serde_json::{json, Map, Value};

use crate::ir::{ChartData, ChartSpec, Channel, Field, FieldType, Mark, Stack, TitleBlock};

pub const SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Build the Vega-Lite document for a chart
pub fn to_vega_lite(chart: &ChartSpec) -> Value {
    let mut spec = json!({
        "$schema": SCHEMA,
        "data": { "values": data_values(&chart.data) },
        "mark": mark_value(&chart.mark),
        "encoding": encoding_value(chart),
    });

    if let Some(title) = &chart.title {
        spec["title"] = title_value(title);
    }

    spec
}

/// Pretty-printed document, as written by the CLI
pub fn to_vega_lite_string(chart: &ChartSpec) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&to_vega_lite(chart))
}

fn data_values(data: &ChartData) -> Vec<Value> {
    match data {
        ChartData::Tidy(tidy) => tidy
            .rows
            .iter()
            .map(|row| Value::Object(row.to_object()))
            .collect(),
        ChartData::Notice(message) => {
            let mut row = Map::new();
            row.insert(Field::Message.name().to_string(), json!(message));
            vec![Value::Object(row)]
        }
    }
}

fn mark_value(mark: &Mark) -> Value {
    match mark {
        Mark::Line { point } => json!({ "type": mark.name(), "point": point }),
        Mark::Circle { size } => json!({ "type": mark.name(), "size": size }),
        _ => json!(mark.name()),
    }
}

fn encoding_value(chart: &ChartSpec) -> Value {
    let enc = &chart.encoding;
    let mut encoding = Map::new();

    let channels = [
        ("x", &enc.x),
        ("y", &enc.y),
        ("color", &enc.color),
        ("theta", &enc.theta),
        ("text", &enc.text),
    ];
    for (name, channel) in channels {
        if let Some(channel) = channel {
            encoding.insert(name.to_string(), channel_value(channel));
        }
    }

    if !enc.tooltip.is_empty() {
        encoding.insert(
            "tooltip".to_string(),
            Value::Array(enc.tooltip.iter().map(channel_value).collect()),
        );
    }

    Value::Object(encoding)
}

fn channel_value(channel: &Channel) -> Value {
    let field_type = match channel.field_type {
        FieldType::Nominal => "nominal",
        FieldType::Quantitative => "quantitative",
    };
    let mut value = json!({
        "field": channel.field.name(),
        "type": field_type,
    });
    if let Some(title) = &channel.title {
        value["title"] = json!(title);
    }
    if let Some(Stack::Zero) = channel.stack {
        value["stack"] = json!("zero");
    }
    value
}

fn title_value(title: &TitleBlock) -> Value {
    match &title.subtitle {
        Some(subtitle) => json!({ "text": title.text, "subtitle": subtitle }),
        None => json!(title.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{build_chart, unsupported_placeholder};
    use crate::config::{ChartConfig, SeriesSpec};
    use crate::data::Table;

    fn make_table() -> Table {
        Table::from_columns(vec![
            ("Region", vec![json!("N"), json!("S")]),
            ("Units", vec![json!(10), json!(20)]),
        ])
    }

    #[test]
    fn test_bar_document() {
        let cfg = ChartConfig::new("bar", vec![SeriesSpec::new("Region", "Units", "s1")]);
        let chart = build_chart(&make_table(), &cfg).unwrap();
        let vl = to_vega_lite(&chart);

        assert_eq!(vl["$schema"], SCHEMA);
        assert_eq!(vl["mark"], "bar");
        assert_eq!(
            vl["data"]["values"],
            json!([
                {"label": "N", "value": 10, "series": "s1"},
                {"label": "S", "value": 20, "series": "s1"}
            ])
        );
        assert_eq!(
            vl["encoding"]["x"],
            json!({"field": "label", "type": "nominal", "title": "Region"})
        );
        assert_eq!(vl["encoding"]["y"]["title"], "Units");
        assert_eq!(vl["encoding"]["tooltip"].as_array().unwrap().len(), 2);
        assert!(vl.get("title").is_none());
    }

    #[test]
    fn test_mark_properties() {
        let table = make_table();
        let series = vec![SeriesSpec::new("Region", "Units", "s1")];

        let line = to_vega_lite(&build_chart(&table, &ChartConfig::new("line", series.clone())).unwrap());
        assert_eq!(line["mark"], json!({"type": "line", "point": true}));

        let scatter = to_vega_lite(&build_chart(&table, &ChartConfig::new("scatter", series.clone())).unwrap());
        assert_eq!(scatter["mark"], json!({"type": "circle", "size": 100.0}));

        let stacked = to_vega_lite(&build_chart(&table, &ChartConfig::new("stacked_bar", series)).unwrap());
        assert_eq!(stacked["encoding"]["y"]["stack"], "zero");
        assert_eq!(stacked["encoding"]["color"]["field"], "series");
    }

    #[test]
    fn test_title_forms() {
        let table = make_table();
        let series = vec![SeriesSpec::new("Region", "Units", "s1")];

        let cfg = ChartConfig::new("pie", series.clone()).with_title("Share");
        let vl = to_vega_lite(&build_chart(&table, &cfg).unwrap());
        assert_eq!(vl["title"], "Share");
        assert_eq!(vl["mark"], "arc");
        assert_eq!(vl["encoding"]["theta"]["field"], "value");

        let cfg = ChartConfig::new("pie", series)
            .with_title("Q3 Sales")
            .with_subtitle("By Region");
        let vl = to_vega_lite(&build_chart(&table, &cfg).unwrap());
        assert_eq!(vl["title"], json!({"text": "Q3 Sales", "subtitle": "By Region"}));
    }

    #[test]
    fn test_placeholder_document() {
        let vl = to_vega_lite(&unsupported_placeholder("bubble"));
        assert_eq!(vl["mark"], "text");
        assert_eq!(
            vl["data"]["values"],
            json!([{"msg": "⚠️ unsupported chart_type: bubble"}])
        );
        assert_eq!(vl["encoding"]["text"]["field"], "msg");
    }
}
