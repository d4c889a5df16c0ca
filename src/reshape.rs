// Wide result table -> long (tidy) table with canonical columns

use serde_json::{Map, Value};

use crate::config::{group_column_in_effect, SeriesSpec};
use crate::data::Table;
use crate::error::ConfigError;

pub const LABEL: &str = "label";
pub const VALUE: &str = "value";
pub const SERIES: &str = "series";
pub const GROUP: &str = "group";

/// One (category, series) observation
#[derive(Debug, Clone, PartialEq)]
pub struct TidyRow {
    pub label: Value,
    pub value: Value,
    pub series: String,
    pub group: Option<Value>,
}

impl TidyRow {
    /// JSON object form, with `group` present only when grouping is active
    pub fn to_object(&self) -> Map<String, Value> {
        let mut obj = Map::new();
        obj.insert(LABEL.to_string(), self.label.clone());
        obj.insert(VALUE.to_string(), self.value.clone());
        obj.insert(SERIES.to_string(), Value::String(self.series.clone()));
        if let Some(group) = &self.group {
            obj.insert(GROUP.to_string(), group.clone());
        }
        obj
    }
}

/// Concatenation of every series slice, in configured order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TidyTable {
    pub rows: Vec<TidyRow>,
    pub has_group: bool,
}

impl TidyTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> Vec<&'static str> {
        if self.has_group {
            vec![LABEL, VALUE, SERIES, GROUP]
        } else {
            vec![LABEL, VALUE, SERIES]
        }
    }

    /// Series names in order of first appearance
    pub fn series_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !names.contains(&row.series.as_str()) {
                names.push(&row.series);
            }
        }
        names
    }
}

/// Melt `table` into one slice per series and stack the slices.
///
/// Fails when no series is configured or when any referenced column is
/// missing from the table.
pub fn reshape(
    table: &Table,
    series_list: &[SeriesSpec],
    group_column: Option<&str>,
) -> Result<TidyTable, ConfigError> {
    if series_list.is_empty() {
        return Err(ConfigError::NoSeries);
    }

    let group_col = group_column_in_effect(group_column);
    let groups = match group_col {
        Some(col) => Some(table.column(col)?),
        None => None,
    };

    let mut rows = Vec::with_capacity(table.len() * series_list.len());
    for spec in series_list {
        let labels = table.column(&spec.label_column)?;
        let values = table.column(&spec.value_column)?;

        for (i, (label, value)) in labels.into_iter().zip(values).enumerate() {
            rows.push(TidyRow {
                label: label.clone(),
                value: value.clone(),
                series: spec.series_name.clone(),
                group: groups.as_ref().map(|g| g[i].clone()),
            });
        }
    }

    Ok(TidyTable {
        rows,
        has_group: group_col.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_table() -> Table {
        Table::from_columns(vec![
            ("Region", vec![json!("N"), json!("S")]),
            ("Units", vec![json!(10), json!(20)]),
            ("Revenue", vec![json!(1.5), json!(2.5)]),
            ("Category", vec![json!("A"), json!("B")]),
        ])
    }

    #[test]
    fn test_reshape_single_series() {
        let table = make_table();
        let tidy = reshape(&table, &[SeriesSpec::new("Region", "Units", "s1")], None).unwrap();

        assert_eq!(
            tidy.rows,
            vec![
                TidyRow { label: json!("N"), value: json!(10), series: "s1".into(), group: None },
                TidyRow { label: json!("S"), value: json!(20), series: "s1".into(), group: None },
            ]
        );
        assert_eq!(tidy.columns(), vec!["label", "value", "series"]);
    }

    #[test]
    fn test_reshape_preserves_series_order() {
        let table = make_table();
        let series = vec![
            SeriesSpec::new("Region", "Revenue", "revenue"),
            SeriesSpec::new("Region", "Units", "units"),
        ];
        let tidy = reshape(&table, &series, None).unwrap();

        assert_eq!(tidy.len(), table.len() * series.len());
        let tags: Vec<&str> = tidy.rows.iter().map(|r| r.series.as_str()).collect();
        assert_eq!(tags, vec!["revenue", "revenue", "units", "units"]);
        assert_eq!(tidy.series_names(), vec!["revenue", "units"]);
        assert_eq!(tidy.rows[2].value, json!(10));
    }

    #[test]
    fn test_reshape_with_group_column() {
        let table = make_table();
        let tidy = reshape(
            &table,
            &[SeriesSpec::new("Region", "Units", "s1")],
            Some("Category"),
        )
        .unwrap();

        assert!(tidy.has_group);
        assert_eq!(tidy.rows[0].group, Some(json!("A")));
        assert_eq!(tidy.rows[1].group, Some(json!("B")));
        assert!(tidy.rows[0].to_object().contains_key("group"));
    }

    #[test]
    fn test_reshape_none_group_adds_no_column() {
        let table = make_table();
        for sentinel in ["none", "NoNe"] {
            let tidy = reshape(
                &table,
                &[SeriesSpec::new("Region", "Units", "s1")],
                Some(sentinel),
            )
            .unwrap();
            assert!(!tidy.has_group);
            assert!(tidy.rows.iter().all(|r| r.group.is_none()));
            assert!(!tidy.rows[0].to_object().contains_key("group"));
        }
    }

    #[test]
    fn test_reshape_empty_series_fails() {
        let table = make_table();
        let res = reshape(&table, &[], None);
        assert!(matches!(res, Err(ConfigError::NoSeries)));
    }

    #[test]
    fn test_reshape_missing_columns_fail() {
        let table = make_table();

        let res = reshape(&table, &[SeriesSpec::new("Region", "Profit", "s1")], None);
        match res {
            Err(ConfigError::MissingColumn { column }) => assert_eq!(column, "Profit"),
            other => panic!("Expected MissingColumn, got {:?}", other),
        }

        let res = reshape(
            &table,
            &[SeriesSpec::new("Region", "Units", "s1")],
            Some("Segment"),
        );
        assert!(matches!(res, Err(ConfigError::MissingColumn { .. })));
    }
}
