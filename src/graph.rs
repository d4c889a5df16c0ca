use anyhow::{bail, Context, Result};
use image::ImageEncoder;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::collections::HashMap;
use std::f64::consts::PI;

use crate::data::{cell_number, cell_text};
use crate::ir::{ChartData, ChartSpec, Field, Mark, TitleBlock};
use crate::palette::ColorPalette;
use crate::reshape::{TidyRow, TidyTable};
use crate::{OutputFormat, RenderOptions};

/// Fraction of a category slot covered by bars
const BAR_WIDTH: f64 = 0.8;

// =============================================================================
// Layout (pure geometry, no drawing)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BarMode {
    /// Bars drawn on top of each other at the category centre
    Overlay,
    /// Side by side, one slot per colour key present at the category
    Dodge,
    /// Cumulative from a zero baseline
    Stack,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarRect {
    pub key: String,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    /// Angles in radians, clockwise from twelve o'clock
    pub start: f64,
    pub end: f64,
}

/// Distinct category labels. Sorted numerically when every label is
/// numeric, lexicographically otherwise.
pub fn categories(tidy: &TidyTable) -> Vec<String> {
    let mut cats: Vec<String> = Vec::new();
    for row in &tidy.rows {
        let text = cell_text(&row.label);
        if !cats.contains(&text) {
            cats.push(text);
        }
    }

    let all_numeric = cats.iter().all(|s| s.parse::<f64>().is_ok());
    if all_numeric {
        cats.sort_by(|a, b| {
            let fa = a.parse::<f64>().unwrap_or(0.0);
            let fb = b.parse::<f64>().unwrap_or(0.0);
            fa.partial_cmp(&fb).unwrap_or(std::cmp::Ordering::Equal)
        });
    } else {
        cats.sort();
    }
    cats
}

/// Legend key of a row for the given colour field
fn color_key(row: &TidyRow, field: Option<Field>) -> String {
    match field {
        Some(Field::Label) => cell_text(&row.label),
        Some(Field::Series) => row.series.clone(),
        Some(Field::Group) => row.group.as_ref().map(cell_text).unwrap_or_default(),
        _ => String::new(),
    }
}

/// Sorted distinct colour keys
pub fn color_keys(tidy: &TidyTable, field: Option<Field>) -> Vec<String> {
    let mut keys: Vec<String> = tidy.rows.iter().map(|r| color_key(r, field)).collect();
    keys.sort();
    keys.dedup();
    keys
}

/// Compute bar rectangles in category-index coordinates.
/// Category `i` is centred on `i` and spans `[i - 0.5, i + 0.5)`.
/// Rows without a numeric value are skipped.
pub fn layout_bars(
    tidy: &TidyTable,
    categories: &[String],
    color: Option<Field>,
    mode: BarMode,
) -> Vec<BarRect> {
    let index: HashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    let keys = color_keys(tidy, color);

    // Category -> sorted keys present there
    let mut occupancy: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut points: Vec<(usize, usize, f64)> = Vec::new();
    for row in &tidy.rows {
        let Some(value) = cell_number(&row.value) else {
            continue;
        };
        let Some(&cat) = index.get(cell_text(&row.label).as_str()) else {
            continue;
        };
        let key = color_key(row, color);
        let rank = keys.iter().position(|k| *k == key).unwrap_or(0);
        occupancy.entry(cat).or_default().push(rank);
        points.push((cat, rank, value));
    }
    for ranks in occupancy.values_mut() {
        ranks.sort();
        ranks.dedup();
    }

    // Stack in key order so colours keep the same position in every column
    if mode == BarMode::Stack {
        points.sort_by_key(|&(cat, rank, _)| (cat, rank));
    }

    let mut stack_tops: HashMap<usize, f64> = HashMap::new();
    points
        .into_iter()
        .map(|(cat, rank, value)| {
            let centre = cat as f64;
            let (x0, x1) = match mode {
                BarMode::Dodge => {
                    let present = &occupancy[&cat];
                    let slot = BAR_WIDTH / present.len() as f64;
                    let pos = present.iter().position(|&r| r == rank).unwrap_or(0);
                    let offset = (pos as f64 - (present.len() as f64 - 1.0) / 2.0) * slot;
                    (centre + offset - slot / 2.0, centre + offset + slot / 2.0)
                }
                _ => (centre - BAR_WIDTH / 2.0, centre + BAR_WIDTH / 2.0),
            };
            let (y0, y1) = if mode == BarMode::Stack {
                let base = stack_tops.get(&cat).copied().unwrap_or(0.0);
                stack_tops.insert(cat, base + value);
                (base, base + value)
            } else {
                (0.0, value)
            };
            BarRect {
                key: keys[rank].clone(),
                x0,
                x1,
                y0,
                y1,
            }
        })
        .collect()
}

/// Aggregate values per label (first-appearance order) into pie slices.
/// Non-positive and non-numeric values take no angle.
pub fn pie_slices(tidy: &TidyTable) -> Vec<PieSlice> {
    let mut totals: Vec<(String, f64)> = Vec::new();
    for row in &tidy.rows {
        let value = match cell_number(&row.value) {
            Some(v) if v > 0.0 => v,
            _ => continue,
        };
        let label = cell_text(&row.label);
        match totals.iter_mut().find(|(l, _)| *l == label) {
            Some((_, total)) => *total += value,
            None => totals.push((label, value)),
        }
    }

    let sum: f64 = totals.iter().map(|(_, v)| v).sum();
    let mut angle = 0.0;
    totals
        .into_iter()
        .map(|(label, value)| {
            let sweep = if sum > 0.0 { value / sum * 2.0 * PI } else { 0.0 };
            let slice = PieSlice {
                label,
                value,
                start: angle,
                end: angle + sweep,
            };
            angle += sweep;
            slice
        })
        .collect()
}

/// Y range covering zero and every bar, padded by 5%
fn value_range(lows: impl Iterator<Item = f64>, highs: impl Iterator<Item = f64>) -> (f64, f64) {
    let min = lows.fold(0.0_f64, f64::min);
    let max = highs.fold(0.0_f64, f64::max);
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (if min < 0.0 { min - padding } else { min }, max + padding)
    }
}

// =============================================================================
// Drawing
// =============================================================================

/// Bytes of an RGB8 bitmap of the given size
fn rgb_buffer_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

/// Render a chart to PNG or SVG bytes
pub fn render_chart(chart: &ChartSpec, options: &RenderOptions) -> Result<Vec<u8>> {
    let (width, height) = (options.width, options.height);
    match options.format {
        OutputFormat::Png => {
            let mut buffer = vec![0u8; rgb_buffer_len(width, height)];
            {
                let root = BitMapBackend::with_buffer(&mut buffer, (width, height))
                    .into_drawing_area();
                draw_chart(root, chart)?;
            }

            let mut png_bytes = Vec::new();
            image::codecs::png::PngEncoder::new(&mut png_bytes)
                .write_image(&buffer, width, height, image::ColorType::Rgb8)
                .context("Failed to encode PNG")?;
            Ok(png_bytes)
        }
        OutputFormat::Svg => {
            let mut svg = String::new();
            {
                let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
                draw_chart(root, chart)?;
            }
            Ok(svg.into_bytes())
        }
        OutputFormat::VegaLite => bail!("Vega-Lite output is not drawn by the plotters backend"),
    }
}

fn draw_chart<DB>(root: DrawingArea<DB, Shift>, chart: &ChartSpec) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;
    let area = apply_titles(&root, chart.title.as_ref())?;

    match (&chart.data, chart.mark) {
        (ChartData::Notice(message), _) => draw_notice(&area, message)?,
        (ChartData::Tidy(tidy), Mark::Arc) => draw_pie(&area, tidy)?,
        (ChartData::Tidy(tidy), Mark::Bar) => draw_bars(&area, chart, tidy)?,
        (ChartData::Tidy(tidy), Mark::Line { point }) => {
            draw_trend(&area, chart, tidy, true, if point { 3 } else { 0 })?
        }
        (ChartData::Tidy(tidy), Mark::Circle { size }) => {
            let radius = (size / PI).sqrt().round() as i32;
            draw_trend(&area, chart, tidy, false, radius)?
        }
        (ChartData::Tidy(_), Mark::Text) => bail!("Text marks need a notice message"),
    }

    root.present().context("Failed to present drawing")?;
    Ok(())
}

fn apply_titles<DB>(
    root: &DrawingArea<DB, Shift>,
    title: Option<&TitleBlock>,
) -> Result<DrawingArea<DB, Shift>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let mut area = root.clone();
    if let Some(title) = title {
        if !title.text.is_empty() {
            area = area
                .titled(&title.text, ("sans-serif", 22))
                .context("Failed to draw title")?;
        }
        if let Some(subtitle) = &title.subtitle {
            area = area
                .titled(subtitle, ("sans-serif", 15))
                .context("Failed to draw subtitle")?;
        }
    }
    Ok(area)
}

fn draw_notice<DB>(area: &DrawingArea<DB, Shift>, message: &str) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (_, height) = area.dim_in_pixel();
    area.draw(&Text::new(
        message,
        (20, height as i32 / 2),
        ("sans-serif", 20),
    ))
    .context("Failed to draw notice")?;
    Ok(())
}

fn draw_pie<DB>(area: &DrawingArea<DB, Shift>, tidy: &TidyTable) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let slices = pie_slices(tidy);
    if slices.is_empty() {
        return draw_notice(area, "No positive values to chart");
    }

    let (width, height) = area.dim_in_pixel();
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    let radius = width.min(height) as f64 * 0.38;
    let palette = ColorPalette::tableau10();

    for (i, slice) in slices.iter().enumerate() {
        let steps = ((slice.end - slice.start) / (PI / 90.0)).ceil().max(1.0) as usize;
        let mut points = vec![(cx as i32, cy as i32)];
        for s in 0..=steps {
            let theta = slice.start + (slice.end - slice.start) * s as f64 / steps as f64;
            points.push((
                (cx + radius * theta.sin()).round() as i32,
                (cy - radius * theta.cos()).round() as i32,
            ));
        }
        area.draw(&Polygon::new(points, palette.color_at(i).filled()))
            .context("Failed to draw pie slice")?;

        // Legend entry
        let y = 12 + i as i32 * 20;
        area.draw(&Rectangle::new(
            [(12, y), (24, y + 12)],
            palette.color_at(i).filled(),
        ))
        .context("Failed to draw legend swatch")?;
        area.draw(&Text::new(slice.label.as_str(), (30, y), ("sans-serif", 14)))
            .context("Failed to draw legend label")?;
    }

    Ok(())
}

fn draw_bars<DB>(area: &DrawingArea<DB, Shift>, chart: &ChartSpec, tidy: &TidyTable) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let cats = categories(tidy);
    if cats.is_empty() {
        return draw_notice(area, "No rows to chart");
    }

    let color = chart.color_field();
    let mode = if chart.is_stacked() {
        BarMode::Stack
    } else if color.is_some() {
        BarMode::Dodge
    } else {
        BarMode::Overlay
    };
    let rects = layout_bars(tidy, &cats, color, mode);
    let (y_min, y_max) = value_range(
        rects.iter().map(|r| r.y0.min(r.y1)),
        rects.iter().map(|r| r.y0.max(r.y1)),
    );

    let mut cc = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(category_range(&cats), y_min..y_max)
        .context("Failed to build chart")?;

    cc.configure_mesh()
        .disable_x_mesh()
        .x_labels(cats.len())
        .x_label_formatter(&|x| category_at(&cats, *x))
        .x_desc(chart.x_title().unwrap_or_default())
        .y_desc(chart.y_title().unwrap_or_default())
        .draw()
        .context("Failed to draw mesh")?;

    let palette = ColorPalette::tableau10();
    let keys = color_keys(tidy, color);
    for (i, key) in keys.iter().enumerate() {
        let fill = if color.is_some() {
            palette.color_at(i)
        } else {
            palette.color_at(0)
        };
        let series = cc
            .draw_series(
                rects
                    .iter()
                    .filter(|r| r.key == *key)
                    .map(|r| Rectangle::new([(r.x0, r.y1), (r.x1, r.y0)], fill.filled())),
            )
            .context("Failed to draw bars")?;
        if color.is_some() {
            series
                .label(key.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], fill.filled()));
        }
    }

    if color.is_some() {
        draw_legend(&mut cc)?;
    }
    Ok(())
}

/// Line and scatter charts: one trace per colour key
fn draw_trend<DB>(
    area: &DrawingArea<DB, Shift>,
    chart: &ChartSpec,
    tidy: &TidyTable,
    connect: bool,
    point_radius: i32,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let cats = categories(tidy);
    if cats.is_empty() {
        return draw_notice(area, "No rows to chart");
    }
    let index: HashMap<&str, usize> = cats.iter().enumerate().map(|(i, c)| (c.as_str(), i)).collect();

    let color = chart.color_field();
    let keys = color_keys(tidy, color);
    let mut traces: Vec<Vec<(f64, f64)>> = vec![Vec::new(); keys.len()];
    for row in &tidy.rows {
        let (Some(y), Some(&cat)) = (cell_number(&row.value), index.get(cell_text(&row.label).as_str()))
        else {
            continue;
        };
        let key = color_key(row, color);
        if let Some(k) = keys.iter().position(|c| *c == key) {
            traces[k].push((cat as f64, y));
        }
    }
    for trace in &mut traces {
        trace.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    }

    let (y_min, y_max) = value_range(
        traces.iter().flatten().map(|p| p.1),
        traces.iter().flatten().map(|p| p.1),
    );

    let mut cc = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(category_range(&cats), y_min..y_max)
        .context("Failed to build chart")?;

    cc.configure_mesh()
        .x_labels(cats.len())
        .x_label_formatter(&|x| category_at(&cats, *x))
        .x_desc(chart.x_title().unwrap_or_default())
        .y_desc(chart.y_title().unwrap_or_default())
        .draw()
        .context("Failed to draw mesh")?;

    let palette = ColorPalette::tableau10();
    for (k, (key, trace)) in keys.iter().zip(traces).enumerate() {
        let stroke = palette.color_at(k);
        if connect {
            cc.draw_series(LineSeries::new(trace.clone(), stroke.stroke_width(2)))
                .context("Failed to draw line series")?;
        }
        let series = cc
            .draw_series(
                trace
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), point_radius, stroke.filled())),
            )
            .context("Failed to draw point series")?;
        if color.is_some() {
            series
                .label(key.as_str())
                .legend(move |(x, y)| Circle::new((x + 5, y), 4, stroke.filled()));
        }
    }

    if color.is_some() {
        draw_legend(&mut cc)?;
    }
    Ok(())
}

fn draw_legend<'a, DB>(
    cc: &mut ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
{
    cc.configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .context("Failed to draw legend")?;
    Ok(())
}

/// X range with every category centred on an integer tick
fn category_range(categories: &[String]) -> std::ops::Range<f64> {
    -0.5..categories.len() as f64 - 0.5
}

/// Axis label for a tick; ticks between category centres stay blank
fn category_at(categories: &[String], x: f64) -> String {
    let nearest = x.round();
    if nearest < 0.0 || (x - nearest).abs() > 1e-6 {
        return String::new();
    }
    categories.get(nearest as usize).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(label: &str, value: f64, series: &str) -> TidyRow {
        TidyRow {
            label: json!(label),
            value: json!(value),
            series: series.to_string(),
            group: None,
        }
    }

    fn make_tidy() -> TidyTable {
        TidyTable {
            rows: vec![
                row("S", 20.0, "units"),
                row("N", 10.0, "units"),
                row("S", 5.0, "cost"),
                row("N", 4.0, "cost"),
            ],
            has_group: false,
        }
    }

    #[test]
    fn test_categories_sorted() {
        assert_eq!(categories(&make_tidy()), vec!["N", "S"]);

        let numeric = TidyTable {
            rows: vec![row("10", 1.0, "a"), row("9", 2.0, "a"), row("100", 3.0, "a")],
            has_group: false,
        };
        assert_eq!(categories(&numeric), vec!["9", "10", "100"]);
    }

    #[test]
    fn test_layout_dodge() {
        let tidy = make_tidy();
        let cats = categories(&tidy);
        let rects = layout_bars(&tidy, &cats, Some(Field::Series), BarMode::Dodge);

        assert_eq!(rects.len(), 4);
        // "cost" sorts before "units", so it takes the left slot
        let cost_n = rects.iter().find(|r| r.key == "cost" && r.x0 < 0.5).unwrap();
        let units_n = rects.iter().find(|r| r.key == "units" && r.x0 < 0.5).unwrap();
        assert!((cost_n.x0 + 0.4).abs() < 1e-9);
        assert!(cost_n.x1.abs() < 1e-9);
        assert!(units_n.x0.abs() < 1e-9);
        assert!((units_n.x1 - 0.4).abs() < 1e-9);
        assert_eq!(units_n.y1, 10.0);
    }

    #[test]
    fn test_layout_stack() {
        let tidy = make_tidy();
        let cats = categories(&tidy);
        let rects = layout_bars(&tidy, &cats, Some(Field::Series), BarMode::Stack);

        let s_units = rects.iter().find(|r| r.key == "units" && r.x0 > 0.5).unwrap();
        let s_cost = rects.iter().find(|r| r.key == "cost" && r.x0 > 0.5).unwrap();
        assert_eq!((s_cost.y0, s_cost.y1), (0.0, 5.0));
        assert_eq!((s_units.y0, s_units.y1), (5.0, 25.0));
    }

    #[test]
    fn test_layout_skips_non_numeric() {
        let mut tidy = make_tidy();
        tidy.rows.push(TidyRow {
            label: json!("N"),
            value: json!("n/a"),
            series: "units".into(),
            group: None,
        });
        let cats = categories(&tidy);
        assert_eq!(layout_bars(&tidy, &cats, None, BarMode::Overlay).len(), 4);
    }

    #[test]
    fn test_pie_slices() {
        let tidy = TidyTable {
            rows: vec![row("A", 1.0, "s"), row("B", 3.0, "s"), row("A", 0.0, "s")],
            has_group: false,
        };
        let slices = pie_slices(&tidy);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].label, "A");
        assert!((slices[0].end - PI / 2.0).abs() < 1e-9);
        assert!((slices[1].end - 2.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn test_value_range_includes_zero() {
        let (lo, hi) = value_range([5.0, 10.0].into_iter(), [5.0, 10.0].into_iter());
        assert_eq!(lo, 0.0);
        assert!((hi - 10.5).abs() < 1e-9);

        let (lo, hi) = value_range(std::iter::empty(), std::iter::empty());
        assert_eq!((lo, hi), (-1.0, 1.0));
    }

    #[test]
    fn test_rgb_buffer_len_does_not_wrap() {
        assert_eq!(rgb_buffer_len(800, 600), 1_440_000);
        assert_eq!(rgb_buffer_len(40_000, 40_000), 4_800_000_000);
    }

    fn is_png(bytes: &[u8]) -> bool {
        bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
    }

    fn zero_pie() -> ChartSpec {
        let table = crate::data::Table::from_columns(vec![
            ("Status", vec![json!("Open"), json!("Closed")]),
            ("Count", vec![json!(0), json!(0)]),
        ]);
        let config = crate::config::ChartConfig::new(
            "pie",
            vec![crate::config::SeriesSpec::new("Status", "Count", "Count")],
        );
        crate::compiler::build_chart(&table, &config).unwrap()
    }

    #[test]
    fn test_zero_valued_pie_renders_notice() {
        let chart = zero_pie();
        let png = render_chart(&chart, &RenderOptions::default()).unwrap();
        assert!(is_png(&png));

        let options = RenderOptions {
            format: OutputFormat::Svg,
            ..RenderOptions::default()
        };
        let svg = String::from_utf8(render_chart(&chart, &options).unwrap()).unwrap();
        assert!(svg.contains("No positive values to chart"));
    }

    #[test]
    fn test_category_at() {
        let cats = vec!["A".to_string(), "B".to_string()];
        assert_eq!(category_at(&cats, 0.0), "A");
        assert_eq!(category_at(&cats, 1.0), "B");
        assert_eq!(category_at(&cats, 0.5), "");
        assert_eq!(category_at(&cats, 1.4), "");
        assert_eq!(category_at(&cats, 2.0), "");
        assert_eq!(category_at(&cats, -0.5), "");
        assert_eq!(category_range(&cats), -0.5..1.5);
    }
}
