use plotters::style::RGBColor;
use std::collections::HashMap;

/// Categorical colour palette, assigned to keys in order and cycled
#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<RGBColor>,
}

impl ColorPalette {
    /// Tableau-10, the Vega-Lite default categorical scheme
    pub fn tableau10() -> Self {
        let colors = [
            0x4c78a8, 0xf58518, 0xe45756, 0x72b7b2, 0x54a24b,
            0xeeca3b, 0xb279a2, 0xff9da6, 0x9d755d, 0xbab0ac,
        ]
        .iter()
        .map(|&hex| hex_to_rgb(hex))
        .collect();
        Self { colors }
    }

    pub fn color_at(&self, index: usize) -> RGBColor {
        self.colors[index % self.colors.len()]
    }

    pub fn assign_colors(&self, keys: &[String]) -> HashMap<String, RGBColor> {
        keys.iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), self.color_at(i)))
            .collect()
    }
}

fn hex_to_rgb(hex: u32) -> RGBColor {
    RGBColor(
        ((hex >> 16) & 0xff) as u8,
        ((hex >> 8) & 0xff) as u8,
        (hex & 0xff) as u8,
    )
}
