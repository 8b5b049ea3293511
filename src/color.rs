use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

fn hsl_to_color32(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| hsl_to_color32((i as f32 / n as f32) * 360.0, 0.75, 0.55))
        .collect()
}

/// Sequential scale for the global view: `t = 0` dark purple, `t = 1` yellow
/// (plasma-like).
pub fn sequential(t: f64) -> Color32 {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) as f32 } else { 0.0 };
    hsl_to_color32(270.0 + 150.0 * t, 0.8, 0.25 + 0.4 * t)
}

/// Diverging scale for correlations: -1 blue, 0 light grey, +1 red.
pub fn diverging(r: f64) -> Color32 {
    let r = if r.is_finite() { r.clamp(-1.0, 1.0) as f32 } else { 0.0 };
    let hue = if r < 0.0 { 220.0 } else { 0.0 };
    hsl_to_color32(hue, 0.7 * r.abs(), 0.9 - 0.4 * r.abs())
}

// ---------------------------------------------------------------------------
// Color mapping: category name → Color32
// ---------------------------------------------------------------------------

/// Maps category names (entities, region groups) to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map from the sorted set of category names.
    pub fn new(names: &BTreeSet<String>) -> Self {
        let palette = generate_palette(names.len());
        let mapping = names.iter().cloned().zip(palette).collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a category.
    pub fn color_for(&self, name: &str) -> Color32 {
        self.mapping.get(name).copied().unwrap_or(self.default_color)
    }
}
