//! Discrete qualitative colour classes for range readings.

use plotters::style::RGBColor;

/// ColorBrewer "Set1", nine classes.
const SET1: [RGBColor; 9] = [
    RGBColor(0xe4, 0x1a, 0x1c),
    RGBColor(0x37, 0x7e, 0xb8),
    RGBColor(0x4d, 0xaf, 0x4a),
    RGBColor(0x98, 0x4e, 0xa3),
    RGBColor(0xff, 0x7f, 0x00),
    RGBColor(0xff, 0xff, 0x33),
    RGBColor(0xa6, 0x56, 0x28),
    RGBColor(0xf7, 0x81, 0xbf),
    RGBColor(0x99, 0x99, 0x99),
];

/// Splits a value range into equal-width classes, one colour each.
#[derive(Clone, Copy, Debug)]
pub struct QualitativePalette {
    colors: &'static [RGBColor],
}

impl Default for QualitativePalette {
    fn default() -> Self {
        Self::set1()
    }
}

impl QualitativePalette {
    /// The nine-class Set1 palette.
    pub const fn set1() -> Self {
        Self { colors: &SET1 }
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always false; a palette has at least one class.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Class of `value` within `[min, max]`. A degenerate range maps everything to class 0.
    pub fn class_of(&self, value: f64, min: f64, max: f64) -> usize {
        let span = max - min;
        if span <= 0.0 || !span.is_finite() {
            return 0;
        }
        let t = ((value - min) / span).clamp(0.0, 1.0);
        ((t * self.len() as f64).floor() as usize).min(self.len() - 1)
    }

    /// Colour of class `class`.
    pub fn color(&self, class: usize) -> RGBColor {
        self.colors[class.min(self.len() - 1)]
    }

    /// Colour of `value` within `[min, max]`.
    pub fn color_of(&self, value: f64, min: f64, max: f64) -> RGBColor {
        self.color(self.class_of(value, min, max))
    }

    /// Lower bound, upper bound and colour of every class, bottom to top.
    pub fn bands(&self, min: f64, max: f64) -> Vec<(f64, f64, RGBColor)> {
        let step = (max - min) / self.len() as f64;
        self.colors
            .iter()
            .enumerate()
            .map(|(i, color)| (min + step * i as f64, min + step * (i + 1) as f64, *color))
            .collect()
    }
}
