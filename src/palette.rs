// Series colors
//
// Each observed series gets a dark color drawn from a generator seeded by
// its index, so the same index always yields the same color. Estimates reuse
// the hue at a lighter tone. The reference line is a fixed grey.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

pub const REFERENCE_COLOR: Rgb = Rgb::new(0xAA, 0xAA, 0xAA);

/// Lightness bump applied to estimate colors
const ESTIMATE_LIGHTEN: f64 = 0.25;

/// (hue, saturation, lightness) for a series index
fn series_hsl(index: usize) -> (f64, f64, f64) {
    let seed = 1u64.checked_shl(index as u32 + 10).unwrap_or(index as u64);
    let mut rng = StdRng::seed_from_u64(seed);

    let hue = rng.random_range(0.0..360.0);
    let saturation = rng.random_range(0.55..0.95);
    // dark tones keep clear of the grey reference line
    let lightness = rng.random_range(0.28..0.45);
    (hue, saturation, lightness)
}

pub fn series_color(index: usize) -> Rgb {
    let (h, s, l) = series_hsl(index);
    hsl_to_rgb(h, s, l)
}

pub fn estimate_color(index: usize) -> Rgb {
    let (h, s, l) = series_hsl(index);
    hsl_to_rgb(h, s, (l + ESTIMATE_LIGHTEN).min(0.85))
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> Rgb {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let h = (hue % 360.0) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = lightness - c / 2.0;

    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb::new(channel(r), channel(g), channel(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brightness(c: Rgb) -> u32 {
        c.r as u32 + c.g as u32 + c.b as u32
    }

    #[test]
    fn test_same_index_same_color() {
        for i in 0..8 {
            assert_eq!(series_color(i), series_color(i));
            assert_eq!(estimate_color(i), estimate_color(i));
        }
    }

    #[test]
    fn test_neighbouring_indices_differ() {
        assert_ne!(series_color(0), series_color(1));
        assert_ne!(series_color(1), series_color(2));
    }

    #[test]
    fn test_estimate_is_lighter() {
        for i in 0..8 {
            assert!(brightness(estimate_color(i)) > brightness(series_color(i)));
        }
    }

    #[test]
    fn test_series_colors_are_not_reference_grey() {
        for i in 0..16 {
            assert_ne!(series_color(i), REFERENCE_COLOR);
        }
    }

    #[test]
    fn test_hex() {
        assert_eq!(REFERENCE_COLOR.hex(), "#AAAAAA");
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), Rgb::new(255, 0, 0));
    }
}
