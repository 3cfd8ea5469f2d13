//! Color constants and the deterministic segment color function.
//!
//! The chart engine never reaches into global theme state; it calls
//! [`segment_color`], a pure function of node name and ring level, so
//! recoloring on hover or selection never jitters.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use egui::Color32;

/// Background colors for the app shell
pub mod bg {
    use super::*;

    /// Chart canvas background - darkest layer
    pub const CHART: Color32 = Color32::from_rgb(14, 17, 23);

    /// Panel backgrounds - slightly lighter than the chart
    pub const PANEL: Color32 = Color32::from_rgb(20, 22, 28);
}

/// Text colors at different emphasis levels
pub mod text {
    use super::*;

    /// Primary text - high contrast
    pub const PRIMARY: Color32 = Color32::from_rgb(240, 240, 245);

    /// Secondary text - medium contrast
    pub const SECONDARY: Color32 = Color32::from_rgb(180, 180, 190);

    /// Muted text - low contrast for less important info
    pub const MUTED: Color32 = Color32::from_rgb(120, 125, 135);
}

/// State colors for interactive elements
pub mod state {
    use super::*;

    /// Hover outline
    pub const HOVER: Color32 = Color32::WHITE;

    /// Segment outline at rest
    pub const OUTLINE: Color32 = super::bg::CHART;
}

/// Saturation/value pairs per ring: the year ring is the most saturated and
/// bright, deeper rings step down.
const RING_STYLE: [(f32, f32); 3] = [(0.80, 0.90), (0.70, 0.80), (0.55, 0.70)];

/// Deterministic segment color: the node name hashes to a hue, the ring
/// level picks saturation and brightness. Stable across calls for the same
/// name.
pub fn segment_color(name: &str, level: usize) -> Color32 {
    let (saturation, value) = RING_STYLE[level.min(RING_STYLE.len() - 1)];
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    let hue = (hasher.finish() % 360) as f32;
    hsv_to_rgb(hue, saturation, value)
}

/// Convert HSV (hue in degrees, s/v in 0..=1) to RGB color
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Color32 {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    Color32::from_rgb(
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_color_stable() {
        assert_eq!(segment_color("2024", 0), segment_color("2024", 0));
        assert_eq!(segment_color("01", 2), segment_color("01", 2));
    }

    #[test]
    fn test_levels_mute_progressively() {
        // The brightest channel equals the HSV value, so deeper rings are
        // strictly darker whatever hue the name hashes to.
        let l0 = segment_color("2024", 0);
        let l2 = segment_color("2024", 2);
        let brightest = |c: Color32| c.r().max(c.g()).max(c.b());
        assert!(brightest(l2) < brightest(l0));
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), Color32::from_rgb(255, 0, 0));
        assert_eq!(hsv_to_rgb(120.0, 1.0, 1.0), Color32::from_rgb(0, 255, 0));
        assert_eq!(hsv_to_rgb(240.0, 1.0, 1.0), Color32::from_rgb(0, 0, 255));
    }
}
