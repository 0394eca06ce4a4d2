//! Voxel colors and HSB helpers

use serde::{Deserialize, Serialize};

/// 8-bit RGB color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to hue, saturation, brightness in `0.0..=1.0`.
    pub fn to_hsb(self) -> [f32; 3] {
        let r = self.r as f32 / 255.0;
        let g = self.g as f32 / 255.0;
        let b = self.b as f32 / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let brightness = max;
        let saturation = if max > 0.0 { delta / max } else { 0.0 };
        let hue = if delta == 0.0 {
            0.0
        } else if max == r {
            ((g - b) / delta).rem_euclid(6.0) / 6.0
        } else if max == g {
            ((b - r) / delta + 2.0) / 6.0
        } else {
            ((r - g) / delta + 4.0) / 6.0
        };
        [hue, saturation, brightness]
    }

    /// Build a color from hue, saturation, brightness in `0.0..=1.0`.
    pub fn from_hsb(hsb: [f32; 3]) -> Self {
        let [h, s, v] = hsb;
        if s <= 0.0 {
            let c = channel(v);
            return Self::new(c, c, c);
        }
        let h = h.rem_euclid(1.0) * 6.0;
        let sector = h.floor();
        let f = h - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));
        let (r, g, b) = match sector as u32 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        Self::new(channel(r), channel(g), channel(b))
    }

    /// Offset in HSB space. Hue wraps around, saturation and brightness clamp.
    pub fn shifted(self, offset: [f32; 3]) -> Self {
        let [h, s, b] = self.to_hsb();
        Self::from_hsb([
            (h + offset[0]).rem_euclid(1.0),
            (s + offset[1]).clamp(0.0, 1.0),
            (b + offset[2]).clamp(0.0, 1.0),
        ])
    }
}

fn channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsb_primary_colors() {
        assert_eq!(Color::new(255, 0, 0).to_hsb(), [0.0, 1.0, 1.0]);
        let green = Color::new(0, 255, 0).to_hsb();
        assert!((green[0] - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(Color::from_hsb([2.0 / 3.0, 1.0, 1.0]), Color::new(0, 0, 255));
    }

    #[test]
    fn test_hsb_preserves_grey() {
        let grey = Color::new(128, 128, 128);
        assert_eq!(Color::from_hsb(grey.to_hsb()), grey);
    }

    #[test]
    fn test_shift_hue_wraps() {
        let red = Color::new(255, 0, 0);
        // Half a turn from red lands on cyan
        assert_eq!(red.shifted([0.5, 0.0, 0.0]), Color::new(0, 255, 255));
        assert_eq!(red.shifted([1.0, 0.0, 0.0]), red);
    }

    #[test]
    fn test_shift_clamps_brightness() {
        let color = Color::new(200, 100, 50);
        assert_eq!(color.shifted([0.0, 0.0, -2.0]), Color::new(0, 0, 0));
    }
}
