//! Pixel-level drawing on an `RgbImage` with a value-to-pixel mapping

use image::{Rgb, RgbImage};

use super::{colors, ChartConfig};

/// Vertical value range mapped onto the plot area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub min: f64,
    pub max: f64,
}

impl Scale {
    /// Range covering `values` with 5% headroom. Bar charts pass
    /// `include_zero` so bars grow from the axis.
    pub fn from_values<I>(values: I, include_zero: bool) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let (mut min, mut max) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

        if !min.is_finite() || !max.is_finite() {
            return Self { min: -1.0, max: 1.0 };
        }
        if include_zero {
            min = min.min(0.0);
            max = max.max(0.0);
        }
        if (max - min).abs() < 1e-12 {
            return Self {
                min: min - 1.0,
                max: max + 1.0,
            };
        }

        let pad = (max - min) * 0.05;
        Self {
            min: if include_zero && min == 0.0 { 0.0 } else { min - pad },
            max: if include_zero && max == 0.0 { 0.0 } else { max + pad },
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Image plus plot area geometry for `slots` evenly spaced x positions
pub struct Canvas {
    img: RgbImage,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    slots: usize,
    scale: Scale,
}

impl Canvas {
    pub fn new(config: &ChartConfig, slots: usize, scale: Scale) -> Self {
        let img = RgbImage::from_pixel(config.width, config.height, config.background);
        let margin = config.margin as i32;
        Self {
            img,
            left: margin,
            top: margin,
            right: config.width as i32 - margin,
            bottom: config.height as i32 - margin,
            slots: slots.max(1),
            scale,
        }
    }

    pub fn into_image(self) -> RgbImage {
        self.img
    }

    fn slot_width(&self) -> f64 {
        (self.right - self.left) as f64 / self.slots as f64
    }

    /// Pixel x of the centre of slot `i`
    pub fn x_at(&self, i: usize) -> i32 {
        self.left + (self.slot_width() * (i as f64 + 0.5)).round() as i32
    }

    /// Pixel y of `value`; larger values are higher up
    pub fn y_at(&self, value: f64) -> i32 {
        let t = (value - self.scale.min) / (self.scale.max - self.scale.min);
        self.bottom - (t.clamp(0.0, 1.0) * (self.bottom - self.top) as f64).round() as i32
    }

    /// Light horizontal grid plus the left/bottom axes
    pub fn draw_frame(&mut self, grid_lines: usize) {
        for i in 1..grid_lines {
            let y = self.top + (self.bottom - self.top) * i as i32 / grid_lines as i32;
            let (left, right) = (self.left, self.right);
            self.draw_line(left, y, right, y, colors::GRID);
        }

        let (left, top, right, bottom) = (self.left, self.top, self.right, self.bottom);
        self.draw_line(left, top, left, bottom, colors::AXIS);
        self.draw_line(left, bottom, right, bottom, colors::AXIS);
    }

    /// Horizontal line at value zero, if zero is on the scale
    pub fn draw_zero_line(&mut self) {
        if self.scale.contains(0.0) {
            let y = self.y_at(0.0);
            let (left, right) = (self.left, self.right);
            self.draw_line(left, y, right, y, colors::BLACK);
        }
    }

    pub fn draw_series(&mut self, values: &[f64], color: Rgb<u8>, thickness: i32) {
        let points: Vec<(i32, i32)> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (self.x_at(i), self.y_at(v)))
            .collect();

        for pair in points.windows(2) {
            let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
            for offset in -(thickness / 2)..=(thickness / 2) {
                self.draw_line(x0, y0 + offset, x1, y1 + offset, color);
            }
        }
    }

    pub fn draw_markers(&mut self, values: &[f64], color: Rgb<u8>, radius: i32, square: bool) {
        for (i, &v) in values.iter().enumerate() {
            let (cx, cy) = (self.x_at(i), self.y_at(v));
            if square {
                self.fill_rect(cx - radius, cy - radius, cx + radius, cy + radius, color);
            } else {
                self.fill_circle(cx, cy, radius, color);
            }
        }
    }

    /// Bar from zero to `value` in slot `i`. `part`/`parts` split the slot
    /// for grouped bars.
    pub fn draw_bar(&mut self, i: usize, part: usize, parts: usize, value: f64, color: Rgb<u8>) {
        let parts = parts.max(1);
        let slot = self.slot_width();
        let group_width = slot * 0.8;
        let bar_width = group_width / parts as f64;

        let group_left = self.left as f64 + slot * i as f64 + (slot - group_width) / 2.0;
        let x0 = (group_left + bar_width * part as f64).round() as i32;
        let x1 = (group_left + bar_width * (part + 1) as f64).round() as i32 - 1;

        let base = self.y_at(0.0_f64.clamp(self.scale.min, self.scale.max));
        let top = self.y_at(value);
        let fill = blend(colors::WHITE, color, 0.7);
        self.fill_rect(x0, top.min(base), x1.max(x0), top.max(base), fill);
    }

    /// Bresenham line, clipped to the image
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb<u8>) {
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx - dy;

        let (mut x, mut y) = (x0, y0);
        loop {
            self.put(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Inclusive rectangle, clipped to the image
    pub fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb<u8>) {
        let (xa, xb) = (x0.min(x1), x0.max(x1));
        let (ya, yb) = (y0.min(y1), y0.max(y1));
        for y in ya..=yb {
            for x in xa..=xb {
                self.put(x, y, color);
            }
        }
    }

    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: Rgb<u8>) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.put(cx + dx, cy + dy, color);
                }
            }
        }
    }

    fn put(&mut self, x: i32, y: i32, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.img.width() && (y as u32) < self.img.height() {
            self.img.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// `fg` over `bg` at opacity `alpha`
pub fn blend(bg: Rgb<u8>, fg: Rgb<u8>, alpha: f64) -> Rgb<u8> {
    let a = alpha.clamp(0.0, 1.0);
    let mix = |b: u8, f: u8| ((1.0 - a) * b as f64 + a * f as f64).round() as u8;
    Rgb([mix(bg.0[0], fg.0[0]), mix(bg.0[1], fg.0[1]), mix(bg.0[2], fg.0[2])])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ChartConfig {
        ChartConfig {
            width: 120,
            height: 100,
            margin: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_scale_padding_and_zero() {
        let scale = Scale::from_values(vec![10.0, 20.0], false);
        assert!((scale.min - 9.5).abs() < 1e-9);
        assert!((scale.max - 20.5).abs() < 1e-9);

        let bars = Scale::from_values(vec![10.0, 20.0], true);
        assert_eq!(bars.min, 0.0);
        assert!(bars.contains(0.0));

        let flat = Scale::from_values(vec![3.0, 3.0], false);
        assert_eq!((flat.min, flat.max), (2.0, 4.0));

        let empty = Scale::from_values(Vec::new(), false);
        assert_eq!((empty.min, empty.max), (-1.0, 1.0));
    }

    #[test]
    fn test_value_mapping() {
        let canvas = Canvas::new(&small_config(), 4, Scale { min: 0.0, max: 10.0 });
        assert_eq!(canvas.y_at(0.0), 90);
        assert_eq!(canvas.y_at(10.0), 10);
        assert_eq!(canvas.y_at(5.0), 50);
        // clamped
        assert_eq!(canvas.y_at(50.0), 10);

        // 100px plot width, 4 slots of 25px
        assert_eq!(canvas.x_at(0), 23);
        assert_eq!(canvas.x_at(3), 98);
    }

    #[test]
    fn test_bar_fills_between_zero_and_value() {
        let mut canvas = Canvas::new(&small_config(), 1, Scale { min: -10.0, max: 10.0 });
        canvas.draw_bar(0, 0, 1, -5.0, colors::RED);
        let img = canvas.into_image();

        let fill = blend(colors::WHITE, colors::RED, 0.7);
        // zero at y=50, -5 at y=70
        assert_eq!(*img.get_pixel(60, 60), fill);
        assert_ne!(*img.get_pixel(60, 40), fill);
    }

    #[test]
    fn test_blend() {
        assert_eq!(blend(colors::WHITE, colors::BLACK, 1.0), colors::BLACK);
        assert_eq!(blend(colors::WHITE, colors::BLACK, 0.0), colors::WHITE);
    }
}
