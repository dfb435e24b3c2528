use image::{Rgb, RgbImage};

use super::{canvas::blend, colors, ChartConfig};

/// Degrees counter-clockwise from the positive x axis where the first wedge begins
const START_ANGLE: f64 = 140.0;

/// Pie chart of `shares`, wedges laid out counter-clockwise from
/// [`START_ANGLE`]. Non-positive shares are ignored.
pub fn render_pie(config: &ChartConfig, shares: &[(f64, Rgb<u8>)]) -> RgbImage {
    let mut img = RgbImage::from_pixel(config.width, config.height, config.background);

    let total: f64 = shares.iter().map(|(v, _)| v.max(0.0)).sum();
    if total <= 0.0 {
        return img;
    }

    // cumulative end angle of each wedge, relative to START_ANGLE
    let mut bounds = Vec::with_capacity(shares.len());
    let mut acc = 0.0;
    for &(value, color) in shares {
        acc += value.max(0.0) / total * 360.0;
        bounds.push((acc, color));
    }

    let cx = config.width as f64 / 2.0;
    let cy = config.height as f64 / 2.0;
    let radius = (cx.min(cy) - config.margin as f64).max(1.0);
    let shadow_offset = (radius * 0.03).max(2.0);

    for y in 0..config.height {
        for x in 0..config.width {
            let dx = x as f64 + 0.5 - cx;
            let dy = cy - (y as f64 + 0.5);

            let dist = (dx * dx + dy * dy).sqrt();
            if dist > radius {
                let (sx, sy) = (dx + shadow_offset, dy + shadow_offset);
                if (sx * sx + sy * sy).sqrt() <= radius {
                    img.put_pixel(x, y, blend(config.background, colors::BLACK, 0.25));
                }
                continue;
            }

            let angle = (dy.atan2(dx).to_degrees() - START_ANGLE).rem_euclid(360.0);
            if let Some(&(_, color)) = bounds.iter().find(|(end, _)| angle < *end) {
                img.put_pixel(x, y, color);
            } else if let Some(&(_, color)) = bounds.last() {
                img.put_pixel(x, y, color);
            }
        }
    }

    img
}
