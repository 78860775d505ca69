//! Static PNG charts of the aggregates.
//!
//! Each chart is rendered only when the aggregate it draws is available, so a
//! day-level run writes fewer files than an hour-level one.

mod plots;

pub use plots::{render_daytype_hourly, render_heatmap, render_hourly, render_scatter, render_timeseries};

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::Aggregates;
use crate::loader::CleanTable;

pub const HEATMAP_FILE: &str = "fig_heatmap_month_hour.png";
pub const TIMESERIES_FILE: &str = "fig_timeseries.png";
pub const SCATTER_FILE: &str = "fig_temp_vs_cnt.png";
pub const HOURLY_FILE: &str = "fig_avg_by_hour.png";
pub const DAYTYPE_HOURLY_FILE: &str = "fig_avg_by_hour_daytype.png";

pub mod colors {
    use image::Rgb;

    pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    pub const LIGHT_GRAY: Rgb<u8> = Rgb([220, 220, 220]);
    pub const BLUE: Rgb<u8> = Rgb([33, 150, 243]);
    pub const ORANGE: Rgb<u8> = Rgb([255, 152, 0]);
    pub const GREEN: Rgb<u8> = Rgb([0, 170, 83]);
}

#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub background: Rgb<u8>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 450,
            margin: 40,
            background: colors::WHITE,
        }
    }
}

/// Renders every chart whose inputs are available and writes it under
/// `out_dir`. Returns the written paths.
#[tracing::instrument(skip_all, fields(out_dir = %out_dir.display()))]
pub fn write_charts(
    clean: &CleanTable,
    aggregates: &Aggregates,
    out_dir: &Path,
    cfg: &ChartConfig,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir).with_context(|| format!("create {}", out_dir.display()))?;

    let mut charts: Vec<(&str, RgbImage)> = Vec::new();
    if let Some(grid) = aggregates.month_hour.available() {
        charts.push((HEATMAP_FILE, render_heatmap(grid, cfg)));
    }
    if let Some(daily) = aggregates.daily.available() {
        charts.push((TIMESERIES_FILE, render_timeseries(daily, cfg)));
    }
    match render_scatter(clean, cfg) {
        Ok(img) => charts.push((SCATTER_FILE, img)),
        Err(gap) => info!("{gap}"),
    }
    if let Some(hourly) = aggregates.hourly.available() {
        charts.push((HOURLY_FILE, render_hourly(hourly, cfg)));
    }
    if let Some(profile) = aggregates.day_type_profile.available() {
        charts.push((DAYTYPE_HOURLY_FILE, render_daytype_hourly(profile, cfg)));
    }

    let mut written = Vec::with_capacity(charts.len());
    for (name, img) in charts {
        let path = out_dir.join(name);
        img.save(&path)
            .with_context(|| format!("write chart {}", path.display()))?;
        debug!(path = %path.display(), "Chart written");
        written.push(path);
    }
    Ok(written)
}

pub fn draw_filled_rect(img: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, color: Rgb<u8>) {
    let (w, h) = (img.width(), img.height());
    for py in y..y.saturating_add(height).min(h) {
        for px in x..x.saturating_add(width).min(w) {
            img.put_pixel(px, py, color);
        }
    }
}

/// Bresenham line; pixels outside the image are clipped.
pub fn draw_line(img: &mut RgbImage, from: (i32, i32), to: (i32, i32), color: Rgb<u8>) {
    let (x1, y1) = from;
    let (x2, y2) = to;
    let dx = (x2 - x1).abs();
    let dy = (y2 - y1).abs();
    let sx = if x1 < x2 { 1 } else { -1 };
    let sy = if y1 < y2 { 1 } else { -1 };
    let mut err = dx - dy;
    let (mut x, mut y) = (x1, y1);

    loop {
        put_clipped(img, x, y, color);
        if x == x2 && y == y2 {
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

pub fn put_clipped(img: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

pub fn interpolate_color(c1: Rgb<u8>, c2: Rgb<u8>, t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    Rgb([
        ((1.0 - t) * c1.0[0] as f64 + t * c2.0[0] as f64) as u8,
        ((1.0 - t) * c1.0[1] as f64 + t * c2.0[1] as f64) as u8,
        ((1.0 - t) * c1.0[2] as f64 + t * c2.0[2] as f64) as u8,
    ])
}

/// Maps `[0, 1]` onto a pale-yellow to dark-red ramp.
pub fn value_to_heatmap_color(value: f64) -> Rgb<u8> {
    let v = value.clamp(0.0, 1.0);
    if v < 0.5 {
        interpolate_color(Rgb([255, 255, 204]), Rgb([253, 141, 60]), v / 0.5)
    } else {
        interpolate_color(Rgb([253, 141, 60]), Rgb([128, 0, 38]), (v - 0.5) / 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_color() {
        let mid = interpolate_color(Rgb([0, 0, 0]), Rgb([255, 255, 255]), 0.5);
        assert_eq!(mid, Rgb([127, 127, 127]));
    }

    #[test]
    fn test_heatmap_ramp_ends() {
        assert_eq!(value_to_heatmap_color(0.0), Rgb([255, 255, 204]));
        assert_eq!(value_to_heatmap_color(1.0), Rgb([128, 0, 38]));
        assert_eq!(value_to_heatmap_color(7.0), Rgb([128, 0, 38]));
    }

    #[test]
    fn test_draw_line_clips_outside_pixels() {
        let mut img = RgbImage::from_pixel(10, 10, colors::WHITE);
        draw_line(&mut img, (-5, 5), (20, 5), colors::BLACK);
        assert!((0..10).all(|x| *img.get_pixel(x, 5) == colors::BLACK));
        assert_eq!(*img.get_pixel(0, 4), colors::WHITE);
    }

    #[test]
    fn test_filled_rect_stays_in_bounds() {
        let mut img = RgbImage::from_pixel(4, 4, colors::WHITE);
        draw_filled_rect(&mut img, 2, 2, 10, 10, colors::BLUE);
        assert_eq!(*img.get_pixel(3, 3), colors::BLUE);
        assert_eq!(*img.get_pixel(1, 1), colors::WHITE);
    }
}
