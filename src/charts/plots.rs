use chrono::Datelike;
use image::{Rgb, RgbImage};

use super::{ChartConfig, colors, draw_filled_rect, draw_line, put_clipped, value_to_heatmap_color};
use crate::analyzers::daytype::DayType;
use crate::analyzers::types::{DailyTotal, DayTypeHourMean, HourlyMean, MonthHourGrid};
use crate::error::SchemaGap;
use crate::frame::f64_values;
use crate::loader::{Capability, CleanTable, TEMP_COLUMN};

const GRID_LINES: u32 = 4;

/// Maps data coordinates into the plotting area inside the margins.
struct Frame {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    x: (f64, f64),
    y: (f64, f64),
}

impl Frame {
    fn new(cfg: &ChartConfig, x: (f64, f64), y: (f64, f64)) -> Self {
        let m = cfg.margin.min(cfg.width / 4).min(cfg.height / 4) as f64;
        Self {
            left: m,
            top: m,
            width: (cfg.width as f64 - 2.0 * m).max(1.0),
            height: (cfg.height as f64 - 2.0 * m).max(1.0),
            x: widen(x),
            y: widen(y),
        }
    }

    fn px(&self, x: f64, y: f64) -> (i32, i32) {
        let fx = (x - self.x.0) / (self.x.1 - self.x.0);
        let fy = (y - self.y.0) / (self.y.1 - self.y.0);
        (
            (self.left + fx * self.width).round() as i32,
            (self.top + (1.0 - fy) * self.height).round() as i32,
        )
    }

    fn canvas(&self, cfg: &ChartConfig) -> RgbImage {
        let mut img = RgbImage::from_pixel(cfg.width, cfg.height, cfg.background);
        let (l, t) = (self.left as i32, self.top as i32);
        let (r, b) = ((self.left + self.width) as i32, (self.top + self.height) as i32);

        for i in 1..=GRID_LINES {
            let gy = t + ((b - t) as f64 * i as f64 / (GRID_LINES + 1) as f64) as i32;
            draw_line(&mut img, (l, gy), (r, gy), colors::LIGHT_GRAY);
        }
        draw_line(&mut img, (l, b), (r, b), colors::BLACK);
        draw_line(&mut img, (l, t), (l, b), colors::BLACK);
        img
    }

    fn polyline(&self, img: &mut RgbImage, points: &[(f64, f64)], color: Rgb<u8>) {
        for w in points.windows(2) {
            draw_line(img, self.px(w[0].0, w[0].1), self.px(w[1].0, w[1].1), color);
        }
        if let [only] = points {
            self.dot(img, only.0, only.1, color);
        }
    }

    fn dot(&self, img: &mut RgbImage, x: f64, y: f64, color: Rgb<u8>) {
        let (cx, cy) = self.px(x, y);
        for dy in -1..=1 {
            for dx in -1..=1 {
                put_clipped(img, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Pads a degenerate range so a single value still maps somewhere sensible.
fn widen((lo, hi): (f64, f64)) -> (f64, f64) {
    if !lo.is_finite() || !hi.is_finite() {
        (0.0, 1.0)
    } else if hi - lo <= f64::EPSILON {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    }
}

fn range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Month rows by hour columns, one colored cell per mean.
pub fn render_heatmap(grid: &MonthHourGrid, cfg: &ChartConfig) -> RgbImage {
    let mut img = RgbImage::from_pixel(cfg.width, cfg.height, cfg.background);
    let (rows, cols) = (grid.months.len() as u32, grid.hours.len() as u32);
    if rows == 0 || cols == 0 {
        return img;
    }

    let (lo, hi) = widen((grid.min().unwrap_or(0.0), grid.max().unwrap_or(1.0)));
    let m = cfg.margin.min(cfg.width / 4).min(cfg.height / 4);
    let cell_w = ((cfg.width - 2 * m) / cols).max(1);
    let cell_h = ((cfg.height - 2 * m) / rows).max(1);

    for (i, row) in grid.values.iter().enumerate() {
        for (j, cell) in row.iter().enumerate() {
            let color = match cell {
                Some(v) => value_to_heatmap_color((v - lo) / (hi - lo)),
                None => colors::LIGHT_GRAY,
            };
            draw_filled_rect(
                &mut img,
                m + j as u32 * cell_w,
                m + i as u32 * cell_h,
                cell_w,
                cell_h,
                color,
            );
        }
    }
    img
}

pub fn render_timeseries(daily: &[DailyTotal], cfg: &ChartConfig) -> RgbImage {
    let points: Vec<(f64, f64)> = daily
        .iter()
        .map(|d| (d.date.num_days_from_ce() as f64, d.total))
        .collect();
    line_chart(&[(points, colors::BLUE)], cfg)
}

/// Temperature against the target, one dot per row.
pub fn render_scatter(clean: &CleanTable, cfg: &ChartConfig) -> Result<RgbImage, SchemaGap> {
    clean
        .manifest
        .require("temperature scatter", &[Capability::Temperature, Capability::Target])?;
    let target = clean.manifest.column_name(Capability::Target);
    let (Ok(temp), Ok(y)) = (
        f64_values(&clean.frame, TEMP_COLUMN),
        f64_values(&clean.frame, target),
    ) else {
        return Err(SchemaGap::no_rows("temperature scatter"));
    };

    let points: Vec<(f64, f64)> = temp
        .into_iter()
        .zip(y)
        .filter_map(|(t, y)| Some((t?, y?)))
        .collect();
    if points.is_empty() {
        return Err(SchemaGap::no_rows("temperature scatter"));
    }

    let frame = Frame::new(
        cfg,
        range(points.iter().map(|p| p.0)),
        range(points.iter().map(|p| p.1)),
    );
    let mut img = frame.canvas(cfg);
    for (x, y) in points {
        frame.dot(&mut img, x, y, colors::BLUE);
    }
    Ok(img)
}

pub fn render_hourly(hourly: &[HourlyMean], cfg: &ChartConfig) -> RgbImage {
    let points: Vec<(f64, f64)> = hourly.iter().map(|h| (h.hr as f64, h.avg_cnt)).collect();
    line_chart(&[(points, colors::BLUE)], cfg)
}

/// One curve per day type over the full hourly profile.
pub fn render_daytype_hourly(profile: &[DayTypeHourMean], cfg: &ChartConfig) -> RgbImage {
    let series: Vec<(Vec<(f64, f64)>, Rgb<u8>)> = [
        (DayType::NonWorkingday, colors::GREEN),
        (DayType::Weekend, colors::ORANGE),
        (DayType::Workingday, colors::BLUE),
    ]
    .into_iter()
    .map(|(dt, color)| {
        let points: Vec<(f64, f64)> = profile
            .iter()
            .filter(|p| p.day_type == dt)
            .map(|p| (p.hr as f64, p.avg_cnt))
            .collect();
        (points, color)
    })
    .collect();
    line_chart(&series, cfg)
}

fn line_chart(series: &[(Vec<(f64, f64)>, Rgb<u8>)], cfg: &ChartConfig) -> RgbImage {
    let all = || series.iter().flat_map(|(pts, _)| pts.iter());
    let frame = Frame::new(cfg, range(all().map(|p| p.0)), range(all().map(|p| p.1)));
    let mut img = frame.canvas(cfg);
    for (points, color) in series {
        frame.polyline(&mut img, points, *color);
    }
    img
}
