//! Chart rendering on top of plotters. Every chart is written as an SVG file into the
//! canvas directory and the written path is returned to the caller.

use std::error::Error;
use std::fs::create_dir_all;
use std::ops::Range;
use std::path::{Path, PathBuf};

use plotters::style::RGBColor;
use polars::prelude::*;
use tracing::info;

use crate::models::polars_err;

pub mod bars;
pub mod boxplot;
pub mod distribution;
pub mod heatmap;
pub mod hexbin;
pub mod scatter;

pub const CHART_SIZE: (u32, u32) = (900, 650);
pub const CAPTION_FONT: (&str, u32) = ("sans-serif", 24);
pub const AXIS_FONT: (&str, u32) = ("sans-serif", 16);

pub const SERIES_BLUE: RGBColor = RGBColor(31, 119, 180);
pub const SERIES_ORANGE: RGBColor = RGBColor(255, 127, 14);

/// Output directory for rendered charts.
#[derive(Debug, Clone)]
pub struct ChartCanvas {
    dir: PathBuf,
}

impl ChartCanvas {
    pub fn new(dir: impl Into<PathBuf>) -> PolarsResult<Self> {
        let dir = dir.into();
        create_dir_all(&dir).map_err(|e| polars_err(Box::new(e)))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.svg", name))
    }
}

pub(crate) fn draw_err<E: Error + 'static>(e: E) -> PolarsError {
    polars_err(Box::new(e))
}

pub(crate) fn rendered(path: &Path) {
    info!("Chart written to {}", path.display());
}

/// Value range with a 5% margin on each side; a degenerate range is widened by ±0.5.
pub fn padded_range<I: IntoIterator<Item = f64>>(values: I) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return 0.0..1.0;
    }
    if hi - lo <= f64::EPSILON {
        return (lo - 0.5)..(hi + 0.5);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad)..(hi + pad)
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}

/// Diverging blue → grey → red scale for values in `[-1, 1]`. Undefined (NaN) is grey.
pub fn cool_warm(value: f64) -> RGBColor {
    const COOL: (u8, u8, u8) = (59, 76, 192);
    const MID: (u8, u8, u8) = (221, 221, 221);
    const WARM: (u8, u8, u8) = (180, 4, 38);
    if value.is_nan() {
        return RGBColor(MID.0, MID.1, MID.2);
    }
    let t = ((value.clamp(-1.0, 1.0) + 1.0) / 2.0).max(0.0);
    let (from, to, local) = if t < 0.5 { (COOL, MID, t * 2.0) } else { (MID, WARM, (t - 0.5) * 2.0) };
    RGBColor(lerp(from.0, to.0, local), lerp(from.1, to.1, local), lerp(from.2, to.2, local))
}

/// White → `base` ramp for densities in `[0, 1]`.
pub fn density_color(base: RGBColor, t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    RGBColor(lerp(255, base.0, t), lerp(255, base.1, t), lerp(255, base.2, t))
}
