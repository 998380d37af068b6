use std::collections::BTreeMap;
use std::path::Path;

use plotters::prelude::*;
use polars::prelude::*;

use super::distribution::histogram;
use super::{density_color, draw_err, padded_range, rendered, AXIS_FONT, CAPTION_FONT, CHART_SIZE, SERIES_BLUE};

pub const DEFAULT_GRIDSIZE: usize = 30;
const MARGINAL_SIZE: i32 = 130;
const MARGINAL_BINS: usize = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct HexBin {
    pub center: (f64, f64),
    pub count: usize,
}

#[derive(Debug, Clone, Copy)]
struct HexGrid {
    x0: f64,
    y0: f64,
    sx: f64,
    sy: f64,
}

impl HexGrid {
    fn over(points: &[(f64, f64)], gridsize: usize) -> Self {
        let (xs, ys) = (
            padded_range(points.iter().map(|p| p.0)),
            padded_range(points.iter().map(|p| p.1)),
        );
        let nx = gridsize.max(1) as f64;
        let ny = (nx / 3f64.sqrt()).round().max(1.0);
        Self {
            x0: xs.start,
            y0: ys.start,
            sx: (xs.end - xs.start) / nx,
            sy: (ys.end - ys.start) / ny,
        }
    }

    /// Offsets two rectangular lattices by half a cell and keeps whichever centre is
    /// closer in hexagon-scaled distance.
    fn cell_of(&self, (x, y): (f64, f64)) -> (u8, i64, i64) {
        let ix = (x - self.x0) / self.sx;
        let iy = (y - self.y0) / self.sy;
        let (ix1, iy1) = (ix.round(), iy.round());
        let (ix2, iy2) = (ix.floor(), iy.floor());
        let d1 = (ix - ix1).powi(2) + 3.0 * (iy - iy1).powi(2);
        let d2 = (ix - ix2 - 0.5).powi(2) + 3.0 * (iy - iy2 - 0.5).powi(2);
        if d1 < d2 {
            (0, ix1 as i64, iy1 as i64)
        } else {
            (1, ix2 as i64, iy2 as i64)
        }
    }

    fn center_of(&self, (lattice, i, j): (u8, i64, i64)) -> (f64, f64) {
        let shift = if lattice == 0 { 0.0 } else { 0.5 };
        (
            self.x0 + (i as f64 + shift) * self.sx,
            self.y0 + (j as f64 + shift) * self.sy,
        )
    }

    fn hexagon(&self, (cx, cy): (f64, f64)) -> Vec<(f64, f64)> {
        let (hx, hy) = (0.5 * self.sx, self.sy / 6.0);
        vec![
            (cx + hx, cy - hy),
            (cx + hx, cy + hy),
            (cx, cy + 2.0 * hy),
            (cx - hx, cy + hy),
            (cx - hx, cy - hy),
            (cx, cy - 2.0 * hy),
        ]
    }
}

/// Counts points per hexagonal cell; only occupied cells are returned.
pub fn hex_bins(points: &[(f64, f64)], gridsize: usize) -> Vec<HexBin> {
    let grid = HexGrid::over(points, gridsize);
    let mut cells: BTreeMap<(u8, i64, i64), usize> = BTreeMap::new();
    for &p in points.iter().filter(|p| p.0.is_finite() && p.1.is_finite()) {
        *cells.entry(grid.cell_of(p)).or_insert(0) += 1;
    }
    cells
        .into_iter()
        .map(|(cell, count)| HexBin { center: grid.center_of(cell), count })
        .collect()
}

/// Hexbin density panel with marginal histograms along the top and right edges.
pub fn draw_hexbin_joint(
    path: &Path,
    title: &str,
    x_label: &str,
    y_label: &str,
    points: &[(f64, f64)],
    gridsize: usize,
) -> PolarsResult<()> {
    let grid = HexGrid::over(points, gridsize);
    let bins = hex_bins(points, gridsize);
    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(1).max(1) as f64;
    let x_range = padded_range(points.iter().map(|p| p.0));
    let y_range = padded_range(points.iter().map(|p| p.1));

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;
    let area = root.titled(title, CAPTION_FONT).map_err(draw_err)?;
    let width = area.dim_in_pixel().0 as i32;
    let (upper, lower) = area.split_vertically(MARGINAL_SIZE);
    let (top_panel, _) = upper.split_horizontally(width - MARGINAL_SIZE);
    let (main_panel, right_panel) = lower.split_horizontally(width - MARGINAL_SIZE);

    let mut main = ChartBuilder::on(&main_panel)
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(x_range.clone(), y_range.clone())
        .map_err(draw_err)?;
    main.configure_mesh()
        .disable_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .axis_desc_style(AXIS_FONT)
        .draw()
        .map_err(draw_err)?;
    main.draw_series(bins.iter().map(|b| {
        let shade = 0.15 + 0.85 * b.count as f64 / max_count;
        Polygon::new(grid.hexagon(b.center), density_color(SERIES_BLUE, shade).filled())
    }))
    .map_err(draw_err)?;

    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let x_hist = histogram(&xs, &x_range, MARGINAL_BINS);
    let x_peak = x_hist.counts.iter().copied().max().unwrap_or(1).max(1) as f64;
    let mut top = ChartBuilder::on(&top_panel)
        .margin(10)
        .margin_bottom(0)
        .y_label_area_size(55)
        .build_cartesian_2d(x_range.clone(), 0.0..x_peak * 1.05)
        .map_err(draw_err)?;
    top.draw_series(x_hist.counts.iter().enumerate().map(|(i, &c)| {
        let x = x_hist.start + i as f64 * x_hist.bin_width;
        Rectangle::new([(x, 0.0), (x + x_hist.bin_width, c as f64)], SERIES_BLUE.mix(0.6).filled())
    }))
    .map_err(draw_err)?;

    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    let y_hist = histogram(&ys, &y_range, MARGINAL_BINS);
    let y_peak = y_hist.counts.iter().copied().max().unwrap_or(1).max(1) as f64;
    let mut right = ChartBuilder::on(&right_panel)
        .margin(10)
        .margin_left(0)
        .x_label_area_size(45)
        .build_cartesian_2d(0.0..y_peak * 1.05, y_range)
        .map_err(draw_err)?;
    right
        .draw_series(y_hist.counts.iter().enumerate().map(|(i, &c)| {
            let y = y_hist.start + i as f64 * y_hist.bin_width;
            Rectangle::new([(0.0, y), (c as f64, y + y_hist.bin_width)], SERIES_BLUE.mix(0.6).filled())
        }))
        .map_err(draw_err)?;

    root.present().map_err(draw_err)?;
    rendered(path);
    Ok(())
}
