//! Local maxima of a distance field, used as watershed seeds.

use std::collections::VecDeque;
use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::open;
use crate::binary_image::BinaryMask;
use crate::distance::DistanceField;

/// Finds local maxima of `field` over the foreground of `mask`.
///
/// A pixel is a candidate when it equals the maximum of the square window of
/// radius `min_distance` around it and exceeds the smallest value of the
/// whole field (`0.0` as soon as any background exists). When every
/// foreground pixel equals its window maximum the field is flat, and only
/// the pixels a cross-shaped opening removes (lines and specks) are
/// candidates. Candidates are then accepted from highest to lowest (raster
/// order among equals) unless an accepted peak is closer than `min_distance`
/// in Chebyshev distance. With `exclude_border`, pixels closer than
/// `min_distance` to the canvas edge never become peaks.
///
/// Returns `(x, y)` coordinates in acceptance order.
pub fn find_peaks(
    field: &DistanceField,
    mask: &BinaryMask,
    min_distance: u32,
    exclude_border: bool,
) -> Vec<(u32, u32)> {
    let (width, height) = mask.dimensions();
    let border = if exclude_border { min_distance } else { 0 };
    if border.saturating_mul(2) >= width || border.saturating_mul(2) >= height {
        return Vec::new();
    }

    let Some((x0, y0, x1, y1)) = foreground_bounds(mask, border) else {
        return Vec::new();
    };
    let crop_width = (x1 - x0 + 1) as usize;
    let crop_height = (y1 - y0 + 1) as usize;

    let mut values = vec![f64::NEG_INFINITY; crop_width * crop_height];
    let mut inside = vec![false; crop_width * crop_height];
    for y in y0..=y1 {
        for x in x0..=x1 {
            if mask.get(x, y) {
                let i = (y - y0) as usize * crop_width + (x - x0) as usize;
                values[i] = field.get(x, y);
                inside[i] = true;
            }
        }
    }
    let threshold = field.values().iter().copied().fold(f64::INFINITY, f64::min);

    let maxima = maximum_filter(&values, crop_width, crop_height, min_distance as usize);
    let flat = inside
        .iter()
        .zip(values.iter().zip(&maxima))
        .all(|(&set, (value, max))| !set || value == max);
    let is_peak: Vec<bool> = if flat {
        isolated_pixels(&inside, crop_width, crop_height)
    } else {
        values.iter().zip(&maxima).map(|(value, max)| value == max).collect()
    };

    let mut candidates: Vec<(u32, u32, f64)> = (0..values.len())
        .filter(|&i| inside[i] && is_peak[i] && values[i] > threshold)
        .map(|i| {
            let x = x0 + (i % crop_width) as u32;
            let y = y0 + (i / crop_width) as u32;
            (x, y, values[i])
        })
        .collect();
    candidates.sort_by(|a, b| b.2.total_cmp(&a.2));

    if min_distance <= 1 {
        return candidates.into_iter().map(|(x, y, _)| (x, y)).collect();
    }

    let mut accepted: Vec<(u32, u32)> = Vec::new();
    for (x, y, _) in candidates {
        let crowded = accepted
            .iter()
            .any(|&(ax, ay)| x.abs_diff(ax).max(y.abs_diff(ay)) < min_distance);
        if !crowded {
            accepted.push((x, y));
        }
    }
    accepted
}

/// Bounding box `(x0, y0, x1, y1)` (inclusive) of the foreground lying at
/// least `border` pixels away from every canvas edge.
fn foreground_bounds(mask: &BinaryMask, border: u32) -> Option<(u32, u32, u32, u32)> {
    let (width, height) = mask.dimensions();
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for y in border..height - border {
        for x in border..width - border {
            if !mask.get(x, y) {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
    }
    bounds
}

/// Foreground pixels of a `width` x `height` crop that do not survive an
/// opening by the 3x3 cross. Pixels past the crop edge count as background.
fn isolated_pixels(inside: &[bool], width: usize, height: usize) -> Vec<bool> {
    let padded = GrayImage::from_fn(width as u32 + 2, height as u32 + 2, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let set = (1..=width).contains(&x) && (1..=height).contains(&y) && inside[(y - 1) * width + x - 1];
        Luma([if set { 255 } else { 0 }])
    });
    let opened = open(&padded, Norm::L1, 1);
    inside
        .iter()
        .enumerate()
        .map(|(i, &set)| {
            let (x, y) = ((i % width) as u32 + 1, (i / width) as u32 + 1);
            set && opened.get_pixel(x, y).0[0] == 0
        })
        .collect()
}

/// Separable maximum over a `(2 * radius + 1)` square window clamped to the
/// image.
fn maximum_filter(values: &[f64], width: usize, height: usize, radius: usize) -> Vec<f64> {
    let mut rows = vec![0.0; values.len()];
    for (line, out) in values.chunks(width).zip(rows.chunks_mut(width)) {
        sliding_max(line, radius, out);
    }

    let mut result = vec![0.0; values.len()];
    let mut column = vec![0.0; height];
    let mut column_max = vec![0.0; height];
    for x in 0..width {
        for y in 0..height {
            column[y] = rows[y * width + x];
        }
        sliding_max(&column, radius, &mut column_max);
        for y in 0..height {
            result[y * width + x] = column_max[y];
        }
    }
    result
}

fn sliding_max(line: &[f64], radius: usize, out: &mut [f64]) {
    let n = line.len();
    let mut window: VecDeque<usize> = VecDeque::new();
    let mut next = 0;
    for i in 0..n {
        let hi = (i + radius).min(n - 1);
        while next <= hi {
            while window.back().is_some_and(|&b| line[b] <= line[next]) {
                window.pop_back();
            }
            window.push_back(next);
            next += 1;
        }
        let lo = i.saturating_sub(radius);
        while window.front().is_some_and(|&f| f < lo) {
            window.pop_front();
        }
        out[i] = line[window[0]];
    }
}
