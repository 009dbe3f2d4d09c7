//! Test data generators for staggered grids.
//!
//! These generators create predictable, verifiable patterns so tests can
//! tell exactly which part of a grid survived a subset.

use rand::Rng;

/// Creates a grid whose values encode their own position.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// After slicing, `value[0]` tells which (col, row) of the source grid the
/// slice starts at.
///
/// # Example
///
/// ```
/// use test_utils::create_index_grid;
///
/// let grid = create_index_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0);  // col=1, row=0
/// assert_eq!(grid[10], 1.0);    // col=0, row=1
/// ```
pub fn create_index_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Decode a value produced by [`create_index_grid`] into `(col, row)`.
pub fn decode_index(value: f64) -> (usize, usize) {
    let v = value.round() as usize;
    (v / 1000, v % 1000)
}

/// Creates a temperature-like field in degrees Celsius, warmer towards
/// high columns and rows.
pub fn create_temperature_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let x_factor = col as f32 / width.max(1) as f32;
            let y_factor = row as f32 / height.max(1) as f32;
            data.push(8.0 + x_factor * 6.0 + y_factor * 6.0);
        }
    }
    data
}

/// Creates a velocity component varying along rows, in m/s.
pub fn create_velocity_grid(width: usize, height: usize, amplitude: f32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        let factor = (row as f32 / height.max(1) as f32 - 0.5) * 2.0;
        data.extend(std::iter::repeat(factor * amplitude).take(width));
    }
    data
}

/// Regularly spaced 2-D longitude/latitude arrays, row-major over
/// `(height, width)`.
///
/// Point `(row, col)` sits at `(lon0 + col * step, lat0 + row * step)`.
pub fn create_coordinate_grids(
    width: usize,
    height: usize,
    lon0: f64,
    lat0: f64,
    step: f64,
) -> (Vec<f64>, Vec<f64>) {
    let mut lon = Vec::with_capacity(width * height);
    let mut lat = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            lon.push(lon0 + col as f64 * step);
            lat.push(lat0 + row as f64 * step);
        }
    }
    (lon, lat)
}

/// Sets NaN at the given `(col, row)` positions of a row-major grid.
///
/// Out-of-range positions are ignored.
pub fn with_nans(mut data: Vec<f64>, width: usize, nan_positions: &[(usize, usize)]) -> Vec<f64> {
    for &(col, row) in nan_positions {
        if col < width {
            if let Some(v) = data.get_mut(row * width + col) {
                *v = f64::NAN;
            }
        }
    }
    data
}

/// A random star-shaped (therefore simple) polygon around `center`.
///
/// Vertices are placed at increasing angles with radii in
/// `[radius / 2, radius]`, so the ring never self-intersects.
pub fn random_star_polygon<R: Rng>(
    rng: &mut R,
    center: (f64, f64),
    radius: f64,
    vertices: usize,
) -> Vec<(f64, f64)> {
    let n = vertices.max(3);
    let mut angles: Vec<f64> = (0..n)
        .map(|k| (k as f64 + rng.gen_range(0.1..0.9)) * std::f64::consts::TAU / n as f64)
        .collect();
    angles.sort_by(f64::total_cmp);
    angles
        .into_iter()
        .map(|a| {
            let r = rng.gen_range(radius / 2.0..=radius);
            (center.0 + r * a.cos(), center.1 + r * a.sin())
        })
        .collect()
}
