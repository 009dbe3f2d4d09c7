//! Common test fixtures for grid subsetting tests.
//!
//! The main fixture is a small ROMS-style Arakawa C grid: psi points (cell
//! corners) on a regular 0.5 degree lattice, rho points (cell centers)
//! offset by half a step with one extra point per axis, u points sharing
//! psi longitudes and rho latitudes, and v points the other way round.

use grid_subset::{Attributes, Dataset, Polygon, Variable, GRID_TOPOLOGY_ROLE};

use crate::generators::{
    create_coordinate_grids, create_index_grid, create_temperature_grid, create_velocity_grid,
};

/// Dimensions of the Arakawa C fixture.
pub mod arakawa {
    /// Psi points along xi.
    pub const NX_PSI: usize = 15;
    /// Psi points along eta.
    pub const NY_PSI: usize = 13;
    /// Longitude of psi point (0, 0).
    pub const LON0: f64 = 5.0;
    /// Latitude of psi point (0, 0).
    pub const LAT0: f64 = 36.0;
    /// Grid spacing in degrees.
    pub const STEP: f64 = 0.5;
    /// Time steps.
    pub const NT: usize = 2;
}

/// Canned polygons as `(lon, lat)` rings.
pub mod polygons {
    /// Closed ring over the middle of the Arakawa fixture.
    pub const COASTAL: [(f64, f64); 5] = [
        (6.5, 37.5),
        (6.5, 39.5),
        (9.5, 40.5),
        (8.5, 37.5),
        (6.5, 37.5),
    ];

    /// Small square containing only a handful of psi points.
    pub const SMALL_SQUARE: [(f64, f64); 4] = [(7.2, 38.2), (8.3, 38.2), (8.3, 39.3), (7.2, 39.3)];

    /// Far away from the fixture.
    pub const OUTSIDE: [(f64, f64); 4] = [(-40.0, -10.0), (-39.0, -10.0), (-39.0, -9.0), (-40.0, -9.0)];

    /// Covers the whole fixture.
    pub const EVERYTHING: [(f64, f64); 4] = [(0.0, 30.0), (20.0, 30.0), (20.0, 50.0), (0.0, 50.0)];

    /// Collinear, zero area.
    pub const DEGENERATE: [(f64, f64); 3] = [(6.0, 37.0), (7.0, 38.0), (8.0, 39.0)];
}

/// Build a [`Polygon`] from a canned ring.
///
/// # Panics
///
/// Panics if the ring is not a valid polygon.
pub fn polygon(vertices: &[(f64, f64)]) -> Polygon {
    Polygon::new(vertices.to_vec()).expect("fixture polygon is valid")
}

/// SGRID attributes of a ROMS grid topology variable.
pub fn roms_topology_attrs() -> Attributes {
    let mut attrs = Attributes::new();
    for (key, value) in [
        ("cf_role", GRID_TOPOLOGY_ROLE),
        ("topology_dimension", "2"),
        ("node_dimensions", "xi_psi eta_psi"),
        (
            "face_dimensions",
            "xi_rho: xi_psi (padding: both) eta_rho: eta_psi (padding: both)",
        ),
        ("edge1_dimensions", "xi_u: xi_psi eta_u: eta_psi (padding: both)"),
        ("edge2_dimensions", "xi_v: xi_psi (padding: both) eta_v: eta_psi"),
        ("node_coordinates", "lon_psi lat_psi"),
        ("face_coordinates", "lon_rho lat_rho"),
        ("edge1_coordinates", "lon_u lat_u"),
        ("edge2_coordinates", "lon_v lat_v"),
    ] {
        attrs.insert(key.to_string(), value.into());
    }
    attrs
}

/// The Arakawa C fixture at its default size.
pub fn arakawa_c_grid() -> Dataset {
    arakawa_c_grid_sized(arakawa::NX_PSI, arakawa::NY_PSI)
}

/// An Arakawa C grid with `nx` by `ny` psi points.
///
/// Variables:
/// - coordinates `lon_*`/`lat_*` for psi, rho, u and v, dims `(eta, xi)`
/// - `ocean_time` (1-D coordinate)
/// - `temp`, `zeta` on rho, `u` on u, `v` on v, all over `ocean_time`
/// - `index_rho`, an index-encoding grid on rho (see
///   [`crate::create_index_grid`])
/// - `h` bathymetry on rho, `mask_rho` (i32) on rho
/// - scalars `grid` (topology) and `dstart`
///
/// # Panics
///
/// Panics if `nx` or `ny` is zero.
pub fn arakawa_c_grid_sized(nx: usize, ny: usize) -> Dataset {
    assert!(nx > 0 && ny > 0, "grid needs at least one psi point per axis");
    use arakawa::{LAT0, LON0, NT, STEP};
    let half = STEP / 2.0;

    let mut ds = Dataset::new();
    ds.set_attr("title", "Arakawa C test grid");

    let mut grid = Variable::scalar(vec![1i32]).expect("scalar");
    for (key, value) in roms_topology_attrs() {
        grid = grid.with_attr(key, value);
    }
    ds.insert("grid", grid).expect("insert grid");

    // (suffix, xi size, eta size, lon origin, lat origin)
    let locations = [
        ("psi", nx, ny, LON0, LAT0),
        ("rho", nx + 1, ny + 1, LON0 - half, LAT0 - half),
        ("u", nx, ny + 1, LON0, LAT0 - half),
        ("v", nx + 1, ny, LON0 - half, LAT0),
    ];
    for (suffix, w, h, lon0, lat0) in locations {
        let (lon, lat) = create_coordinate_grids(w, h, lon0, lat0, STEP);
        let dims = [format!("eta_{}", suffix), format!("xi_{}", suffix)];
        let lon = Variable::new(dims.clone(), vec![h, w], lon)
            .expect("lon")
            .with_attr("units", "degree_east");
        let lat = Variable::new(dims, vec![h, w], lat)
            .expect("lat")
            .with_attr("units", "degree_north");
        ds.insert_coord(format!("lon_{}", suffix), lon).expect("insert lon");
        ds.insert_coord(format!("lat_{}", suffix), lat).expect("insert lat");
    }

    let times: Vec<f64> = (0..NT).map(|t| t as f64 * 3600.0).collect();
    ds.insert_coord(
        "ocean_time",
        Variable::new(["ocean_time"], vec![NT], times)
            .expect("ocean_time")
            .with_attr("units", "seconds since 2024-01-01"),
    )
    .expect("insert ocean_time");

    let timed = |field: Vec<f32>| -> Vec<f32> {
        let mut data = Vec::with_capacity(NT * field.len());
        for t in 0..NT {
            data.extend(field.iter().map(|v| v + t as f32));
        }
        data
    };
    let (xr, er) = (nx + 1, ny + 1);
    let fields = [
        ("temp", "rho", xr, er, timed(create_temperature_grid(xr, er))),
        ("zeta", "rho", xr, er, timed(create_velocity_grid(xr, er, 0.5))),
        ("u", "u", nx, er, timed(create_velocity_grid(nx, er, 1.2))),
        ("v", "v", xr, ny, timed(create_velocity_grid(xr, ny, 0.8))),
    ];
    for (name, suffix, w, h, data) in fields {
        let dims = [
            "ocean_time".to_string(),
            format!("eta_{}", suffix),
            format!("xi_{}", suffix),
        ];
        let variable = Variable::new(dims, vec![NT, h, w], data).expect(name);
        ds.insert(name, variable).expect("insert field");
    }

    ds.insert(
        "index_rho",
        Variable::new(["eta_rho", "xi_rho"], vec![er, xr], create_index_grid(xr, er))
            .expect("index_rho"),
    )
    .expect("insert index_rho");

    let depth: Vec<f64> = (0..er * xr).map(|k| 10.0 + (k % xr) as f64 * 25.0).collect();
    ds.insert(
        "h",
        Variable::new(["eta_rho", "xi_rho"], vec![er, xr], depth)
            .expect("h")
            .with_attr("units", "meter"),
    )
    .expect("insert h");

    ds.insert(
        "mask_rho",
        Variable::new(["eta_rho", "xi_rho"], vec![er, xr], vec![1i32; er * xr])
            .expect("mask_rho"),
    )
    .expect("insert mask_rho");

    ds.insert("dstart", Variable::scalar(vec![0.0f64]).expect("dstart"))
        .expect("insert dstart");

    ds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arakawa_sizes() {
        let ds = arakawa_c_grid();
        let sizes = ds.sizes();
        assert_eq!(sizes["xi_psi"], arakawa::NX_PSI);
        assert_eq!(sizes["eta_psi"], arakawa::NY_PSI);
        assert_eq!(sizes["xi_rho"], arakawa::NX_PSI + 1);
        assert_eq!(sizes["eta_rho"], arakawa::NY_PSI + 1);
        assert_eq!(sizes["xi_u"], arakawa::NX_PSI);
        assert_eq!(sizes["eta_u"], arakawa::NY_PSI + 1);
        assert_eq!(sizes["xi_v"], arakawa::NX_PSI + 1);
        assert_eq!(sizes["eta_v"], arakawa::NY_PSI);
        assert_eq!(sizes["ocean_time"], arakawa::NT);
    }

    #[test]
    fn test_arakawa_has_topology() {
        let ds = arakawa_c_grid();
        let (name, _) = ds.topology_variable().unwrap();
        assert_eq!(name, "grid");
    }

    #[test]
    fn test_canned_polygons() {
        polygon(&polygons::COASTAL);
        polygon(&polygons::SMALL_SQUARE);
        polygon(&polygons::EVERYTHING);
        assert!(Polygon::new(polygons::DEGENERATE.to_vec()).is_err());
    }
}
