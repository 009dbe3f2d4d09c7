//! End-to-end polygon subsetting of the Arakawa C fixture.

use grid_subset::{
    subset_by_polygon, subset_by_variable_names, Dataset, GridSubsetter, Polygon, SubsetConfig,
    SubsetError,
};
use test_utils::{arakawa_c_grid, assert_approx_eq, decode_index, polygon, polygons};

fn size(ds: &Dataset, dim: &str) -> usize {
    ds.size(dim).unwrap_or_else(|| panic!("missing dimension {}", dim))
}

fn value(ds: &Dataset, name: &str, index: &[usize]) -> f64 {
    ds.get(name).unwrap().get_f64(index).unwrap()
}

fn assert_staggered_sizes(ds: &Dataset) {
    assert_eq!(size(ds, "eta_rho"), size(ds, "eta_psi") + 1);
    assert_eq!(size(ds, "eta_u"), size(ds, "eta_psi") + 1);
    assert_eq!(size(ds, "eta_v"), size(ds, "eta_psi"));
    assert_eq!(size(ds, "xi_rho"), size(ds, "xi_psi") + 1);
    assert_eq!(size(ds, "xi_u"), size(ds, "xi_psi"));
    assert_eq!(size(ds, "xi_v"), size(ds, "xi_psi") + 1);
}

// ============================================================================
// Coastal polygon
// ============================================================================

#[test]
fn test_coastal_polygon_subset() {
    test_utils::init_tracing();
    let ds = arakawa_c_grid();
    let subset = subset_by_polygon(&ds, &polygon(&polygons::COASTAL)).unwrap();

    assert_staggered_sizes(&subset);

    let lon_psi = subset.get("lon_psi").unwrap();
    let lat_psi = subset.get("lat_psi").unwrap();
    assert!(lon_psi.min().unwrap() <= 6.5 && lon_psi.max().unwrap() >= 9.5);
    assert!(lat_psi.min().unwrap() <= 37.5 && lat_psi.max().unwrap() >= 40.5);

    assert!(subset.contains("u"));
    assert!(size(&subset, "xi_psi") < size(&ds, "xi_psi"));
    assert!(size(&subset, "eta_psi") < size(&ds, "eta_psi"));
}

#[test]
fn test_corner_points_sit_between_centers() {
    let ds = arakawa_c_grid();
    let subset = subset_by_polygon(&ds, &polygon(&polygons::COASTAL)).unwrap();

    let psi = value(&subset, "lon_psi", &[0, 0]);
    assert!(value(&subset, "lon_rho", &[0, 0]) < psi);
    assert!(value(&subset, "lon_rho", &[0, 1]) > psi);

    let psi = value(&subset, "lat_psi", &[0, 0]);
    assert!(value(&subset, "lat_rho", &[0, 0]) < psi);
    assert!(value(&subset, "lat_rho", &[1, 0]) > psi);

    // u shares psi longitudes and rho latitudes; v the other way round.
    assert_approx_eq!(value(&subset, "lon_u", &[0, 0]), value(&subset, "lon_psi", &[0, 0]), 1e-12);
    assert_approx_eq!(value(&subset, "lat_u", &[0, 0]), value(&subset, "lat_rho", &[0, 0]), 1e-12);
    assert_approx_eq!(value(&subset, "lon_v", &[0, 0]), value(&subset, "lon_rho", &[0, 0]), 1e-12);
    assert_approx_eq!(value(&subset, "lat_v", &[0, 0]), value(&subset, "lat_psi", &[0, 0]), 1e-12);
}

// ============================================================================
// Exact ranges
// ============================================================================

#[test]
fn test_small_square_exact_ranges() {
    // Inside psi points: xi 5..=6, eta 5..=6; one index of margin each side.
    let ds = arakawa_c_grid();
    let subset = subset_by_polygon(&ds, &polygon(&polygons::SMALL_SQUARE)).unwrap();

    assert_eq!(size(&subset, "xi_psi"), 4);
    assert_eq!(size(&subset, "eta_psi"), 4);
    assert_eq!(size(&subset, "xi_rho"), 5);
    assert_eq!(size(&subset, "eta_rho"), 5);
    assert_eq!(size(&subset, "xi_u"), 4);
    assert_eq!(size(&subset, "eta_u"), 5);
    assert_eq!(size(&subset, "xi_v"), 5);
    assert_eq!(size(&subset, "eta_v"), 4);

    assert_approx_eq!(value(&subset, "lon_psi", &[0, 0]), 7.0, 1e-12);
    assert_approx_eq!(value(&subset, "lat_psi", &[0, 0]), 38.0, 1e-12);
    assert_eq!(decode_index(value(&subset, "index_rho", &[0, 0])), (4, 4));
    assert_eq!(decode_index(value(&subset, "index_rho", &[4, 4])), (8, 8));
}

#[test]
fn test_polygon_covering_everything_keeps_full_grid() {
    let ds = arakawa_c_grid();
    let subset = subset_by_polygon(&ds, &polygon(&polygons::EVERYTHING)).unwrap();
    assert_eq!(subset, ds);
}

#[test]
fn test_unbounded_margin_keeps_full_grid() {
    let subsetter = GridSubsetter::new(SubsetConfig {
        bounding_margin: usize::MAX,
        ..SubsetConfig::default()
    })
    .unwrap();
    let ds = arakawa_c_grid();
    let subset = subsetter
        .subset_by_polygon(&ds, &polygon(&polygons::SMALL_SQUARE))
        .unwrap();
    assert_eq!(subset, ds);
}

// ============================================================================
// Pass-through and purity
// ============================================================================

#[test]
fn test_unstaggered_variables_pass_through() {
    let ds = arakawa_c_grid();
    let subset = subset_by_polygon(&ds, &polygon(&polygons::COASTAL)).unwrap();

    assert_eq!(subset.get("ocean_time"), ds.get("ocean_time"));
    assert_eq!(subset.get("dstart"), ds.get("dstart"));
    assert_eq!(subset.get("grid"), ds.get("grid"));
    assert_eq!(size(&subset, "ocean_time"), size(&ds, "ocean_time"));
    assert_eq!(subset.attrs(), ds.attrs());
}

#[test]
fn test_subset_does_not_modify_input() {
    let ds = arakawa_c_grid();
    let before = ds.clone();
    let _ = subset_by_polygon(&ds, &polygon(&polygons::COASTAL)).unwrap();
    assert_eq!(ds, before);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_polygon_outside_grid() {
    let ds = arakawa_c_grid();
    let err = subset_by_polygon(&ds, &polygon(&polygons::OUTSIDE)).unwrap_err();
    assert!(matches!(err, SubsetError::EmptySelection { .. }));
}

#[test]
fn test_degenerate_polygon_rejected() {
    let err = Polygon::new(polygons::DEGENERATE.to_vec()).unwrap_err();
    assert!(matches!(err, SubsetError::InvalidPolygon(_)));
}

#[test]
fn test_missing_topology_fails_before_classification() {
    let mut ds = Dataset::new();
    for name in ["lon_psi", "lat_psi"] {
        ds.insert_coord(name, arakawa_c_grid().get(name).unwrap().clone())
            .unwrap();
    }
    let err = subset_by_polygon(&ds, &polygon(&polygons::COASTAL)).unwrap_err();
    assert!(matches!(err, SubsetError::Topology { .. }));
}

// ============================================================================
// Composition with variable subsetting
// ============================================================================

#[test]
fn test_variable_then_polygon_equals_polygon_then_variable() {
    let ds = arakawa_c_grid();
    let poly = polygon(&polygons::COASTAL);

    let a = subset_by_polygon(&subset_by_variable_names(&ds, &["temp", "u", "v"]).unwrap(), &poly)
        .unwrap();
    let b = subset_by_variable_names(&subset_by_polygon(&ds, &poly).unwrap(), &["temp", "u", "v"])
        .unwrap();
    assert_eq!(a, b);

    assert!(a.contains("temp"));
    assert!(a.contains("u"));
    assert!(!a.contains("zeta"));
    assert!(!a.contains("h"));
    assert_staggered_sizes(&a);
}

#[test]
fn test_variable_subset_keeps_dimensions() {
    let ds = arakawa_c_grid();
    let subset = subset_by_variable_names(&ds, &["u"]).unwrap();
    assert_eq!(size(&subset, "xi_u"), size(&ds, "xi_u"));
    assert_eq!(size(&subset, "eta_rho"), size(&ds, "eta_rho"));
    assert!(subset.contains("lon_rho"));
    assert!(!subset.contains("temp"));
}

#[test]
fn test_variable_subset_unknown_name() {
    let ds = arakawa_c_grid();
    let err = subset_by_variable_names(&ds, &["salt"]).unwrap_err();
    assert!(matches!(err, SubsetError::UnknownVariable(name) if name == "salt"));
}
