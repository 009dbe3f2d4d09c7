//! Selector construction, reuse and serialization.

use std::collections::BTreeSet;

use grid_subset::selector::{content_digest, hashname};
use grid_subset::{
    GridTopology, Location, Padding, PolygonSelector, Selectable, Selector, SubsetError,
    VariableNameSelector,
};
use test_utils::{arakawa_c_grid, arakawa_c_grid_sized, polygon, polygons};

fn coastal_selector() -> PolygonSelector {
    let ds = arakawa_c_grid();
    let topology = GridTopology::from_dataset(&ds).unwrap();
    PolygonSelector::from_dataset(
        "coastal",
        polygon(&polygons::COASTAL),
        &topology,
        &ds,
        1,
    )
    .unwrap()
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_selector_covers_all_locations() {
    let selector = coastal_selector();
    let locations: BTreeSet<Location> =
        selector.locations().iter().map(|s| s.location).collect();
    assert_eq!(locations.len(), 4);

    let ranges = selector.ranges();
    let topology = GridTopology::from_dataset(&arakawa_c_grid()).unwrap();
    for dim in topology.staggered_dims() {
        assert!(ranges.contains_key(dim), "no range for {}", dim);
    }
}

#[test]
fn test_construction_is_deterministic() {
    assert_eq!(coastal_selector(), coastal_selector());
}

#[test]
fn test_equality_depends_on_criterion() {
    let ds = arakawa_c_grid();
    let topology = GridTopology::from_dataset(&ds).unwrap();
    let other = PolygonSelector::from_dataset(
        "coastal",
        polygon(&polygons::SMALL_SQUARE),
        &topology,
        &ds,
        1,
    )
    .unwrap();
    assert_ne!(other, coastal_selector());
    assert_ne!(other.content_id(), coastal_selector().content_id());
}

// ============================================================================
// Application
// ============================================================================

#[test]
fn test_select_is_idempotent() {
    let ds = arakawa_c_grid();
    let before = ds.clone();
    let selector = coastal_selector();

    let first = selector.select(&ds).unwrap();
    let second = selector.select(&ds).unwrap();
    assert_eq!(first, second);
    assert_eq!(ds, before);
}

#[test]
fn test_selector_applies_to_any_dataset_on_the_same_grid() {
    let ds = arakawa_c_grid();
    let temp_only = ds.select_variables(&["temp"]).unwrap();
    let selector = coastal_selector();

    let full = selector.select(&ds).unwrap();
    let partial = selector.select(&temp_only).unwrap();
    assert_eq!(full.get("temp"), partial.get("temp"));
}

#[test]
fn test_selector_rejects_other_grid_shape() {
    let selector = coastal_selector();
    let bigger = arakawa_c_grid_sized(20, 13);
    let err = selector.select(&bigger).unwrap_err();
    match err {
        SubsetError::TopologyMismatch { expected, actual, .. } => {
            assert_ne!(expected, actual);
        }
        other => panic!("expected topology mismatch, got {:?}", other),
    }
}

#[test]
fn test_selector_rejects_grid_with_other_padding() {
    let selector = coastal_selector();
    let mut ds = arakawa_c_grid();
    let grid = ds.get("grid").unwrap().clone().with_attr(
        "face_dimensions",
        "xi_rho: xi_psi (padding: low) eta_rho: eta_psi (padding: low)",
    );
    ds.insert("grid", grid).unwrap();

    match selector.select(&ds).unwrap_err() {
        SubsetError::PaddingMismatch { dim, expected, actual } => {
            assert_eq!(dim, "xi_rho");
            assert_eq!(expected, Padding::Both);
            assert_eq!(actual, Padding::Low);
        }
        other => panic!("expected padding mismatch, got {:?}", other),
    }
}

#[test]
fn test_selector_rejects_its_own_output() {
    let ds = arakawa_c_grid();
    let selector: Selector = coastal_selector().into();
    let subset = selector.select(&ds).unwrap();
    assert!(selector.matches(&ds));
    assert!(!selector.matches(&subset));
    assert!(matches!(
        selector.select(&subset),
        Err(SubsetError::TopologyMismatch { .. })
    ));
}

// ============================================================================
// Serialization
// ============================================================================

#[test]
fn test_polygon_selector_bytes_roundtrip() {
    let selector: Selector = coastal_selector().into();
    let bytes = selector.to_bytes().unwrap();
    let restored = Selector::from_bytes(&bytes).unwrap();
    assert_eq!(restored, selector);

    let ds = arakawa_c_grid();
    assert_eq!(restored.select(&ds).unwrap(), selector.select(&ds).unwrap());
}

#[test]
fn test_variable_selector_bytes_roundtrip() {
    let selector: Selector = VariableNameSelector::new("vars", ["u", "temp"]).into();
    let restored = Selector::from_bytes(&selector.to_bytes().unwrap()).unwrap();
    assert_eq!(restored, selector);
}

#[test]
fn test_truncated_bytes_never_decode() {
    let bytes = Selector::from(coastal_selector()).to_bytes().unwrap();
    for len in [0, 3, 4, bytes.len() / 2, bytes.len() - 1] {
        assert!(
            matches!(
                Selector::from_bytes(&bytes[..len]),
                Err(SubsetError::Deserialization(_))
            ),
            "prefix of length {} decoded",
            len
        );
    }
}

// ============================================================================
// Naming
// ============================================================================

#[test]
fn test_content_id_and_hashname() {
    let selector: Selector = coastal_selector().into();
    let expected = content_digest(&polygon(&polygons::COASTAL).canonical_bytes());
    assert_eq!(selector.content_id(), expected);
    assert_eq!(selector.content_id().len(), 64);
    assert_eq!(selector.hashname(), hashname("coastal", &expected));
    assert!(selector.hashname().starts_with("coastal_"));
    assert!(selector.hashname().ends_with(".sel"));
}

#[test]
fn test_variable_selector_through_enum() {
    let ds = arakawa_c_grid();
    let selector: Selector = VariableNameSelector::new("vars", ["temp"]).into();
    assert!(selector.matches(&ds));
    let subset = selector.select(&ds).unwrap();
    assert!(subset.contains("temp"));
    assert!(!subset.contains("u"));

    let missing: Selector = VariableNameSelector::new("vars", ["salt"]).into();
    assert!(!missing.matches(&ds));
}
