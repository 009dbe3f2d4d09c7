//! SGRID topology resolution.
//!
//! A staggered grid names its layout in the attributes of a single topology
//! variable. For each location (`node`, `edge1`, `edge2`, `face`) this module
//! reads:
//!
//! ```text
//! node_dimensions   = "xi_psi eta_psi"
//! face_dimensions   = "xi_rho: xi_psi (padding: both) eta_rho: eta_psi (padding: both)"
//! edge1_dimensions  = "xi_u: xi_psi eta_u: eta_psi (padding: both)"
//! face_coordinates  = "lon_rho lat_rho"
//! face_padding      = "xi_rho: both, eta_rho: both"     (optional)
//! ```
//!
//! and produces a [`LocationDescriptor`]: the two dimension names in declared
//! order, the two coordinate-variable names, and a padding policy per
//! dimension. Unannotated dimensions get [`Padding::None`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dataset::{Attributes, Dataset};
use crate::error::{Result, SubsetError};

/// A staggered grid location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Location {
    /// Cell corners (psi points); the reference location.
    Node,
    /// First edge type (u points).
    Edge1,
    /// Second edge type (v points).
    Edge2,
    /// Cell centers (rho points).
    Face,
}

impl Location {
    /// All locations, reference location first.
    pub const ALL: [Location; 4] = [Self::Node, Self::Edge1, Self::Edge2, Self::Face];

    /// The SGRID attribute prefix for this location.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Edge1 => "edge1",
            Self::Edge2 => "edge2",
            Self::Face => "face",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = SubsetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "node" => Ok(Self::Node),
            "edge1" => Ok(Self::Edge1),
            "edge2" => Ok(Self::Edge2),
            "face" => Ok(Self::Face),
            other => Err(SubsetError::topology(other, "unknown location code")),
        }
    }
}

/// How a location's extent along one axis relates to the node extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Padding {
    /// Same number of points as the node axis.
    #[default]
    None,
    /// One extra point below the first node.
    Low,
    /// One extra point above the last node.
    High,
    /// One extra point bracketing the nodes.
    Both,
}

impl Padding {
    /// Parse a policy word.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "low" => Some(Self::Low),
            "high" => Some(Self::High),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::High => "high",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved layout of one staggered location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDescriptor {
    pub location: Location,
    /// Dimension names in declared order (xi-like first, eta-like second).
    pub dims: [String; 2],
    /// Coordinate variable names (longitude-like first, latitude-like second).
    pub coords: [String; 2],
    /// Padding policy for each entry of `dims`.
    pub padding: BTreeMap<String, Padding>,
}

impl LocationDescriptor {
    /// Padding for a dimension; `None` for dimensions this location does not use.
    pub fn padding_for(&self, dim: &str) -> Padding {
        self.padding.get(dim).copied().unwrap_or_default()
    }
}

/// Resolve one location from the topology variable's attributes.
pub fn resolve(attrs: &Attributes, location: Location) -> Result<LocationDescriptor> {
    let dims_key = format!("{}_dimensions", location);
    let dims_attr = string_attr(attrs, &dims_key, location)?
        .ok_or_else(|| SubsetError::topology(location.as_str(), format!("missing '{}'", dims_key)))?;

    let entries = parse_dimensions(dims_attr, location)?;
    if entries.len() != 2 {
        return Err(SubsetError::topology(
            location.as_str(),
            format!(
                "'{}' must name exactly two dimensions, found {}: {:?}",
                dims_key,
                entries.len(),
                dims_attr
            ),
        ));
    }
    if entries[0].0 == entries[1].0 {
        return Err(SubsetError::topology(
            location.as_str(),
            format!("'{}' repeats dimension '{}'", dims_key, entries[0].0),
        ));
    }

    let dims = [entries[0].0.clone(), entries[1].0.clone()];
    let mut padding: BTreeMap<String, Padding> = entries
        .into_iter()
        .map(|(dim, pad)| (dim, pad.unwrap_or_default()))
        .collect();

    let padding_key = format!("{}_padding", location);
    if let Some(extra) = string_attr(attrs, &padding_key, location)? {
        for (dim, pad) in parse_padding_list(extra, location)? {
            if !padding.contains_key(&dim) {
                return Err(SubsetError::topology(
                    location.as_str(),
                    format!(
                        "'{}' annotates '{}', which is not one of {:?}",
                        padding_key, dim, dims
                    ),
                ));
            }
            padding.insert(dim, pad);
        }
    }

    let coords = resolve_coordinates(attrs, location, &dims)?;

    tracing::debug!(
        location = %location,
        dims = ?dims,
        coords = ?coords,
        "resolved grid location"
    );

    Ok(LocationDescriptor {
        location,
        dims,
        coords,
        padding,
    })
}

fn string_attr<'a>(attrs: &'a Attributes, key: &str, location: Location) -> Result<Option<&'a str>> {
    match attrs.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(SubsetError::topology(
            location.as_str(),
            format!("'{}' must be a string, got {}", key, other),
        )),
    }
}

/// Split into tokens, detaching parentheses and colons.
fn tokenize(s: &str) -> Vec<String> {
    s.replace('(', " ( ")
        .replace(')', " ) ")
        .replace(':', ": ")
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_policy(word: Option<&String>, location: Location) -> Result<Padding> {
    let word = word.ok_or_else(|| {
        SubsetError::topology(location.as_str(), "padding annotation without a policy")
    })?;
    Padding::parse(word).ok_or_else(|| {
        SubsetError::topology(
            location.as_str(),
            format!("unknown padding policy '{}'", word),
        )
    })
}

/// Parse `<dim>[: <node_dim>] [(padding: <policy>)]` entries.
fn parse_dimensions(s: &str, location: Location) -> Result<Vec<(String, Option<Padding>)>> {
    let tokens = tokenize(s);
    let mut entries: Vec<(String, Option<Padding>)> = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        if token == "(" {
            if tokens.get(i + 1).map(String::as_str) != Some("padding:") {
                return Err(SubsetError::topology(
                    location.as_str(),
                    format!("expected '(padding: <policy>)' in {:?}", s),
                ));
            }
            let pad = parse_policy(tokens.get(i + 2), location)?;
            if tokens.get(i + 3).map(String::as_str) != Some(")") {
                return Err(SubsetError::topology(
                    location.as_str(),
                    format!("unclosed padding annotation in {:?}", s),
                ));
            }
            match entries.last_mut() {
                Some((_, slot @ None)) => *slot = Some(pad),
                Some((dim, Some(_))) => {
                    return Err(SubsetError::topology(
                        location.as_str(),
                        format!("dimension '{}' has two padding annotations", dim),
                    ))
                }
                None => {
                    return Err(SubsetError::topology(
                        location.as_str(),
                        format!("padding annotation before any dimension in {:?}", s),
                    ))
                }
            }
            i += 4;
        } else if let Some(dim) = token.strip_suffix(':') {
            // `<dim>: <node_dim>`; the node dimension is implied by position.
            match tokens.get(i + 1) {
                Some(node_dim) if node_dim != "(" && node_dim != ")" && !node_dim.ends_with(':') => {}
                _ => {
                    return Err(SubsetError::topology(
                        location.as_str(),
                        format!("'{}:' is not followed by a node dimension in {:?}", dim, s),
                    ))
                }
            }
            entries.push((dim.to_string(), None));
            i += 2;
        } else if token == ")" {
            return Err(SubsetError::topology(
                location.as_str(),
                format!("unbalanced ')' in {:?}", s),
            ));
        } else {
            entries.push((token.clone(), None));
            i += 1;
        }
    }

    Ok(entries)
}

/// Parse a `<dim>: <policy>` list.
fn parse_padding_list(s: &str, location: Location) -> Result<Vec<(String, Padding)>> {
    let tokens = tokenize(s);
    let mut out = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let dim = tokens[i].strip_suffix(':').ok_or_else(|| {
            SubsetError::topology(
                location.as_str(),
                format!("expected '<dim>: <policy>' in padding list {:?}", s),
            )
        })?;
        let pad = parse_policy(tokens.get(i + 1), location)?;
        out.push((dim.to_string(), pad));
        i += 2;
    }
    Ok(out)
}

fn resolve_coordinates(attrs: &Attributes, location: Location, dims: &[String; 2]) -> Result<[String; 2]> {
    let key = format!("{}_coordinates", location);
    if let Some(s) = string_attr(attrs, &key, location)? {
        let names: Vec<&str> = s.split_whitespace().collect();
        return match names.as_slice() {
            [lon, lat] => Ok([lon.to_string(), lat.to_string()]),
            _ => Err(SubsetError::topology(
                location.as_str(),
                format!("'{}' must name exactly two variables, got {:?}", key, s),
            )),
        };
    }

    // lon_<suffix>/lat_<suffix>, suffix taken from the xi dimension.
    match dims[0].split_once('_') {
        Some((_, suffix)) if !suffix.is_empty() => {
            Ok([format!("lon_{}", suffix), format!("lat_{}", suffix)])
        }
        _ => Err(SubsetError::topology(
            location.as_str(),
            format!(
                "no '{}' attribute and dimension '{}' has no suffix to derive coordinate names from",
                key, dims[0]
            ),
        )),
    }
}

/// All four resolved locations of a grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridTopology {
    variable: String,
    /// Indexed by `Location as usize`.
    locations: [LocationDescriptor; 4],
}

impl GridTopology {
    /// Resolve every location from a topology variable's attributes.
    pub fn from_attributes(variable: impl Into<String>, attrs: &Attributes) -> Result<Self> {
        let locations = [
            resolve(attrs, Location::Node)?,
            resolve(attrs, Location::Edge1)?,
            resolve(attrs, Location::Edge2)?,
            resolve(attrs, Location::Face)?,
        ];
        Ok(Self {
            variable: variable.into(),
            locations,
        })
    }

    /// Find the topology variable in a dataset and resolve it.
    pub fn from_dataset(ds: &Dataset) -> Result<Self> {
        let (name, variable) = ds.topology_variable().ok_or_else(|| {
            SubsetError::topology("grid", "dataset has no variable with cf_role = 'grid_topology'")
        })?;
        Self::from_attributes(name, variable.attrs())
    }

    /// Name of the topology variable.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn location(&self, location: Location) -> &LocationDescriptor {
        &self.locations[location as usize]
    }

    pub fn node(&self) -> &LocationDescriptor {
        self.location(Location::Node)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocationDescriptor> {
        self.locations.iter()
    }

    /// Every dimension used by any location.
    pub fn staggered_dims(&self) -> BTreeSet<&str> {
        self.iter()
            .flat_map(|d| d.dims.iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roms_attrs() -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("cf_role".into(), "grid_topology".into());
        attrs.insert("node_dimensions".into(), "xi_psi eta_psi".into());
        attrs.insert(
            "face_dimensions".into(),
            "xi_rho: xi_psi (padding: both) eta_rho: eta_psi (padding: both)".into(),
        );
        attrs.insert(
            "edge1_dimensions".into(),
            "xi_u: xi_psi eta_u: eta_psi (padding: both)".into(),
        );
        attrs.insert(
            "edge2_dimensions".into(),
            "xi_v: xi_psi (padding: both) eta_v: eta_psi".into(),
        );
        attrs.insert("node_coordinates".into(), "lon_psi lat_psi".into());
        attrs.insert("face_coordinates".into(), "lon_rho lat_rho".into());
        attrs.insert("edge1_coordinates".into(), "lon_u lat_u".into());
        attrs.insert("edge2_coordinates".into(), "lon_v lat_v".into());
        attrs
    }

    fn padding(pairs: &[(&str, Padding)]) -> BTreeMap<String, Padding> {
        pairs.iter().map(|(d, p)| (d.to_string(), *p)).collect()
    }

    #[test]
    fn test_resolve_node() {
        let node = resolve(&roms_attrs(), Location::Node).unwrap();
        assert_eq!(node.dims, ["xi_psi".to_string(), "eta_psi".to_string()]);
        assert_eq!(node.coords, ["lon_psi".to_string(), "lat_psi".to_string()]);
        assert_eq!(
            node.padding,
            padding(&[("xi_psi", Padding::None), ("eta_psi", Padding::None)])
        );
    }

    #[test]
    fn test_resolve_face() {
        let face = resolve(&roms_attrs(), Location::Face).unwrap();
        assert_eq!(face.dims, ["xi_rho".to_string(), "eta_rho".to_string()]);
        assert_eq!(
            face.padding,
            padding(&[("xi_rho", Padding::Both), ("eta_rho", Padding::Both)])
        );
    }

    #[test]
    fn test_resolve_edges_pad_one_axis() {
        let edge1 = resolve(&roms_attrs(), Location::Edge1).unwrap();
        assert_eq!(edge1.dims, ["xi_u".to_string(), "eta_u".to_string()]);
        assert_eq!(
            edge1.padding,
            padding(&[("eta_u", Padding::Both), ("xi_u", Padding::None)])
        );

        let edge2 = resolve(&roms_attrs(), Location::Edge2).unwrap();
        assert_eq!(edge2.dims, ["xi_v".to_string(), "eta_v".to_string()]);
        assert_eq!(
            edge2.padding,
            padding(&[("xi_v", Padding::Both), ("eta_v", Padding::None)])
        );
    }

    #[test]
    fn test_separate_padding_attribute() {
        let mut attrs = roms_attrs();
        attrs.insert("edge1_dimensions".into(), "xi_u eta_u".into());
        attrs.insert("edge1_padding".into(), "eta_u: high, xi_u: low".into());
        let edge1 = resolve(&attrs, Location::Edge1).unwrap();
        assert_eq!(edge1.padding_for("eta_u"), Padding::High);
        assert_eq!(edge1.padding_for("xi_u"), Padding::Low);
    }

    #[test]
    fn test_padding_for_foreign_dim_fails() {
        let mut attrs = roms_attrs();
        attrs.insert("face_padding".into(), "xi_psi: both".into());
        let err = resolve(&attrs, Location::Face).unwrap_err();
        assert!(matches!(err, SubsetError::Topology { .. }));
    }

    #[test]
    fn test_missing_location_fails() {
        let mut attrs = roms_attrs();
        attrs.remove("edge2_dimensions");
        assert!(matches!(
            resolve(&attrs, Location::Edge2),
            Err(SubsetError::Topology { ref location, .. }) if location == "edge2"
        ));
    }

    #[test]
    fn test_malformed_dimensions_fail() {
        let mut attrs = roms_attrs();
        attrs.insert("node_dimensions".into(), "xi_psi".into());
        assert!(resolve(&attrs, Location::Node).is_err());

        attrs.insert("node_dimensions".into(), "a b c".into());
        assert!(resolve(&attrs, Location::Node).is_err());

        attrs.insert("node_dimensions".into(), "a (padding: sideways) b".into());
        assert!(resolve(&attrs, Location::Node).is_err());

        attrs.insert("node_dimensions".into(), "(padding: both) a b".into());
        assert!(resolve(&attrs, Location::Node).is_err());

        attrs.insert("node_dimensions".into(), serde_json::json!(["a", "b"]));
        assert!(resolve(&attrs, Location::Node).is_err());
    }

    #[test]
    fn test_coordinates_fall_back_to_naming_convention() {
        let mut attrs = roms_attrs();
        attrs.remove("face_coordinates");
        let face = resolve(&attrs, Location::Face).unwrap();
        assert_eq!(face.coords, ["lon_rho".to_string(), "lat_rho".to_string()]);
    }

    #[test]
    fn test_grid_topology_from_attributes() {
        let topology = GridTopology::from_attributes("grid", &roms_attrs()).unwrap();
        assert_eq!(topology.variable(), "grid");
        assert_eq!(topology.iter().count(), 4);
        assert_eq!(topology.staggered_dims().len(), 8);
        assert_eq!(topology.node().location, Location::Node);
    }

    #[test]
    fn test_location_parse() {
        assert_eq!("edge1".parse::<Location>().unwrap(), Location::Edge1);
        assert!("corner".parse::<Location>().is_err());
    }
}
