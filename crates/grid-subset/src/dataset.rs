//! In-memory labeled dataset.
//!
//! A [`Dataset`] is a set of named [`Variable`]s sharing a namespace of
//! dimensions. Each variable stores its values row-major (last dimension
//! varies fastest) together with an attribute bag, the same way array
//! attributes are carried through the rest of the grid stack.
//!
//! Datasets are values: [`Dataset::isel`] and [`Dataset::select_variables`]
//! build new datasets and never touch the receiver.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SubsetError};

/// Attribute bag attached to variables and datasets.
pub type Attributes = Map<String, Value>;

/// Attribute value marking the SGRID topology variable.
pub const GRID_TOPOLOGY_ROLE: &str = "grid_topology";

/// Typed, row-major array storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
}

impl ArrayData {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::I32(v) => v.len(),
        }
    }

    /// Check if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the element type.
    pub fn dtype(&self) -> &'static str {
        match self {
            Self::F32(_) => "float32",
            Self::F64(_) => "float64",
            Self::I32(_) => "int32",
        }
    }

    /// Read one element as f64.
    pub fn get_f64(&self, flat_index: usize) -> Option<f64> {
        match self {
            Self::F32(v) => v.get(flat_index).map(|x| *x as f64),
            Self::F64(v) => v.get(flat_index).copied(),
            Self::I32(v) => v.get(flat_index).map(|x| *x as f64),
        }
    }

    /// Copy all elements out as f64.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            Self::F32(v) => v.iter().map(|x| *x as f64).collect(),
            Self::F64(v) => v.clone(),
            Self::I32(v) => v.iter().map(|x| *x as f64).collect(),
        }
    }

    fn slice(&self, shape: &[usize], ranges: &[Range<usize>]) -> Self {
        match self {
            Self::F32(v) => Self::F32(slice_row_major(v, shape, ranges)),
            Self::F64(v) => Self::F64(slice_row_major(v, shape, ranges)),
            Self::I32(v) => Self::I32(slice_row_major(v, shape, ranges)),
        }
    }
}

impl From<Vec<f32>> for ArrayData {
    fn from(v: Vec<f32>) -> Self {
        Self::F32(v)
    }
}

impl From<Vec<f64>> for ArrayData {
    fn from(v: Vec<f64>) -> Self {
        Self::F64(v)
    }
}

impl From<Vec<i32>> for ArrayData {
    fn from(v: Vec<i32>) -> Self {
        Self::I32(v)
    }
}

/// Extract the hyper-rectangle `ranges` from row-major `data` of `shape`.
///
/// Ranges must already be validated against `shape`.
fn slice_row_major<T: Copy>(data: &[T], shape: &[usize], ranges: &[Range<usize>]) -> Vec<T> {
    let ndim = shape.len();
    if ndim == 0 {
        return data.to_vec();
    }

    let mut strides = vec![1usize; ndim];
    for axis in (0..ndim - 1).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }

    let out_len: usize = ranges.iter().map(|r| r.len()).product();
    let mut out = Vec::with_capacity(out_len);
    if out_len == 0 {
        return out;
    }

    // Contiguous runs along the last axis, odometer over the outer axes.
    let inner = ranges[ndim - 1].clone();
    let mut counter: Vec<usize> = ranges[..ndim - 1].iter().map(|r| r.start).collect();
    loop {
        let base: usize = counter.iter().zip(&strides).map(|(i, s)| i * s).sum();
        out.extend_from_slice(&data[base + inner.start..base + inner.end]);

        let mut axis = ndim - 1;
        loop {
            if axis == 0 {
                return out;
            }
            axis -= 1;
            counter[axis] += 1;
            if counter[axis] < ranges[axis].end {
                break;
            }
            counter[axis] = ranges[axis].start;
        }
    }
}

/// A named-dimension array with attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    dims: Vec<String>,
    shape: Vec<usize>,
    data: ArrayData,
    attrs: Attributes,
}

impl Variable {
    /// Create a variable, checking that dims, shape and data agree.
    pub fn new<S: Into<String>>(
        dims: impl IntoIterator<Item = S>,
        shape: Vec<usize>,
        data: impl Into<ArrayData>,
    ) -> Result<Self> {
        let dims: Vec<String> = dims.into_iter().map(Into::into).collect();
        let data = data.into();

        if dims.len() != shape.len() {
            return Err(SubsetError::dataset(format!(
                "{} dimension names for a {}-d shape",
                dims.len(),
                shape.len()
            )));
        }
        let unique: BTreeSet<&String> = dims.iter().collect();
        if unique.len() != dims.len() {
            return Err(SubsetError::dataset(format!(
                "repeated dimension name in {:?}",
                dims
            )));
        }
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(SubsetError::dataset(format!(
                "shape {:?} needs {} values, got {}",
                shape,
                expected,
                data.len()
            )));
        }

        Ok(Self {
            dims,
            shape,
            data,
            attrs: Attributes::new(),
        })
    }

    /// Create a zero-dimensional variable holding one value.
    pub fn scalar(data: impl Into<ArrayData>) -> Result<Self> {
        Self::new(Vec::<String>::new(), Vec::new(), data)
    }

    /// Attach an attribute (builder style).
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Get a string attribute.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    /// Length of the named dimension, if this variable carries it.
    pub fn size_of(&self, dim: &str) -> Option<usize> {
        self.dims
            .iter()
            .position(|d| d == dim)
            .map(|axis| self.shape[axis])
    }

    /// Read the element at a multi-index as f64.
    pub fn get_f64(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0usize;
        for (i, n) in index.iter().zip(&self.shape) {
            if i >= n {
                return None;
            }
            flat = flat * n + i;
        }
        self.data.get_f64(flat)
    }

    /// Minimum finite value, ignoring NaN.
    pub fn min(&self) -> Option<f64> {
        self.data
            .to_f64_vec()
            .into_iter()
            .filter(|v| !v.is_nan())
            .reduce(f64::min)
    }

    /// Maximum finite value, ignoring NaN.
    pub fn max(&self) -> Option<f64> {
        self.data
            .to_f64_vec()
            .into_iter()
            .filter(|v| !v.is_nan())
            .reduce(f64::max)
    }

    fn isel(&self, ranges: &BTreeMap<String, Range<usize>>) -> Result<Self> {
        if !self.dims.iter().any(|d| ranges.contains_key(d)) {
            return Ok(self.clone());
        }

        let mut axis_ranges = Vec::with_capacity(self.dims.len());
        for (dim, &n) in self.dims.iter().zip(&self.shape) {
            let range = ranges.get(dim).cloned().unwrap_or(0..n);
            if range.start > range.end || range.end > n {
                return Err(SubsetError::dataset(format!(
                    "range {:?} out of bounds for dimension '{}' of size {}",
                    range, dim, n
                )));
            }
            axis_ranges.push(range);
        }

        Ok(Self {
            dims: self.dims.clone(),
            shape: axis_ranges.iter().map(|r| r.len()).collect(),
            data: self.data.slice(&self.shape, &axis_ranges),
            attrs: self.attrs.clone(),
        })
    }
}

/// A 2-D coordinate array read out of a dataset as f64.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordArray {
    /// Dimension names in storage order (row dimension first).
    pub dims: [String; 2],
    /// Lengths of `dims`.
    pub shape: [usize; 2],
    /// Row-major values.
    pub values: Vec<f64>,
}

impl CoordArray {
    /// Value at (row, col).
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.shape[0] || col >= self.shape[1] {
            return None;
        }
        self.values.get(row * self.shape[1] + col).copied()
    }
}

/// A collection of variables over shared named dimensions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    variables: BTreeMap<String, Variable>,
    coord_names: BTreeSet<String>,
    attrs: Attributes,
}

impl Dataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a data variable.
    ///
    /// Fails if one of its dimensions already exists with another length.
    pub fn insert(&mut self, name: impl Into<String>, variable: Variable) -> Result<()> {
        let name = name.into();
        for (dim, &n) in variable.dims.iter().zip(&variable.shape) {
            if let Some(existing) = self.size_of_excluding(dim, &name) {
                if existing != n {
                    return Err(SubsetError::dataset(format!(
                        "variable '{}' gives dimension '{}' length {}, dataset has {}",
                        name, dim, n, existing
                    )));
                }
            }
        }
        self.coord_names.remove(&name);
        self.variables.insert(name, variable);
        Ok(())
    }

    /// Insert a coordinate variable.
    pub fn insert_coord(&mut self, name: impl Into<String>, variable: Variable) -> Result<()> {
        let name = name.into();
        self.insert(name.clone(), variable)?;
        self.coord_names.insert(name);
        Ok(())
    }

    /// Set a dataset-level attribute.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attrs.insert(key.into(), value.into());
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Get a variable by name.
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Check if a variable exists.
    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Check if a variable is a coordinate.
    pub fn is_coord(&self, name: &str) -> bool {
        self.coord_names.contains(name)
    }

    /// All variable names in sorted order.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Names of non-coordinate variables.
    pub fn data_var_names(&self) -> impl Iterator<Item = &str> {
        self.variables
            .keys()
            .filter(|name| !self.coord_names.contains(*name))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Lengths of every dimension used by any variable.
    pub fn sizes(&self) -> BTreeMap<String, usize> {
        let mut sizes = BTreeMap::new();
        for variable in self.variables.values() {
            for (dim, &n) in variable.dims.iter().zip(&variable.shape) {
                sizes.entry(dim.clone()).or_insert(n);
            }
        }
        sizes
    }

    /// Length of one dimension.
    pub fn size(&self, dim: &str) -> Option<usize> {
        self.variables.values().find_map(|v| v.size_of(dim))
    }

    fn size_of_excluding(&self, dim: &str, skip: &str) -> Option<usize> {
        self.variables
            .iter()
            .filter(|(name, _)| name.as_str() != skip)
            .find_map(|(_, v)| v.size_of(dim))
    }

    /// Find the SGRID topology variable (`cf_role = "grid_topology"`).
    pub fn topology_variable(&self) -> Option<(&str, &Variable)> {
        self.variables
            .iter()
            .find(|(_, v)| v.attr_str("cf_role") == Some(GRID_TOPOLOGY_ROLE))
            .map(|(name, v)| (name.as_str(), v))
    }

    /// Read a 2-D variable as a coordinate array.
    pub fn coords_2d(&self, name: &str) -> Result<CoordArray> {
        let variable = self
            .get(name)
            .ok_or_else(|| SubsetError::UnknownVariable(name.to_string()))?;
        if variable.dims.len() != 2 {
            return Err(SubsetError::dataset(format!(
                "coordinate '{}' has {} dimensions, expected 2",
                name,
                variable.dims.len()
            )));
        }
        Ok(CoordArray {
            dims: [variable.dims[0].clone(), variable.dims[1].clone()],
            shape: [variable.shape[0], variable.shape[1]],
            values: variable.data.to_f64_vec(),
        })
    }

    /// Slice every variable along the named dimensions.
    ///
    /// Variables carrying none of the dimensions are copied unchanged.
    /// Every range must lie within its dimension.
    pub fn isel(&self, ranges: &BTreeMap<String, Range<usize>>) -> Result<Dataset> {
        let mut variables = BTreeMap::new();
        for (name, variable) in &self.variables {
            variables.insert(name.clone(), variable.isel(ranges)?);
        }
        Ok(Dataset {
            variables,
            coord_names: self.coord_names.clone(),
            attrs: self.attrs.clone(),
        })
    }

    /// Keep the named variables plus every coordinate and the topology variable.
    pub fn select_variables<S: AsRef<str>>(&self, names: &[S]) -> Result<Dataset> {
        let mut keep: BTreeSet<String> = self.coord_names.clone();
        if let Some((topology, _)) = self.topology_variable() {
            keep.insert(topology.to_string());
        }
        for name in names {
            let name = name.as_ref();
            if !self.contains(name) {
                return Err(SubsetError::UnknownVariable(name.to_string()));
            }
            keep.insert(name.to_string());
        }

        let variables = self
            .variables
            .iter()
            .filter(|(name, _)| keep.contains(*name))
            .map(|(name, v)| (name.clone(), v.clone()))
            .collect();

        Ok(Dataset {
            variables,
            coord_names: self.coord_names.clone(),
            attrs: self.attrs.clone(),
        })
    }
}
