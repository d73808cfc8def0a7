use std::collections::BTreeMap;

use crate::npy::{NpyArrayBytes, NpyHeader, element_count, encode_f64_payload};
use crate::npz::{NpzEntry, write_npz_bytes};
use crate::text::TextArrayData;
use crate::{IOError, IOSupportedDType, decode_numeric_payload};

/// Where an array lives inside a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Association {
    Point,
    Cell,
}

impl Association {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Cell => "cell",
        }
    }

    #[must_use]
    pub const fn member_prefix(self) -> &'static str {
        match self {
            Self::Point => "point_data/",
            Self::Cell => "cell_data/",
        }
    }

    /// Split an archive member name into its association and array name.
    #[must_use]
    pub fn split_member_name(member: &str) -> (Self, &str) {
        if let Some(name) = member.strip_prefix(Self::Cell.member_prefix()) {
            (Self::Cell, name)
        } else if let Some(name) = member.strip_prefix(Self::Point.member_prefix()) {
            (Self::Point, name)
        } else {
            (Self::Point, member)
        }
    }
}

/// A named array viewed as a sequence of equal-arity tuples.
///
/// The leading axis indexes tuples; all trailing axes are flattened into the
/// component axis. Numeric payloads are widened to `f64` at load time, the
/// values of non-numeric arrays are not kept.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    name: String,
    dtype: IOSupportedDType,
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl DataArray {
    /// Build an `f64` array from row-major values.
    pub fn from_values(
        name: impl Into<String>,
        shape: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self, IOError> {
        if element_count(&shape)? != values.len() {
            return Err(IOError::ReadPayloadIncomplete(
                "value count does not match shape element count",
            ));
        }
        Ok(Self {
            name: name.into(),
            dtype: IOSupportedDType::F64,
            shape,
            values,
        })
    }

    pub fn from_npy(name: impl Into<String>, array: &NpyArrayBytes) -> Result<Self, IOError> {
        let header = &array.header;
        let values = match decode_numeric_payload(header.descr, &array.payload) {
            Some(values) => {
                if values.len() != element_count(&header.shape)? {
                    return Err(IOError::ReadPayloadIncomplete(
                        "decoded value count does not match shape element count",
                    ));
                }
                if header.fortran_order && header.shape.len() > 1 {
                    fortran_to_c_order(&values, &header.shape)
                } else {
                    values
                }
            }
            None => Vec::new(),
        };
        Ok(Self {
            name: name.into(),
            dtype: header.descr,
            shape: header.shape.clone(),
            values,
        })
    }

    pub fn from_text(name: impl Into<String>, data: TextArrayData) -> Result<Self, IOError> {
        Self::from_values(name, vec![data.nrows, data.ncols], data.values)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dtype(&self) -> IOSupportedDType {
        self.dtype
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.dtype.is_numeric()
    }

    /// Row-major values; empty for non-numeric arrays.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn tuple_count(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        if self.shape.len() <= 1 {
            1
        } else {
            self.shape[1..].iter().product()
        }
    }

    /// Components of tuple `index`. Panics for non-numeric arrays.
    #[must_use]
    pub fn tuple(&self, index: usize) -> &[f64] {
        let arity = self.arity();
        &self.values[index * arity..(index + 1) * arity]
    }

    #[must_use]
    pub fn component(&self, tuple: usize, component: usize) -> f64 {
        self.values[tuple * self.arity() + component]
    }
}

fn fortran_to_c_order(values: &[f64], shape: &[usize]) -> Vec<f64> {
    let mut f_strides = Vec::with_capacity(shape.len());
    let mut stride = 1usize;
    for &dim in shape {
        f_strides.push(stride);
        stride *= dim;
    }

    let mut out = Vec::with_capacity(values.len());
    let mut index = vec![0usize; shape.len()];
    for _ in 0..values.len() {
        let offset: usize = index.iter().zip(&f_strides).map(|(i, s)| i * s).sum();
        out.push(values[offset]);
        for axis in (0..shape.len()).rev() {
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    out
}

/// Named arrays of one input file, split into point and cell storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    point_data: BTreeMap<String, DataArray>,
    cell_data: BTreeMap<String, DataArray>,
}

impl Dataset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn storage(&self, association: Association) -> &BTreeMap<String, DataArray> {
        match association {
            Association::Point => &self.point_data,
            Association::Cell => &self.cell_data,
        }
    }

    pub fn insert(&mut self, association: Association, array: DataArray) -> Result<(), IOError> {
        let storage = match association {
            Association::Point => &mut self.point_data,
            Association::Cell => &mut self.cell_data,
        };
        if storage.contains_key(array.name()) {
            return Err(IOError::DuplicateArray {
                name: array.name().to_string(),
                association: association.as_str(),
            });
        }
        storage.insert(array.name().to_string(), array);
        Ok(())
    }

    pub fn from_npz_entries(entries: Vec<NpzEntry>) -> Result<Self, IOError> {
        let mut dataset = Self::new();
        for entry in entries {
            let (association, name) = Association::split_member_name(&entry.name);
            let array = DataArray::from_npy(name, &entry.array)?;
            dataset.insert(association, array)?;
        }
        Ok(dataset)
    }

    #[must_use]
    pub fn get(&self, association: Association, name: &str) -> Option<&DataArray> {
        self.storage(association).get(name)
    }

    pub fn remove(&mut self, association: Association, name: &str) -> Option<DataArray> {
        match association {
            Association::Point => self.point_data.remove(name),
            Association::Cell => self.cell_data.remove(name),
        }
    }

    /// Point data is searched before cell data.
    #[must_use]
    pub fn locate(&self, name: &str) -> Option<Association> {
        [Association::Point, Association::Cell]
            .into_iter()
            .find(|association| self.storage(*association).contains_key(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.point_data.len() + self.cell_data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encode every array as `<f8` members of an `.npz` archive.
    pub fn to_npz_bytes(&self) -> Result<Vec<u8>, IOError> {
        let mut members = Vec::with_capacity(self.len());
        for association in [Association::Point, Association::Cell] {
            for array in self.storage(association).values() {
                if !array.is_numeric() {
                    return Err(IOError::WriteContractViolation(
                        "non-numeric arrays cannot be re-encoded",
                    ));
                }
                let member = format!("{}{}", association.member_prefix(), array.name());
                let header = NpyHeader {
                    shape: array.shape().to_vec(),
                    fortran_order: false,
                    descr: IOSupportedDType::F64,
                };
                members.push((member, header, encode_f64_payload(array.values())));
            }
        }
        let borrowed = members
            .iter()
            .map(|(name, header, payload)| (name.as_str(), header, payload.as_slice()))
            .collect::<Vec<_>>();
        write_npz_bytes(&borrowed)
    }
}
