use ndarray::{Array1, Array2};
use serde_derive::{Deserialize, Serialize};
use strum::EnumProperty;
use strum_macros::{Display, EnumIter, EnumProperty, EnumString};

use crate::error::SoilCategoryError;

/// Mualem-van Genuchten soil parameters, in the column order of the SHETRAN soil properties table
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    Copy,
    Clone,
    PartialOrd,
    Ord,
    EnumString,
    EnumIter,
    EnumProperty,
    Display,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum SoilParameter {
    /// Saturated water content
    #[strum(props(column = "VG_ThetaS", long_name = "Saturated water content", units = "cm3 cm-3"))]
    ThetaS,
    /// Residual water content
    #[strum(props(column = "VG_ThetaR", long_name = "Residual water content", units = "cm3 cm-3"))]
    ThetaR,
    /// Saturated hydraulic conductivity, m/day once converted
    #[strum(props(column = "VG_Ksat", long_name = "Saturated hydraulic conductivity", units = "m d-1"))]
    Ksat,
    /// Inverse of the air entry suction
    #[strum(props(column = "VG_alpha", long_name = "van Genuchten alpha", units = "cm-1"))]
    Alpha,
    /// Pore size distribution index
    #[strum(props(column = "VG_n", long_name = "van Genuchten n", units = "-"))]
    N,
}

impl SoilParameter {
    /// Position of the parameter inside a [`ParameterTuple`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Header of the parameter column in the soil properties table
    pub fn column(&self) -> &'static str {
        self.get_str("column").unwrap_or_default()
    }

    pub fn long_name(&self) -> &'static str {
        self.get_str("long_name").unwrap_or_default()
    }

    pub fn units(&self) -> &'static str {
        self.get_str("units").unwrap_or_default()
    }
}

/// The five parameters of one soil, ordered as [`SoilParameter`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterTuple {
    pub values: [f64; 5],
}

impl ParameterTuple {
    pub fn new(theta_s: f64, theta_r: f64, ksat: f64, alpha: f64, n: f64) -> Self {
        Self {
            values: [theta_s, theta_r, ksat, alpha, n],
        }
    }

    pub fn get(&self, parameter: SoilParameter) -> f64 {
        self.values[parameter.index()]
    }
}

/// Parameter values of every cell, flattened in row-major order and aligned by cell index.
/// Ksat is expected in m/day.
#[derive(Debug, Clone)]
pub struct SoilInput {
    pub nrows: usize,
    pub ncols: usize,
    pub data: [Array1<f64>; 5],
}

impl SoilInput {
    /// Flatten five grids given in [`SoilParameter`] order
    pub fn from_grids(grids: [Array2<f64>; 5]) -> Result<Self, SoilCategoryError> {
        let (nrows, ncols) = grids[0].dim();
        let data = grids.map(|grid| grid.iter().copied().collect::<Array1<f64>>());
        Self::new(nrows, ncols, data)
    }

    pub fn new(
        nrows: usize,
        ncols: usize,
        data: [Array1<f64>; 5],
    ) -> Result<Self, SoilCategoryError> {
        if nrows == 0 || ncols == 0 {
            return Err(SoilCategoryError::EmptyGrid { nrows, ncols });
        }
        let expected = nrows * ncols;
        for (parameter, values) in SOIL_PARAMETERS.iter().zip(data.iter()) {
            if values.len() != expected {
                return Err(SoilCategoryError::LengthMismatch {
                    parameter: *parameter,
                    expected,
                    found: values.len(),
                });
            }
        }
        Ok(Self { nrows, ncols, data })
    }

    pub fn get(&self, parameter: SoilParameter) -> &Array1<f64> {
        &self.data[parameter.index()]
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.nrows * self.ncols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Parameters of the cell at the given flat index
    pub fn tuple(&self, idx: usize) -> ParameterTuple {
        ParameterTuple::new(
            self.data[0][idx],
            self.data[1][idx],
            self.data[2][idx],
            self.data[3][idx],
            self.data[4][idx],
        )
    }
}

/// All the parameters, in canonical order
pub const SOIL_PARAMETERS: [SoilParameter; 5] = [
    SoilParameter::ThetaS,
    SoilParameter::ThetaR,
    SoilParameter::Ksat,
    SoilParameter::Alpha,
    SoilParameter::N,
];
