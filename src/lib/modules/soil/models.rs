use ndarray::Array2;

use crate::models::{
    input::{ParameterTuple, SoilParameter},
    output::{SoilDetailRecord, SoilPropertyRecord},
};

/// Soil categories of a grid: one id per cell and one parameter set per id
#[derive(Debug, Clone)]
pub struct SuperCategories {
    /// supercategory id of every cell
    pub grid: Array2<usize>,
    /// parameters of each supercategory, indexed by id
    pub tuples: Vec<ParameterTuple>,
    /// number of cells whose value differs from the one of their category, per parameter.
    /// Always empty when categories are keyed on the full parameter tuple.
    pub inconsistent_cells: Vec<(SoilParameter, usize)>,
}

impl SuperCategories {
    /// Number of supercategories
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.grid.dim()
    }

    /// Soil properties table, ordered by ascending id
    pub fn properties(&self) -> Vec<SoilPropertyRecord> {
        self.tuples
            .iter()
            .enumerate()
            .map(|(supercat, parameters)| SoilPropertyRecord {
                supercat,
                soil_type: supercat,
                parameters: *parameters,
            })
            .collect()
    }

    /// Soil details table: every category gets the same layer profile,
    /// ordered by ascending id and then by layer
    pub fn details(&self, layer_depths: &[f64]) -> Vec<SoilDetailRecord> {
        (0..self.len())
            .flat_map(|supercat| {
                layer_depths
                    .iter()
                    .enumerate()
                    .map(move |(idx, depth)| SoilDetailRecord {
                        supercat,
                        layer: idx + 1,
                        soil_type: supercat,
                        depth: *depth,
                    })
            })
            .collect()
    }
}

/// Per-cell category ids together with the flat index of the first cell of each category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FirstSeen {
    pub ids: Vec<usize>,
    pub firsts: Vec<usize>,
}

impl FirstSeen {
    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.firsts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.firsts.is_empty()
    }
}
