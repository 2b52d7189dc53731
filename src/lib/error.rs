use ndarray::ShapeError;
use thiserror::Error;

use crate::models::input::SoilParameter;

/// Errors raised while building soil categories from the parameter grids.
#[derive(Debug, Error)]
pub enum SoilCategoryError {
    /// The grids hold no cells
    #[error("parameter grids are empty ({nrows} rows x {ncols} columns)")]
    EmptyGrid { nrows: usize, ncols: usize },

    /// A parameter does not have one value per cell
    #[error("{parameter} has {found} values, expected {expected}")]
    LengthMismatch {
        parameter: SoilParameter,
        expected: usize,
        found: usize,
    },

    /// ThetaS-keyed categories cannot be matched to the distinct values of another parameter
    #[error(
        "{parameter} has {found} distinct values but ThetaS has {expected}: \
         categories keyed on ThetaS cannot be aligned, use the `tuple` deduplication mode"
    )]
    UnalignedParameter {
        parameter: SoilParameter,
        expected: usize,
        found: usize,
    },

    #[error("at least one soil layer is required")]
    NoLayers,

    #[error("invalid depth {depth} for soil layer {layer}")]
    InvalidDepth { layer: usize, depth: f64 },

    #[error("cannot reshape categories: {0}")]
    Shape(#[from] ShapeError),
}
