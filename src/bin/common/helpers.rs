use std::{io, path::Path};

use log::{debug, warn};
use ndarray::Array1;
use shetran_soil::{
    error::SoilCategoryError,
    models::input::{SoilInput, SoilParameter, SOIL_PARAMETERS},
    modules::soil::functions::convert_ksat,
};
use thiserror::Error;

use crate::common::{config::models::Config, io::readers::prelude::InputHandler};

/// Every failure of a conversion run. All of them are fatal.
#[derive(Debug, Error)]
pub enum ShetranError {
    /// Missing or ambiguous input files, invalid options
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed or missing grid header or data
    #[error("format error in {path}: {message}")]
    Format { path: String, message: String },

    /// A parameter grid does not have the shared dimensions
    #[error("shape mismatch in {path}: expected {expected:?} (rows, cols), found {found:?}")]
    ShapeMismatch {
        path: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("I/O error on {path}: {source}")]
    Io { path: String, source: io::Error },

    /// Wraps an error with the pipeline stage it happened in
    #[error("{stage} failed: {source}")]
    Stage {
        stage: &'static str,
        source: Box<ShetranError>,
    },
}

impl From<String> for ShetranError {
    fn from(msg: String) -> Self {
        ShetranError::Configuration(msg)
    }
}

impl From<&str> for ShetranError {
    fn from(msg: &str) -> Self {
        ShetranError::Configuration(msg.into())
    }
}

impl From<SoilCategoryError> for ShetranError {
    fn from(err: SoilCategoryError) -> Self {
        ShetranError::Configuration(err.to_string())
    }
}

impl ShetranError {
    pub fn io(path: &Path) -> impl FnOnce(io::Error) -> ShetranError + '_ {
        move |source| ShetranError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn format(path: &Path, message: impl Into<String>) -> ShetranError {
        ShetranError::Format {
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}

pub trait StageContext<T> {
    /// Tag the error with the pipeline stage that produced it
    fn stage(self, stage: &'static str) -> Result<T, ShetranError>;
}

impl<T> StageContext<T> for Result<T, ShetranError> {
    fn stage(self, stage: &'static str) -> Result<T, ShetranError> {
        self.map_err(|err| ShetranError::Stage {
            stage,
            source: Box::new(err),
        })
    }
}

/// Read the five parameter grids from the input handler and align them cell by cell.
/// Ksat is converted from cm/day to m/day, no-data cells excluded.
pub fn get_input(handler: &dyn InputHandler, config: &Config) -> Result<SoilInput, ShetranError> {
    let (nrows, ncols) = handler.shape();
    let nodata = config.soil.nodata;

    let mut data: Vec<Array1<f64>> = Vec::with_capacity(SOIL_PARAMETERS.len());
    for parameter in SOIL_PARAMETERS {
        let grid = handler.get_values(parameter)?;
        let mut values: Array1<f64> = grid.iter().copied().collect();

        let n_nodata = values.iter().filter(|v| **v == nodata).count();
        debug!(
            "{} ({}, {}): {} cells, {} no-data",
            parameter,
            parameter.long_name(),
            parameter.units(),
            values.len(),
            n_nodata
        );

        if parameter == SoilParameter::Ksat {
            values = convert_ksat(&values, nodata);
        }
        data.push(values);
    }

    let data: [Array1<f64>; 5] = data
        .try_into()
        .map_err(|_| "expected exactly five parameter grids")?;

    let input = SoilInput::new(nrows, ncols, data)?;
    if input
        .get(SoilParameter::ThetaS)
        .iter()
        .all(|v| *v == nodata)
    {
        warn!("ThetaS grid holds only no-data cells");
    }
    Ok(input)
}
