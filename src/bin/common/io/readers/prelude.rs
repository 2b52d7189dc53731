use ndarray::Array2;
use shetran_soil::models::input::SoilParameter;

use crate::common::helpers::ShetranError;

/// Trait defining the behavior of a source of soil parameter grids
pub trait InputHandler {
    /// rows and columns shared by every grid
    fn shape(&self) -> (usize, usize);

    /// get the grid of the desired parameter, in the units of the input files
    fn get_values(&self, parameter: SoilParameter) -> Result<Array2<f64>, ShetranError>;

    /// Returns a description of the input files
    fn info_input(&self) -> String;
}
