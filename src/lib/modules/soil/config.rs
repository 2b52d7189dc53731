use serde_derive::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::{
    constants::DEFAULT_LAYER_DEPTH,
    functions::{check_layer_depths, reduce_by_theta_s, reduce_by_tuple},
    models::SuperCategories,
};
use crate::{constants::NODATAVAL, error::SoilCategoryError, models::input::SoilInput};

/// Key used to merge cells into the same soil category
#[derive(
    Debug,
    Default,
    PartialEq,
    Eq,
    Copy,
    Clone,
    EnumString,
    Display,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    /// ThetaS alone, other parameters are matched by order of appearance
    #[default]
    ThetaS,
    /// the full parameter tuple
    Tuple,
}

/// configuration of the soil category builder
#[derive(Debug)]
pub struct SoilCategoryConfig {
    pub dedup_mode: DedupMode,
    pub nodata: f64,
    pub layer_depths: Vec<f64>,
    // categories reduction function
    reduce_fn: fn(&SoilInput) -> Result<SuperCategories, SoilCategoryError>,
}

impl Default for SoilCategoryConfig {
    fn default() -> Self {
        Self {
            dedup_mode: DedupMode::ThetaS,
            nodata: NODATAVAL,
            layer_depths: vec![DEFAULT_LAYER_DEPTH],
            reduce_fn: reduce_by_theta_s,
        }
    }
}

impl SoilCategoryConfig {
    pub fn new(
        dedup_mode: DedupMode,
        nodata: f64,
        layer_depths: Vec<f64>,
    ) -> Result<Self, SoilCategoryError> {
        check_layer_depths(&layer_depths)?;

        let reduce_fn: fn(&SoilInput) -> Result<SuperCategories, SoilCategoryError> =
            match dedup_mode {
                DedupMode::ThetaS => reduce_by_theta_s,
                DedupMode::Tuple => reduce_by_tuple,
            };

        Ok(SoilCategoryConfig {
            dedup_mode,
            nodata,
            layer_depths,
            reduce_fn,
        })
    }

    pub fn reduce(&self, input: &SoilInput) -> Result<SuperCategories, SoilCategoryError> {
        (self.reduce_fn)(input)
    }
}
