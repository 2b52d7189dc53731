use super::input::ParameterTuple;

/// One line of the SHETRAN soil properties table
#[derive(Debug, Clone, PartialEq)]
pub struct SoilPropertyRecord {
    /// supercategory id
    pub supercat: usize,
    /// soil type referenced by the soil details, same as the supercategory
    pub soil_type: usize,
    /// ThetaS, ThetaR, Ksat [m/day], alpha, n
    pub parameters: ParameterTuple,
}

/// One line of the SHETRAN soil details table
#[derive(Debug, Clone, PartialEq)]
pub struct SoilDetailRecord {
    /// supercategory id
    pub supercat: usize,
    /// layer number, starting at 1 from the surface
    pub layer: usize,
    /// soil type filling the layer
    pub soil_type: usize,
    /// depth of the bottom of the layer [m]
    pub depth: f64,
}
