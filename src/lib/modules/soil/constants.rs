/// Ksat conversion factor from cm/day to m/day
pub const KSAT_CM_DAY_TO_M_DAY: f64 = 0.01;
/// Depth of the single default soil layer [m]
pub const DEFAULT_LAYER_DEPTH: f64 = 2.0;
/// Id of the first cell of the subcategory grid
pub const FIRST_SUBCATEGORY: u64 = 1;
