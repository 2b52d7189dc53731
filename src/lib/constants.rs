/// No-data sentinel used by the soil parameter grids
pub const NODATAVAL: f64 = -999.0;
