use std::collections::HashMap;
use std::hash::Hash;

use itertools::izip;
use ndarray::{Array1, Array2};

use crate::{
    error::SoilCategoryError,
    models::input::{ParameterTuple, SoilInput, SoilParameter, SOIL_PARAMETERS},
};

use super::{
    constants::*,
    models::{FirstSeen, SuperCategories},
};

/// Positional id of every cell: 1 + ncols * row + col
pub fn subcategory_grid(nrows: usize, ncols: usize) -> Array2<u64> {
    Array2::from_shape_fn((nrows, ncols), |(row, col)| {
        FIRST_SUBCATEGORY + (ncols * row + col) as u64
    })
}

/// Ksat from cm/day to m/day, leaving no-data cells untouched
pub fn convert_ksat(ksat: &Array1<f64>, nodata: f64) -> Array1<f64> {
    ksat.mapv(|value| {
        if value == nodata {
            value
        } else {
            value * KSAT_CM_DAY_TO_M_DAY
        }
    })
}

/// Hashable identity of a cell value: -0.0 equals 0.0 and all NaNs are the same value
pub fn value_key(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    }
}

/// Stable deduplication: ids follow the order in which keys first appear
pub fn first_seen<K, I>(keys: I) -> FirstSeen
where
    K: Hash + Eq,
    I: IntoIterator<Item = K>,
{
    let mut lookup: HashMap<K, usize> = HashMap::new();
    let mut seen = FirstSeen::default();
    for (idx, key) in keys.into_iter().enumerate() {
        let next_id = lookup.len();
        let id = *lookup.entry(key).or_insert_with(|| {
            seen.firsts.push(idx);
            next_id
        });
        seen.ids.push(id);
    }
    seen
}

fn first_seen_values(values: &Array1<f64>) -> FirstSeen {
    first_seen(values.iter().map(|value| value_key(*value)))
}

/// Categories keyed on ThetaS alone.
/// The parameters of category k are the k-th distinct value of each parameter, every
/// parameter being deduplicated on its own. This only holds when every distinct ThetaS
/// value comes with exactly one combination of the other parameters, so cells that
/// disagree with their category are counted in `inconsistent_cells`.
pub fn reduce_by_theta_s(input: &SoilInput) -> Result<SuperCategories, SoilCategoryError> {
    let theta_s = first_seen_values(input.get(SoilParameter::ThetaS));
    let n_categories = theta_s.len();

    let mut tuples = vec![ParameterTuple { values: [0.0; 5] }; n_categories];
    for parameter in SOIL_PARAMETERS {
        let values = input.get(parameter);
        let firsts = if parameter == SoilParameter::ThetaS {
            theta_s.firsts.clone()
        } else {
            first_seen_values(values).firsts
        };

        if firsts.len() != n_categories {
            return Err(SoilCategoryError::UnalignedParameter {
                parameter,
                expected: n_categories,
                found: firsts.len(),
            });
        }

        for (tuple, first) in tuples.iter_mut().zip(firsts) {
            tuple.values[parameter.index()] = values[first];
        }
    }

    let inconsistent_cells = SOIL_PARAMETERS
        .iter()
        .map(|parameter| {
            let count = izip!(input.get(*parameter).iter(), theta_s.ids.iter())
                .filter(|(value, id)| {
                    value_key(**value) != value_key(tuples[**id].get(*parameter))
                })
                .count();
            (*parameter, count)
        })
        .filter(|(_, count)| *count > 0)
        .collect();

    let grid = Array2::from_shape_vec(input.shape(), theta_s.ids)?;

    Ok(SuperCategories {
        grid,
        tuples,
        inconsistent_cells,
    })
}

/// Categories keyed on the whole (ThetaS, ThetaR, Ksat, alpha, n) tuple.
/// The parameters of each category are the ones of its first cell.
pub fn reduce_by_tuple(input: &SoilInput) -> Result<SuperCategories, SoilCategoryError> {
    let seen = first_seen((0..input.len()).map(|idx| input.tuple(idx).values.map(value_key)));

    let tuples = seen.firsts.iter().map(|idx| input.tuple(*idx)).collect();
    let grid = Array2::from_shape_vec(input.shape(), seen.ids)?;

    Ok(SuperCategories {
        grid,
        tuples,
        inconsistent_cells: Vec::new(),
    })
}

/// Checks a soil layer profile: at least one layer, every depth finite and positive
pub fn check_layer_depths(layer_depths: &[f64]) -> Result<(), SoilCategoryError> {
    if layer_depths.is_empty() {
        return Err(SoilCategoryError::NoLayers);
    }
    match layer_depths
        .iter()
        .enumerate()
        .find(|(_, depth)| !depth.is_finite() || **depth <= 0.0)
    {
        Some((idx, depth)) => Err(SoilCategoryError::InvalidDepth {
            layer: idx + 1,
            depth: *depth,
        }),
        None => Ok(()),
    }
}
