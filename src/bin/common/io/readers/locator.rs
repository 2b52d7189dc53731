use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use log::debug;
use regex::Regex;
use shetran_soil::models::input::{SoilParameter, SOIL_PARAMETERS};

use crate::common::helpers::ShetranError;

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lists the grid files of `dir` whose name contains `resolution` and ends with `.extension`,
/// sorted by file name
pub fn locate_grids(
    dir: &Path,
    resolution: &str,
    extension: &str,
) -> Result<Vec<PathBuf>, ShetranError> {
    if !dir.is_dir() {
        return Err(format!("Input directory {} does not exist", dir.display()).into());
    }

    let pattern = format!(
        "{}/*{}*.{}",
        Pattern::escape(&dir.to_string_lossy()),
        Pattern::escape(resolution),
        Pattern::escape(extension)
    );
    debug!("Looking for grids matching {}", pattern);

    let mut paths = glob(&pattern)
        .map_err(|err| format!("Invalid grid search pattern {pattern}: {err}"))?
        .collect::<Result<Vec<PathBuf>, _>>()
        .map_err(|err| format!("Cannot list {}: {err}", dir.display()))?;
    paths.retain(|path| path.is_file());
    paths.sort_by_key(|path| file_name(path));

    if paths.len() < SOIL_PARAMETERS.len() {
        return Err(format!(
            "Found {} grid files for resolution '{}' in {}, expected at least {}",
            paths.len(),
            resolution,
            dir.display(),
            SOIL_PARAMETERS.len()
        )
        .into());
    }
    Ok(paths)
}

/// Assigns exactly one file to each parameter by matching the file names against the patterns
pub fn map_parameters(
    paths: &[PathBuf],
    patterns: &[(SoilParameter, Regex)],
) -> Result<BTreeMap<SoilParameter, PathBuf>, ShetranError> {
    let mut mapping: BTreeMap<SoilParameter, PathBuf> = BTreeMap::new();

    for (parameter, regex) in patterns {
        let matches: Vec<&PathBuf> = paths
            .iter()
            .filter(|path| regex.is_match(&file_name(path)))
            .collect();

        match matches.as_slice() {
            [] => {
                return Err(format!(
                    "No grid file matches /{}/ for parameter {}",
                    regex.as_str(),
                    parameter
                )
                .into())
            }
            [path] => {
                if let Some((other, _)) = mapping.iter().find(|(_, p)| p == path) {
                    return Err(format!(
                        "{} matches both {} and {}",
                        path.display(),
                        other,
                        parameter
                    )
                    .into());
                }
                debug!("{} -> {}", parameter, path.display());
                mapping.insert(*parameter, (*path).clone());
            }
            _ => {
                let names: Vec<String> = matches.iter().map(|path| file_name(path)).collect();
                return Err(format!(
                    "Parameter {} is ambiguous, /{}/ matches {}",
                    parameter,
                    regex.as_str(),
                    names.join(", ")
                )
                .into());
            }
        }
    }

    if let Some(missing) = SOIL_PARAMETERS.iter().find(|p| !mapping.contains_key(*p)) {
        return Err(format!("No filename pattern for parameter {missing}").into());
    }
    Ok(mapping)
}
