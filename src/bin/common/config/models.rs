use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::debug;
use regex::{Regex, RegexBuilder};
use shetran_soil::{
    models::input::{SoilParameter, SOIL_PARAMETERS},
    modules::soil::config::SoilCategoryConfig,
};
use tempfile::NamedTempFile;

use crate::common::helpers::ShetranError;

use super::builder::{default_pattern, ConfigBuilder};

/// Extension of every emitted file
pub const OUTPUT_EXTENSION: &str = "txt";

/// Validated configuration of a conversion run
#[derive(Debug)]
pub struct Config {
    pub input_dir: PathBuf,
    pub resolution: String,
    pub extension: String,
    pub output_dir: PathBuf,
    pub supercats_name: String,
    pub soil_properties_name: String,
    pub soil_details_name: String,
    pub subcategories_name: Option<String>,
    /// filename pattern of each parameter, in [`SoilParameter`] order
    pub patterns: Vec<(SoilParameter, Regex)>,
    pub soil: SoilCategoryConfig,
}

fn required(value: &Option<String>, name: &str) -> Result<String, ShetranError> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_owned()),
        _ => Err(format!("{name} is required").into()),
    }
}

fn check_output_name(name: &str, option: &str) -> Result<String, ShetranError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("{option} must not be empty").into());
    }
    if name.contains('/') || name.contains('\\') {
        return Err(format!("{option} must be a file name, got {name}").into());
    }
    Ok(name.to_owned())
}

fn compile_pattern(parameter: SoilParameter, pattern: &str) -> Result<Regex, ShetranError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|err| format!("Invalid filename pattern for {parameter}: {err}").into())
}

/// Fails unless `dir` is an existing directory where files can be created
fn check_writable(dir: &Path) -> Result<(), ShetranError> {
    if !dir.is_dir() {
        return Err(ShetranError::Io {
            path: dir.display().to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "output directory does not exist",
            ),
        });
    }
    // the temporary file is removed when dropped
    NamedTempFile::new_in(dir).map_err(ShetranError::io(dir))?;
    Ok(())
}

impl Config {
    /// Validates a resolved [`ConfigBuilder`]
    pub fn new(defs: &ConfigBuilder) -> Result<Config, ShetranError> {
        let input_dir = PathBuf::from(required(&defs.input_dir, "input directory")?);
        if !input_dir.is_dir() {
            return Err(format!("Input directory {} is not a directory", input_dir.display()).into());
        }

        let resolution = required(&defs.resolution, "resolution tag")?;

        let extension = required(&defs.extension, "grid file extension")?
            .trim_start_matches('.')
            .to_owned();

        let output_dir = PathBuf::from(required(&defs.output_dir, "output directory")?);
        check_writable(&output_dir)?;

        let supercats_name = check_output_name(
            &required(&defs.supercats_name, "supercategories file name")?,
            "supercategories file name",
        )?;
        let soil_properties_name = check_output_name(
            &required(&defs.soil_properties_name, "soil properties file name")?,
            "soil properties file name",
        )?;
        let soil_details_name = check_output_name(
            &required(&defs.soil_details_name, "soil details file name")?,
            "soil details file name",
        )?;
        let subcategories_name = defs
            .subcategories_name
            .as_deref()
            .map(|name| check_output_name(name, "subcategories file name"))
            .transpose()?;

        let mut names = vec![&supercats_name, &soil_properties_name, &soil_details_name];
        if let Some(name) = &subcategories_name {
            names.push(name);
        }
        let unique: HashSet<&String> = names.iter().copied().collect();
        if unique.len() != names.len() {
            return Err("Output file names must be distinct".into());
        }

        let patterns = SOIL_PARAMETERS
            .iter()
            .map(|parameter| {
                let pattern = defs
                    .patterns
                    .get(parameter)
                    .map(|p| p.as_str())
                    .unwrap_or_else(|| default_pattern(*parameter));
                debug!("{} files match /{}/", parameter, pattern);
                compile_pattern(*parameter, pattern).map(|regex| (*parameter, regex))
            })
            .collect::<Result<Vec<_>, ShetranError>>()?;

        let soil = SoilCategoryConfig::new(
            defs.dedup.unwrap_or_default(),
            defs.nodata.unwrap_or(shetran_soil::constants::NODATAVAL),
            defs.layer_depths.clone().unwrap_or_default(),
        )?;

        Ok(Config {
            input_dir,
            resolution,
            extension,
            output_dir,
            supercats_name,
            soil_properties_name,
            soil_details_name,
            subcategories_name,
            patterns,
            soil,
        })
    }

    /// Full path of an output file
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{name}.{OUTPUT_EXTENSION}"))
    }
}
