use serde_derive::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, BufRead, Read};
use std::str::FromStr;

use shetran_soil::{
    constants::NODATAVAL,
    models::input::{SoilParameter, SOIL_PARAMETERS},
    modules::soil::{config::DedupMode, constants::DEFAULT_LAYER_DEPTH},
};

use crate::common::helpers::ShetranError;

use super::models::Config;

pub type ConfigMap = HashMap<String, Vec<String>>;

const INPUT_DIR_KEY: &str = "INPUTDIR";
const RESOLUTION_KEY: &str = "RESOLUTION";
const EXTENSION_KEY: &str = "EXTENSION";
const OUTPUT_DIR_KEY: &str = "OUTPUTDIR";
const SUPERCATS_KEY: &str = "SUPERCATS";
const SOIL_PROPERTIES_KEY: &str = "SOILPROPERTIES";
const SOIL_DETAILS_KEY: &str = "SOILDETAILS";
const SUBCATS_KEY: &str = "SUBCATS";
const DEDUP_KEY: &str = "DEDUP";
const NODATA_KEY: &str = "NODATA";
const LAYER_DEPTH_KEY: &str = "LAYERDEPTH";
const PATTERN_KEY: &str = "PATTERN";

pub const DEFAULT_EXTENSION: &str = "asc";
pub const DEFAULT_SUPERCATS_NAME: &str = "SoilCats";
pub const DEFAULT_SOIL_PROPERTIES_NAME: &str = "SoilProperties";
pub const DEFAULT_SOIL_DETAILS_NAME: &str = "SoilDetails";

/// Filename patterns used to recognise the grid of each parameter
pub fn default_pattern(parameter: SoilParameter) -> &'static str {
    match parameter {
        SoilParameter::ThetaS => "theta_?s",
        SoilParameter::ThetaR => "theta_?r",
        SoilParameter::Ksat => "k_?sat",
        SoilParameter::Alpha => "alpha",
        SoilParameter::N => "(^|[^a-z0-9])n([^a-z0-9]|$)",
    }
}

trait ConfigMapExt {
    /// Get the first value of a key in the config map
    fn first(&self, key: &str) -> Option<String>;
    fn all(&self, key: &str) -> Option<Vec<String>>;
}

impl ConfigMapExt for ConfigMap {
    fn first(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|values| values.first().cloned())
    }

    fn all(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).cloned()
    }
}

/// Reads a KEY=VALUE text file. Keys may be repeated, values accumulate in order.
pub fn read_config(file_name: impl Into<String>) -> Result<ConfigMap, ShetranError> {
    let file_name = file_name.into();
    let file =
        File::open(&file_name).map_err(|error| format!("error opening config file: {error}"))?;
    let reader = io::BufReader::new(file);

    let mut config_map: ConfigMap = ConfigMap::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|error| format!("error line: {i} \n {error}"))?;
        let line = line.trim();

        if line.starts_with('%') || line.starts_with('#') || line.is_empty() {
            // skip comments and empty lines
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or(format!("error parsing config file {file_name} at line {i}."))?;

        config_map
            .entry(key.trim().to_owned())
            .or_default()
            .push(value.trim().to_owned());
    }
    Ok(config_map)
}

/// Unvalidated configuration, as read from a file, the environment or the command line.
/// Missing values fall back to defaults in [`ConfigBuilder::resolved`].
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigBuilder {
    pub input_dir: Option<String>,
    pub resolution: Option<String>,
    pub extension: Option<String>,
    pub output_dir: Option<String>,
    pub supercats_name: Option<String>,
    pub soil_properties_name: Option<String>,
    pub soil_details_name: Option<String>,
    pub subcategories_name: Option<String>,
    pub dedup: Option<DedupMode>,
    pub nodata: Option<f64>,
    pub layer_depths: Option<Vec<f64>>,
    pub patterns: BTreeMap<SoilParameter, String>,
}

impl ConfigBuilder {
    pub fn from_file(config_file: &str) -> Result<ConfigBuilder, ShetranError> {
        // Check the file extension to determine which method to use
        if config_file.ends_with(".yaml") || config_file.ends_with(".yml") {
            Self::from_yaml(config_file)
        } else if config_file.ends_with(".txt") {
            Self::from_txt_file(config_file)
        } else {
            Err(ShetranError::from(format!(
                "Unsupported config file format: {}",
                config_file
            )))
        }
    }

    pub fn from_yaml(config_file: &str) -> Result<Self, ShetranError> {
        let mut file = File::open(config_file)
            .map_err(|err| format!("Cannot open config file {}: {}", config_file, err))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|err| format!("Cannot read config file {}: {}", config_file, err))?;

        let conf = serde_yaml::from_str(&contents)
            .map_err(|err| format!("Cannot parse config file {}: {}", config_file, err))?;
        Ok(conf)
    }

    fn from_txt_file(config_file: &str) -> Result<ConfigBuilder, ShetranError> {
        let config_map = read_config(config_file)?;

        let dedup = config_map
            .first(DEDUP_KEY)
            .map(|value| {
                DedupMode::from_str(&value)
                    .map_err(|_| format!("Invalid {DEDUP_KEY} value {value}"))
            })
            .transpose()?;

        let nodata = config_map
            .first(NODATA_KEY)
            .map(|value| {
                value
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid {NODATA_KEY} value {value}"))
            })
            .transpose()?;

        let layer_depths = config_map
            .all(LAYER_DEPTH_KEY)
            .map(|values| {
                values
                    .iter()
                    .map(|value| {
                        value
                            .parse::<f64>()
                            .map_err(|_| format!("Invalid {LAYER_DEPTH_KEY} value {value}"))
                    })
                    .collect::<Result<Vec<f64>, String>>()
            })
            .transpose()?;

        let patterns = match config_map.all(PATTERN_KEY) {
            Some(defs) => parse_patterns(&defs)?,
            None => BTreeMap::new(),
        };

        Ok(ConfigBuilder {
            input_dir: config_map.first(INPUT_DIR_KEY),
            resolution: config_map.first(RESOLUTION_KEY),
            extension: config_map.first(EXTENSION_KEY),
            output_dir: config_map.first(OUTPUT_DIR_KEY),
            supercats_name: config_map.first(SUPERCATS_KEY),
            soil_properties_name: config_map.first(SOIL_PROPERTIES_KEY),
            soil_details_name: config_map.first(SOIL_DETAILS_KEY),
            subcategories_name: config_map.first(SUBCATS_KEY),
            dedup,
            nodata,
            layer_depths,
            patterns,
        })
    }

    /// Values set in `other` take precedence over the ones in `self`
    pub fn merge(self, other: ConfigBuilder) -> ConfigBuilder {
        let mut patterns = self.patterns;
        patterns.extend(other.patterns);

        ConfigBuilder {
            input_dir: other.input_dir.or(self.input_dir),
            resolution: other.resolution.or(self.resolution),
            extension: other.extension.or(self.extension),
            output_dir: other.output_dir.or(self.output_dir),
            supercats_name: other.supercats_name.or(self.supercats_name),
            soil_properties_name: other.soil_properties_name.or(self.soil_properties_name),
            soil_details_name: other.soil_details_name.or(self.soil_details_name),
            subcategories_name: other.subcategories_name.or(self.subcategories_name),
            dedup: other.dedup.or(self.dedup),
            nodata: other.nodata.or(self.nodata),
            layer_depths: other.layer_depths.or(self.layer_depths),
            patterns,
        }
    }

    /// Fill every unset option with its default
    pub fn resolved(&self) -> ConfigBuilder {
        let mut patterns = self.patterns.clone();
        for parameter in SOIL_PARAMETERS {
            patterns
                .entry(parameter)
                .or_insert_with(|| default_pattern(parameter).to_owned());
        }

        ConfigBuilder {
            input_dir: self.input_dir.clone(),
            resolution: self.resolution.clone(),
            extension: Some(
                self.extension
                    .clone()
                    .unwrap_or_else(|| DEFAULT_EXTENSION.to_owned()),
            ),
            output_dir: self.output_dir.clone(),
            supercats_name: Some(
                self.supercats_name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SUPERCATS_NAME.to_owned()),
            ),
            soil_properties_name: Some(
                self.soil_properties_name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SOIL_PROPERTIES_NAME.to_owned()),
            ),
            soil_details_name: Some(
                self.soil_details_name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SOIL_DETAILS_NAME.to_owned()),
            ),
            subcategories_name: self.subcategories_name.clone(),
            dedup: Some(self.dedup.unwrap_or_default()),
            nodata: Some(self.nodata.unwrap_or(NODATAVAL)),
            layer_depths: Some(
                self.layer_depths
                    .clone()
                    .unwrap_or_else(|| vec![DEFAULT_LAYER_DEPTH]),
            ),
            patterns,
        }
    }

    pub fn build(&self) -> Result<Config, ShetranError> {
        Config::new(&self.resolved())
    }
}

/// Parses `Parameter:regex` definitions
pub fn parse_patterns(defs: &[String]) -> Result<BTreeMap<SoilParameter, String>, ShetranError> {
    let mut patterns = BTreeMap::new();
    for def in defs {
        let (parameter, pattern) = def
            .split_once(':')
            .ok_or(format!("Invalid pattern definition {def}, expected Parameter:regex"))?;
        let parameter = SoilParameter::from_str(parameter.trim())
            .map_err(|_| format!("Unknown soil parameter {parameter} in pattern {def}"))?;
        patterns.insert(parameter, pattern.trim().to_owned());
    }
    Ok(patterns)
}
