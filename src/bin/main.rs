mod common;
use std::env::{set_var, var};
use std::path::PathBuf;
use std::process::exit;

use chrono::prelude::*;
use clap::{arg, command, Parser};

use common::config::builder::{parse_patterns, ConfigBuilder};
use common::config::models::Config;
use common::helpers::{get_input, ShetranError, StageContext};
use common::io::models::output::{OutputWriter, SoilOutput};
use common::io::readers::asc::AscInputHandler;
use common::io::readers::prelude::InputHandler;
use log::{error, info, trace, warn};
use shetran_soil::modules::soil::{config::DedupMode, functions::subcategory_grid};
use shetran_soil::version::LONG_VERSION;

#[derive(Parser, Debug)]
#[command(
    version,
    long_version=LONG_VERSION,
    about="Builds the SHETRAN soil library from Mualem-van Genuchten parameter grids",
    long_about="Reads the ThetaS, ThetaR, Ksat, alpha and n grids of one resolution, groups the cells into soil categories and writes the category map together with the soil properties and soil details tables used by SHETRAN."
)]
struct Args {
    #[arg(
        help = "Path to the configuration file (.yml, .yaml or .txt)",
        index = 1,
        env = "SHETRAN_SOIL_CONFIG"
    )]
    config_path: Option<String>,

    #[arg(short, long, value_name = "DIR", env = "SHETRAN_SOIL_INPUT_DIR", help = "Directory holding the parameter grids")]
    input_dir: Option<String>,

    #[arg(short, long, value_name = "TAG", env = "SHETRAN_SOIL_RESOLUTION", help = "Resolution tag contained in the grid file names")]
    resolution: Option<String>,

    #[arg(short, long, value_name = "DIR", env = "SHETRAN_SOIL_OUTPUT_DIR", help = "Directory receiving the output files")]
    output_dir: Option<String>,

    #[arg(long, value_name = "EXT", help = "Extension of the grid files [default: asc]")]
    extension: Option<String>,

    #[arg(long, value_name = "NAME", help = "Name of the supercategory map [default: SoilCats]")]
    supercats_name: Option<String>,

    #[arg(long, value_name = "NAME", help = "Name of the soil properties table [default: SoilProperties]")]
    soil_properties_name: Option<String>,

    #[arg(long, value_name = "NAME", help = "Name of the soil details table [default: SoilDetails]")]
    soil_details_name: Option<String>,

    #[arg(long, value_name = "NAME", help = "Also write the subcategory map with this name")]
    subcategories_name: Option<String>,

    #[arg(long, value_name = "MODE", help = "Category key, theta_s or tuple [default: theta_s]")]
    dedup: Option<DedupMode>,

    #[arg(long, value_name = "VALUE", allow_negative_numbers = true, help = "No-data value of the grids [default: -999]")]
    nodata: Option<f64>,

    #[arg(long = "layer-depth", value_name = "M", help = "Depth of a soil layer in meters, repeat once per layer [default: 2.0]")]
    layer_depths: Vec<f64>,

    #[arg(long = "pattern", value_name = "PARAM:REGEX", help = "Filename pattern of a parameter grid, repeatable")]
    patterns: Vec<String>,

    #[arg(long, help = "Validate and print the resolved configuration without converting")]
    dry_run: bool,
}

impl Args {
    /// Options given on the command line or through the environment
    fn config_builder(&self) -> Result<ConfigBuilder, ShetranError> {
        Ok(ConfigBuilder {
            input_dir: self.input_dir.clone(),
            resolution: self.resolution.clone(),
            extension: self.extension.clone(),
            output_dir: self.output_dir.clone(),
            supercats_name: self.supercats_name.clone(),
            soil_properties_name: self.soil_properties_name.clone(),
            soil_details_name: self.soil_details_name.clone(),
            subcategories_name: self.subcategories_name.clone(),
            dedup: self.dedup,
            nodata: self.nodata,
            layer_depths: if self.layer_depths.is_empty() {
                None
            } else {
                Some(self.layer_depths.clone())
            },
            patterns: parse_patterns(&self.patterns)?,
        })
    }
}

/// Configuration file values, overridden by the command line
fn load_config(args: &Args) -> Result<ConfigBuilder, ShetranError> {
    let from_file = match &args.config_path {
        Some(config_path) => {
            info!("Loading configuration from {}", config_path);
            ConfigBuilder::from_file(config_path)?
        }
        None => ConfigBuilder::default(),
    };
    Ok(from_file.merge(args.config_builder()?))
}

fn run(config: &Config) -> Result<Vec<PathBuf>, ShetranError> {
    let c = Utc::now();
    let handler = AscInputHandler::new(config).stage("locating input grids")?;
    info!("Input files: {}", handler.info_input());
    trace!("Locating input grids took {} seconds", Utc::now() - c);

    let c = Utc::now();
    let input = get_input(&handler, config).stage("reading parameter grids")?;
    trace!("Reading parameter grids took {} seconds", Utc::now() - c);

    let subcategories = config
        .subcategories_name
        .as_ref()
        .map(|_| subcategory_grid(input.nrows, input.ncols));

    let c = Utc::now();
    let categories = config
        .soil
        .reduce(&input)
        .map_err(ShetranError::from)
        .stage("building supercategories")?;
    trace!("Building supercategories took {} seconds", Utc::now() - c);
    info!(
        "{} cells grouped into {} supercategories, {} mode",
        input.len(),
        categories.len(),
        config.soil.dedup_mode
    );
    for (parameter, count) in &categories.inconsistent_cells {
        warn!(
            "{} cells have a {} value different from the one of their supercategory",
            count, parameter
        );
    }

    let output = SoilOutput::new(subcategories, categories, &config.soil.layer_depths);
    let writer = OutputWriter::new(config);

    let c = Utc::now();
    let written = writer.write_output(&output).stage("writing outputs")?;
    trace!("Writing outputs took {} seconds", Utc::now() - c);
    Ok(written)
}

/// What a successful invocation produced
#[derive(Debug)]
enum Outcome {
    /// resolved configuration, as YAML
    DryRun(String),
    Written(Vec<PathBuf>),
}

fn execute(args: &Args) -> Result<Outcome, ShetranError> {
    let defs = load_config(args).stage("loading configuration")?;
    let config = defs.build().stage("validating configuration")?;
    if args.dry_run {
        let resolved = serde_yaml::to_string(&defs.resolved())
            .map_err(|err| format!("Cannot serialize configuration: {err}"))?;
        return Ok(Outcome::DryRun(resolved));
    }
    run(&config).map(Outcome::Written)
}

fn main() {
    let args = Args::parse();

    if var("RUST_LOG").is_err() {
        set_var("RUST_LOG", "info")
    }
    pretty_env_logger::init();

    let start_time = Utc::now();
    match execute(&args) {
        Ok(Outcome::DryRun(resolved)) => println!("{}", resolved),
        Ok(Outcome::Written(written)) => {
            for path in written {
                info!("Written {}", path.display());
            }
            let elapsed_time = Utc::now() - start_time;
            info!("Elapsed time: {} seconds", elapsed_time.num_seconds());
        }
        Err(err) => {
            error!("{}", err);
            exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;

    fn write_grid(dir: &Path, name: &str, rows: &[&[f64]]) {
        let mut content = format!(
            "ncols        {}\nnrows        {}\nxllcorner    0\nyllcorner    0\ncellsize     5000\nNODATA_value -999\n",
            rows[0].len(),
            rows.len()
        );
        for row in rows {
            let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            content.push_str(&line.join(" "));
            content.push('\n');
        }
        fs::write(dir.join(name), content).expect("should write grid");
    }

    fn input_dir() -> TempDir {
        let dir = TempDir::new().expect("should create input dir");
        write_grid(dir.path(), "VG_ThetaS_5km.asc", &[&[0.4, 0.4], &[0.5, 0.4]]);
        write_grid(dir.path(), "VG_ThetaR_5km.asc", &[&[0.05, 0.05], &[0.06, 0.05]]);
        write_grid(dir.path(), "VG_Ksat_5km.asc", &[&[100.0, 100.0], &[200.0, 100.0]]);
        write_grid(dir.path(), "VG_Alpha_5km.asc", &[&[0.02, 0.02], &[0.03, 0.02]]);
        write_grid(dir.path(), "VG_N_5km.asc", &[&[1.5, 1.5], &[1.6, 1.5]]);
        dir
    }

    fn builder(input: &TempDir, output: &TempDir) -> ConfigBuilder {
        ConfigBuilder {
            input_dir: Some(input.path().to_string_lossy().into_owned()),
            resolution: Some("5km".into()),
            output_dir: Some(output.path().to_string_lossy().into_owned()),
            ..Default::default()
        }
    }

    fn read(dir: &TempDir, name: &str) -> String {
        fs::read_to_string(dir.path().join(name)).expect("should read output")
    }

    #[test]
    fn run_writes_the_three_outputs() {
        let input = input_dir();
        let output = TempDir::new().expect("should create output dir");
        let config = builder(&input, &output).build().expect("should build");

        let written = run(&config).expect("should run");
        assert_eq!(written.len(), 3);

        assert_eq!(read(&output, "SoilCats.txt"), "0 0\n1 0\n");
        assert_eq!(
            read(&output, "SoilProperties.txt"),
            "SoilProperty,SuperCats,SoilType,VG_ThetaS,VG_ThetaR,VG_Ksat,VG_alpha,VG_n,</SoilProperty>\n\
             <SoilProperty>,0,0,0.4,0.05,1.0,0.02,1.5,</SoilProperty>\n\
             <SoilProperty>,1,1,0.5,0.06,2.0,0.03,1.6,</SoilProperty>\n"
        );
        assert_eq!(
            read(&output, "SoilDetails.txt"),
            "<SoilDetails>,SuperCats,SoilLayer,SoilType,Depth[m],</SoilDetails>\n\
             <SoilDetail>,0,1,0,2.0,</SoilDetail>\n\
             <SoilDetail>,1,1,1,2.0,</SoilDetail>\n"
        );
    }

    #[test]
    fn run_writes_subcategories_and_layers() {
        let input = input_dir();
        let output = TempDir::new().expect("should create output dir");
        let defs = ConfigBuilder {
            subcategories_name: Some("SubCats".into()),
            layer_depths: Some(vec![0.5, 2.0]),
            ..builder(&input, &output)
        };
        let config = defs.build().expect("should build");

        let written = run(&config).expect("should run");
        assert_eq!(written.len(), 4);
        assert_eq!(read(&output, "SubCats.txt"), "1 2\n3 4\n");

        let details = read(&output, "SoilDetails.txt");
        let rows: Vec<&str> = details.lines().skip(1).collect();
        assert_eq!(
            rows,
            vec![
                "<SoilDetail>,0,1,0,0.5,</SoilDetail>",
                "<SoilDetail>,0,2,0,2.0,</SoilDetail>",
                "<SoilDetail>,1,1,1,0.5,</SoilDetail>",
                "<SoilDetail>,1,2,1,2.0,</SoilDetail>",
            ]
        );
    }

    #[test]
    fn run_is_idempotent() {
        let input = input_dir();
        let first = TempDir::new().expect("should create output dir");
        let second = TempDir::new().expect("should create output dir");

        run(&builder(&input, &first).build().expect("should build")).expect("should run");
        run(&builder(&input, &second).build().expect("should build")).expect("should run");

        for name in ["SoilCats.txt", "SoilProperties.txt", "SoilDetails.txt"] {
            let a = fs::read(first.path().join(name)).expect("should read");
            let b = fs::read(second.path().join(name)).expect("should read");
            assert_eq!(a, b, "{name} differs between runs");
        }
    }

    #[test]
    fn failed_run_leaves_no_output() {
        let input = input_dir();
        write_grid(input.path(), "VG_N_5km.asc", &[&[1.5, 1.5, 1.5], &[1.6, 1.5, 1.5]]);
        let output = TempDir::new().expect("should create output dir");
        let config = builder(&input, &output).build().expect("should build");

        let result = run(&config);
        assert!(matches!(
            result,
            Err(ShetranError::Stage { stage: "reading parameter grids", .. })
        ));
        let msg = result.err().map(|err| err.to_string()).unwrap_or_default();
        assert!(msg.contains("VG_N_5km.asc"));
        assert_eq!(fs::read_dir(output.path()).expect("should list").count(), 0);
    }

    #[test]
    fn missing_grid_fails_while_locating() {
        let input = input_dir();
        fs::remove_file(input.path().join("VG_Alpha_5km.asc")).expect("should remove");
        let output = TempDir::new().expect("should create output dir");
        let config = builder(&input, &output).build().expect("should build");

        assert!(matches!(
            run(&config),
            Err(ShetranError::Stage { stage: "locating input grids", .. })
        ));
    }

    #[test]
    fn command_line_overrides_config_file() {
        let args = Args::parse_from([
            "shetran-soil",
            "-i",
            "/data/grids",
            "--resolution",
            "1km",
            "--dedup",
            "tuple",
            "--nodata",
            "-9999",
            "--layer-depth",
            "0.5",
            "--layer-depth",
            "2",
            "--pattern",
            "N:^n_",
        ]);
        let from_file = ConfigBuilder {
            input_dir: Some("/other".into()),
            output_dir: Some("/out".into()),
            resolution: Some("5km".into()),
            ..Default::default()
        };
        let defs = from_file.merge(args.config_builder().expect("should convert"));

        assert_eq!(defs.input_dir.as_deref(), Some("/data/grids"));
        assert_eq!(defs.output_dir.as_deref(), Some("/out"));
        assert_eq!(defs.resolution.as_deref(), Some("1km"));
        assert_eq!(defs.dedup, Some(DedupMode::Tuple));
        assert_eq!(defs.nodata, Some(-9999.0));
        assert_eq!(defs.layer_depths, Some(vec![0.5, 2.0]));
        assert_eq!(
            defs.patterns
                .get(&shetran_soil::models::input::SoilParameter::N)
                .map(String::as_str),
            Some("^n_")
        );
    }

    #[test]
    fn oversized_header_fails_without_panicking() {
        let input = input_dir();
        fs::write(
            input.path().join("VG_ThetaS_5km.asc"),
            "ncols 10000000000\nnrows 10000000000\n0.4\n",
        )
        .expect("should write grid");
        let output = TempDir::new().expect("should create output dir");
        let config = builder(&input, &output).build().expect("should build");

        let result = run(&config);
        assert!(matches!(
            &result,
            Err(ShetranError::Stage { stage: "locating input grids", source })
                if matches!(**source, ShetranError::Format { .. })
        ));
        assert_eq!(fs::read_dir(output.path()).expect("should list").count(), 0);
    }

    #[test]
    fn resolution_can_come_from_the_environment() {
        set_var("SHETRAN_SOIL_RESOLUTION", "250m");
        let args = Args::try_parse_from(["shetran-soil", "-i", "/data/grids"]);
        std::env::remove_var("SHETRAN_SOIL_RESOLUTION");

        let args = args.expect("should parse");
        assert_eq!(args.resolution.as_deref(), Some("250m"));
        assert_eq!(args.input_dir.as_deref(), Some("/data/grids"));
    }

    #[test]
    fn dry_run_resolves_without_writing() {
        let input = input_dir();
        let output = TempDir::new().expect("should create output dir");
        let input_path = input.path().to_string_lossy().into_owned();
        let output_path = output.path().to_string_lossy().into_owned();
        let args = Args::try_parse_from([
            "shetran-soil",
            "-i",
            input_path.as_str(),
            "-r",
            "5km",
            "-o",
            output_path.as_str(),
            "--dry-run",
        ])
        .expect("should parse");

        let resolved = match execute(&args).expect("should resolve") {
            Outcome::DryRun(resolved) => resolved,
            Outcome::Written(_) => panic!("dry run should not write"),
        };
        let defs: ConfigBuilder = serde_yaml::from_str(&resolved).expect("should be valid yaml");
        assert_eq!(defs.resolution.as_deref(), Some("5km"));
        assert_eq!(defs.dedup, Some(DedupMode::ThetaS));
        assert_eq!(defs.layer_depths, Some(vec![2.0]));
        assert_eq!(defs.patterns.len(), 5);
        assert_eq!(fs::read_dir(output.path()).expect("should list").count(), 0);
    }
}
