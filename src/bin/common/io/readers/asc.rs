//! Reader for ASCII grid rasters.
//!
//! ```text
//! ncols        3
//! nrows        2
//! xllcorner    -60.5
//! yllcorner    1.2
//! cellsize     5000
//! NODATA_value -999
//! 0.41 0.43 -999
//! 0.40 0.41 0.39
//! ```
//!
//! Header lines are the leading lines whose first token is not a number.
//! Only `ncols` and `nrows` are required.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use log::{debug, warn};
use ndarray::Array2;
use regex::Regex;
use shetran_soil::models::input::SoilParameter;

use crate::common::{config::models::Config, helpers::ShetranError};

use super::{
    locator::{locate_grids, map_parameters},
    prelude::InputHandler,
};

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"-?\d+\.?\d*").expect("Should be a valid regex");
}

const NCOLS_KEY: &str = "ncols";
const NROWS_KEY: &str = "nrows";

/// Header block of an ASCII grid
#[derive(Debug, Clone, PartialEq)]
pub struct AscHeader {
    pub ncols: usize,
    pub nrows: usize,
    pub xll: Option<f64>,
    pub yll: Option<f64>,
    pub cellsize: Option<f64>,
    pub nodata: Option<f64>,
    /// number of lines before the data section
    pub lines: usize,
}

impl AscHeader {
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }
}

fn is_numeric(token: &str) -> bool {
    token.parse::<f64>().is_ok()
}

fn first_number(line: &str) -> Option<&str> {
    NUMBER.find(line).map(|m| m.as_str())
}

fn parse_dimension(path: &Path, key: &str, line: &str) -> Result<usize, ShetranError> {
    let value = first_number(line)
        .and_then(|number| number.parse::<f64>().ok())
        .ok_or_else(|| ShetranError::format(path, format!("no value for {key} in '{line}'")))?;

    if value.fract() != 0.0 || value < 1.0 {
        return Err(ShetranError::format(
            path,
            format!("{key} must be a positive integer, found {value}"),
        ));
    }
    Ok(value as usize)
}

fn parse_optional(line: &str) -> Option<f64> {
    first_number(line).and_then(|number| number.parse::<f64>().ok())
}

/// Parses the header block of an ASCII grid
pub fn parse_header(path: &Path, content: &str) -> Result<AscHeader, ShetranError> {
    let mut ncols: Option<usize> = None;
    let mut nrows: Option<usize> = None;
    let mut xll: Option<f64> = None;
    let mut yll: Option<f64> = None;
    let mut cellsize: Option<f64> = None;
    let mut nodata: Option<f64> = None;
    let mut lines = 0;

    for line in content.lines() {
        let key = match line.split_whitespace().next() {
            Some(key) => key,
            None => {
                lines += 1;
                continue;
            }
        };
        if is_numeric(key) {
            break;
        }
        lines += 1;

        match key.to_ascii_lowercase().as_str() {
            NCOLS_KEY => ncols = Some(parse_dimension(path, NCOLS_KEY, line)?),
            NROWS_KEY => nrows = Some(parse_dimension(path, NROWS_KEY, line)?),
            "xllcorner" | "xllcenter" => xll = parse_optional(line),
            "yllcorner" | "yllcenter" => yll = parse_optional(line),
            "cellsize" => cellsize = parse_optional(line),
            "nodata_value" => nodata = parse_optional(line),
            _ => debug!("{}: ignoring header line '{}'", path.display(), line),
        }
    }

    let ncols = ncols.ok_or_else(|| ShetranError::format(path, "missing ncols in header"))?;
    let nrows = nrows.ok_or_else(|| ShetranError::format(path, "missing nrows in header"))?;

    // ndarray rejects shapes whose cell count does not fit an isize
    match nrows.checked_mul(ncols) {
        Some(cells) if cells <= isize::MAX as usize => {}
        _ => {
            return Err(ShetranError::format(
                path,
                format!("grid of {nrows} rows x {ncols} columns is too large"),
            ))
        }
    }

    Ok(AscHeader {
        ncols,
        nrows,
        xll,
        yll,
        cellsize,
        nodata,
        lines,
    })
}

/// Parses the data section of an ASCII grid whose `header` has already been read.
/// The grid must have the `expected` (rows, cols) shape.
pub fn parse_grid(
    path: &Path,
    content: &str,
    header: &AscHeader,
    expected: (usize, usize),
) -> Result<Array2<f64>, ShetranError> {
    if header.shape() != expected {
        return Err(ShetranError::ShapeMismatch {
            path: path.display().to_string(),
            expected,
            found: header.shape(),
        });
    }

    let (nrows, ncols) = expected;
    // every value takes at least two bytes, so the content bounds the allocation
    let mut values: Vec<f64> = Vec::with_capacity((nrows * ncols).min(content.len() / 2 + 1));
    let mut rows = 0;

    for (i, line) in content.lines().enumerate().skip(header.lines) {
        if line.trim().is_empty() {
            continue;
        }
        rows += 1;
        if rows > nrows {
            return Err(ShetranError::format(
                path,
                format!("more than {nrows} data rows, extra row at line {}", i + 1),
            ));
        }

        let before = values.len();
        for token in line.split_whitespace() {
            let value = token.parse::<f64>().map_err(|_| {
                ShetranError::format(path, format!("invalid value '{token}' at line {}", i + 1))
            })?;
            values.push(value);
        }
        let found = values.len() - before;
        if found != ncols {
            return Err(ShetranError::format(
                path,
                format!("expected {ncols} values at line {}, found {found}", i + 1),
            ));
        }
    }

    if rows != nrows {
        return Err(ShetranError::format(
            path,
            format!("expected {nrows} data rows, found {rows}"),
        ));
    }

    Array2::from_shape_vec(expected, values)
        .map_err(|err| ShetranError::format(path, err.to_string()))
}

fn read_content(path: &Path) -> Result<String, ShetranError> {
    fs::read_to_string(path).map_err(ShetranError::io(path))
}

/// Reads the header of a grid file
pub fn read_header(path: &Path) -> Result<AscHeader, ShetranError> {
    parse_header(path, &read_content(path)?)
}

/// Input handler reading one ASCII grid per soil parameter
#[derive(Debug)]
pub struct AscInputHandler {
    files: BTreeMap<SoilParameter, PathBuf>,
    header: AscHeader,
    nodata: f64,
}

impl AscInputHandler {
    /// Locates the grids of the configured resolution and reads the shared dimensions
    /// from the ThetaS grid
    pub fn new(config: &Config) -> Result<Self, ShetranError> {
        let paths = locate_grids(&config.input_dir, &config.resolution, &config.extension)?;
        let files = map_parameters(&paths, &config.patterns)?;

        let reference = files
            .get(&SoilParameter::ThetaS)
            .ok_or("No grid file for ThetaS")?;
        let header = read_header(reference)?;

        Ok(Self {
            files,
            header,
            nodata: config.soil.nodata,
        })
    }
}

impl InputHandler for AscInputHandler {
    fn shape(&self) -> (usize, usize) {
        self.header.shape()
    }

    fn get_values(&self, parameter: SoilParameter) -> Result<Array2<f64>, ShetranError> {
        let path = self
            .files
            .get(&parameter)
            .ok_or(format!("No grid file for {parameter}"))?;
        debug!("Reading {} from {}", parameter, path.display());

        let content = read_content(path)?;
        let header = parse_header(path, &content)?;
        if let Some(nodata) = header.nodata {
            if nodata != self.nodata {
                warn!(
                    "{}: NODATA_value {} differs from the configured no-data value {}",
                    path.display(),
                    nodata,
                    self.nodata
                );
            }
        }
        parse_grid(path, &content, &header, self.shape())
    }

    fn info_input(&self) -> String {
        let (nrows, ncols) = self.shape();
        let mut info = format!("grid {nrows} rows x {ncols} columns");
        if let (Some(xll), Some(yll)) = (self.header.xll, self.header.yll) {
            info.push_str(&format!(", lower left corner ({xll}, {yll})"));
        }
        if let Some(cellsize) = self.header.cellsize {
            info.push_str(&format!(", cell size {cellsize}"));
        }
        for (parameter, path) in &self.files {
            info.push_str(&format!("\n{:>7}: {}", parameter.to_string(), path.display()));
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: &str = "ncols        3
nrows        2
xllcorner    -60.5
yllcorner    1.25
cellsize     5000
NODATA_value -999
0.41 0.43 -999
0.40 0.41 0.39
";

    fn path() -> PathBuf {
        PathBuf::from("VG_ThetaS_5km.asc")
    }

    fn read_str(content: &str, expected: (usize, usize)) -> Result<Array2<f64>, ShetranError> {
        let header = parse_header(&path(), content)?;
        parse_grid(&path(), content, &header, expected)
    }

    #[test]
    fn parse_header_reads_dimensions_and_metadata() {
        let header = parse_header(&path(), GRID).expect("should parse");
        assert_eq!(header.shape(), (2, 3));
        assert_eq!(header.xll, Some(-60.5));
        assert_eq!(header.yll, Some(1.25));
        assert_eq!(header.cellsize, Some(5000.0));
        assert_eq!(header.nodata, Some(-999.0));
        assert_eq!(header.lines, 6);
    }

    #[test]
    fn parse_header_is_case_insensitive() {
        let header = parse_header(&path(), "NCOLS 4\nNROWS 1\n1 2 3 4\n").expect("should parse");
        assert_eq!(header.shape(), (1, 4));
        assert_eq!(header.nodata, None);
    }

    #[test]
    fn parse_header_accepts_integral_float() {
        let header = parse_header(&path(), "ncols 2.0\nnrows 1\n1 2\n").expect("should parse");
        assert_eq!(header.ncols, 2);
    }

    #[test]
    fn parse_header_fails_without_nrows() {
        let result = parse_header(&path(), "ncols 3\ncellsize 5\n1 2 3\n");
        assert!(matches!(result, Err(ShetranError::Format { message, .. }) if message.contains("nrows")));
    }

    #[test]
    fn parse_header_fails_for_bad_dimension() {
        assert!(parse_header(&path(), "ncols 2.5\nnrows 1\n1 2\n").is_err());
        assert!(parse_header(&path(), "ncols 0\nnrows 1\n").is_err());
        assert!(parse_header(&path(), "ncols many\nnrows 1\n").is_err());
    }

    #[test]
    fn parse_header_rejects_oversized_grid() {
        let content = "ncols 10000000000\nnrows 10000000000\n0.4\n";
        let result = parse_header(&path(), content);
        assert!(matches!(result, Err(ShetranError::Format { message, .. }) if message.contains("too large")));
    }

    #[test]
    fn parse_grid_with_huge_header_and_little_data_fails() {
        let content = "ncols 100000\nnrows 100000\n0.4\n";
        assert!(matches!(
            read_str(content, (100000, 100000)),
            Err(ShetranError::Format { .. })
        ));
    }

    #[test]
    fn parse_grid_reads_values_row_major() {
        let grid = read_str(GRID, (2, 3)).expect("should parse");
        assert_eq!(grid.dim(), (2, 3));
        assert_eq!(grid[[0, 2]], -999.0);
        assert_eq!(grid[[1, 0]], 0.40);
    }

    #[test]
    fn parse_grid_detects_shape_mismatch() {
        let result = read_str(GRID, (3, 3));
        assert!(matches!(
            result,
            Err(ShetranError::ShapeMismatch {
                expected: (3, 3),
                found: (2, 3),
                ..
            })
        ));
    }

    #[test]
    fn parse_grid_fails_for_short_row() {
        let content = "ncols 3\nnrows 2\n0.1 0.2 0.3\n0.1 0.2\n";
        let result = read_str(content, (2, 3));
        assert!(matches!(result, Err(ShetranError::Format { message, .. }) if message.contains("line 4")));
    }

    #[test]
    fn parse_grid_fails_for_missing_row() {
        let content = "ncols 3\nnrows 2\n0.1 0.2 0.3\n";
        assert!(matches!(
            read_str(content, (2, 3)),
            Err(ShetranError::Format { .. })
        ));
    }

    #[test]
    fn parse_grid_fails_for_extra_row() {
        let content = "ncols 1\nnrows 1\n0.1\n0.2\n";
        assert!(read_str(content, (1, 1)).is_err());
    }

    #[test]
    fn parse_grid_fails_for_invalid_value() {
        let content = "ncols 2\nnrows 1\n0.1 abc\n";
        assert!(matches!(
            read_str(content, (1, 2)),
            Err(ShetranError::Format { .. })
        ));
    }

    #[test]
    fn read_header_fails_for_missing_file() {
        let result = read_header(Path::new("/definitely/not/here.asc"));
        assert!(matches!(result, Err(ShetranError::Io { .. })));
    }
}
