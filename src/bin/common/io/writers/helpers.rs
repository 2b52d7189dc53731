use std::fmt::Display;
use std::io::Write;
use std::path::Path;

use ndarray::Array2;
use shetran_soil::models::{
    input::SOIL_PARAMETERS,
    output::{SoilDetailRecord, SoilPropertyRecord},
};
use tempfile::NamedTempFile;

use crate::common::helpers::ShetranError;

const PROPERTIES_OPEN: &str = "<SoilProperty>";
const PROPERTIES_CLOSE: &str = "</SoilProperty>";
const DETAILS_HEADER_OPEN: &str = "<SoilDetails>";
const DETAILS_HEADER_CLOSE: &str = "</SoilDetails>";
const DETAIL_OPEN: &str = "<SoilDetail>";
const DETAIL_CLOSE: &str = "</SoilDetail>";

/// Shortest representation that reads back to the same value, with `.0` on integral values
pub fn format_value(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        format!("{text}.0")
    } else {
        text
    }
}

/// One line per row, values separated by single spaces
pub fn render_grid<T: Display>(grid: &Array2<T>) -> String {
    let mut content = String::new();
    for row in grid.rows() {
        let line: Vec<String> = row.iter().map(|value| value.to_string()).collect();
        content.push_str(&line.join(" "));
        content.push('\n');
    }
    content
}

pub fn render_properties(records: &[SoilPropertyRecord]) -> String {
    let mut header: Vec<&str> = vec!["SoilProperty", "SuperCats", "SoilType"];
    header.extend(SOIL_PARAMETERS.iter().map(|p| p.column()));
    header.push(PROPERTIES_CLOSE);

    let mut content = header.join(",");
    content.push('\n');
    for record in records {
        let mut fields = vec![
            PROPERTIES_OPEN.to_string(),
            record.supercat.to_string(),
            record.soil_type.to_string(),
        ];
        fields.extend(record.parameters.values.iter().map(|v| format_value(*v)));
        fields.push(PROPERTIES_CLOSE.to_string());
        content.push_str(&fields.join(","));
        content.push('\n');
    }
    content
}

pub fn render_details(records: &[SoilDetailRecord]) -> String {
    let mut content = format!(
        "{DETAILS_HEADER_OPEN},SuperCats,SoilLayer,SoilType,Depth[m],{DETAILS_HEADER_CLOSE}\n"
    );
    for record in records {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            DETAIL_OPEN,
            record.supercat,
            record.layer,
            record.soil_type,
            format_value(record.depth),
            DETAIL_CLOSE
        ));
    }
    content
}

/// Writes `content` to a temporary file next to `path`, then renames it over `path`
pub fn write_atomically(path: &Path, content: &str) -> Result<(), ShetranError> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut file = NamedTempFile::new_in(dir).map_err(ShetranError::io(dir))?;
    file.write_all(content.as_bytes())
        .map_err(ShetranError::io(path))?;
    file.flush().map_err(ShetranError::io(path))?;
    file.persist(path)
        .map_err(|err| ShetranError::io(path)(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use ndarray::array;
    use shetran_soil::models::input::ParameterTuple;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn format_value_keeps_a_decimal_point() {
        assert_eq!(format_value(0.4), "0.4");
        assert_eq!(format_value(2.0), "2.0");
        assert_eq!(format_value(-999.0), "-999.0");
        assert_eq!(format_value(1.0), "1.0");
        assert_eq!(format_value(0.0001), "0.0001");
        assert_eq!(format_value(1.0e-7), "0.0000001");
    }

    #[test]
    fn render_grid_rows() {
        let grid = array![[0usize, 0], [1, 0]];
        assert_eq!(render_grid(&grid), "0 0\n1 0\n");
    }

    #[test]
    fn render_properties_table() {
        let records = vec![
            SoilPropertyRecord {
                supercat: 0,
                soil_type: 0,
                parameters: ParameterTuple::new(0.4, 0.05, 1.0, 0.02, 1.5),
            },
            SoilPropertyRecord {
                supercat: 1,
                soil_type: 1,
                parameters: ParameterTuple::new(-999.0, -999.0, -999.0, -999.0, -999.0),
            },
        ];
        let expected = "SoilProperty,SuperCats,SoilType,VG_ThetaS,VG_ThetaR,VG_Ksat,VG_alpha,VG_n,</SoilProperty>\n\
            <SoilProperty>,0,0,0.4,0.05,1.0,0.02,1.5,</SoilProperty>\n\
            <SoilProperty>,1,1,-999.0,-999.0,-999.0,-999.0,-999.0,</SoilProperty>\n";
        assert_eq!(render_properties(&records), expected);
    }

    #[test]
    fn render_details_table() {
        let records = vec![SoilDetailRecord {
            supercat: 3,
            layer: 1,
            soil_type: 3,
            depth: 2.0,
        }];
        let expected = "<SoilDetails>,SuperCats,SoilLayer,SoilType,Depth[m],</SoilDetails>\n\
            <SoilDetail>,3,1,3,2.0,</SoilDetail>\n";
        assert_eq!(render_details(&records), expected);
    }

    #[test]
    fn render_empty_tables_have_only_headers() {
        assert_eq!(render_properties(&[]).lines().count(), 1);
        assert_eq!(render_details(&[]).lines().count(), 1);
    }

    #[test]
    fn write_atomically_replaces_content() {
        let dir = TempDir::new().expect("should create dir");
        let path = dir.path().join("SoilCats.txt");
        fs::write(&path, "old").expect("should write");

        write_atomically(&path, "0 0\n1 0\n").expect("should write");
        assert_eq!(fs::read_to_string(&path).expect("should read"), "0 0\n1 0\n");
        assert_eq!(fs::read_dir(dir.path()).expect("should list").count(), 1);
    }

    #[test]
    fn write_atomically_fails_in_missing_dir() {
        let dir = TempDir::new().expect("should create dir");
        let path = dir.path().join("missing").join("SoilCats.txt");
        assert!(matches!(
            write_atomically(&path, ""),
            Err(ShetranError::Io { .. })
        ));
    }
}
