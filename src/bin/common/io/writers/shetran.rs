use std::path::{Path, PathBuf};

use crate::common::io::models::output::SoilOutput;

use super::{
    helpers::{render_details, render_grid, render_properties},
    prelude::OutputSink,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridKind {
    SuperCategories,
    SubCategories,
}

/// Category map, one id per cell
pub struct GridWriter {
    path: PathBuf,
    kind: GridKind,
}

impl GridWriter {
    pub fn new(path: PathBuf, kind: GridKind) -> Self {
        Self { path, kind }
    }
}

impl OutputSink for GridWriter {
    fn name(&self) -> &'static str {
        match self.kind {
            GridKind::SuperCategories => "SUPERCATS",
            GridKind::SubCategories => "SUBCATS",
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn render(&self, output: &SoilOutput) -> String {
        match self.kind {
            GridKind::SuperCategories => render_grid(&output.categories.grid),
            GridKind::SubCategories => output
                .subcategories
                .as_ref()
                .map(render_grid)
                .unwrap_or_default(),
        }
    }
}

pub struct SoilPropertiesWriter {
    path: PathBuf,
}

impl SoilPropertiesWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl OutputSink for SoilPropertiesWriter {
    fn name(&self) -> &'static str {
        "SOILPROPERTIES"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn render(&self, output: &SoilOutput) -> String {
        render_properties(&output.properties)
    }
}

pub struct SoilDetailsWriter {
    path: PathBuf,
}

impl SoilDetailsWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl OutputSink for SoilDetailsWriter {
    fn name(&self) -> &'static str {
        "SOILDETAILS"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn render(&self, output: &SoilOutput) -> String {
        render_details(&output.details)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use shetran_soil::{
        models::input::SoilInput, modules::soil::config::SoilCategoryConfig,
        modules::soil::functions::subcategory_grid,
    };

    use super::*;

    fn output() -> SoilOutput {
        let theta_s = array![[0.4, 0.4], [0.5, 0.4]];
        let other = array![[0.1, 0.1], [0.2, 0.1]];
        let input = SoilInput::from_grids([
            theta_s,
            other.clone(),
            other.clone(),
            other.clone(),
            other,
        ])
        .expect("should build input");
        let config = SoilCategoryConfig::default();
        let categories = config.reduce(&input).expect("should reduce");
        SoilOutput::new(Some(subcategory_grid(2, 2)), categories, &config.layer_depths)
    }

    #[test]
    fn grid_writers_render_their_grid() {
        let output = output();
        let supercats = GridWriter::new(PathBuf::from("SoilCats.txt"), GridKind::SuperCategories);
        let subcats = GridWriter::new(PathBuf::from("SubCats.txt"), GridKind::SubCategories);
        assert_eq!(supercats.render(&output), "0 0\n1 0\n");
        assert_eq!(subcats.render(&output), "1 2\n3 4\n");
        assert_eq!(supercats.name(), "SUPERCATS");
    }

    #[test]
    fn table_writers_share_the_category_ids() {
        let output = output();
        let properties = SoilPropertiesWriter::new(PathBuf::from("SoilProperties.txt"));
        let details = SoilDetailsWriter::new(PathBuf::from("SoilDetails.txt"));

        let properties = properties.render(&output);
        let details = details.render(&output);
        assert_eq!(properties.lines().count(), 3);
        assert_eq!(details.lines().count(), 3);
        assert!(properties.contains("<SoilProperty>,1,1,0.5,0.2,0.2,0.2,0.2,</SoilProperty>"));
        assert!(details.contains("<SoilDetail>,1,1,1,2.0,</SoilDetail>"));
    }
}
