use std::path::PathBuf;

use chrono::Utc;
use log::{debug, trace};
use ndarray::Array2;
use shetran_soil::{
    models::output::{SoilDetailRecord, SoilPropertyRecord},
    modules::soil::models::SuperCategories,
};

use crate::common::{
    config::models::Config,
    helpers::ShetranError,
    io::writers::{
        helpers::write_atomically,
        prelude::OutputSink,
        shetran::{GridKind, GridWriter, SoilDetailsWriter, SoilPropertiesWriter},
    },
};

/// Everything emitted by a conversion run
#[derive(Debug, Clone)]
pub struct SoilOutput {
    /// positional ids, only built when the subcategory map is requested
    pub subcategories: Option<Array2<u64>>,
    pub categories: SuperCategories,
    pub properties: Vec<SoilPropertyRecord>,
    pub details: Vec<SoilDetailRecord>,
}

impl SoilOutput {
    pub fn new(
        subcategories: Option<Array2<u64>>,
        categories: SuperCategories,
        layer_depths: &[f64],
    ) -> Self {
        let properties = categories.properties();
        let details = categories.details(layer_depths);
        Self {
            subcategories,
            categories,
            properties,
            details,
        }
    }
}

/// Set of sinks configured for a run
pub struct OutputWriter {
    sinks: Vec<Box<dyn OutputSink>>,
}

impl OutputWriter {
    pub fn new(config: &Config) -> Self {
        let mut sinks: Vec<Box<dyn OutputSink>> = vec![
            Box::new(GridWriter::new(
                config.output_path(&config.supercats_name),
                GridKind::SuperCategories,
            )),
            Box::new(SoilPropertiesWriter::new(
                config.output_path(&config.soil_properties_name),
            )),
            Box::new(SoilDetailsWriter::new(
                config.output_path(&config.soil_details_name),
            )),
        ];
        if let Some(name) = &config.subcategories_name {
            sinks.push(Box::new(GridWriter::new(
                config.output_path(name),
                GridKind::SubCategories,
            )));
        }
        Self { sinks }
    }

    /// Renders every file first, then writes them one by one
    pub fn write_output(&self, output: &SoilOutput) -> Result<Vec<PathBuf>, ShetranError> {
        let c = Utc::now();
        let rendered: Vec<(&dyn OutputSink, String)> = self
            .sinks
            .iter()
            .map(|sink| (sink.as_ref(), sink.render(output)))
            .collect();
        trace!("Rendering output took {} seconds", Utc::now() - c);

        let mut written = Vec::with_capacity(rendered.len());
        for (sink, content) in rendered {
            debug!("[{}] Writing {}", sink.name(), sink.path().display());
            write_atomically(sink.path(), &content)?;
            written.push(sink.path().to_owned());
        }
        Ok(written)
    }
}
