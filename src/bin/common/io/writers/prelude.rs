use std::path::Path;

use crate::common::io::models::output::SoilOutput;

/// Trait implemented by the output files of a run. Rendering never touches the filesystem.
pub trait OutputSink {
    /// short name used in logs
    fn name(&self) -> &'static str;

    fn path(&self) -> &Path;

    /// Full content of the file
    fn render(&self, output: &SoilOutput) -> String;
}
