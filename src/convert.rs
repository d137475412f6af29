//! The end to end merge: read every input, merge, resolve the scalar field, write the output

use crate::accumulate::HexAccumulator;
use crate::resolve::{cell_to_vertex, isolated_vertices};
use crate::vtu::read_vtu;
use crate::write_ugrid::write_ugrid32;
use crate::Error;

use log::{info, warn};
use std::path::{Path, PathBuf};

/// Inputs to a single conversion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// base path of the output, `.ugrid32` and `.scalar` are appended to it
    pub output: PathBuf,
    /// `.vtu` files in merge order
    pub inputs: Vec<PathBuf>,
    /// only merge the first `max_files` inputs
    pub max_files: Option<usize>,
}

impl ConvertOptions {
    pub fn new(output: impl Into<PathBuf>, inputs: Vec<PathBuf>) -> Self {
        Self {
            output: output.into(),
            inputs,
            max_files: None,
        }
    }

    pub fn max_files(mut self, max_files: usize) -> Self {
        self.max_files = Some(max_files);
        self
    }

    /// the inputs that will actually be read, in order
    pub fn selected_inputs(&self) -> &[PathBuf] {
        match self.max_files {
            Some(max) if max < self.inputs.len() => &self.inputs[..max],
            _ => &self.inputs,
        }
    }
}

/// What a conversion produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversionSummary {
    pub files_read: usize,
    pub vertex_count: usize,
    pub hex_count: usize,
    /// vertices referenced by no hexahedron, their scalar is written as `0.0`
    pub isolated_vertices: usize,
}

/// Merge the selected inputs and write `<output>.ugrid32` and `<output>.scalar`.
///
/// Every input is read and merged before anything is written, so a failure in any input
/// leaves no output files behind.
pub fn convert(options: &ConvertOptions) -> Result<ConversionSummary, Error> {
    let inputs = options.selected_inputs();
    if inputs.len() < options.inputs.len() {
        info!(
            "merging the first {} of {} input files",
            inputs.len(),
            options.inputs.len()
        );
    }

    let mut accumulator = HexAccumulator::new();

    for (index, path) in inputs.iter().enumerate() {
        info!("reading {} ({}/{})", path.display(), index + 1, inputs.len());
        merge_file(&mut accumulator, path).map_err(|source| Error::Input {
            path: path.clone(),
            source: Box::new(source),
        })?;
    }

    let header = accumulator.header()?;
    let hex_indices = accumulator.hex_indices();
    let vertex_count = accumulator.vertex_count();

    let vertex_scalars = cell_to_vertex(vertex_count, hex_indices, accumulator.cell_scalars());
    let isolated = isolated_vertices(vertex_count, hex_indices);
    if isolated > 0 {
        warn!("{isolated} of {vertex_count} vertices belong to no hexahedron, scalar set to 0");
    }

    write_ugrid32(
        &options.output,
        &header,
        accumulator.vertices(),
        hex_indices,
        &vertex_scalars,
    )?;

    Ok(ConversionSummary {
        files_read: inputs.len(),
        vertex_count,
        hex_count: accumulator.hex_count(),
        isolated_vertices: isolated,
    })
}

fn merge_file(accumulator: &mut HexAccumulator, path: &Path) -> Result<(), Error> {
    let mesh = read_vtu(path)?;
    accumulator.ingest_mesh(&mesh)?;
    Ok(())
}
