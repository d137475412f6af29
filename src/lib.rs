//! Merge VTK XML unstructured hexahedral meshes into a single `ugrid32` binary mesh.
//!
//! The pipeline has four stages:
//!
//! 1. [`read_vtu`] parses each `.vtu` input into a [`SourceMesh`]
//! 2. [`HexAccumulator`] merges every mesh into one globally indexed vertex / hexahedron list
//! 3. [`cell_to_vertex`] turns the per-cell scalar field into a per-vertex field
//! 4. [`write_ugrid32`] emits `<base>.ugrid32` and `<base>.scalar`
//!
//! [`load_ugrid32`] is the inverse of step 4 and is used by downstream consumers.
//!
//! ```no_run
//! let options = ugrid::ConvertOptions::new("merged", vec!["a.vtu".into(), "b.vtu".into()]);
//! let summary = ugrid::convert(&options)?;
//! println!("{} hexes written", summary.hex_count);
//! # Ok::<(), ugrid::Error>(())
//! ```

mod accumulate;
mod convert;
mod header;
pub mod prelude;
mod read_ugrid;
mod resolve;
pub mod vtu;
mod write_ugrid;

pub use accumulate::{HexAccumulator, IngestError, HEX_ARITY};
pub use convert::{convert, ConversionSummary, ConvertOptions};
pub use header::UGridHeader;
pub use read_ugrid::{load_ugrid32, FormatError, UMesh, VertexFormat, VertexWidth};
pub use resolve::{cell_to_vertex, isolated_vertices, INCIDENCE_EPSILON};
pub use vtu::{parse_vtu, read_vtu, CellList, SourceMesh};
pub use write_ugrid::{scalar_path, ugrid32_path, write_ugrid32};

/// general purpose error enumeration for possible causes of failure.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("An io error occured: `{0}`")]
    Io(#[from] std::io::Error),
    #[error("Error while parsing VTU xml: {0}")]
    Parse(#[from] vtu::ParseError),
    #[error("Could not merge mesh: {0}")]
    Ingest(#[from] IngestError),
    #[error("Malformed ugrid32 data: {0}")]
    Format(#[from] FormatError),
    #[error("{what} count {count} does not fit in a 32 bit ugrid32 header")]
    CountOverflow { what: &'static str, count: usize },
    #[error("Failed to convert `{}`", path.display())]
    Input {
        path: std::path::PathBuf,
        source: Box<Error>,
    },
}

