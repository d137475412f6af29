//! Common types and functions that are useful for working with `ugrid`

pub use crate::{
    cell_to_vertex, convert, load_ugrid32, read_vtu, write_ugrid32, ConversionSummary,
    ConvertOptions, Error, HexAccumulator, SourceMesh, UGridHeader, UMesh, VertexFormat,
};
