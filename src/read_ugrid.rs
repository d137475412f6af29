//! Loading `ugrid32` files back into memory

use crate::accumulate::HEX_ARITY;
use crate::header::UGridHeader;
use crate::Error;

use byteorder::{ByteOrder, LittleEndian};
use derive_more::{Constructor, Display};
use std::path::Path;

/// How the vertex block of a `ugrid32` file is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexFormat {
    /// infer the width from the file name, see [`VertexWidth::from_file_name`]
    #[default]
    Auto,
    Double,
    Float,
}

/// Resolved vertex coordinate width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexWidth {
    Double,
    Float,
}

impl VertexWidth {
    /// Files named with the `.lb4.` marker (little endian, 4 byte) hold 32 bit vertices,
    /// everything else holds 64 bit vertices.
    pub fn from_file_name(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();

        if name.contains(".lb4.") {
            Self::Float
        } else {
            Self::Double
        }
    }

    /// bytes per coordinate
    pub fn bytes(&self) -> usize {
        match self {
            Self::Double => std::mem::size_of::<f64>(),
            Self::Float => std::mem::size_of::<f32>(),
        }
    }
}

impl VertexFormat {
    pub fn resolve(&self, path: &Path) -> VertexWidth {
        match self {
            Self::Auto => VertexWidth::from_file_name(path),
            Self::Double => VertexWidth::Double,
            Self::Float => VertexWidth::Float,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("{0}")]
    Size(SizeMismatch),
    #[error("file declares {count} {element} elements, only hexahedra are supported")]
    UnsupportedElements { element: &'static str, count: u32 },
    #[error("{0}")]
    BadIndex(BadIndex),
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "{file} is {actual} bytes but its header declares {expected} bytes")]
pub struct SizeMismatch {
    pub file: &'static str,
    pub expected: u64,
    pub actual: u64,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "hexahedron {cell} stores vertex index {stored} (1-based) but there are only {vertex_count} vertices")]
pub struct BadIndex {
    pub cell: usize,
    pub stored: u64,
    pub vertex_count: usize,
}

/// An in-memory hexahedral mesh loaded from a `ugrid32` file.
#[derive(Debug, Clone, PartialEq)]
pub struct UMesh {
    /// coordinates, widened to `f64` when the file stores `f32`
    pub vertices: Vec<[f64; 3]>,
    /// 0-based vertex indices of every hexahedron
    pub hexes: Vec<[usize; HEX_ARITY]>,
    /// per-vertex field, present only when a scalar file was loaded
    pub per_vertex: Option<Vec<f32>>,
}

/// Load a `ugrid32` file and, when `scalar_file` is given, its companion per-vertex scalar file.
pub fn load_ugrid32(
    format: VertexFormat,
    data_file: &Path,
    scalar_file: Option<&Path>,
) -> Result<UMesh, Error> {
    let width = format.resolve(data_file);
    log::debug!("loading {} with {width:?} vertices", data_file.display());

    let bytes = std::fs::read(data_file)?;
    let (vertices, hexes) = parse_mesh(&bytes, width)?;

    let per_vertex = scalar_file
        .map(|path| {
            let bytes = std::fs::read(path)?;
            parse_scalars(&bytes, vertices.len())
        })
        .transpose()?;

    Ok(UMesh {
        vertices,
        hexes,
        per_vertex,
    })
}

pub(crate) fn parse_mesh(
    bytes: &[u8],
    width: VertexWidth,
) -> Result<(Vec<[f64; 3]>, Vec<[usize; HEX_ARITY]>), Error> {
    if bytes.len() < UGridHeader::BYTES {
        let mismatch =
            SizeMismatch::new("ugrid32 file", UGridHeader::BYTES as u64, bytes.len() as u64);
        return Err(FormatError::Size(mismatch).into());
    }

    let mut header_bytes = &bytes[..UGridHeader::BYTES];
    let header = UGridHeader::read(&mut header_bytes)?;

    if let Some((element, count)) = header.unsupported_counts().into_iter().next() {
        return Err(FormatError::UnsupportedElements { element, count }.into());
    }

    let vertex_count = header.n_verts as usize;
    let hex_count = header.n_hexes as usize;

    let vertex_bytes = vertex_count as u64 * 3 * width.bytes() as u64;
    let hex_bytes = hex_count as u64 * HEX_ARITY as u64 * std::mem::size_of::<u64>() as u64;
    let expected = UGridHeader::BYTES as u64 + vertex_bytes + hex_bytes;

    if bytes.len() as u64 != expected {
        let mismatch = SizeMismatch::new("ugrid32 file", expected, bytes.len() as u64);
        return Err(FormatError::Size(mismatch).into());
    }

    let (vertex_block, hex_block) = bytes[UGridHeader::BYTES..].split_at(vertex_bytes as usize);

    let coordinates: Vec<f64> = match width {
        VertexWidth::Double => {
            let mut out = vec![0f64; vertex_count * 3];
            LittleEndian::read_f64_into(vertex_block, &mut out);
            out
        }
        VertexWidth::Float => {
            let mut out = vec![0f32; vertex_count * 3];
            LittleEndian::read_f32_into(vertex_block, &mut out);
            out.into_iter().map(f64::from).collect()
        }
    };

    let vertices = coordinates
        .chunks_exact(3)
        .map(|xyz| [xyz[0], xyz[1], xyz[2]])
        .collect();

    let mut stored = vec![0u64; hex_count * HEX_ARITY];
    LittleEndian::read_u64_into(hex_block, &mut stored);

    let mut hexes = Vec::with_capacity(hex_count);
    for (cell, one_based) in stored.chunks_exact(HEX_ARITY).enumerate() {
        let mut hex = [0usize; HEX_ARITY];
        for (slot, &index) in hex.iter_mut().zip(one_based) {
            *slot = index
                .checked_sub(1)
                .map(|index| index as usize)
                .filter(|index| *index < vertex_count)
                .ok_or_else(|| FormatError::BadIndex(BadIndex::new(cell, index, vertex_count)))?;
        }
        hexes.push(hex);
    }

    Ok((vertices, hexes))
}

pub(crate) fn parse_scalars(bytes: &[u8], vertex_count: usize) -> Result<Vec<f32>, Error> {
    let expected = vertex_count as u64 * std::mem::size_of::<f32>() as u64;
    if bytes.len() as u64 != expected {
        let mismatch = SizeMismatch::new("scalar file", expected, bytes.len() as u64);
        return Err(FormatError::Size(mismatch).into());
    }

    let mut values = vec![0f32; vertex_count];
    LittleEndian::read_f32_into(bytes, &mut values);
    Ok(values)
}
