//! Merging independently indexed meshes into one globally indexed hexahedral mesh

use derive_more::{Constructor, Display};

use crate::header::UGridHeader;
use crate::vtu::SourceMesh;

/// number of vertices in every supported cell
pub const HEX_ARITY: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("unsupported number of points per cell: {arity} (cell {cell}), only hexahedra are supported")]
    UnsupportedTopology { cell: usize, arity: usize },
    #[error("{0}")]
    PointOutOfRange(PointOutOfRange),
    #[error("{0}")]
    MissingCellData(MissingCellData),
}

impl IngestError {
    /// true if the input itself is self-inconsistent, as opposed to merely unsupported
    pub fn is_corrupt_input(&self) -> bool {
        !matches!(self, Self::UnsupportedTopology { .. })
    }
}

#[derive(Display, Debug, Constructor, Clone, PartialEq)]
#[display(
    fmt = "cell {cell} references point {index} but the mesh only has {point_count} points (cell points: {cell_points:?})"
)]
pub struct PointOutOfRange {
    pub cell: usize,
    pub index: i64,
    pub point_count: usize,
    pub cell_points: Vec<i64>,
}

#[derive(Display, Debug, Constructor, Clone, PartialEq)]
#[display(fmt = "expected one cell scalar per cell ({cell_count} cells), found {scalar_count}")]
pub struct MissingCellData {
    pub cell_count: usize,
    pub scalar_count: usize,
}

/// Owns the growing vertex, hexahedron, and per-cell scalar lists of a merge.
///
/// Every call to [`ingest`](HexAccumulator::ingest) appends one mesh. The local point indices
/// of that mesh are shifted by the number of vertices already held, so a point with local index
/// `k` in the `i`th mesh lands at `p_1 + ... + p_(i-1) + k`. Indices are 0-based here; the
/// conversion to the on-disk 1-based form happens in the writer.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HexAccumulator {
    vertices: Vec<[f64; 3]>,
    hex_indices: Vec<usize>,
    cell_scalars: Vec<f64>,
}

impl HexAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one mesh.
    ///
    /// `cells` yields the local point indices of every cell, in the order they appear in the
    /// source. Every cell must have exactly [`HEX_ARITY`] points, every index must fall in
    /// `0..points.len()` and there must be exactly one scalar per cell.
    ///
    /// The mesh is validated in full before anything is appended, so a failed call leaves the
    /// accumulator unchanged.
    pub fn ingest<'c, I>(
        &mut self,
        points: &[[f64; 3]],
        cells: I,
        cell_scalars: &[f64],
    ) -> Result<(), IngestError>
    where
        I: IntoIterator<Item = &'c [i64]>,
    {
        let base_offset = self.vertices.len();
        let point_count = points.len();

        let mut hexes = Vec::new();
        let mut cell_count = 0;

        for (cell, cell_points) in cells.into_iter().enumerate() {
            if cell_points.len() != HEX_ARITY {
                return Err(IngestError::UnsupportedTopology {
                    cell,
                    arity: cell_points.len(),
                });
            }

            for &index in cell_points {
                let local = usize::try_from(index)
                    .ok()
                    .filter(|local| *local < point_count)
                    .ok_or_else(|| {
                        IngestError::PointOutOfRange(PointOutOfRange::new(
                            cell,
                            index,
                            point_count,
                            cell_points.to_vec(),
                        ))
                    })?;

                hexes.push(base_offset + local);
            }

            cell_count += 1;
        }

        if cell_scalars.len() != cell_count {
            return Err(IngestError::MissingCellData(MissingCellData::new(
                cell_count,
                cell_scalars.len(),
            )));
        }

        self.vertices.extend_from_slice(points);
        self.hex_indices.extend(hexes);
        self.cell_scalars.extend_from_slice(cell_scalars);

        Ok(())
    }

    /// Append a mesh produced by the VTU reader.
    ///
    /// A mesh with cells but no cell data is rejected as [`IngestError::MissingCellData`], after
    /// the cell topology has been checked.
    pub fn ingest_mesh(&mut self, mesh: &SourceMesh) -> Result<(), IngestError> {
        let scalars = mesh.cell_scalars.as_deref().unwrap_or(&[]);
        self.ingest(&mesh.points, mesh.cells.iter(), scalars)
    }

    pub fn vertices(&self) -> &[[f64; 3]] {
        &self.vertices
    }

    /// flat global hexahedron indices, [`HEX_ARITY`] per cell
    pub fn hex_indices(&self) -> &[usize] {
        &self.hex_indices
    }

    pub fn cell_scalars(&self) -> &[f64] {
        &self.cell_scalars
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn hex_count(&self) -> usize {
        self.hex_indices.len() / HEX_ARITY
    }

    /// header describing the current contents, fails if a count no longer fits in 32 bits
    pub fn header(&self) -> Result<UGridHeader, crate::Error> {
        UGridHeader::hexahedra(self.vertex_count(), self.hex_count())
    }
}
