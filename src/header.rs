//! The fixed size header that opens every `ugrid32` file

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// The fixed seven field header at the start of every `ugrid32` file.
///
/// Only `n_verts` and `n_hexes` are ever non-zero for meshes produced by this crate. The other
/// element counts exist for format compatibility.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UGridHeader {
    pub n_verts: u32,
    pub n_tris: u32,
    pub n_quads: u32,
    pub n_tets: u32,
    pub n_pyrs: u32,
    pub n_prisms: u32,
    pub n_hexes: u32,
}

impl UGridHeader {
    /// size of the header on disk
    pub const BYTES: usize = 7 * std::mem::size_of::<u32>();

    /// header for a hexahedra-only mesh
    pub fn hexahedra(vertex_count: usize, hex_count: usize) -> Result<Self, crate::Error> {
        let n_verts = u32::try_from(vertex_count).map_err(|_| crate::Error::CountOverflow {
            what: "vertex",
            count: vertex_count,
        })?;
        let n_hexes = u32::try_from(hex_count).map_err(|_| crate::Error::CountOverflow {
            what: "hexahedron",
            count: hex_count,
        })?;

        Ok(Self {
            n_verts,
            n_hexes,
            ..Self::default()
        })
    }

    /// element types other than hexahedra with a non-zero count, by name
    pub(crate) fn unsupported_counts(&self) -> Vec<(&'static str, u32)> {
        [
            ("triangle", self.n_tris),
            ("quad", self.n_quads),
            ("tetrahedron", self.n_tets),
            ("pyramid", self.n_pyrs),
            ("prism", self.n_prisms),
        ]
        .into_iter()
        .filter(|(_, count)| *count != 0)
        .collect()
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for field in self.fields() {
            writer.write_u32::<LittleEndian>(field)?;
        }
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut fields = [0u32; 7];
        reader.read_u32_into::<LittleEndian>(&mut fields)?;

        let [n_verts, n_tris, n_quads, n_tets, n_pyrs, n_prisms, n_hexes] = fields;
        Ok(Self {
            n_verts,
            n_tris,
            n_quads,
            n_tets,
            n_pyrs,
            n_prisms,
            n_hexes,
        })
    }

    fn fields(&self) -> [u32; 7] {
        [
            self.n_verts,
            self.n_tris,
            self.n_quads,
            self.n_tets,
            self.n_pyrs,
            self.n_prisms,
            self.n_hexes,
        ]
    }
}
