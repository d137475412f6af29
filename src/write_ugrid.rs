//! Serialization of a merged mesh to the `ugrid32` layout and its companion scalar file

use crate::header::UGridHeader;
use crate::Error;

use byteorder::{ByteOrder, LittleEndian};
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// `<base>.ugrid32`. The extension is appended, never substituted, so `out.v2` becomes
/// `out.v2.ugrid32`.
pub fn ugrid32_path(base: &Path) -> PathBuf {
    with_suffix(base, ".ugrid32")
}

/// `<base>.scalar`
pub fn scalar_path(base: &Path) -> PathBuf {
    with_suffix(base, ".scalar")
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Write `<base>.ugrid32` and `<base>.scalar`.
///
/// `hex_indices` are the 0-based global indices held in memory; they are written as 1-based
/// 64 bit integers. Vertices are written as 64 bit floats and `vertex_scalars` as 32 bit
/// floats with no header. All values are little endian.
///
/// The write is not transactional: an error part way through can leave a partial file behind.
pub fn write_ugrid32(
    base: &Path,
    header: &UGridHeader,
    vertices: &[[f64; 3]],
    hex_indices: &[usize],
    vertex_scalars: &[f32],
) -> Result<(), Error> {
    let mesh_path = ugrid32_path(base);
    log::debug!("writing mesh to {}", mesh_path.display());

    let mut writer = BufWriter::new(File::create(&mesh_path)?);
    write_mesh(&mut writer, header, vertices, hex_indices)?;
    writer.flush()?;

    let scalar_path = scalar_path(base);
    log::debug!("writing vertex scalars to {}", scalar_path.display());

    let mut writer = BufWriter::new(File::create(&scalar_path)?);
    write_scalars(&mut writer, vertex_scalars)?;
    writer.flush()?;

    Ok(())
}

/// the `ugrid32` body: header, vertex block, then the 1-based hexahedron block
pub(crate) fn write_mesh<W: Write>(
    writer: &mut W,
    header: &UGridHeader,
    vertices: &[[f64; 3]],
    hex_indices: &[usize],
) -> std::io::Result<()> {
    header.write(writer)?;

    let coordinates: Vec<f64> = vertices.iter().flatten().copied().collect();
    let mut bytes = vec![0; coordinates.len() * std::mem::size_of::<f64>()];
    LittleEndian::write_f64_into(&coordinates, &mut bytes);
    writer.write_all(&bytes)?;

    // the only place the 0-based to 1-based shift happens
    let one_based: Vec<u64> = hex_indices.iter().map(|&index| index as u64 + 1).collect();
    let mut bytes = vec![0; one_based.len() * std::mem::size_of::<u64>()];
    LittleEndian::write_u64_into(&one_based, &mut bytes);
    writer.write_all(&bytes)?;

    Ok(())
}

pub(crate) fn write_scalars<W: Write>(writer: &mut W, values: &[f32]) -> std::io::Result<()> {
    let mut bytes = vec![0; values.len() * std::mem::size_of::<f32>()];
    LittleEndian::write_f32_into(values, &mut bytes);
    writer.write_all(&bytes)
}
