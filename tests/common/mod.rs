#![allow(dead_code)]

use std::fmt::Write;
use std::path::{Path, PathBuf};

/// the 8 corners of a unit cube shifted along x, in vtk hexahedron order
pub fn cube(x_offset: f64) -> Vec<[f64; 3]> {
    [
        [0., 0., 0.],
        [1., 0., 0.],
        [1., 1., 0.],
        [0., 1., 0.],
        [0., 0., 1.],
        [1., 0., 1.],
        [1., 1., 1.],
        [0., 1., 1.],
    ]
    .iter()
    .map(|[x, y, z]| [x + x_offset, *y, *z])
    .collect()
}

pub const CUBE_CELL: [i64; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

fn join<T: std::fmt::Display>(values: impl IntoIterator<Item = T>) -> String {
    let mut out = String::new();
    for value in values {
        write!(out, "{value} ").unwrap();
    }
    out
}

/// an ascii encoded vtu document
pub fn ascii_vtu(points: &[[f64; 3]], cells: &[&[i64]], scalars: Option<&[f64]>) -> String {
    let coordinates = join(points.iter().flatten());
    let connectivity = join(cells.iter().flat_map(|cell| cell.iter()));
    let offsets = join(cells.iter().scan(0, |end, cell| {
        *end += cell.len();
        Some(*end)
    }));

    let cell_data = match scalars {
        Some(values) => format!(
            r#"<CellData Scalars="pressure">
        <DataArray type="Float64" Name="pressure" format="ascii">{}</DataArray>
      </CellData>"#,
            join(values)
        ),
        None => String::new(),
    };

    format!(
        r#"<?xml version="1.0"?>
<VTKFile type="UnstructuredGrid" version="1.0" byte_order="LittleEndian" header_type="UInt32">
  <UnstructuredGrid>
    <Piece NumberOfPoints="{}" NumberOfCells="{}">
      <PointData>
      </PointData>
      {cell_data}
      <Points>
        <DataArray type="Float64" Name="Points" NumberOfComponents="3" format="ascii">{coordinates}</DataArray>
      </Points>
      <Cells>
        <DataArray type="Int64" Name="connectivity" format="ascii">{connectivity}</DataArray>
        <DataArray type="Int64" Name="offsets" format="ascii">{offsets}</DataArray>
        <DataArray type="UInt8" Name="types" format="ascii">{}</DataArray>
      </Cells>
    </Piece>
  </UnstructuredGrid>
</VTKFile>
"#,
        points.len(),
        cells.len(),
        join(cells.iter().map(|_| 12))
    )
}

/// a vtu document with raw appended data and 64 bit block headers, as written by paraview
pub fn appended_vtu(points: &[[f64; 3]], cells: &[&[i64]], scalars: &[f64]) -> Vec<u8> {
    let mut data = Vec::new();
    let mut block = |bytes: Vec<u8>| {
        let offset = data.len();
        data.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
        data.extend_from_slice(&bytes);
        offset
    };

    let points_offset = block(
        points
            .iter()
            .flatten()
            .flat_map(|x| (*x as f32).to_le_bytes())
            .collect(),
    );
    let connectivity_offset = block(
        cells
            .iter()
            .flat_map(|cell| cell.iter())
            .flat_map(|i| i.to_le_bytes())
            .collect(),
    );
    let offsets_offset = block(
        cells
            .iter()
            .scan(0i64, |end, cell| {
                *end += cell.len() as i64;
                Some(*end)
            })
            .flat_map(|end| end.to_le_bytes())
            .collect(),
    );
    let scalars_offset = block(scalars.iter().flat_map(|x| (*x as f32).to_le_bytes()).collect());

    let mut document = format!(
        r#"<VTKFile type="UnstructuredGrid" version="1.0" byte_order="LittleEndian" header_type="UInt64">
  <UnstructuredGrid>
    <Piece NumberOfPoints="{}" NumberOfCells="{}">
      <Points>
        <DataArray type="Float32" Name="Points" NumberOfComponents="3" format="appended" offset="{points_offset}"/>
      </Points>
      <Cells>
        <DataArray type="Int64" Name="connectivity" format="appended" offset="{connectivity_offset}"/>
        <DataArray type="Int64" Name="offsets" format="appended" offset="{offsets_offset}"/>
      </Cells>
      <CellData>
        <DataArray type="Float32" Name="temperature" format="appended" offset="{scalars_offset}"/>
      </CellData>
    </Piece>
  </UnstructuredGrid>
  <AppendedData encoding="raw">
   _"#,
        points.len(),
        cells.len()
    )
    .into_bytes();

    document.extend_from_slice(&data);
    document.extend_from_slice(b"\n  </AppendedData>\n</VTKFile>\n");
    document
}

pub fn write_file(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
