use byteorder::{LittleEndian, WriteBytesExt};
use std::path::Path;
use ugrid::{load_ugrid32, write_ugrid32, Error, FormatError, UGridHeader, VertexFormat};

fn unit_cube() -> Vec<[f64; 3]> {
    (0..8)
        .map(|i| [(i & 1) as f64, ((i >> 1) & 1) as f64, ((i >> 2) & 1) as f64])
        .collect()
}

fn write_float_file(path: &Path, vertices: &[[f64; 3]], one_based: &[u64]) {
    let mut bytes = Vec::new();
    UGridHeader::hexahedra(vertices.len(), one_based.len() / 8)
        .unwrap()
        .write(&mut bytes)
        .unwrap();
    for coordinate in vertices.iter().flatten() {
        bytes.write_f32::<LittleEndian>(*coordinate as f32).unwrap();
    }
    for index in one_based {
        bytes.write_u64::<LittleEndian>(*index).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

#[test]
fn written_mesh_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("cube");
    let vertices = unit_cube();
    let indices: Vec<usize> = (0..8).collect();
    let scalars: Vec<f32> = (0..8).map(|i| i as f32 * 0.5).collect();

    write_ugrid32(
        &base,
        &UGridHeader::hexahedra(8, 1).unwrap(),
        &vertices,
        &indices,
        &scalars,
    )
    .unwrap();

    let mesh = load_ugrid32(
        VertexFormat::Auto,
        &dir.path().join("cube.ugrid32"),
        Some(dir.path().join("cube.scalar").as_path()),
    )
    .unwrap();

    assert_eq!(mesh.vertices, vertices);
    assert_eq!(mesh.hexes, vec![[0, 1, 2, 3, 4, 5, 6, 7]]);
    assert_eq!(mesh.per_vertex, Some(scalars));
}

#[test]
fn lb4_name_selects_float_vertices() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cube.lb4.ugrid32");
    let vertices = unit_cube();
    write_float_file(&path, &vertices, &[8, 7, 6, 5, 4, 3, 2, 1]);

    let mesh = load_ugrid32(VertexFormat::Auto, &path, None).unwrap();
    assert_eq!(mesh.vertices, vertices);
    assert_eq!(mesh.hexes[0], [7, 6, 5, 4, 3, 2, 1, 0]);

    // forcing double width makes the size check fail
    let err = load_ugrid32(VertexFormat::Double, &path, None).unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::Size(_))));
}

#[test]
fn lb4_marker_in_directory_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("run.lb4.out");
    std::fs::create_dir(&nested).unwrap();
    let path = nested.join("cube.ugrid32");
    write_float_file(&path, &unit_cube(), &[1, 2, 3, 4, 5, 6, 7, 8]);

    // treated as double width, which does not match the file size
    assert!(load_ugrid32(VertexFormat::Auto, &path, None).is_err());
    assert!(load_ugrid32(VertexFormat::Float, &path, None).is_ok());
}

#[test]
fn zero_index_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zero.lb4.ugrid32");
    write_float_file(&path, &unit_cube(), &[0, 1, 2, 3, 4, 5, 6, 7]);

    let err = load_ugrid32(VertexFormat::Auto, &path, None).unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::BadIndex(_))));
}

#[test]
fn short_scalar_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cube.lb4.ugrid32");
    write_float_file(&path, &unit_cube(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    let scalars = dir.path().join("cube.scalar");
    std::fs::write(&scalars, [0u8; 7 * 4]).unwrap();

    let err = load_ugrid32(VertexFormat::Auto, &path, Some(scalars.as_path())).unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::Size(_))));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let absent = dir.path().join("absent.ugrid32");
    let err = load_ugrid32(VertexFormat::Auto, &absent, None).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
