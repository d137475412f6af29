mod common;

use byteorder::{ByteOrder, LittleEndian};
use common::{appended_vtu, ascii_vtu, cube, write_file, CUBE_CELL};
use ugrid::{
    convert, load_ugrid32, scalar_path, ugrid32_path, ConvertOptions, Error, IngestError,
    UGridHeader, VertexFormat,
};

#[test]
fn indices_shifted_across_files() {
    let dir = tempfile::tempdir().unwrap();
    let inputs: Vec<_> = (0..3)
        .map(|i| {
            let contents = ascii_vtu(&cube(i as f64), &[&CUBE_CELL], Some(&[i as f64]));
            write_file(dir.path(), &format!("block_{i}.vtu"), contents)
        })
        .collect();
    let output = dir.path().join("merged");

    let summary = convert(&ConvertOptions::new(&output, inputs)).unwrap();
    assert_eq!(summary.files_read, 3);
    assert_eq!(summary.vertex_count, 24);
    assert_eq!(summary.hex_count, 3);

    let mesh = load_ugrid32(VertexFormat::Double, &ugrid32_path(&output), None).unwrap();
    for (i, hex) in mesh.hexes.iter().enumerate() {
        let expected: Vec<usize> = (0..8).map(|k| 8 * i + k).collect();
        assert_eq!(hex.to_vec(), expected);
    }
    assert_eq!(mesh.vertices[17], [3., 0., 0.]);
    assert!(mesh.per_vertex.is_none());
}

#[test]
fn on_disk_layout() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(
        dir.path(),
        "single.vtu",
        ascii_vtu(&cube(0.), &[&CUBE_CELL], Some(&[2.5])),
    );
    let output = dir.path().join("single");

    convert(&ConvertOptions::new(&output, vec![input])).unwrap();

    let bytes = std::fs::read(ugrid32_path(&output)).unwrap();
    assert_eq!(bytes.len(), UGridHeader::BYTES + 8 * 24 + 8 * 8);

    let header = UGridHeader::read(&mut bytes.as_slice()).unwrap();
    assert_eq!(header, UGridHeader::hexahedra(8, 1).unwrap());

    // vertex 1 is (1, 0, 0)
    assert_eq!(LittleEndian::read_f64(&bytes[28 + 24..]), 1.0);

    // indices are stored 1-based
    let indices = &bytes[28 + 8 * 24..];
    let stored: Vec<u64> = indices.chunks_exact(8).map(LittleEndian::read_u64).collect();
    assert_eq!(stored, vec![1, 2, 3, 4, 5, 6, 7, 8]);

    let scalars = std::fs::read(scalar_path(&output)).unwrap();
    assert_eq!(scalars.len(), 8 * 4);
    assert!(scalars
        .chunks_exact(4)
        .all(|value| LittleEndian::read_f32(value) == 2.5));
}

#[test]
fn shared_vertices_averaged() {
    let dir = tempfile::tempdir().unwrap();

    // two hexes stacked along x sharing the face x = 1
    let mut points = cube(0.);
    points.extend(cube(1.).into_iter().filter(|p| p[0] == 2.));
    let second: [i64; 8] = [1, 8, 9, 2, 5, 10, 11, 6];
    let input = write_file(
        dir.path(),
        "stack.vtu",
        ascii_vtu(&points, &[&CUBE_CELL, &second], Some(&[3., 7.])),
    );
    let output = dir.path().join("stack");

    let summary = convert(&ConvertOptions::new(&output, vec![input])).unwrap();
    assert_eq!(summary.vertex_count, 12);
    assert_eq!(summary.isolated_vertices, 0);

    let mesh = load_ugrid32(
        VertexFormat::Auto,
        &ugrid32_path(&output),
        Some(scalar_path(&output).as_path()),
    )
    .unwrap();
    let scalars = mesh.per_vertex.unwrap();

    for shared in [1, 2, 5, 6] {
        assert_eq!(scalars[shared], 5.0);
    }
    for only_first in [0, 3, 4, 7] {
        assert_eq!(scalars[only_first], 3.0);
    }
    for only_second in 8..12 {
        assert_eq!(scalars[only_second], 7.0);
    }
}

#[test]
fn isolated_vertex_written_as_zero() {
    let dir = tempfile::tempdir().unwrap();
    let mut points = cube(0.);
    points.push([5., 5., 5.]);
    let input = write_file(
        dir.path(),
        "extra_point.vtu",
        ascii_vtu(&points, &[&CUBE_CELL], Some(&[4.])),
    );
    let output = dir.path().join("extra_point");

    let summary = convert(&ConvertOptions::new(&output, vec![input])).unwrap();
    assert_eq!(summary.isolated_vertices, 1);

    let mesh = load_ugrid32(
        VertexFormat::Auto,
        &ugrid32_path(&output),
        Some(scalar_path(&output).as_path()),
    )
    .unwrap();
    let scalars = mesh.per_vertex.unwrap();
    assert_eq!(scalars[8], 0.0);
    assert_eq!(scalars[0], 4.0);
}

#[test]
fn appended_and_ascii_inputs_mixed() {
    let dir = tempfile::tempdir().unwrap();
    let ascii = write_file(
        dir.path(),
        "ascii.vtu",
        ascii_vtu(&cube(0.), &[&CUBE_CELL], Some(&[1.])),
    );
    let appended = write_file(
        dir.path(),
        "appended.vtu",
        appended_vtu(&cube(10.), &[&CUBE_CELL], &[0.5]),
    );
    let output = dir.path().join("mixed");

    let summary = convert(&ConvertOptions::new(&output, vec![ascii, appended])).unwrap();
    assert_eq!(summary.hex_count, 2);

    let mesh = load_ugrid32(
        VertexFormat::Auto,
        &ugrid32_path(&output),
        Some(scalar_path(&output).as_path()),
    )
    .unwrap();

    assert_eq!(mesh.vertices[9], [11., 0., 0.]);
    assert_eq!(mesh.hexes[1], [8, 9, 10, 11, 12, 13, 14, 15]);
    assert_eq!(mesh.per_vertex.unwrap()[15], 0.5);
}

#[test]
fn tetrahedra_rejected_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_file(
        dir.path(),
        "good.vtu",
        ascii_vtu(&cube(0.), &[&CUBE_CELL], Some(&[1.])),
    );
    let tets = write_file(
        dir.path(),
        "tets.vtu",
        ascii_vtu(&cube(0.)[..4], &[&[0, 1, 2, 3]], Some(&[1.])),
    );
    let output = dir.path().join("rejected");

    let err = convert(&ConvertOptions::new(&output, vec![good, tets.clone()])).unwrap_err();

    let Error::Input { path, source } = err else {
        panic!("expected an input error");
    };
    assert_eq!(path, tets);
    assert!(matches!(
        *source,
        Error::Ingest(IngestError::UnsupportedTopology { cell: 0, arity: 4 })
    ));

    assert!(!ugrid32_path(&output).exists());
    assert!(!scalar_path(&output).exists());
}

#[test]
fn missing_cell_data_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "bare.vtu", ascii_vtu(&cube(0.), &[&CUBE_CELL], None));
    let output = dir.path().join("bare");

    let err = convert(&ConvertOptions::new(&output, vec![input])).unwrap_err();

    let Error::Input { source, .. } = err else {
        panic!("expected an input error");
    };
    let Error::Ingest(ingest) = *source else {
        panic!("expected an ingest error");
    };
    assert!(ingest.is_corrupt_input());
    assert!(!ugrid32_path(&output).exists());
}

#[test]
fn malformed_input_reported() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "broken.vtu", "<VTKFile type=\"ImageData\"></VTKFile>");
    let output = dir.path().join("broken");

    let err = convert(&ConvertOptions::new(&output, vec![input])).unwrap_err();

    let Error::Input { source, .. } = err else {
        panic!("expected an input error");
    };
    assert!(matches!(*source, Error::Parse(_)));
    assert!(err_chain_mentions(&*source, "UnstructuredGrid"));
}

fn err_chain_mentions(err: &dyn std::error::Error, needle: &str) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if err.to_string().contains(needle) {
            return true;
        }
        current = err.source();
    }
    false
}

#[test]
fn tetrahedra_without_cell_data_report_topology() {
    let dir = tempfile::tempdir().unwrap();
    let tets = write_file(
        dir.path(),
        "bare_tets.vtu",
        ascii_vtu(&cube(0.)[..4], &[&[0, 1, 2, 3]], None),
    );
    let output = dir.path().join("bare_tets");

    let err = convert(&ConvertOptions::new(&output, vec![tets])).unwrap_err();

    let Error::Input { source, .. } = err else {
        panic!("expected an input error");
    };
    assert!(matches!(
        *source,
        Error::Ingest(IngestError::UnsupportedTopology { cell: 0, arity: 4 })
    ));
}
