//! reading and parsing xml VTK `UnstructuredGrid` (`.vtu`) files
//!
//! Only the parts of the format that the merge needs are kept: the point coordinates, the cell
//! connectivity, and the first cell data array. Point data and cell types are skipped. Files
//! with several `<Piece>` elements are concatenated into one mesh in piece order.
//! `DataArray` payloads may be ascii, inline base64 (`format="binary"`) or raw appended data.
//! Compressed files and big endian files are rejected.

mod data_array;
mod error;
mod event_summary;

pub use data_array::{ArrayFormat, DataArrayHeader, HeaderType, PendingArray, ScalarType};
pub use error::ParseError;

use data_array::parse_attribute;
use event_summary::EventSummary;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;

use std::io::BufRead;
use std::path::Path;

/// Cells of a source mesh as a flat connectivity list with one end offset per cell
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellList {
    connectivity: Vec<i64>,
    ends: Vec<usize>,
}

impl CellList {
    /// `offsets` holds the end of every cell in `connectivity`, as in a vtu `offsets` array.
    /// Offsets must be non-decreasing and the last one must equal `connectivity.len()`.
    pub fn new(connectivity: Vec<i64>, offsets: &[i64]) -> Result<Self, ParseError> {
        let mut ends = Vec::with_capacity(offsets.len());
        let mut previous = 0;

        for (cell, &offset) in offsets.iter().enumerate() {
            let end = usize::try_from(offset)
                .ok()
                .filter(|end| *end >= previous && *end <= connectivity.len());
            let end = end.ok_or_else(|| {
                error::Arrays::from(error::InvalidOffsets::new(cell, offset, connectivity.len()))
            })?;

            ends.push(end);
            previous = end;
        }

        if previous != connectivity.len() {
            let last = offsets.len().saturating_sub(1);
            let invalid = error::InvalidOffsets::new(last, previous as i64, connectivity.len());
            return Err(error::Arrays::from(invalid).into());
        }

        Ok(Self { connectivity, ends })
    }

    /// build from explicit cells
    pub fn from_cells<C: AsRef<[i64]>>(cells: &[C]) -> Self {
        let mut connectivity = Vec::new();
        let mut ends = Vec::with_capacity(cells.len());
        for cell in cells {
            connectivity.extend_from_slice(cell.as_ref());
            ends.push(connectivity.len());
        }
        Self { connectivity, ends }
    }

    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// local point indices of each cell, in file order
    pub fn iter(&self) -> impl Iterator<Item = &[i64]> + '_ {
        let starts = std::iter::once(0).chain(self.ends.iter().copied());
        starts
            .zip(self.ends.iter().copied())
            .map(move |(start, end)| &self.connectivity[start..end])
    }

    /// append the cells of `other`, shifting its point indices by `point_offset`
    fn append(&mut self, other: CellList, point_offset: i64) {
        let end_offset = self.connectivity.len();
        self.connectivity
            .extend(other.connectivity.into_iter().map(|index| index + point_offset));
        self.ends.extend(other.ends.into_iter().map(|end| end + end_offset));
    }
}

/// One input mesh as read from a `.vtu` file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMesh {
    pub points: Vec<[f64; 3]>,
    pub cells: CellList,
    /// first component of the first cell data array, `None` if the file has no cell data
    pub cell_scalars: Option<Vec<f64>>,
}

impl SourceMesh {
    /// Concatenate another piece. Its point indices are shifted past the points already held.
    /// The cell scalars survive only if every piece with cells has them.
    fn append(&mut self, piece: SourceMesh) {
        let held_cells = self.cells.len();
        let piece_cells = piece.cells.len();

        let point_offset = self.points.len() as i64;
        self.points.extend(piece.points);
        self.cells.append(piece.cells, point_offset);

        self.cell_scalars = match (self.cell_scalars.take(), piece.cell_scalars) {
            (Some(mut scalars), Some(more)) => {
                scalars.extend(more);
                Some(scalars)
            }
            (Some(scalars), None) if piece_cells == 0 => Some(scalars),
            (None, Some(more)) if held_cells == 0 => Some(more),
            _ => None,
        };
    }
}

/// read in and parse an entire vtu file for a given path
pub fn read_vtu(path: &Path) -> Result<SourceMesh, crate::Error> {
    let bytes = std::fs::read(path)?;
    let mesh = parse_vtu(&bytes)?;

    log::info!(
        "{}: {} points, {} cells",
        path.display(),
        mesh.points.len(),
        mesh.cells.len()
    );

    Ok(mesh)
}

/// Counts declared by the `<Piece>` element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PieceCounts {
    points: usize,
    cells: usize,
}

/// Arrays collected from a `<Piece>`. Only the ones the merge needs are kept.
#[derive(Debug, Default)]
struct PieceArrays {
    points: Option<PendingArray>,
    connectivity: Option<PendingArray>,
    offsets: Option<PendingArray>,
    cell_data: Option<PendingArray>,
}

impl PieceArrays {
    fn push(&mut self, section: Section, array: PendingArray) {
        let slot = match section {
            Section::Points => &mut self.points,
            Section::CellData => &mut self.cell_data,
            Section::Cells => match array.header.name.as_str() {
                "connectivity" => &mut self.connectivity,
                "offsets" => &mut self.offsets,
                _ => return,
            },
            Section::PointData | Section::Other => return,
        };

        // the first array wins, matching vtk's `GetArray(0)` for cell data
        if slot.is_none() {
            *slot = Some(array);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Points,
    Cells,
    PointData,
    CellData,
    Other,
}

impl Section {
    fn from_name(name: &[u8]) -> Self {
        match name {
            b"Points" => Self::Points,
            b"Cells" => Self::Cells,
            b"PointData" => Self::PointData,
            b"CellData" => Self::CellData,
            _ => Self::Other,
        }
    }
}

/// Parse a complete vtu document held in memory.
pub fn parse_vtu(bytes: &[u8]) -> Result<SourceMesh, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);
    let mut buffer = Vec::new();

    let header_type = read_to_grid_header(&mut reader, &mut buffer)?;

    let mut pieces = Vec::new();
    while let Some(counts) = read_piece_header(&mut reader, &mut buffer)? {
        let arrays = read_piece(&mut reader, &mut buffer)?;
        pieces.push((counts, arrays));
    }

    if pieces.is_empty() {
        return Err(error::Header::NoPieces.into());
    }

    let appended = if read_to_appended_data(&mut reader, &mut buffer)? {
        Some(appended_payload(bytes, reader.buffer_position())?)
    } else {
        None
    };

    let mut mesh: Option<SourceMesh> = None;
    for (counts, arrays) in pieces {
        let piece = assemble(counts, arrays, header_type, appended)?;
        mesh = Some(match mesh {
            Some(mut mesh) => {
                mesh.append(piece);
                mesh
            }
            None => piece,
        });
    }

    Ok(mesh.unwrap_or_default())
}

/// find the `VTKFile` element and the opening `UnstructuredGrid` element
fn read_to_grid_header<R: BufRead>(
    reader: &mut Reader<R>,
    buffer: &mut Vec<u8>,
) -> Result<HeaderType, error::Header> {
    let header_type = loop {
        buffer.clear();
        let event = reader
            .read_event_into(buffer)
            .map_err(error::MalformedXml::from)?;

        let start = match &event {
            // xml declarations and comments may precede the root element
            Event::Decl(_) | Event::Comment(_) | Event::DocType(_) => continue,
            Event::Start(start) if start.name().as_ref() == b"VTKFile" => start,
            Event::Eof => {
                return Err(error::UnexpectedElement::new("VTKFile", EventSummary::eof()).into())
            }
            _ => {
                let actual = EventSummary::new(&event);
                return Err(error::UnexpectedElement::new("VTKFile", actual).into());
            }
        };

        let file_type = get_attribute_value::<error::Header>(start, "type", "VTKFile")?;
        check_attribute_value(file_type, "VTKFile", "type", "UnstructuredGrid")?;

        if let Some(byte_order) = find_attribute::<error::Header>(start, "byte_order")? {
            check_attribute_value(byte_order, "VTKFile", "byte_order", "LittleEndian")?;
        }

        if let Some(compressor) = find_attribute::<error::Header>(start, "compressor")? {
            if !compressor.value.is_empty() {
                let name = String::from_utf8_lossy(&compressor.value);
                return Err(error::Unsupported::new(format!("compressed data ({name})")).into());
            }
        }

        let header_type = match find_attribute::<error::Header>(start, "header_type")? {
            Some(att) => HeaderType::from_attribute(&att.value).ok_or_else(|| {
                error::UnexpectedAttributeValue::new(
                    "VTKFile".into(),
                    "header_type".into(),
                    "UInt32 or UInt64".into(),
                    att.value.clone().into(),
                )
            })?,
            None => HeaderType::default(),
        };

        break header_type;
    };

    let _grid =
        read_starting_element_with_name::<error::Header, _>(reader, buffer, "UnstructuredGrid")?;

    Ok(header_type)
}

/// Read up to and including the next `<Piece>` start element, skipping any grid level
/// `<FieldData>`. Returns `None` once `</UnstructuredGrid>` has been consumed.
fn read_piece_header<R: BufRead>(
    reader: &mut Reader<R>,
    buffer: &mut Vec<u8>,
) -> Result<Option<PieceCounts>, error::Header> {
    loop {
        buffer.clear();
        let event = reader
            .read_event_into(buffer)
            .map_err(error::MalformedXml::from)?;

        match &event {
            Event::Start(start) if start.name().as_ref() == b"Piece" => {
                let points =
                    get_attribute_value::<error::Header>(start, "NumberOfPoints", "Piece")?;
                let cells =
                    get_attribute_value::<error::Header>(start, "NumberOfCells", "Piece")?;

                return Ok(Some(PieceCounts {
                    points: parse_attribute::<_, error::Header>(&points, "Piece NumberOfPoints")?,
                    cells: parse_attribute::<_, error::Header>(&cells, "Piece NumberOfCells")?,
                }));
            }
            Event::End(end) if end.name().as_ref() == b"UnstructuredGrid" => return Ok(None),
            Event::Start(start) if start.name().as_ref() == b"FieldData" => {}
            Event::Empty(_) | Event::Comment(_) => continue,
            _ => {
                let actual = EventSummary::new(&event);
                let unexpected =
                    error::UnexpectedElement::new("Piece or /UnstructuredGrid", actual);
                return Err(unexpected.into());
            }
        }

        // only reached for <FieldData>
        skip_element::<_, error::Header>(reader, buffer, "FieldData")?;
    }
}

/// Collect the arrays of the `<Piece>` element, stopping after `</Piece>`.
fn read_piece<R: BufRead>(
    reader: &mut Reader<R>,
    buffer: &mut Vec<u8>,
) -> Result<PieceArrays, error::Piece> {
    enum Step {
        Array { header: DataArrayHeader, has_body: bool },
        Enter(Section),
        Leave(Section),
        Skip,
        Done,
    }

    let mut section = Section::Other;
    let mut arrays = PieceArrays::default();

    loop {
        buffer.clear();
        let event = reader
            .read_event_into(buffer)
            .map_err(error::MalformedXml::from)?;

        let step = match &event {
            Event::Start(start) if start.name().as_ref() == b"DataArray" => Step::Array {
                header: DataArrayHeader::from_start(start)?,
                has_body: true,
            },
            Event::Empty(start) if start.name().as_ref() == b"DataArray" => Step::Array {
                header: DataArrayHeader::from_start(start)?,
                has_body: false,
            },
            Event::Start(start) => Step::Enter(Section::from_name(start.name().as_ref())),
            Event::End(end) if end.name().as_ref() == b"Piece" => Step::Done,
            Event::End(end) => Step::Leave(Section::from_name(end.name().as_ref())),
            Event::Empty(_) | Event::Comment(_) => Step::Skip,
            _ => {
                let actual = EventSummary::new(&event);
                return Err(error::UnexpectedElement::new(
                    "Points, Cells, PointData, CellData or /Piece",
                    actual,
                )
                .into());
            }
        };

        match step {
            Step::Array { header, has_body } => {
                let body = if has_body {
                    read_array_body(reader, buffer)?
                } else {
                    Vec::new()
                };
                log::trace!("found {:?} DataArray `{}` in {section:?}", header.format, header.name);
                arrays.push(section, PendingArray { header, body });
            }
            Step::Enter(entered) => section = entered,
            Step::Leave(left) if left == section => section = Section::Other,
            Step::Leave(_) | Step::Skip => {}
            Step::Done => break,
        }
    }

    Ok(arrays)
}

/// Read the text inside a `<DataArray>` up to its closing element. Nested elements such as
/// `<InformationKey>` are skipped.
fn read_array_body<R: BufRead>(
    reader: &mut Reader<R>,
    buffer: &mut Vec<u8>,
) -> Result<Vec<u8>, error::Piece> {
    let mut body = Vec::new();
    let mut depth = 0usize;

    loop {
        buffer.clear();
        let event = reader
            .read_event_into(buffer)
            .map_err(error::MalformedXml::from)?;

        match event {
            Event::Text(text) if depth == 0 => {
                if !body.is_empty() {
                    body.push(b' ');
                }
                body.extend_from_slice(&text.into_inner());
            }
            Event::Start(_) => depth += 1,
            Event::End(end) if depth == 0 => {
                check_end_name::<error::Piece>(&end, "DataArray")?;
                return Ok(body);
            }
            Event::End(_) => depth -= 1,
            Event::Eof => {
                return Err(error::UnexpectedElement::new("/DataArray", EventSummary::eof()).into())
            }
            _ => continue,
        }
    }
}

/// Called after `</UnstructuredGrid>`. Returns `true` if an `<AppendedData>` element follows, in
/// which case the reader is positioned just after its start tag.
fn read_to_appended_data<R: BufRead>(
    reader: &mut Reader<R>,
    buffer: &mut Vec<u8>,
) -> Result<bool, error::AppendedData> {
    buffer.clear();
    let event = reader
        .read_event_into(buffer)
        .map_err(error::MalformedXml::from)?;

    match &event {
        Event::Start(start) if start.name().as_ref() == b"AppendedData" => {
            let encoding =
                get_attribute_value::<error::AppendedData>(start, "encoding", "AppendedData")?;
            check_attribute_value(encoding, "AppendedData", "encoding", "raw")?;
            Ok(true)
        }
        Event::End(end) if end.name().as_ref() == b"VTKFile" => Ok(false),
        Event::Eof => Ok(false),
        _ => {
            let actual = EventSummary::new(&event);
            Err(error::UnexpectedElement::new("AppendedData or /VTKFile", actual).into())
        }
    }
}

/// the raw bytes after the `_` marker that opens the appended section
fn appended_payload(bytes: &[u8], position: usize) -> Result<&[u8], error::AppendedData> {
    let rest = bytes.get(position..).unwrap_or_default();
    let marker = rest
        .iter()
        .position(|byte| !byte.is_ascii_whitespace())
        .filter(|&index| rest[index] == b'_')
        .ok_or(error::AppendedData::MissingMarker)?;

    Ok(&rest[marker + 1..])
}

/// Decode the collected arrays and check them against the counts declared by `<Piece>`.
fn assemble(
    counts: PieceCounts,
    arrays: PieceArrays,
    header_type: HeaderType,
    appended: Option<&[u8]>,
) -> Result<SourceMesh, ParseError> {
    let PieceArrays {
        points,
        connectivity,
        offsets,
        cell_data,
    } = arrays;

    let points = points
        .ok_or_else(|| error::Arrays::from(error::MissingArray::new("Points", "Points")))?;
    if points.header.components != 3 {
        let mismatch = error::UnexpectedAttributeValue::new(
            "DataArray".into(),
            "NumberOfComponents".into(),
            "3".into(),
            points.header.components.to_string().as_str().into(),
        );
        return Err(error::Arrays::from(mismatch).into());
    }

    let coordinates: Vec<f64> = points.decode(header_type, appended)?;
    let expected = value_count(&points.header.name, counts.points, 3)?;
    check_length(&points.header.name, expected, coordinates.len())?;
    let points: Vec<[f64; 3]> = coordinates
        .chunks_exact(3)
        .map(|xyz| [xyz[0], xyz[1], xyz[2]])
        .collect();

    let cells = match (connectivity, offsets) {
        (Some(connectivity), Some(offsets)) => {
            let connectivity: Vec<i64> = connectivity.decode(header_type, appended)?;
            let offsets_values: Vec<i64> = offsets.decode(header_type, appended)?;
            check_length(&offsets.header.name, counts.cells, offsets_values.len())?;
            CellList::new(connectivity, &offsets_values)?
        }
        // a piece without cells may leave out the connectivity arrays
        _ if counts.cells == 0 => CellList::default(),
        (None, _) => {
            let missing = error::MissingArray::new("Cells", "connectivity");
            return Err(error::Arrays::from(missing).into());
        }
        (_, None) => {
            let missing = error::MissingArray::new("Cells", "offsets");
            return Err(error::Arrays::from(missing).into());
        }
    };

    let cell_scalars = match cell_data {
        Some(array) => {
            let components = array.header.components.max(1);
            let values: Vec<f64> = array.decode(header_type, appended)?;
            let expected = value_count(&array.header.name, counts.cells, components)?;
            check_length(&array.header.name, expected, values.len())?;
            Some(values.into_iter().step_by(components).collect())
        }
        None => None,
    };

    Ok(SourceMesh {
        points,
        cells,
        cell_scalars,
    })
}

/// `count` tuples of `components` values, rejecting counts too large to address
fn value_count(array_name: &str, count: usize, components: usize) -> Result<usize, error::Arrays> {
    count.checked_mul(components).ok_or_else(|| {
        let text = format!("{count} x {components}");
        let context = format!("value count of DataArray `{array_name}`");
        error::InvalidNumber::new(context, text.as_str().into()).into()
    })
}

fn check_length(array_name: &str, expected: usize, actual: usize) -> Result<(), error::Arrays> {
    if expected == actual {
        Ok(())
    } else {
        Err(error::LengthMismatch::new(array_name.into(), expected, actual).into())
    }
}

/// consume events up to and including the end of an element whose start was already read
fn skip_element<R: BufRead, E>(
    reader: &mut Reader<R>,
    buffer: &mut Vec<u8>,
    name: &str,
) -> Result<(), E>
where
    E: From<error::UnexpectedElement> + From<error::MalformedXml>,
{
    let mut depth = 0usize;
    loop {
        buffer.clear();
        match reader.read_event_into(buffer).map_err(error::MalformedXml::from)? {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth > 0 => depth -= 1,
            Event::End(end) => return check_end_name(&end, name),
            Event::Eof => {
                let unexpected =
                    error::UnexpectedElement::new(format!("/{name}"), EventSummary::eof());
                return Err(unexpected.into());
            }
            _ => continue,
        }
    }
}

fn read_starting_element_with_name<'a, E, R: BufRead>(
    reader: &mut Reader<R>,
    buffer: &'a mut Vec<u8>,
    expected_name: &str,
) -> Result<BytesStart<'a>, E>
where
    E: From<error::UnexpectedElement> + From<error::MalformedXml>,
{
    buffer.clear();
    let element = reader
        .read_event_into(buffer)
        .map_err(error::MalformedXml::from)?;

    match element {
        Event::Start(event) if event.name().as_ref() == expected_name.as_bytes() => Ok(event),
        other => {
            let actual_event = EventSummary::new(&other);
            Err(E::from(error::UnexpectedElement::new(expected_name, actual_event)))
        }
    }
}

fn check_end_name<E: From<error::UnexpectedElement>>(
    end: &BytesEnd<'_>,
    expected_name: &str,
) -> Result<(), E> {
    if end.name().as_ref() == expected_name.as_bytes() {
        Ok(())
    } else {
        let actual = EventSummary::new(&Event::End(end.clone()));
        Err(E::from(error::UnexpectedElement::new(format!("/{expected_name}"), actual)))
    }
}

/// find an optional attribute, erroring only if the attribute list is malformed
fn find_attribute<'a, E>(
    bytes_start: &'a BytesStart<'_>,
    attribute_key: &str,
) -> Result<Option<Attribute<'a>>, E>
where
    E: From<error::MalformedAttribute>,
{
    for attribute in bytes_start.attributes() {
        let attribute = attribute.map_err(error::MalformedAttribute::from)?;
        if attribute.key.as_ref() == attribute_key.as_bytes() {
            return Ok(Some(attribute));
        }
    }

    Ok(None)
}

fn get_attribute_value<'a, E>(
    bytes_start: &'a BytesStart<'_>,
    attribute_key: &str,
    element_name: &str,
) -> Result<Attribute<'a>, E>
where
    E: From<error::MissingAttribute> + From<error::MalformedAttribute>,
{
    match find_attribute::<E>(bytes_start, attribute_key)? {
        Some(att) => Ok(att),
        None => {
            let err = error::MissingAttribute::new(element_name.into(), attribute_key.into());
            Err(E::from(err))
        }
    }
}

/// ensure that an attribute's value is what we expect it to be, otherwise return an error with
/// some location information
fn check_attribute_value(
    att: Attribute<'_>,
    element_name: &str,
    attribute_name: &str,
    expected_attribute_value: &str,
) -> Result<(), error::UnexpectedAttributeValue> {
    if att.value.as_ref() != expected_attribute_value.as_bytes() {
        let unexpected_value = error::UnexpectedAttributeValue {
            element_name: element_name.into(),
            attribute_name: attribute_name.into(),
            expected_value: expected_attribute_value.into(),
            actual_value: error::ParsedNameOrBytes::from(att.value),
        };

        Err(unexpected_value)
    } else {
        Ok(())
    }
}
