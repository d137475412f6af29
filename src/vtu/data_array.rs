//! `DataArray` headers and decoding of their ascii, base64, and appended raw payloads

use super::error;
use super::{find_attribute, get_attribute_value};

use byteorder::{ByteOrder, LittleEndian};
use num_traits::{NumCast, ToPrimitive};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesStart;

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Element type of a `DataArray`, from its `type` attribute
pub enum ScalarType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl ScalarType {
    fn from_attribute(value: &[u8]) -> Option<Self> {
        let scalar = match value {
            b"Int8" | b"Char" => Self::Int8,
            b"UInt8" | b"UnsignedChar" => Self::UInt8,
            b"Int16" => Self::Int16,
            b"UInt16" => Self::UInt16,
            b"Int32" => Self::Int32,
            b"UInt32" => Self::UInt32,
            b"Int64" => Self::Int64,
            b"UInt64" => Self::UInt64,
            b"Float32" => Self::Float32,
            b"Float64" => Self::Float64,
            _ => return None,
        };
        Some(scalar)
    }

    /// bytes per value in binary encodings
    pub fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Integer type of the byte-count prefix on binary blocks, from `VTKFile header_type`
pub enum HeaderType {
    #[default]
    UInt32,
    UInt64,
}

impl HeaderType {
    pub(crate) fn from_attribute(value: &[u8]) -> Option<Self> {
        match value {
            b"UInt32" => Some(Self::UInt32),
            b"UInt64" => Some(Self::UInt64),
            _ => None,
        }
    }

    pub fn bytes(&self) -> usize {
        match self {
            Self::UInt32 => 4,
            Self::UInt64 => 8,
        }
    }

    /// read a block length prefix. `bytes` must hold at least [`HeaderType::bytes`] bytes
    fn read(&self, bytes: &[u8]) -> u64 {
        match self {
            Self::UInt32 => LittleEndian::read_u32(bytes) as u64,
            Self::UInt64 => LittleEndian::read_u64(bytes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where and how the values of a `DataArray` are stored
pub enum ArrayFormat {
    /// whitespace separated numbers inside the element
    Ascii,
    /// base64 inside the element, prefixed with a byte count
    Binary,
    /// raw bytes in the `<AppendedData>` section, starting at `offset` past the `_` marker
    Appended { offset: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The attributes of a `DataArray` element
pub struct DataArrayHeader {
    pub name: String,
    pub scalar_type: ScalarType,
    pub components: usize,
    pub format: ArrayFormat,
}

impl DataArrayHeader {
    pub(crate) fn from_start(start: &BytesStart<'_>) -> Result<Self, error::Piece> {
        let name = find_attribute::<error::Piece>(start, "Name")?
            .map(|att| String::from_utf8_lossy(&att.value).into_owned())
            .unwrap_or_default();

        let type_att = get_attribute_value::<error::Piece>(start, "type", "DataArray")?;
        let scalar_type = ScalarType::from_attribute(&type_att.value).ok_or_else(|| {
            error::UnexpectedAttributeValue::new(
                "DataArray".into(),
                "type".into(),
                "a numeric VTK type".into(),
                type_att.value.clone().into(),
            )
        })?;

        let components = match find_attribute::<error::Piece>(start, "NumberOfComponents")? {
            Some(att) => {
                parse_attribute::<usize, error::Piece>(&att, "DataArray NumberOfComponents")?
            }
            None => 1,
        };

        let format_att = get_attribute_value::<error::Piece>(start, "format", "DataArray")?;
        let format = match format_att.value.as_ref() {
            b"ascii" => ArrayFormat::Ascii,
            b"binary" => ArrayFormat::Binary,
            b"appended" => {
                let offset = get_attribute_value::<error::Piece>(start, "offset", "DataArray")?;
                let offset = parse_attribute::<u64, error::Piece>(&offset, "DataArray offset")?;
                ArrayFormat::Appended { offset }
            }
            _ => {
                return Err(error::UnexpectedAttributeValue::new(
                    "DataArray".into(),
                    "format".into(),
                    "ascii, binary or appended".into(),
                    format_att.value.clone().into(),
                )
                .into())
            }
        };

        Ok(Self {
            name,
            scalar_type,
            components,
            format,
        })
    }
}

/// parse an attribute value such as `NumberOfPoints="8"`
pub(crate) fn parse_attribute<T: FromStr, E: From<error::InvalidNumber>>(
    att: &Attribute<'_>,
    context: &str,
) -> Result<T, E> {
    std::str::from_utf8(&att.value)
        .ok()
        .and_then(|text| text.trim().parse().ok())
        .ok_or_else(|| {
            E::from(error::InvalidNumber::new(
                context.into(),
                error::ParsedNameOrBytes::new(&att.value),
            ))
        })
}

#[derive(Debug, Clone)]
/// A `DataArray` whose header has been read, along with its inline text (empty if appended)
pub struct PendingArray {
    pub header: DataArrayHeader,
    pub body: Vec<u8>,
}

/// Types that `DataArray` values are converted into
pub(crate) trait Element: NumCast + Copy {
    const NAME: &'static str;
    /// whether a float with a fractional part may be stored
    const FRACTIONAL: bool;
}

impl Element for f64 {
    const NAME: &'static str = "Float64";
    const FRACTIONAL: bool = true;
}

impl Element for i64 {
    const NAME: &'static str = "Int64";
    const FRACTIONAL: bool = false;
}

impl PendingArray {
    /// Decode every value of the array (all components, interleaved) into `T`.
    ///
    /// `appended` is the raw `<AppendedData>` payload following the `_` marker, if the file has
    /// one.
    pub(crate) fn decode<T: Element>(
        &self,
        header_type: HeaderType,
        appended: Option<&[u8]>,
    ) -> Result<Vec<T>, error::Arrays> {
        let name = &self.header.name;
        let scalar_type = self.header.scalar_type;

        match self.header.format {
            ArrayFormat::Ascii => decode_ascii(&self.body, scalar_type, name),
            ArrayFormat::Binary => {
                let bytes = decode_inline_binary(&self.body, header_type, name)?;
                decode_le(&bytes, scalar_type, name)
            }
            ArrayFormat::Appended { offset } => {
                let raw = appended.ok_or_else(|| error::Arrays::MissingAppendedData(name.clone()))?;
                let bytes = appended_block(raw, offset, header_type, name)?;
                decode_le(bytes, scalar_type, name)
            }
        }
    }
}

fn cast<T: Element, S: ToPrimitive>(value: S, name: &str) -> Result<T, error::Arrays> {
    T::from(value).ok_or_else(|| error::Unrepresentable::new(name.into(), T::NAME).into())
}

fn cast_float<T: Element>(value: f64, name: &str) -> Result<T, error::Arrays> {
    if !T::FRACTIONAL && value.fract() != 0.0 {
        return Err(error::Unrepresentable::new(name.into(), T::NAME).into());
    }
    cast(value, name)
}

fn decode_ascii<T: Element>(
    body: &[u8],
    scalar_type: ScalarType,
    name: &str,
) -> Result<Vec<T>, error::Arrays> {
    let invalid = |token: &[u8]| {
        error::Arrays::from(error::InvalidNumber::new(
            format!("ascii DataArray `{name}`"),
            error::ParsedNameOrBytes::new(token),
        ))
    };

    body.split(|byte| byte.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            let text = std::str::from_utf8(token).map_err(|_| invalid(token))?;

            if scalar_type.is_float() {
                let value: f64 = text.parse().map_err(|_| invalid(token))?;
                cast_float(value, name)
            } else if scalar_type == ScalarType::UInt64 {
                let value: u64 = text.parse().map_err(|_| invalid(token))?;
                cast(value, name)
            } else {
                let value: i64 = text.parse().map_err(|_| invalid(token))?;
                cast(value, name)
            }
        })
        .collect()
}

/// Little endian values of `scalar_type` packed back to back
fn decode_le<T: Element>(
    bytes: &[u8],
    scalar_type: ScalarType,
    name: &str,
) -> Result<Vec<T>, error::Arrays> {
    let size = scalar_type.size();
    if bytes.len() % size != 0 {
        let whole = (bytes.len() / size * size) as u64;
        let truncated = error::TruncatedBinary::new(name.into(), whole + size as u64, bytes.len());
        return Err(truncated.into());
    }

    bytes
        .chunks_exact(size)
        .map(|chunk| match scalar_type {
            ScalarType::Int8 => cast(chunk[0] as i8, name),
            ScalarType::UInt8 => cast(chunk[0], name),
            ScalarType::Int16 => cast(LittleEndian::read_i16(chunk), name),
            ScalarType::UInt16 => cast(LittleEndian::read_u16(chunk), name),
            ScalarType::Int32 => cast(LittleEndian::read_i32(chunk), name),
            ScalarType::UInt32 => cast(LittleEndian::read_u32(chunk), name),
            ScalarType::Int64 => cast(LittleEndian::read_i64(chunk), name),
            ScalarType::UInt64 => cast(LittleEndian::read_u64(chunk), name),
            ScalarType::Float32 => cast_float(LittleEndian::read_f32(chunk) as f64, name),
            ScalarType::Float64 => cast_float(LittleEndian::read_f64(chunk), name),
        })
        .collect()
}

/// Decode a `format="binary"` payload into the bytes following its length prefix.
///
/// Writers either encode the prefix and the data as one base64 stream, or encode the prefix
/// on its own (with its own padding) followed by the data. Both are accepted.
fn decode_inline_binary(
    body: &[u8],
    header_type: HeaderType,
    name: &str,
) -> Result<Vec<u8>, error::Arrays> {
    let text: Vec<u8> = body
        .iter()
        .copied()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();
    let prefix = header_type.bytes();

    if let Ok(mut decoded) = base64::decode(&text) {
        if decoded.len() < prefix {
            let truncated = error::TruncatedBinary::new(name.into(), prefix as u64, decoded.len());
            return Err(truncated.into());
        }

        let declared = header_type.read(&decoded[..prefix]);
        let available = decoded.len() - prefix;
        if declared > available as u64 {
            return Err(error::TruncatedBinary::new(name.into(), declared, available).into());
        }

        decoded.drain(..prefix);
        decoded.truncate(declared as usize);
        return Ok(decoded);
    }

    // the prefix is padded on its own, so it spans a whole number of base64 quads
    let prefix_chars = (prefix + 2) / 3 * 4;
    if text.len() < prefix_chars {
        let available = text.len() * 3 / 4;
        return Err(error::TruncatedBinary::new(name.into(), prefix as u64, available).into());
    }

    let (head, tail) = text.split_at(prefix_chars);
    let head = base64::decode(head).map_err(|e| error::InvalidBase64::new(name.into(), e))?;
    let mut data = base64::decode(tail).map_err(|e| error::InvalidBase64::new(name.into(), e))?;

    if head.len() < prefix {
        return Err(error::TruncatedBinary::new(name.into(), prefix as u64, head.len()).into());
    }

    let declared = header_type.read(&head[..prefix]);
    if declared > data.len() as u64 {
        return Err(error::TruncatedBinary::new(name.into(), declared, data.len()).into());
    }

    data.truncate(declared as usize);
    Ok(data)
}

/// the bytes of one block in the raw appended section
fn appended_block<'a>(
    raw: &'a [u8],
    offset: u64,
    header_type: HeaderType,
    name: &str,
) -> Result<&'a [u8], error::Arrays> {
    let prefix = header_type.bytes();
    let truncated = |declared: u64| error::TruncatedBinary::new(name.into(), declared, raw.len());

    let start = usize::try_from(offset).map_err(|_| truncated(offset))?;
    let data_start = start.checked_add(prefix).ok_or_else(|| truncated(offset))?;
    let prefix_bytes = raw
        .get(start..data_start)
        .ok_or_else(|| truncated(data_start as u64))?;

    let declared = header_type.read(prefix_bytes);
    let data_end = (data_start as u64).saturating_add(declared);

    let block = usize::try_from(data_end)
        .ok()
        .and_then(|end| raw.get(data_start..end))
        .ok_or_else(|| truncated(data_end))?;

    Ok(block)
}
