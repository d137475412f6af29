use super::event_summary::EventSummary;

use derive_more::{Constructor, Display, From};
use quick_xml::name::QName;

#[derive(Debug, thiserror::Error, From)]
pub enum ParseError {
    #[error("Error parsing vtu file before the <Piece> element: {0}")]
    Header(Header),
    #[error("Error parsing vtu <Piece> element: {0}")]
    Piece(Piece),
    #[error("Error decoding vtu data arrays: {0}")]
    Arrays(Arrays),
    #[error("Error locating vtu appended data: {0}")]
    AppendedData(AppendedData),
}

#[derive(Debug, thiserror::Error, From)]
pub enum Header {
    #[error("{0}")]
    MalformedXml(MalformedXml),
    #[error("{0}")]
    MalformedAttribute(MalformedAttribute),
    #[error("{0}")]
    MissingAttribute(MissingAttribute),
    #[error("{0}")]
    UnexpectedElement(UnexpectedElement),
    #[error("{0}")]
    UnexpectedAttributeValue(UnexpectedAttributeValue),
    #[error("{0}")]
    InvalidNumber(InvalidNumber),
    #[error("{0}")]
    Unsupported(Unsupported),
    #[error("the UnstructuredGrid element holds no <Piece>")]
    NoPieces,
}

#[derive(Debug, thiserror::Error, From)]
pub enum Piece {
    #[error("{0}")]
    MalformedXml(MalformedXml),
    #[error("{0}")]
    MalformedAttribute(MalformedAttribute),
    #[error("{0}")]
    MissingAttribute(MissingAttribute),
    #[error("{0}")]
    UnexpectedElement(UnexpectedElement),
    #[error("{0}")]
    UnexpectedAttributeValue(UnexpectedAttributeValue),
    #[error("{0}")]
    InvalidNumber(InvalidNumber),
}

#[derive(Debug, thiserror::Error, From)]
pub enum Arrays {
    #[error("{0}")]
    InvalidNumber(InvalidNumber),
    #[error("{0}")]
    InvalidBase64(InvalidBase64),
    #[error("{0}")]
    TruncatedBinary(TruncatedBinary),
    #[error("{0}")]
    Unrepresentable(Unrepresentable),
    #[error("{0}")]
    LengthMismatch(LengthMismatch),
    #[error("{0}")]
    MissingArray(MissingArray),
    #[error("{0}")]
    UnexpectedAttributeValue(UnexpectedAttributeValue),
    #[error("{0}")]
    InvalidOffsets(InvalidOffsets),
    #[error("array `{0}` is stored in the appended section, but the file has no <AppendedData>")]
    MissingAppendedData(String),
}

#[derive(Debug, thiserror::Error, From)]
pub enum AppendedData {
    #[error("{0}")]
    MalformedXml(MalformedXml),
    #[error("{0}")]
    MalformedAttribute(MalformedAttribute),
    #[error("{0}")]
    MissingAttribute(MissingAttribute),
    #[error("{0}")]
    UnexpectedElement(UnexpectedElement),
    #[error("{0}")]
    UnexpectedAttributeValue(UnexpectedAttributeValue),
    #[error("the <AppendedData> section does not start with the `_` marker")]
    MissingMarker,
}

#[derive(From, Display, Debug)]
#[display(fmt = "failed to parse an xml element: {xml_err}")]
pub struct MalformedXml {
    xml_err: quick_xml::Error,
}

#[derive(From, Display, Debug)]
#[display(fmt = "failed to parse an xml attribute: {att_err}")]
pub struct MalformedAttribute {
    att_err: quick_xml::events::attributes::AttrError,
}

#[derive(Display, Debug)]
#[display(fmt = "unexpected element. Expected `{expected_name}`, got {actual_element}")]
pub struct UnexpectedElement {
    expected_name: String,
    actual_element: EventSummary,
}

impl UnexpectedElement {
    pub(crate) fn new<T: Into<String>>(expected_name: T, actual_element: EventSummary) -> Self {
        Self {
            expected_name: expected_name.into(),
            actual_element,
        }
    }
}

#[derive(Display, Debug, Constructor)]
#[display(
    fmt = "unexpected attribute value for {attribute_name} in {element_name} element: expected {expected_value}, got {actual_value}"
)]
pub struct UnexpectedAttributeValue {
    pub(crate) element_name: String,
    pub(crate) attribute_name: String,
    pub(crate) expected_value: String,
    pub(crate) actual_value: ParsedNameOrBytes,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "missing attribute `{attribute_name}` in {element_name} element")]
pub struct MissingAttribute {
    element_name: String,
    attribute_name: String,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "could not parse {context} value `{text}` as a number")]
pub struct InvalidNumber {
    context: String,
    text: ParsedNameOrBytes,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "unsupported vtu feature: {feature}")]
pub struct Unsupported {
    feature: String,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "DataArray `{array_name}` is not valid base64: {b64_err}")]
pub struct InvalidBase64 {
    array_name: String,
    b64_err: base64::DecodeError,
}

#[derive(Display, Debug, Constructor)]
#[display(
    fmt = "binary data for DataArray `{array_name}` declares {declared} bytes but {available} are available"
)]
pub struct TruncatedBinary {
    array_name: String,
    declared: u64,
    available: usize,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "DataArray `{array_name}` holds a value that cannot be represented as {target}")]
pub struct Unrepresentable {
    array_name: String,
    target: &'static str,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "DataArray `{array_name}` holds {actual} values, expected {expected}")]
pub struct LengthMismatch {
    pub(crate) array_name: String,
    pub(crate) expected: usize,
    pub(crate) actual: usize,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "missing DataArray `{array_name}` in <{section}>")]
pub struct MissingArray {
    section: &'static str,
    array_name: &'static str,
}

#[derive(Display, Debug, Constructor)]
#[display(
    fmt = "cell {cell} ends at connectivity offset {offset}, which is before its start or past the {connectivity_len} connectivity entries"
)]
pub struct InvalidOffsets {
    pub(crate) cell: usize,
    pub(crate) offset: i64,
    pub(crate) connectivity_len: usize,
}

#[derive(From, Display, Debug)]
pub enum ParsedNameOrBytes {
    #[display(fmt = "{_0}")]
    Utf8(String),
    #[display(fmt = "{_0:?} (cannot convert to UTF8 string)")]
    Bytes(Vec<u8>),
}

impl ParsedNameOrBytes {
    pub(crate) fn new(bytes: &[u8]) -> Self {
        match String::from_utf8(bytes.to_vec()) {
            Ok(string) => Self::Utf8(string),
            Err(e) => Self::Bytes(e.into_bytes()),
        }
    }
}

impl<'a> From<QName<'a>> for ParsedNameOrBytes {
    fn from(x: QName) -> Self {
        Self::new(x.as_ref())
    }
}

impl<'a> From<std::borrow::Cow<'a, [u8]>> for ParsedNameOrBytes {
    fn from(x: std::borrow::Cow<'a, [u8]>) -> Self {
        Self::new(x.as_ref())
    }
}

impl<'a> From<&'a str> for ParsedNameOrBytes {
    fn from(x: &str) -> Self {
        Self::Utf8(x.into())
    }
}
