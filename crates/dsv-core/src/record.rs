//! Property records stored in tree nodes.
//!
//! On disk a record is `name_len: u32`, the name as UTF-16 (`name_len` code
//! units), the attribute code as a four-character `u32`, a four-byte data
//! type tag and a payload whose layout depends on that tag.
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{DsStoreError, Result};
use crate::stream::{ByteStream, Encoding, Endianness};

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z.
pub const REFERENCE_DATE_UNIX: i64 = 978_307_200;

/// Blobs longer than this are summarized by `Display`.
pub const DEFAULT_BLOB_PREVIEW: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    Long,
    Shor,
    Type,
    Comp,
    Dutc,
    Blob,
    Ustr,
}

impl DataType {
    pub const ALL: [DataType; 8] = [
        DataType::Bool,
        DataType::Long,
        DataType::Shor,
        DataType::Type,
        DataType::Comp,
        DataType::Dutc,
        DataType::Blob,
        DataType::Ustr,
    ];

    pub fn as_tag(self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Long => "long",
            DataType::Shor => "shor",
            DataType::Type => "type",
            DataType::Comp => "comp",
            DataType::Dutc => "dutc",
            DataType::Blob => "blob",
            DataType::Ustr => "ustr",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_tag() == tag)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValue {
    Bool(bool),
    Long(i32),
    /// Four bytes on disk despite the name.
    Shor(i32),
    Type(u32),
    Comp(i64),
    Dutc(DateTime<Utc>),
    Blob(Vec<u8>),
    Ustr(String),
}

impl RecordValue {
    pub fn data_type(&self) -> DataType {
        match self {
            RecordValue::Bool(_) => DataType::Bool,
            RecordValue::Long(_) => DataType::Long,
            RecordValue::Shor(_) => DataType::Shor,
            RecordValue::Type(_) => DataType::Type,
            RecordValue::Comp(_) => DataType::Comp,
            RecordValue::Dutc(_) => DataType::Dutc,
            RecordValue::Blob(_) => DataType::Blob,
            RecordValue::Ustr(_) => DataType::Ustr,
        }
    }

    /// Decodes the payload that follows a `data_type` tag.
    pub fn read<S: ByteStream + ?Sized>(stream: &mut S, data_type: DataType) -> Result<Self> {
        let value = match data_type {
            DataType::Bool => RecordValue::Bool(stream.read_u8()? == 1),
            DataType::Long => RecordValue::Long(stream.read_i32(Endianness::Big)?),
            DataType::Shor => RecordValue::Shor(stream.read_i32(Endianness::Big)?),
            DataType::Type => RecordValue::Type(stream.read_u32(Endianness::Big)?),
            DataType::Comp => RecordValue::Comp(stream.read_i64(Endianness::Big)?),
            DataType::Dutc => {
                RecordValue::Dutc(from_reference_date(stream.read_i64(Endianness::Big)?)?)
            }
            DataType::Blob => {
                let len = stream.read_u32(Endianness::Big)?;
                RecordValue::Blob(stream.read(len as usize)?)
            }
            DataType::Ustr => {
                let len = stream.read_u32(Endianness::Big)?;
                let text = stream.read_string(utf16_byte_len(len), Encoding::Utf16)?;
                RecordValue::Ustr(text.ok_or(DsStoreError::InvalidStringValue)?)
            }
        };
        Ok(value)
    }

    /// Like `Display`, but blobs over `max_blob_bytes` are shown as a byte
    /// count instead of hex.
    pub fn display_with(&self, max_blob_bytes: usize) -> String {
        match self {
            RecordValue::Bool(true) => "True".to_string(),
            RecordValue::Bool(false) => "False".to_string(),
            RecordValue::Long(v) | RecordValue::Shor(v) => v.to_string(),
            RecordValue::Type(v) => fourcc(*v),
            RecordValue::Comp(v) => v.to_string(),
            RecordValue::Dutc(ts) => ts.to_rfc3339_opts(SecondsFormat::Secs, true),
            RecordValue::Blob(b) if b.is_empty() || b.len() > max_blob_bytes => {
                format!("{} bytes", b.len())
            }
            RecordValue::Blob(b) => hex_upper(b),
            RecordValue::Ustr(s) => s.clone(),
        }
    }
}

impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_with(DEFAULT_BLOB_PREVIEW))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// File name the property belongs to ("." for the folder itself).
    pub name: String,
    /// Four-character attribute code, e.g. `Iloc` or `bwsp`.
    pub type_code: u32,
    pub value: RecordValue,
}

impl Record {
    pub fn read<S: ByteStream + ?Sized>(stream: &mut S) -> Result<Self> {
        let name_len = stream.read_u32(Endianness::Big)?;
        let name = stream
            .read_string(utf16_byte_len(name_len), Encoding::Utf16)?
            .ok_or(DsStoreError::InvalidRecordName)?;
        let type_code = stream.read_u32(Endianness::Big)?;
        let tag = stream
            .read_string(4, Encoding::Utf8)?
            .ok_or(DsStoreError::InvalidDataTypeTag)?;
        let data_type =
            DataType::from_tag(&tag).ok_or_else(|| DsStoreError::UnknownDataType(tag))?;
        let value = RecordValue::read(stream, data_type)?;
        tracing::trace!(name = %name, code = %fourcc(type_code), %data_type, "record");
        Ok(Self {
            name,
            type_code,
            value,
        })
    }

    pub fn data_type(&self) -> DataType {
        self.value.data_type()
    }
}

/// Renders a four-character code, replacing non-printable bytes with `.`.
pub fn fourcc(code: u32) -> String {
    code.to_be_bytes()
        .iter()
        .map(|&b| if (0x20..0x7F).contains(&b) { b as char } else { '.' })
        .collect()
}

pub fn from_reference_date(seconds: i64) -> Result<DateTime<Utc>> {
    REFERENCE_DATE_UNIX
        .checked_add(seconds)
        .and_then(|unix| DateTime::from_timestamp(unix, 0))
        .ok_or(DsStoreError::TimestampOutOfRange(seconds))
}

fn utf16_byte_len(units: u32) -> usize {
    // u32 * 2 always fits in a 64-bit usize; saturate elsewhere so the read
    // reports the shortfall.
    usize::try_from(u64::from(units) * 2).unwrap_or(usize::MAX)
}

pub(crate) fn hex_upper(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(&mut out, "{:02X}", b).ok();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::DataStream;
    use crate::testutil::record_bytes;

    fn decode(tag: &[u8; 4], payload: &[u8]) -> Result<Record> {
        let bytes = record_bytes("file.txt", b"Iloc", tag, payload);
        Record::read(&mut DataStream::new(&bytes))
    }

    #[test]
    fn header_fields() {
        let r = decode(b"bool", &[1]).unwrap();
        assert_eq!(r.name, "file.txt");
        assert_eq!(r.type_code, u32::from_be_bytes(*b"Iloc"));
        assert_eq!(fourcc(r.type_code), "Iloc");
        assert_eq!(r.data_type(), DataType::Bool);
    }

    #[test]
    fn scalar_payloads() {
        assert_eq!(decode(b"bool", &[1]).unwrap().value, RecordValue::Bool(true));
        assert_eq!(decode(b"bool", &[2]).unwrap().value, RecordValue::Bool(false));
        assert_eq!(
            decode(b"long", &[0, 0, 0, 0x2A]).unwrap().value,
            RecordValue::Long(42)
        );
        assert_eq!(
            decode(b"shor", &[0xFF, 0xFF, 0xFF, 0xFF]).unwrap().value,
            RecordValue::Shor(-1)
        );
        assert_eq!(
            decode(b"type", b"icnv").unwrap().value,
            RecordValue::Type(u32::from_be_bytes(*b"icnv"))
        );
        assert_eq!(
            decode(b"comp", &[0, 0, 0, 1, 0, 0, 0, 0]).unwrap().value,
            RecordValue::Comp(1 << 32)
        );
    }

    #[test]
    fn dutc_is_relative_to_2001() {
        let r = decode(b"dutc", &0i64.to_be_bytes()).unwrap();
        assert_eq!(r.value.to_string(), "2001-01-01T00:00:00Z");
        let r = decode(b"dutc", &86_400i64.to_be_bytes()).unwrap();
        let RecordValue::Dutc(ts) = r.value else {
            panic!("expected dutc");
        };
        assert_eq!(ts.timestamp(), REFERENCE_DATE_UNIX + 86_400);
        assert!(matches!(
            decode(b"dutc", &i64::MAX.to_be_bytes()),
            Err(DsStoreError::TimestampOutOfRange(i64::MAX))
        ));
    }

    #[test]
    fn blob_and_ustr() {
        assert_eq!(
            decode(b"blob", &[0, 0, 0, 3, 0x41, 0x42, 0x43]).unwrap().value,
            RecordValue::Blob(vec![0x41, 0x42, 0x43])
        );
        assert_eq!(
            decode(b"ustr", &[0, 0, 0, 2, 0, b'o', 0, b'k']).unwrap().value,
            RecordValue::Ustr("ok".into())
        );
        assert!(matches!(
            decode(b"ustr", &[0, 0, 0, 1, 0xDC, 0x00]),
            Err(DsStoreError::InvalidStringValue)
        ));
    }

    #[test]
    fn unknown_tag() {
        match decode(b"xxxx", &[0; 8]) {
            Err(DsStoreError::UnknownDataType(tag)) => assert_eq!(tag, "xxxx"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            decode(&[0xFF, 0xFE, 0xFD, 0xFC], &[]),
            Err(DsStoreError::InvalidDataTypeTag)
        ));
    }

    #[test]
    fn invalid_name() {
        // one code unit, lone low surrogate
        let mut bytes = vec![0, 0, 0, 1, 0xDC, 0x00];
        bytes.extend_from_slice(b"Ilocbool\x01");
        assert!(matches!(
            Record::read(&mut DataStream::new(&bytes)),
            Err(DsStoreError::InvalidRecordName)
        ));
    }

    #[test]
    fn short_payload() {
        assert!(matches!(
            decode(b"blob", &[0, 0, 0, 9, 1, 2]),
            Err(DsStoreError::InsufficientData { requested: 9, available: 2 })
        ));
    }

    #[test]
    fn display() {
        assert_eq!(RecordValue::Bool(false).to_string(), "False");
        assert_eq!(RecordValue::Type(0x4963_0001).to_string(), "Ic..");
        assert_eq!(RecordValue::Blob(vec![0xAB, 0x01]).to_string(), "AB01");
        assert_eq!(RecordValue::Blob(vec![0; 33]).to_string(), "33 bytes");
        assert_eq!(RecordValue::Blob(vec![0; 33]).display_with(64).len(), 66);
    }

    #[test]
    fn tags_round_trip() {
        for t in DataType::ALL {
            assert_eq!(DataType::from_tag(t.as_tag()), Some(t));
        }
        assert_eq!(DataType::from_tag("BOOL"), None);
    }
}
