//! Wire records returned by the platform's buffered queries.
//!
//! All multi-byte integers are little endian. A UUID is a one-byte encoding
//! tag (0 short, 1 long) followed by 2 bytes (alias, LE) or 16 bytes (the
//! textual big-endian byte order). The record layouts:
//!
//! * service: uuid, u16 attribute handle
//! * characteristic: uuid, u16 attribute handle, u16 value handle,
//!   u8 property bits
//! * descriptor: u8 type code, uuid, u16 attribute handle,
//!   u16 owning characteristic handle
//! * descriptor value: u8 type code, uuid, then the value data to the end
//!   of the buffer
//! * text: the bytes, optionally NUL terminated
//! * text property: u8 type tag (1 is text), the bytes, NUL terminator
//!
//! Attribute set buffers concatenate fixed-size records back to back; the
//! decoders below loop until the buffer is exhausted and treat a partial
//! trailing record as corruption.

use byteorder::{ByteOrder, LittleEndian};
use uuid::Uuid;

use crate::bleuuid::BleUuid;
use crate::error::{Error, Result};

const UUID_KIND_SHORT: u8 = 0;
const UUID_KIND_LONG: u8 = 1;
const PROPERTY_TYPE_TEXT: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceRecord {
    pub uuid: BleUuid,
    pub attribute_handle: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicRecord {
    pub uuid: BleUuid,
    pub attribute_handle: u16,
    pub value_handle: u16,
    pub properties: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorRecord {
    pub kind: u8,
    pub uuid: BleUuid,
    pub attribute_handle: u16,
    pub characteristic_handle: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorValueRecord {
    pub kind: u8,
    pub uuid: BleUuid,
    pub data: Vec<u8>,
}

/// Cursor over a record buffer. Reads past the end report which record was
/// being decoded.
struct Reader<'a> {
    buffer: &'a [u8],
    record: &'static str,
}

impl<'a> Reader<'a> {
    fn new(buffer: &'a [u8], record: &'static str) -> Self {
        Reader { buffer, record }
    }

    fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.buffer.len() < count {
            return Err(Error::Truncated(self.record));
        }
        let (head, rest) = self.buffer.split_at(count);
        self.buffer = rest;
        Ok(head)
    }

    fn take_rest(&mut self) -> &'a [u8] {
        let rest = self.buffer;
        self.buffer = &[];
        rest
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    fn read_uuid(&mut self) -> Result<BleUuid> {
        match self.read_u8()? {
            UUID_KIND_SHORT => Ok(BleUuid::Short(self.read_u16()?)),
            UUID_KIND_LONG => {
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(self.take(16)?);
                Ok(BleUuid::Long(Uuid::from_bytes(bytes)))
            }
            kind => Err(Error::UnknownUuidKind(kind)),
        }
    }
}

pub fn decode_services(buffer: &[u8]) -> Result<Vec<ServiceRecord>> {
    let mut reader = Reader::new(buffer, "service");
    let mut records = Vec::new();
    while !reader.is_empty() {
        records.push(ServiceRecord {
            uuid: reader.read_uuid()?,
            attribute_handle: reader.read_u16()?,
        });
    }
    Ok(records)
}

pub fn decode_characteristics(buffer: &[u8]) -> Result<Vec<CharacteristicRecord>> {
    let mut reader = Reader::new(buffer, "characteristic");
    let mut records = Vec::new();
    while !reader.is_empty() {
        records.push(CharacteristicRecord {
            uuid: reader.read_uuid()?,
            attribute_handle: reader.read_u16()?,
            value_handle: reader.read_u16()?,
            properties: reader.read_u8()?,
        });
    }
    Ok(records)
}

pub fn decode_descriptors(buffer: &[u8]) -> Result<Vec<DescriptorRecord>> {
    let mut reader = Reader::new(buffer, "descriptor");
    let mut records = Vec::new();
    while !reader.is_empty() {
        records.push(DescriptorRecord {
            kind: reader.read_u8()?,
            uuid: reader.read_uuid()?,
            attribute_handle: reader.read_u16()?,
            characteristic_handle: reader.read_u16()?,
        });
    }
    Ok(records)
}

pub fn decode_descriptor_value(buffer: &[u8]) -> Result<DescriptorValueRecord> {
    let mut reader = Reader::new(buffer, "descriptor value");
    Ok(DescriptorValueRecord {
        kind: reader.read_u8()?,
        uuid: reader.read_uuid()?,
        data: reader.take_rest().to_vec(),
    })
}

/// Decodes a plain text record, tolerating a trailing NUL. Non-UTF-8 bytes
/// are replaced rather than rejected; device-provided strings are display
/// data, not identifiers.
pub fn decode_text(buffer: &[u8]) -> String {
    let bytes = match buffer.split_last() {
        Some((0, head)) => head,
        _ => buffer,
    };
    String::from_utf8_lossy(bytes).into_owned()
}

/// Decodes a typed registry property that must be text.
pub fn decode_text_property(buffer: &[u8]) -> Result<String> {
    let mut reader = Reader::new(buffer, "text property");
    if reader.read_u8()? != PROPERTY_TYPE_TEXT {
        return Err(Error::PropertyNotText);
    }
    Ok(decode_text(reader.take_rest()))
}

pub fn encode_uuid(out: &mut Vec<u8>, uuid: BleUuid) {
    match uuid {
        BleUuid::Short(value) => {
            out.push(UUID_KIND_SHORT);
            out.extend_from_slice(&value.to_le_bytes());
        }
        BleUuid::Long(uuid) => {
            out.push(UUID_KIND_LONG);
            out.extend_from_slice(uuid.as_bytes());
        }
    }
}

pub fn encode_service(out: &mut Vec<u8>, record: &ServiceRecord) {
    encode_uuid(out, record.uuid);
    out.extend_from_slice(&record.attribute_handle.to_le_bytes());
}

pub fn encode_characteristic(out: &mut Vec<u8>, record: &CharacteristicRecord) {
    encode_uuid(out, record.uuid);
    out.extend_from_slice(&record.attribute_handle.to_le_bytes());
    out.extend_from_slice(&record.value_handle.to_le_bytes());
    out.push(record.properties);
}

pub fn encode_descriptor(out: &mut Vec<u8>, record: &DescriptorRecord) {
    out.push(record.kind);
    encode_uuid(out, record.uuid);
    out.extend_from_slice(&record.attribute_handle.to_le_bytes());
    out.extend_from_slice(&record.characteristic_handle.to_le_bytes());
}

pub fn encode_descriptor_value(out: &mut Vec<u8>, record: &DescriptorValueRecord) {
    out.push(record.kind);
    encode_uuid(out, record.uuid);
    out.extend_from_slice(&record.data);
}

pub fn encode_text(out: &mut Vec<u8>, text: &str) {
    out.extend_from_slice(text.as_bytes());
    out.push(0);
}

pub fn encode_text_property(out: &mut Vec<u8>, text: &str) {
    out.push(PROPERTY_TYPE_TEXT);
    encode_text(out, text);
}
