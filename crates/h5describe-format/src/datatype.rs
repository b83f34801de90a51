//! HDF5 Datatype message parsing (message type 0x0003).
//!
//! Only the common header is decoded: class, element size and byte order.
//! Buffers are hashed as stored, so member layouts of compound or
//! enumeration types are never needed.

use crate::bytes::{ensure_len, read_u32};
use crate::error::FormatError;

/// Byte order of numeric data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
    /// Classes without a byte order bit (strings, opaque, compound...).
    NotApplicable,
}

/// HDF5 datatype class (low nibble of the first byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatatypeClass {
    FixedPoint,
    FloatingPoint,
    Time,
    String,
    BitField,
    Opaque,
    Compound,
    Reference,
    Enumeration,
    VariableLength,
    Array,
}

impl TryFrom<u8> for DatatypeClass {
    type Error = FormatError;

    fn try_from(class: u8) -> Result<Self, Self::Error> {
        Ok(match class {
            0 => DatatypeClass::FixedPoint,
            1 => DatatypeClass::FloatingPoint,
            2 => DatatypeClass::Time,
            3 => DatatypeClass::String,
            4 => DatatypeClass::BitField,
            5 => DatatypeClass::Opaque,
            6 => DatatypeClass::Compound,
            7 => DatatypeClass::Reference,
            8 => DatatypeClass::Enumeration,
            9 => DatatypeClass::VariableLength,
            10 => DatatypeClass::Array,
            c => return Err(FormatError::InvalidDatatypeClass(c)),
        })
    }
}

/// Parsed datatype header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datatype {
    pub class: DatatypeClass,
    pub version: u8,
    /// Bytes per element.
    pub size: u32,
    pub byte_order: ByteOrder,
    /// Two's complement integer (fixed-point class only).
    pub signed: bool,
}

impl Datatype {
    /// Parse the 8-byte datatype header from raw message bytes.
    pub fn parse(data: &[u8]) -> Result<Datatype, FormatError> {
        ensure_len(data, 0, 8)?;
        let class = DatatypeClass::try_from(data[0] & 0x0F)?;
        let version = data[0] >> 4;
        let bits = data[1];
        let size = read_u32(data, 4)?;

        let byte_order = match class {
            DatatypeClass::FixedPoint | DatatypeClass::FloatingPoint | DatatypeClass::BitField => {
                if bits & 0x01 == 0 {
                    ByteOrder::LittleEndian
                } else {
                    ByteOrder::BigEndian
                }
            }
            _ => ByteOrder::NotApplicable,
        };
        let signed = class == DatatypeClass::FixedPoint && bits & 0x08 != 0;

        Ok(Datatype {
            class,
            version,
            size,
            byte_order,
            signed,
        })
    }

    /// Element size in bytes, as a `usize`.
    pub fn element_size(&self) -> usize {
        self.size as usize
    }
}
