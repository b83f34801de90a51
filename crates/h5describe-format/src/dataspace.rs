//! Dataspace message (type 0x0001): rank and dimension sizes.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::bytes::{ensure_len, read_uint};
use crate::error::FormatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataspaceType {
    /// One element, no dimensions.
    Scalar,
    Simple,
    /// No elements at all.
    Null,
}

/// Parsed dataspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataspace {
    pub space_type: DataspaceType,
    /// Current size of each dimension; empty for scalar and null spaces.
    pub dimensions: Vec<u64>,
    /// Maximum sizes when stored; `u64::MAX` marks an unlimited dimension.
    pub max_dimensions: Option<Vec<u64>>,
}

const FLAG_HAS_MAX: u8 = 0x01;

impl Dataspace {
    /// Parse a dataspace message body. Dimension sizes are `length_size`
    /// bytes wide.
    pub fn parse(data: &[u8], length_size: u8) -> Result<Dataspace, FormatError> {
        ensure_len(data, 0, 4)?;
        let [version, rank, flags, kind] = [data[0], data[1], data[2], data[3]];

        // v1: version, rank, flags, five reserved bytes; v2: version, rank,
        // flags, type
        let (space_type, header_len) = match (version, kind) {
            (1, _) if rank == 0 => (DataspaceType::Scalar, 8),
            (1, _) => (DataspaceType::Simple, 8),
            (2, 0) => (DataspaceType::Scalar, 4),
            (2, 1) => (DataspaceType::Simple, 4),
            (2, 2) => (DataspaceType::Null, 4),
            (2, other) => return Err(FormatError::InvalidDataspaceType(other)),
            (v, _) => return Err(FormatError::InvalidDataspaceVersion(v)),
        };

        let width = length_size as usize;
        let sizes_len = rank as usize * width;
        let stored = if flags & FLAG_HAS_MAX != 0 { 2 } else { 1 };
        ensure_len(data, header_len, stored * sizes_len)?;

        let sizes = |start: usize| -> Result<Vec<u64>, FormatError> {
            (0..rank as usize)
                .map(|d| read_uint(data, start + d * width, length_size))
                .collect()
        };
        let dimensions = sizes(header_len)?;
        let max_dimensions = if stored == 2 {
            Some(sizes(header_len + sizes_len)?)
        } else {
            None
        };

        Ok(Dataspace {
            space_type,
            dimensions,
            max_dimensions,
        })
    }

    /// Number of elements described: 1 for scalar, 0 for null.
    pub fn num_elements(&self) -> Result<u64, FormatError> {
        match self.space_type {
            DataspaceType::Null => Ok(0),
            DataspaceType::Scalar => Ok(1),
            DataspaceType::Simple => self
                .dimensions
                .iter()
                .try_fold(1u64, |n, &d| n.checked_mul(d))
                .ok_or(FormatError::ImplausibleSize("dataspace")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(version: u8, kind: u8, dims: &[u64], max: &[u64], width: usize) -> Vec<u8> {
        let flags = u8::from(!max.is_empty());
        let mut buf = match version {
            1 => vec![1, dims.len() as u8, flags, 0, 0, 0, 0, 0],
            _ => vec![2, dims.len() as u8, flags, kind],
        };
        for d in dims.iter().chain(max) {
            buf.extend_from_slice(&d.to_le_bytes()[..width]);
        }
        buf
    }

    #[test]
    fn detector_stack() {
        let ds = Dataspace::parse(&message(2, 1, &[100, 512, 1030], &[], 8), 8).unwrap();
        assert_eq!(ds.space_type, DataspaceType::Simple);
        assert_eq!(ds.dimensions, vec![100, 512, 1030]);
        assert_eq!(ds.max_dimensions, None);
        assert_eq!(ds.num_elements().unwrap(), 100 * 512 * 1030);
    }

    #[test]
    fn extendable_frame_axis() {
        let ds = Dataspace::parse(&message(2, 1, &[0, 4], &[u64::MAX, 4], 8), 8).unwrap();
        assert_eq!(ds.max_dimensions, Some(vec![u64::MAX, 4]));
        assert_eq!(ds.num_elements().unwrap(), 0);
    }

    #[test]
    fn both_versions_agree() {
        for width in [4, 8] {
            let v1 = Dataspace::parse(&message(1, 0, &[17, 3], &[], width), width as u8).unwrap();
            let v2 = Dataspace::parse(&message(2, 1, &[17, 3], &[], width), width as u8).unwrap();
            assert_eq!(v1, v2);
        }
        let scalar = Dataspace::parse(&message(1, 0, &[], &[], 8), 8).unwrap();
        assert_eq!(scalar.space_type, DataspaceType::Scalar);
    }

    #[test]
    fn scalar_and_null_counts() {
        let scalar = Dataspace::parse(&[2, 0, 0, 0], 8).unwrap();
        assert!(scalar.dimensions.is_empty());
        assert_eq!(scalar.num_elements().unwrap(), 1);

        let null = Dataspace::parse(&[2, 0, 0, 2], 8).unwrap();
        assert_eq!(null.space_type, DataspaceType::Null);
        assert_eq!(null.num_elements().unwrap(), 0);
    }

    #[test]
    fn element_count_overflow() {
        let ds = Dataspace::parse(&message(2, 1, &[1 << 33, 1 << 33], &[], 8), 8).unwrap();
        assert_eq!(ds.num_elements(), Err(FormatError::ImplausibleSize("dataspace")));
    }

    #[test]
    fn malformed() {
        assert_eq!(
            Dataspace::parse(&[3, 0, 0, 0], 8),
            Err(FormatError::InvalidDataspaceVersion(3))
        );
        assert_eq!(
            Dataspace::parse(&[2, 0, 0, 7], 8),
            Err(FormatError::InvalidDataspaceType(7))
        );
        let mut short = message(2, 1, &[3, 4], &[], 8);
        short.truncate(10);
        assert!(matches!(
            Dataspace::parse(&short, 8),
            Err(FormatError::UnexpectedEof { .. })
        ));
        // v1 header itself cut short
        assert!(matches!(
            Dataspace::parse(&[1, 0, 0, 0, 0], 8),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }
}
