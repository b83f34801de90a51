//! Checksum and shape agreement between repeated data entries.
//!
//! Every buffer is reduced to a [`Fingerprint`]: its lookup3 checksum
//! (seeds 0, 0) and its shape. Comparison entries are checked against a
//! reference fingerprint; a checksum difference and a shape difference are
//! reported separately, and both may fire for the same entry.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use h5describe_format::checksum::lookup3;

/// Dimension sizes, slowest-varying first.
pub type Shape = Vec<u64>;

/// Checksum recorded for an optional buffer that is not present.
pub const ABSENT_CHECKSUM: i64 = -1;

/// Checksum and shape of one buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fingerprint {
    /// lookup3 of the raw bytes, or [`ABSENT_CHECKSUM`].
    pub checksum: i64,
    pub shape: Shape,
}

impl Fingerprint {
    pub fn of(bytes: &[u8], shape: &[u64]) -> Self {
        let checksum = lookup3(bytes);
        debug!(len = bytes.len(), checksum, ?shape, "hashed buffer");
        Self {
            checksum: i64::from(checksum),
            shape: shape.to_vec(),
        }
    }

    /// The record of an optional buffer that does not exist.
    pub fn absent() -> Self {
        Self {
            checksum: ABSENT_CHECKSUM,
            shape: Vec::new(),
        }
    }

    pub fn is_absent(&self) -> bool {
        self.checksum == ABSENT_CHECKSUM
    }
}

/// Fingerprint of an optional auxiliary buffer, which has no peer to
/// compare against.
pub fn auxiliary(buffer: Option<(&[u8], &[u64])>) -> Fingerprint {
    match buffer {
        Some((bytes, shape)) => Fingerprint::of(bytes, shape),
        None => Fingerprint::absent(),
    }
}

/// Which property of an entry disagrees with the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchKind {
    Checksum,
    Shape,
}

impl fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MismatchKind::Checksum => "checksum",
            MismatchKind::Shape => "shape",
        })
    }
}

/// One disagreement between a comparison entry and the reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub entry: String,
    pub kind: MismatchKind,
}

/// Compares entries against one reference fingerprint.
#[derive(Debug, Clone)]
pub struct ConsistencyChecker {
    reference: Fingerprint,
}

impl ConsistencyChecker {
    /// Hash the reference buffer.
    pub fn new(reference: &[u8], shape: &[u64]) -> Self {
        Self {
            reference: Fingerprint::of(reference, shape),
        }
    }

    pub fn reference(&self) -> &Fingerprint {
        &self.reference
    }

    pub fn into_reference(self) -> Fingerprint {
        self.reference
    }

    /// Compare an already hashed entry. Checksum mismatch, if any, comes
    /// before shape mismatch.
    pub fn compare(&self, name: &str, fingerprint: &Fingerprint) -> Vec<Mismatch> {
        let mut found = Vec::new();
        if fingerprint.checksum != self.reference.checksum {
            found.push(Mismatch {
                entry: name.to_string(),
                kind: MismatchKind::Checksum,
            });
        }
        if fingerprint.shape != self.reference.shape {
            found.push(Mismatch {
                entry: name.to_string(),
                kind: MismatchKind::Shape,
            });
        }
        found
    }

    /// Hash and compare one entry.
    pub fn check(&self, name: &str, bytes: &[u8], shape: &[u64]) -> Vec<Mismatch> {
        self.compare(name, &Fingerprint::of(bytes, shape))
    }

    /// Read, hash and compare every named entry. Mismatches come back in
    /// `names` order.
    ///
    /// `read` is called once per name and each buffer is dropped as soon as
    /// it is hashed. With the `parallel` feature the entries are handled on
    /// the rayon pool and joined before returning. The first read error
    /// aborts the whole check.
    pub fn check_all<N, E, R>(&self, names: &[N], read: R) -> Result<Vec<Mismatch>, E>
    where
        N: AsRef<str> + Sync,
        E: Send,
        R: Fn(&str) -> Result<(Vec<u8>, Shape), E> + Sync,
    {
        let one = |name: &N| -> Result<Vec<Mismatch>, E> {
            let name = name.as_ref();
            let (bytes, shape) = read(name)?;
            Ok(self.check(name, &bytes, &shape))
        };

        #[cfg(feature = "parallel")]
        let per_entry: Vec<Vec<Mismatch>> = {
            use rayon::prelude::*;
            names.par_iter().map(one).collect::<Result<_, E>>()?
        };
        #[cfg(not(feature = "parallel"))]
        let per_entry: Vec<Vec<Mismatch>> = names.iter().map(one).collect::<Result<_, E>>()?;

        Ok(per_entry.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn identical_entries_agree() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let checker = ConsistencyChecker::new(&data, &[2, 3]);
        assert!(checker.check("data_000002", &data, &[2, 3]).is_empty());
    }

    #[test]
    fn same_bytes_different_shape() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let checker = ConsistencyChecker::new(&data, &[2, 3]);
        assert_eq!(
            checker.check("data_000002", &data, &[3, 2]),
            vec![Mismatch {
                entry: "data_000002".into(),
                kind: MismatchKind::Shape
            }]
        );
    }

    #[test]
    fn different_bytes_same_shape() {
        let checker = ConsistencyChecker::new(&[1, 2, 3, 4], &[4]);
        let found = checker.check("data_000002", &[1, 2, 3, 5], &[4]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, MismatchKind::Checksum);
    }

    #[test]
    fn both_signals_fire() {
        let checker = ConsistencyChecker::new(&[1, 2, 3, 4], &[4]);
        let kinds: Vec<_> = checker
            .check("x", &[9, 9], &[2])
            .into_iter()
            .map(|m| m.kind)
            .collect();
        assert_eq!(kinds, vec![MismatchKind::Checksum, MismatchKind::Shape]);
    }

    #[test]
    fn element_count_is_not_shape() {
        // 1x4 and 4x1 hold the same number of elements but are different shapes
        let checker = ConsistencyChecker::new(&[0; 4], &[1, 4]);
        let found = checker.check("y", &[0; 4], &[4, 1]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, MismatchKind::Shape);
    }

    #[test]
    fn check_all_keeps_entry_order() {
        let reference = vec![7u8; 32];
        let checker = ConsistencyChecker::new(&reference, &[32]);
        let names: Vec<String> = (0..20).map(|i| format!("data_{i:06}")).collect();
        let buffers: HashMap<&str, Vec<u8>> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), vec![if i % 3 == 0 { 8 } else { 7 }; 32]))
            .collect();

        let found = checker
            .check_all(&names, |name| Ok::<_, String>((buffers[name].clone(), vec![32])))
            .unwrap();
        let flagged: Vec<_> = found.into_iter().map(|m| m.entry).collect();
        let expected: Vec<_> = names.iter().step_by(3).cloned().collect();
        assert_eq!(flagged, expected);
    }

    #[test]
    fn check_all_stops_on_read_error() {
        let checker = ConsistencyChecker::new(&[1], &[1]);
        let result = checker.check_all(&["data_000002", "data_000003"], |name| {
            if name == "data_000003" {
                Err(format!("cannot read {name}"))
            } else {
                Ok((vec![1], vec![1]))
            }
        });
        assert_eq!(result, Err("cannot read data_000003".to_string()));
    }

    #[test]
    fn reference_is_kept() {
        let checker = ConsistencyChecker::new(b"Four score and seven years ago", &[30]);
        assert_eq!(checker.reference().checksum, 0x17770551);
        assert_eq!(checker.into_reference().shape, vec![30]);
    }

    #[test]
    fn absent_is_not_empty() {
        let absent = auxiliary(None);
        assert!(absent.is_absent());
        assert_eq!(absent.shape, Vec::<u64>::new());

        let empty = auxiliary(Some((&[], &[0])));
        assert!(!empty.is_absent());
        assert_eq!(empty.checksum, 0xdeadbeef);
        assert_eq!(empty.shape, vec![0]);
    }
}
