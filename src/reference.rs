use facematch_vision::{Encoding, ENCODING_LEN};

use crate::error::ServiceError;

/// Caller-supplied encodings to match against.
///
/// Construction validates the whole payload up front: at least one encoding,
/// each exactly [`ENCODING_LEN`] values in `[0.0, 1.0]`. Anything produced by a
/// different patch size or normalization is rejected instead of being compared.
#[derive(Debug, Clone)]
pub struct ReferenceSet {
    encodings: Vec<Encoding>,
}

impl ReferenceSet {
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, ServiceError> {
        if rows.is_empty() {
            return Err(ServiceError::InvalidReferenceSet(
                "known encodings must be a non-empty array".into(),
            ));
        }

        let encodings = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                if row.len() != ENCODING_LEN {
                    return Err(ServiceError::DimensionMismatch {
                        index,
                        expected: ENCODING_LEN,
                        actual: row.len(),
                    });
                }
                Encoding::try_from_vec(row).map_err(|e| {
                    ServiceError::InvalidReferenceSet(format!("known encoding {index}: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { encodings })
    }

    /// Parse a JSON array of numeric arrays, e.g. `[[0.1, ...], [0.4, ...]]`.
    ///
    /// Takes raw bytes; input that is not UTF-8 is an invalid payload like any other.
    pub fn from_json(raw: impl AsRef<[u8]>) -> Result<Self, ServiceError> {
        let rows: Vec<Vec<f64>> = serde_json::from_slice(raw.as_ref())
            .map_err(|e| ServiceError::InvalidReferenceSet(format!("invalid JSON format: {e}")))?;
        Self::new(rows)
    }

    pub fn encodings(&self) -> &[Encoding] {
        &self.encodings
    }

    pub fn len(&self) -> usize {
        self.encodings.len()
    }

    /// Never true for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.encodings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_json(rows: &[f64]) -> String {
        let rows: Vec<Vec<f64>> = rows.iter().map(|&v| vec![v; ENCODING_LEN]).collect();
        serde_json::to_string(&rows).unwrap()
    }

    #[test]
    fn valid_set() {
        let set = ReferenceSet::from_json(&rows_json(&[0.0, 1.0, 0.25])).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.encodings()[2].values()[0], 0.25);
    }

    #[test]
    fn integers_are_accepted() {
        let raw = serde_json::to_string(&vec![vec![1u8; ENCODING_LEN]]).unwrap();
        let set = ReferenceSet::from_json(&raw).unwrap();
        assert_eq!(set.encodings()[0].values()[0], 1.0);
    }

    #[test]
    fn rejects_malformed_payloads() {
        for raw in ["", "not json", "{\"a\": 1}", "[1, 2, 3]", "[[\"x\"]]", "[[null]]", "42"] {
            let err = ReferenceSet::from_json(raw).unwrap_err();
            assert!(
                matches!(err, ServiceError::InvalidReferenceSet(_)),
                "{raw:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn rejects_non_utf8_payload() {
        for raw in [&b"\xff\xfe[[0.5]]"[..], &b"[[\"\xc3\x28\"]]"[..]] {
            let err = ReferenceSet::from_json(raw).unwrap_err();
            assert!(matches!(err, ServiceError::InvalidReferenceSet(_)), "{err:?}");
        }
    }

    #[test]
    fn rejects_empty_array() {
        let err = ReferenceSet::from_json("[]").unwrap_err();
        assert!(err.to_string().contains("non-empty array"));
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let mut rows = vec![vec![0.5; ENCODING_LEN]; 2];
        rows[1].pop();
        let err = ReferenceSet::new(rows).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::DimensionMismatch {
                index: 1,
                expected: ENCODING_LEN,
                actual
            } if actual == ENCODING_LEN - 1
        ));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut row = vec![0.5; ENCODING_LEN];
        row[10] = 255.0;
        let err = ReferenceSet::new(vec![row]).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidReferenceSet(_)));
        assert!(err.to_string().contains("index 10"));
    }
}
