//! Serde helpers for value arrays with a NaN no-data sentinel.
//!
//! JSON has no NaN, so no-data values travel as `null`.

use serde::de::Deserializer;
use serde::ser::{SerializeSeq, Serializer};
use serde::Deserialize;

/// `#[serde(with = "crate::nodata::nullable")]` for `Vec<f32>`.
pub mod nullable {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[f32], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for v in values {
            if v.is_finite() {
                seq.serialize_element(&Some(*v))?;
            } else {
                seq.serialize_element(&None::<f32>)?;
            }
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f32>, D::Error> {
        let raw: Vec<Option<f32>> = Vec::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect())
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super::nullable")]
        values: Vec<f32>,
    }

    #[test]
    fn test_nan_serializes_as_null() {
        let w = Wrapper {
            values: vec![1.5, f32::NAN, -3.0],
        };
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, r#"{"values":[1.5,null,-3.0]}"#);
    }

    #[test]
    fn test_null_deserializes_as_nan() {
        let w: Wrapper = serde_json::from_str(r#"{"values":[null, 2]}"#).unwrap();
        assert!(w.values[0].is_nan());
        assert_eq!(w.values[1], 2.0);
    }
}
