//! Canonical JSON encoding for persisted blobs.
//!
//! Values are serialized through [`serde_json::Value`], whose object map is
//! ordered, so every object's keys come out sorted regardless of struct
//! field order. Output is pretty-printed.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::SurveyResult;

/// Encode `value` as pretty JSON with sorted object keys.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> SurveyResult<Vec<u8>> {
    let tree = serde_json::to_value(value)?;
    let mut bytes = serde_json::to_vec_pretty(&tree)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decode a blob produced by [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> SurveyResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Unsorted {
        zeta: u32,
        alpha: String,
        mid: Option<f64>,
    }

    #[test]
    fn keys_are_sorted() {
        let value = Unsorted {
            zeta: 1,
            alpha: "a".into(),
            mid: Some(0.5),
        };
        let text = String::from_utf8(encode(&value).unwrap()).unwrap();
        let alpha = text.find("\"alpha\"").unwrap();
        let mid = text.find("\"mid\"").unwrap();
        let zeta = text.find("\"zeta\"").unwrap();
        assert!(alpha < mid && mid < zeta, "{text}");
        assert_eq!(decode::<Unsorted>(text.as_bytes()).unwrap(), value);
    }

    #[test]
    fn bad_json_is_codec_error() {
        let err = decode::<Unsorted>(b"{ not json").unwrap_err();
        assert!(matches!(err, crate::error::SurveyError::Codec(_)));
    }
}
