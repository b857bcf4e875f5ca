//! Hashing - SHA-256 Digests for Sources and Artifacts
//!
//! Composition is deterministic, so a digest of its inputs identifies the
//! artifact it will produce.

use sha2::{Sha256, Digest};
use serde::Serialize;
use serde_json::{Value, to_string};

use crate::label::LabelText;
use crate::region::CropRegion;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    let sorted = sort_value(&v);
    to_string(&sorted)
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_value(v)))
                .collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => {
            Value::Array(arr.iter().map(sort_value).collect())
        }
        _ => v.clone()
    }
}

#[derive(Serialize)]
struct RenderInputs<'a> {
    source_sha256: &'a str,
    crop: &'a CropRegion,
    label: &'a LabelText,
    output_size: u32,
}

/// Key identifying one composition.
/// render_key = sha256(canonical {source_sha256, crop, label, output_size})
pub fn compute_render_key(
    source_sha256: &str,
    crop: &CropRegion,
    label: &LabelText,
    output_size: u32,
) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(&RenderInputs {
        source_sha256,
        crop,
        label,
        output_size,
    })?;
    Ok(sha256_hex(canonical.as_bytes()))
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": 3});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_render_key_tracks_inputs() {
        let crop = CropRegion::new(0, 0, 10, 10).unwrap();
        let k1 = compute_render_key("abc", &crop, &LabelText::new("dev"), 256).unwrap();
        let k2 = compute_render_key("abc", &crop, &LabelText::new("dev"), 256).unwrap();
        let k3 = compute_render_key("abc", &crop, &LabelText::new("qa"), 256).unwrap();
        let k4 = compute_render_key("abc", &crop, &LabelText::new("dev"), 128).unwrap();
        assert_eq!(k1, k2);
        assert_ne!(k1, k3);
        assert_ne!(k1, k4);
    }
}
