//! Serde adapter for non-negative values that may be `+inf`.
//!
//! JSON has no infinity literal and `serde_json` writes non-finite floats as
//! `null`, which would erase the certainty sentinel. Fields using this adapter
//! serialise `+inf` as the string `"Infinity"` and accept either a number or
//! that string back.
//!
//! ```ignore
//! #[serde(with = "dpe_math::math::serde_unbounded")]
//! #[schemars(schema_with = "dpe_math::math::serde_unbounded::schema")]
//! pub lr_positive: f64,
//! ```

use serde::{de, Deserialize, Deserializer, Serializer};

/// Text form of `+inf` on the wire.
pub const INFINITY_LITERAL: &str = "Infinity";

pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_infinite() && value.is_sign_positive() {
        serializer.serialize_str(INFINITY_LITERAL)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Wire {
    Number(f64),
    Text(String),
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Wire::deserialize(deserializer)? {
        Wire::Number(n) => Ok(n),
        Wire::Text(s) => match s.trim() {
            "Infinity" | "infinity" | "inf" | "+inf" => Ok(f64::INFINITY),
            other => Err(de::Error::invalid_value(
                de::Unexpected::Str(other),
                &"a number or \"Infinity\"",
            )),
        },
    }
}

/// JSON Schema for an unbounded non-negative field.
pub fn schema(_generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "anyOf": [
            { "type": "number", "minimum": 0 },
            { "const": "Infinity" }
        ]
    })
}
