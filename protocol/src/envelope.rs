use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The one shape every message takes on the wire. What the three payload
/// sequences mean depends entirely on `message_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Envelope {
    pub message_type: i64,
    #[serde(default)]
    pub string_data: Vec<String>,
    #[serde(default)]
    pub int_data: Vec<i64>,
    #[serde(default)]
    pub decimal_data: Vec<f64>,
}

impl Envelope {
    pub fn new(message_type: i64) -> Self {
        Self {
            message_type,
            string_data: Vec::new(),
            int_data: Vec::new(),
            decimal_data: Vec::new(),
        }
    }

    pub fn with_strings<I, S>(mut self, strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.string_data = strings.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ints<I: IntoIterator<Item = i64>>(mut self, ints: I) -> Self {
        self.int_data = ints.into_iter().collect();
        self
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("message type is missing or not an integer")]
    MissingType,
}

/// Inbound shape. The type tag is kept loose here so that a bad tag can be
/// told apart from bad JSON.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawEnvelope {
    #[serde(default)]
    message_type: Option<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    string_data: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    int_data: Vec<i64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    decimal_data: Vec<f64>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn decode(text: &str) -> Result<Envelope, DecodeError> {
    let raw: RawEnvelope = serde_json::from_str(text)?;
    let message_type = raw
        .message_type
        .as_ref()
        .and_then(integral)
        .ok_or(DecodeError::MissingType)?;
    Ok(Envelope {
        message_type,
        string_data: raw.string_data,
        int_data: raw.int_data,
        decimal_data: raw.decimal_data,
    })
}

/// Any JSON number with no fractional part, so `2.0` reads as `2`.
fn integral(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

pub fn encode(envelope: &Envelope) -> Result<String, serde_json::Error> {
    serde_json::to_string(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_fills_missing_sequences_with_empty() {
        let envelope = decode(r#"{"MessageType": 6}"#).expect("");
        assert_eq!(envelope, Envelope::new(6));
    }

    #[test]
    fn it_treats_null_sequences_as_empty() {
        let envelope =
            decode(r#"{"MessageType": 2, "StringData": null, "IntData": null}"#).expect("");
        assert!(envelope.string_data.is_empty());
        assert!(envelope.int_data.is_empty());
    }

    #[test]
    fn it_rejects_missing_or_non_integer_type() {
        for text in &[
            r#"{"StringData": ["a"]}"#,
            r#"{"MessageType": "two"}"#,
            r#"{"MessageType": 2.5}"#,
            r#"{"MessageType": null}"#,
        ] {
            assert!(
                matches!(decode(text), Err(DecodeError::MissingType)),
                "{} should be a missing type",
                text
            );
        }
    }

    #[test]
    fn it_accepts_integral_float_types() {
        assert_eq!(decode(r#"{"MessageType": 2.0}"#).expect("").message_type, 2);
        assert_eq!(decode(r#"{"MessageType": 212e0}"#).expect("").message_type, 212);
    }

    #[test]
    fn it_rejects_malformed_json() {
        for text in &["{", "not json", "[1, 2]", "5", r#"{"MessageType": 1, "IntData": ["x"]}"#] {
            assert!(
                matches!(decode(text), Err(DecodeError::Malformed(_))),
                "{} should be malformed",
                text
            );
        }
    }

    #[test]
    fn it_encodes_with_wire_field_names() {
        let envelope = Envelope::new(3).with_strings(vec!["ABCD2345"]);
        let value: Value = serde_json::from_str(&encode(&envelope).expect("")).expect("");
        assert_eq!(
            value,
            serde_json::json!({
                "MessageType": 3,
                "StringData": ["ABCD2345"],
                "IntData": [],
                "DecimalData": [],
            })
        );
    }
}
