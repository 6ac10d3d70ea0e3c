//! Outbound message as a JSON object.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::PayloadError;

/// One outbound message: string keys to JSON values.
///
/// Built per call from a typed payload, serialized, and dropped after
/// transmission.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Request {
    fields: Map<String, Value>,
}

impl Request {
    /// Build from a typed payload.
    ///
    /// # Errors
    ///
    /// - `PayloadError::NotAnObject` if `payload` does not serialize to a
    ///   JSON object
    pub fn from_payload<T: Serialize>(payload: &T) -> Result<Self, PayloadError> {
        match serde_json::to_value(payload)? {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(PayloadError::NotAnObject),
        }
    }

    /// Value of a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// True if the field is present.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Set a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Field names.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Compact JSON text.
    pub fn to_json(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }

    /// Compact JSON bytes, the plaintext handed to the cipher.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_json().into_bytes()
    }

    /// Compact JSON array of `requests`, the body of a bulk log request.
    pub fn batch_json(requests: &[Self]) -> String {
        let items = requests.iter().map(|request| Value::Object(request.fields.clone())).collect();
        Value::Array(items).to_string()
    }
}
