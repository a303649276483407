// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use crate::keys::generate_keys;
use crate::{Field, FieldValue, Itinerary, LegFilter};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Not URL-safe base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected an array of legs")]
    NotAnArray,
    #[error("Leg {0} is not an object")]
    LegNotObject(usize),
}

/// Short key for each registry position.
fn short_keys() -> &'static [String] {
    static KEYS: OnceLock<Vec<String>> = OnceLock::new();
    KEYS.get_or_init(|| generate_keys(Field::ALL.len()))
}

fn field_for_key(key: &str) -> Option<Field> {
    static LOOKUP: OnceLock<HashMap<String, Field>> = OnceLock::new();
    LOOKUP
        .get_or_init(|| {
            short_keys()
                .iter()
                .cloned()
                .zip(Field::ALL.iter().copied())
                .collect()
        })
        .get(key)
        .copied()
}

fn to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Flag(b) => Value::Bool(*b),
        FieldValue::Text(s) => Value::String(s.clone()),
    }
}

/// Serializes an itinerary into a URL-safe token.
///
/// Defaulted fields are omitted and field names are replaced by their short
/// keys; the compact JSON is then base64url-encoded without padding, so the
/// output only contains `[A-Za-z0-9_-]`.
pub fn encode(itinerary: &Itinerary) -> String {
    let keys = short_keys();
    let legs: Vec<Value> = itinerary
        .legs()
        .iter()
        .map(|leg| {
            let obj: Map<String, Value> = leg
                .iter()
                .filter(|(field, value)| !field.is_default(value))
                .map(|(field, value)| (keys[field.index()].clone(), to_json(value)))
                .collect();
            Value::Object(obj)
        })
        .collect();
    let json = Value::Array(legs).to_string();
    URL_SAFE_NO_PAD.encode(json.as_bytes())
}

/// Decodes a token produced by [`encode`].
///
/// Never fails: a malformed token yields an empty itinerary and a warning, and
/// a single bad field is dropped without affecting the rest of the leg.
pub fn decode(encoded: &str) -> Itinerary {
    match decode_checked(encoded) {
        Ok(itinerary) => itinerary,
        Err(e) => {
            warn!("Discarding malformed itinerary token: {}", e);
            Itinerary::empty()
        }
    }
}

/// Like [`decode`], but reports structural failures instead of swallowing them.
/// Field-level problems are still dropped with a warning.
pub fn decode_checked(encoded: &str) -> Result<Itinerary, DecodeError> {
    let bytes = URL_SAFE_NO_PAD.decode(encoded.trim().trim_end_matches('='))?;
    let root: Value = serde_json::from_slice(&bytes)?;
    let Value::Array(items) = root else {
        return Err(DecodeError::NotAnArray);
    };

    let mut itinerary = Itinerary::empty();
    for (idx, item) in items.into_iter().enumerate() {
        let Value::Object(obj) = item else {
            return Err(DecodeError::LegNotObject(idx));
        };
        itinerary.push(decode_leg(idx, obj));
    }
    debug!("Decoded itinerary with {} leg(s)", itinerary.len());
    Ok(itinerary)
}

fn decode_leg(idx: usize, obj: Map<String, Value>) -> LegFilter {
    let mut leg = LegFilter::new();
    for (key, raw) in obj {
        let Some(field) = field_for_key(&key) else {
            warn!("Leg {}: ignoring unknown key '{}'", idx, key);
            continue;
        };
        let value = match raw {
            Value::Bool(b) => FieldValue::Flag(b),
            Value::String(s) => FieldValue::Text(s),
            other => {
                warn!("Leg {}: dropping {} with unsupported value {}", idx, field, other);
                continue;
            }
        };
        if let Err(e) = leg.set(field, value) {
            warn!("Leg {}: dropping field: {}", idx, e);
        }
    }
    leg
}
