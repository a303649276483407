// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

pub mod codec;
pub mod keys;
pub mod link;
pub mod registry;

pub use codec::{decode, decode_checked, encode, DecodeError};
pub use keys::{generate_keys, KeySequence};
pub use link::{check_link_len, link, parse_link, share_link, LinkError, SharedItinerary, MAX_LINK_LEN};
pub use registry::{Field, FieldValue, FIELD_REGISTRY, REGISTRY_VERSION};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Unknown field '{0}'")]
    Unknown(String),
    #[error("Field '{field}' expects a {expected} value")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("Invalid value '{value}' for field '{field}'")]
    Invalid { field: &'static str, value: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItineraryError {
    #[error("An itinerary needs at least one leg")]
    Empty,
    #[error("No leg at index {0}")]
    NoSuchLeg(usize),
    #[error("Leg {leg}: {source}")]
    Field {
        leg: usize,
        #[source]
        source: FieldError,
    },
}

/// Filter criteria for one leg.
///
/// Only non-default values are stored, so two filters that differ only in
/// explicitly-set defaults compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, FieldValue>", into = "BTreeMap<String, FieldValue>")]
pub struct LegFilter {
    values: BTreeMap<Field, FieldValue>,
}

impl LegFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a filter from `(name, value)` pairs, dropping unknown names and
    /// invalid values with a warning.
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: AsRef<str>,
    {
        let mut filter = Self::new();
        for (name, value) in entries {
            let name = name.as_ref();
            match Field::from_name(name) {
                Some(field) => {
                    if let Err(e) = filter.set(field, value) {
                        log::warn!("Dropping field: {}", e);
                    }
                }
                None => log::warn!("Ignoring {}", FieldError::Unknown(name.to_string())),
            }
        }
        filter
    }

    /// Sets a field. Setting the registered default clears it.
    pub fn set(&mut self, field: Field, value: impl Into<FieldValue>) -> Result<(), FieldError> {
        let value = value.into();
        field.validate(&value)?;
        if field.is_default(&value) {
            self.values.remove(&field);
        } else {
            self.values.insert(field, value);
        }
        Ok(())
    }

    /// Copy-on-write variant of [`LegFilter::set`].
    pub fn with(&self, field: Field, value: impl Into<FieldValue>) -> Result<Self, FieldError> {
        let mut next = self.clone();
        next.set(field, value)?;
        Ok(next)
    }

    pub fn unset(&mut self, field: Field) {
        self.values.remove(&field);
    }

    /// The explicit value, if one is set.
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    /// The explicit value or the registered default.
    pub fn value(&self, field: Field) -> FieldValue {
        self.values
            .get(&field)
            .cloned()
            .unwrap_or_else(|| field.default_value())
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        self.values.get(&field).and_then(FieldValue::as_text)
    }

    pub fn flag(&self, field: Field) -> bool {
        self.value(field).as_flag().unwrap_or(false)
    }

    /// Explicit (non-default) entries in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.values.iter().map(|(f, v)| (*f, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<BTreeMap<String, FieldValue>> for LegFilter {
    fn from(map: BTreeMap<String, FieldValue>) -> Self {
        LegFilter::from_entries(map)
    }
}

impl From<LegFilter> for BTreeMap<String, FieldValue> {
    fn from(filter: LegFilter) -> Self {
        filter
            .values
            .into_iter()
            .map(|(f, v)| (f.name().to_string(), v))
            .collect()
    }
}

/// Ordered legs of a trip. Leg 0 flies first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Itinerary {
    legs: Vec<LegFilter>,
}

impl Itinerary {
    pub fn new(legs: Vec<LegFilter>) -> Result<Self, ItineraryError> {
        if legs.is_empty() {
            return Err(ItineraryError::Empty);
        }
        Ok(Self { legs })
    }

    /// An itinerary with no legs. Only produced by fail-soft decoding.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn legs(&self) -> &[LegFilter] {
        &self.legs
    }

    pub fn leg(&self, index: usize) -> Option<&LegFilter> {
        self.legs.get(index)
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn push(&mut self, leg: LegFilter) {
        self.legs.push(leg);
    }

    /// Copy-on-write edit of one leg's field.
    pub fn with_field(
        &self,
        leg: usize,
        field: Field,
        value: impl Into<FieldValue>,
    ) -> Result<Self, ItineraryError> {
        let mut next = self.clone();
        let filter = next
            .legs
            .get_mut(leg)
            .ok_or(ItineraryError::NoSuchLeg(leg))?;
        filter
            .set(field, value)
            .map_err(|source| ItineraryError::Field { leg, source })?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_default_clears() {
        let mut leg = LegFilter::new();
        leg.set(Field::Cabin, "C").unwrap();
        assert_eq!(leg.len(), 1);
        leg.set(Field::Cabin, "M").unwrap();
        assert!(leg.is_empty());
        assert_eq!(leg.value(Field::Cabin), FieldValue::Text("M".to_string()));
    }

    #[test]
    fn test_set_rejects_invalid() {
        let mut leg = LegFilter::new();
        assert!(leg.set(Field::Origin, "L H R").is_err());
        assert!(leg.is_empty());
    }

    #[test]
    fn test_from_entries_drops_bad_fields() {
        let leg = LegFilter::from_entries(vec![
            ("origin", FieldValue::from("LHR")),
            ("seat_pitch", FieldValue::from("32")),
            ("adults", FieldValue::from("many")),
            ("airport_change", FieldValue::from(false)),
        ]);
        assert_eq!(leg.len(), 2);
        assert_eq!(leg.text(Field::Origin), Some("LHR"));
        assert!(!leg.flag(Field::AirportChange));
    }

    #[test]
    fn test_json_uses_wire_names() {
        let mut leg = LegFilter::new();
        leg.set(Field::DateFrom, "2026-05-01").unwrap();
        leg.set(Field::ExcludeAirlines, true).unwrap();
        let json = serde_json::to_value(&leg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"date_from": "2026-05-01", "exclude_airlines": true})
        );
        let back: LegFilter = serde_json::from_value(json).unwrap();
        assert_eq!(back, leg);
    }

    #[test]
    fn test_itinerary_requires_a_leg() {
        assert_eq!(Itinerary::new(vec![]), Err(ItineraryError::Empty));
        assert!(Itinerary::empty().is_empty());
    }

    #[test]
    fn test_with_field_is_copy_on_write() {
        let it = Itinerary::new(vec![LegFilter::new()]).unwrap();
        let edited = it.with_field(0, Field::Origin, "PRG").unwrap();
        assert!(it.legs()[0].is_empty());
        assert_eq!(edited.legs()[0].text(Field::Origin), Some("PRG"));
    }
}
