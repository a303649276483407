// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

//! The ordered per-leg filter schema.
//!
//! Share links address fields by position (see [`crate::keys`]), so this table is
//! append-only: new fields go at the end and bump [`REGISTRY_VERSION`]. Removing or
//! reordering an entry silently changes the meaning of every link already issued.

use crate::FieldError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Schema version. Increment whenever a field is appended.
pub const REGISTRY_VERSION: u32 = 1;

/// Airport or location codes. Commas join airports searched together,
/// pipes separate flexible alternatives expanded into parallel searches.
const LOCATION_PATTERN: &str =
    r"^[A-Za-z0-9:_-]+(?:,[A-Za-z0-9:_-]+)*(?:\|[A-Za-z0-9:_-]+(?:,[A-Za-z0-9:_-]+)*)*$";
const DATE_PATTERN: &str = r"^\d{4}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12]\d|3[01])$";
const CLOCK_PATTERN: &str = r"^(?:[01]\d|2[0-3]):[0-5]\d$";
const HOURS_PATTERN: &str = r"^(?:\d|[1-9]\d)$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Origin,
    Destination,
    DateFrom,
    DateTo,
    Cabin,
    MaxStops,
    MinLayover,
    MaxLayover,
    DepTimeFrom,
    DepTimeTo,
    ArrTimeFrom,
    ArrTimeTo,
    Airlines,
    ExcludeAirlines,
    AirportChange,
    MaxDuration,
    Via,
    Adults,
    HoldBags,
    HandBags,
}

/// A field value. Integers travel as text and are checked by the field's pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Flag(_) => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(b) => Some(*b),
            FieldValue::Text(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Flag(b)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Flag(b) => write!(f, "{}", b),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Text(&'static str),
    Flag(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    /// Text matching an anchored regex.
    Pattern(&'static str),
    /// Text drawn from a closed set.
    OneOf(&'static [&'static str]),
    /// Any boolean.
    Flag,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: Field,
    pub name: &'static str,
    pub default: FieldDefault,
    pub validator: Validator,
}

const fn text(
    field: Field,
    name: &'static str,
    default: &'static str,
    validator: Validator,
) -> FieldSpec {
    FieldSpec {
        field,
        name,
        default: FieldDefault::Text(default),
        validator,
    }
}

const fn flag(field: Field, name: &'static str, default: bool) -> FieldSpec {
    FieldSpec {
        field,
        name,
        default: FieldDefault::Flag(default),
        validator: Validator::Flag,
    }
}

/// Append-only. Entry `i` must describe `Field::ALL[i]`.
pub static FIELD_REGISTRY: [FieldSpec; 20] = [
    text(Field::Origin, "origin", "", Validator::Pattern(LOCATION_PATTERN)),
    text(Field::Destination, "destination", "", Validator::Pattern(LOCATION_PATTERN)),
    text(Field::DateFrom, "date_from", "", Validator::Pattern(DATE_PATTERN)),
    text(Field::DateTo, "date_to", "", Validator::Pattern(DATE_PATTERN)),
    text(Field::Cabin, "cabin", "M", Validator::OneOf(&["M", "W", "C", "F"])),
    text(Field::MaxStops, "max_stops", "", Validator::Pattern(r"^\d$")),
    text(Field::MinLayover, "min_layover", "", Validator::Pattern(HOURS_PATTERN)),
    text(Field::MaxLayover, "max_layover", "", Validator::Pattern(HOURS_PATTERN)),
    text(Field::DepTimeFrom, "dep_time_from", "", Validator::Pattern(CLOCK_PATTERN)),
    text(Field::DepTimeTo, "dep_time_to", "", Validator::Pattern(CLOCK_PATTERN)),
    text(Field::ArrTimeFrom, "arr_time_from", "", Validator::Pattern(CLOCK_PATTERN)),
    text(Field::ArrTimeTo, "arr_time_to", "", Validator::Pattern(CLOCK_PATTERN)),
    text(Field::Airlines, "airlines", "", Validator::Pattern(r"^[A-Z0-9]{2}(?:,[A-Z0-9]{2})*$")),
    flag(Field::ExcludeAirlines, "exclude_airlines", false),
    flag(Field::AirportChange, "airport_change", true),
    text(Field::MaxDuration, "max_duration", "", Validator::Pattern(r"^(?:[1-9]|[1-5]\d|60)$")),
    text(Field::Via, "via", "", Validator::Pattern(r"^[A-Z0-9]{3}(?:,[A-Z0-9]{3})*$")),
    text(Field::Adults, "adults", "1", Validator::Pattern(r"^[1-9]$")),
    text(Field::HoldBags, "hold_bags", "", Validator::Pattern(r"^[0-2]$")),
    text(Field::HandBags, "hand_bags", "", Validator::Pattern(r"^[01]$")),
];

fn compiled_patterns() -> &'static Vec<Option<Regex>> {
    static PATTERNS: OnceLock<Vec<Option<Regex>>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        FIELD_REGISTRY
            .iter()
            .map(|spec| match spec.validator {
                Validator::Pattern(p) => Some(Regex::new(p).unwrap()),
                _ => None,
            })
            .collect()
    })
}

impl Field {
    pub const ALL: [Field; 20] = [
        Field::Origin,
        Field::Destination,
        Field::DateFrom,
        Field::DateTo,
        Field::Cabin,
        Field::MaxStops,
        Field::MinLayover,
        Field::MaxLayover,
        Field::DepTimeFrom,
        Field::DepTimeTo,
        Field::ArrTimeFrom,
        Field::ArrTimeTo,
        Field::Airlines,
        Field::ExcludeAirlines,
        Field::AirportChange,
        Field::MaxDuration,
        Field::Via,
        Field::Adults,
        Field::HoldBags,
        Field::HandBags,
    ];

    /// Position in the registry, which is also the position of its short key.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn spec(self) -> &'static FieldSpec {
        &FIELD_REGISTRY[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Looks up a registered field by its wire name. Unknown names yield `None`;
    /// callers are expected to log and skip them.
    pub fn from_name(name: &str) -> Option<Field> {
        FIELD_REGISTRY
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.field)
    }

    pub fn default_value(self) -> FieldValue {
        match self.spec().default {
            FieldDefault::Text(s) => FieldValue::Text(s.to_string()),
            FieldDefault::Flag(b) => FieldValue::Flag(b),
        }
    }

    pub fn is_default(self, value: &FieldValue) -> bool {
        match (self.spec().default, value) {
            (FieldDefault::Text(d), FieldValue::Text(v)) => d == v,
            (FieldDefault::Flag(d), FieldValue::Flag(v)) => d == *v,
            _ => false,
        }
    }

    pub fn is_flag(self) -> bool {
        matches!(self.spec().validator, Validator::Flag)
    }

    /// Checks a value against the field's type and validator. The default value
    /// always passes.
    pub fn validate(self, value: &FieldValue) -> Result<(), FieldError> {
        if self.is_default(value) {
            return Ok(());
        }
        let spec = self.spec();
        match (spec.validator, value) {
            (Validator::Flag, FieldValue::Flag(_)) => Ok(()),
            (Validator::Flag, FieldValue::Text(_)) => Err(FieldError::WrongType {
                field: spec.name,
                expected: "boolean",
            }),
            (_, FieldValue::Flag(_)) => Err(FieldError::WrongType {
                field: spec.name,
                expected: "text",
            }),
            (Validator::OneOf(allowed), FieldValue::Text(v)) => {
                if allowed.contains(&v.as_str()) {
                    Ok(())
                } else {
                    Err(FieldError::Invalid {
                        field: spec.name,
                        value: v.clone(),
                    })
                }
            }
            (Validator::Pattern(_), FieldValue::Text(v)) => {
                let matches = compiled_patterns()[self.index()]
                    .as_ref()
                    .map(|re| re.is_match(v))
                    .unwrap_or(false);
                if matches {
                    Ok(())
                } else {
                    Err(FieldError::Invalid {
                        field: spec.name,
                        value: v.clone(),
                    })
                }
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_matches_enum_order() {
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(FIELD_REGISTRY[i].field, *field);
            assert_eq!(field.index(), i);
        }
    }

    #[test]
    fn test_serde_name_matches_registry_name() {
        for field in Field::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.name()));
        }
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(Field::from_name("origin"), Some(Field::Origin));
        assert_eq!(Field::from_name("seat_pitch"), None);
    }

    #[test]
    fn test_validators() {
        assert!(Field::Origin.validate(&"LHR|LGW".into()).is_ok());
        assert!(Field::Origin.validate(&"city:LON,airport:JFK".into()).is_ok());
        assert!(Field::Origin.validate(&"LHR||LGW".into()).is_err());
        assert!(Field::DateFrom.validate(&"2026-03-14".into()).is_ok());
        assert!(Field::DateFrom.validate(&"14/03/2026".into()).is_err());
        assert!(Field::Cabin.validate(&"C".into()).is_ok());
        assert!(Field::Cabin.validate(&"Z".into()).is_err());
        assert!(Field::DepTimeFrom.validate(&"23:59".into()).is_ok());
        assert!(Field::DepTimeFrom.validate(&"24:00".into()).is_err());
        assert!(Field::MaxDuration.validate(&"61".into()).is_err());
        assert!(Field::Adults.validate(&"0".into()).is_err());
    }

    #[test]
    fn test_type_mismatch() {
        assert_eq!(
            Field::AirportChange.validate(&"yes".into()),
            Err(FieldError::WrongType {
                field: "airport_change",
                expected: "boolean"
            })
        );
        assert!(Field::Origin.validate(&FieldValue::Flag(true)).is_err());
    }

    #[test]
    fn test_defaults_always_valid() {
        for field in Field::ALL {
            assert!(field.validate(&field.default_value()).is_ok(), "{}", field);
            assert!(field.is_default(&field.default_value()));
        }
    }
}
