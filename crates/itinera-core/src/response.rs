// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

//! Provider response schema and shape detection.
//!
//! A response is either *flat* (each element is a complete one-leg itinerary,
//! or the whole response is one list per leg) or *grouped* (each element is a
//! multi-leg itinerary whose `route` holds one sub-itinerary per leg). Only the
//! fields the reconciliation engine needs are read; everything else is ignored.

use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Unrecognised response shape: {0}")]
    ShapeMismatch(String),
    #[error("Malformed itinerary in response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("No leg {0}")]
    NoSuchLeg(usize),
    #[error("Leg {leg} has no candidate '{id}'")]
    UnknownCandidate { leg: usize, id: String },
}

/// Accepts strings, numbers and null; the provider is not consistent about
/// which one it sends for codes and flight numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = lenient_string(deserializer)?;
    Ok(if s.is_empty() { None } else { Some(s) })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "flyFrom", default)]
    pub fly_from: String,
    #[serde(rename = "flyTo", default)]
    pub fly_to: String,
    #[serde(default)]
    pub airline: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub flight_no: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub operating_carrier: Option<String>,
    /// Local departure, epoch seconds.
    #[serde(rename = "dTime", default)]
    pub departure: i64,
    #[serde(rename = "aTime", default)]
    pub arrival: i64,
    #[serde(rename = "dTimeUTC", default)]
    pub departure_utc: i64,
    #[serde(rename = "aTimeUTC", default)]
    pub arrival_utc: i64,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub equipment: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fare_basis: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fare_classes: String,
    #[serde(default)]
    pub bags_recheck_required: bool,
}

impl Segment {
    /// Carrier actually flying the segment.
    pub fn operating(&self) -> &str {
        self.operating_carrier.as_deref().unwrap_or(&self.airline)
    }

    pub fn designator(&self) -> String {
        format!("{}{}", self.airline, self.flight_no)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaggageLimits {
    #[serde(default)]
    pub hand_width: Option<u32>,
    #[serde(default)]
    pub hand_height: Option<u32>,
    #[serde(default)]
    pub hand_length: Option<u32>,
    #[serde(default)]
    pub hand_weight: Option<u32>,
    #[serde(default)]
    pub hold_weight: Option<u32>,
    #[serde(default)]
    pub hold_dimensions_sum: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingWarnings {
    /// Connection not protected by a single ticket.
    pub self_connection: bool,
    pub airport_change: bool,
    pub throwaway_ticketing: bool,
    pub hidden_city: bool,
}

impl RoutingWarnings {
    fn merge(self, other: RoutingWarnings) -> RoutingWarnings {
        RoutingWarnings {
            self_connection: self.self_connection || other.self_connection,
            airport_change: self.airport_change || other.airport_change,
            throwaway_ticketing: self.throwaway_ticketing || other.throwaway_ticketing,
            hidden_city: self.hidden_city || other.hidden_city,
        }
    }

    pub fn any(&self) -> bool {
        self.self_connection || self.airport_change || self.throwaway_ticketing || self.hidden_city
    }
}

/// One row of a leg table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: String,
    /// The provider itinerary this leg option was taken from.
    pub itinerary_id: String,
    pub segments: Vec<Segment>,
    pub baggage: BaggageLimits,
    /// Itinerary-level price; a leg on its own has no price.
    pub price: f64,
    pub stops: usize,
    pub warnings: RoutingWarnings,
}

/// A provider itinerary as read off the wire. `route` is either segments
/// (one-leg) or per-leg sub-itineraries (grouped).
#[derive(Debug, Clone, Default, Deserialize)]
struct RawItinerary {
    #[serde(default, deserialize_with = "lenient_string")]
    id: String,
    #[serde(default)]
    price: f64,
    #[serde(default)]
    route: Vec<Value>,
    #[serde(default)]
    baglimit: BaggageLimits,
    #[serde(default)]
    has_airport_change: bool,
    #[serde(default)]
    virtual_interlining: bool,
    #[serde(default)]
    throw_away_ticketing: bool,
    #[serde(default)]
    hidden_city_ticketing: bool,
}

impl RawItinerary {
    fn warnings(&self) -> RoutingWarnings {
        RoutingWarnings {
            self_connection: self.virtual_interlining,
            airport_change: self.has_airport_change,
            throwaway_ticketing: self.throw_away_ticketing,
            hidden_city: self.hidden_city_ticketing,
        }
    }

    fn segments(&self) -> Result<Vec<Segment>, serde_json::Error> {
        self.route
            .iter()
            .map(|v| Segment::deserialize(v))
            .collect()
    }
}

/// A reconciled provider itinerary: one optional candidate per leg.
///
/// Grouped responses fill every slot. Per-leg flat lists fill a single slot,
/// and those candidates are priced and booked independently.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedItinerary {
    pub id: String,
    pub price: f64,
    pub slots: Vec<Option<Candidate>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Zero results.
    Empty,
    /// One-leg itineraries for a one-leg search.
    Flat,
    /// One list of one-leg itineraries per leg.
    FlatPerLeg,
    /// Multi-leg itineraries with one route entry per leg.
    Grouped,
}

/// Unwraps an optional `{"data": [...]}` envelope and returns the items with
/// any explicit `format` tag.
fn envelope(value: &Value) -> Result<(&[Value], Option<&str>), ReconcileError> {
    match value {
        Value::Array(items) => Ok((items, None)),
        Value::Object(obj) => {
            let items = obj.get("data").and_then(Value::as_array).ok_or_else(|| {
                ReconcileError::ShapeMismatch("object without a 'data' array".to_string())
            })?;
            Ok((items, obj.get("format").and_then(Value::as_str)))
        }
        Value::Null => Ok((&[], None)),
        other => Err(ReconcileError::ShapeMismatch(format!(
            "expected an array, found {}",
            other
        ))),
    }
}

/// A route entry that is itself an itinerary (has its own `route`).
fn is_sub_itinerary(entry: &Value) -> bool {
    entry.get("route").map(Value::is_array).unwrap_or(false)
}

impl ResponseShape {
    /// Decides how to read a response for a search of `leg_count` legs.
    ///
    /// An explicit `"format": "flat" | "grouped"` tag wins. Otherwise the
    /// decision is structural: arrays of arrays are per-leg lists; elements
    /// whose route entries carry their own route, or whose route has one entry
    /// per leg of a multi-leg search, are grouped; anything else is flat.
    pub fn detect(value: &Value, leg_count: usize) -> Result<ResponseShape, ReconcileError> {
        let (items, tag) = envelope(value)?;
        if items.is_empty() {
            return Ok(ResponseShape::Empty);
        }
        let all_lists = items.iter().all(Value::is_array);

        let shape = match tag {
            Some("grouped") => ResponseShape::Grouped,
            Some("flat") if all_lists => ResponseShape::FlatPerLeg,
            Some("flat") => ResponseShape::Flat,
            Some(other) => {
                return Err(ReconcileError::ShapeMismatch(format!(
                    "unknown format tag '{}'",
                    other
                )))
            }
            None if all_lists => ResponseShape::FlatPerLeg,
            None => {
                let grouped = items[0]
                    .get("route")
                    .and_then(Value::as_array)
                    .map(|route| {
                        let nested = !route.is_empty() && route.iter().all(is_sub_itinerary);
                        nested || (leg_count > 1 && route.len() == leg_count)
                    })
                    .unwrap_or(false);
                if grouped {
                    ResponseShape::Grouped
                } else {
                    ResponseShape::Flat
                }
            }
        };

        match shape {
            ResponseShape::Flat if leg_count != 1 => Err(ReconcileError::ShapeMismatch(format!(
                "flat one-leg itineraries for a {}-leg search",
                leg_count
            ))),
            ResponseShape::FlatPerLeg if items.len() != leg_count => {
                Err(ReconcileError::ShapeMismatch(format!(
                    "{} per-leg lists for a {}-leg search",
                    items.len(),
                    leg_count
                )))
            }
            _ => Ok(shape),
        }
    }
}

fn flat_candidate(raw: &RawItinerary) -> Result<Candidate, serde_json::Error> {
    let segments = raw.segments()?;
    Ok(Candidate {
        id: raw.id.clone(),
        itinerary_id: raw.id.clone(),
        stops: segments.len().saturating_sub(1),
        segments,
        baggage: raw.baglimit.clone(),
        price: raw.price,
        warnings: raw.warnings(),
    })
}

/// A route entry is either a sub-itinerary with its own segments or a single
/// segment flown on that leg.
fn grouped_candidate(
    outer: &RawItinerary,
    leg: usize,
    entry: &Value,
) -> Result<Candidate, serde_json::Error> {
    if !is_sub_itinerary(entry) {
        let segment = Segment::deserialize(entry)?;
        let id = if segment.id.is_empty() {
            format!("{}#{}", outer.id, leg)
        } else {
            segment.id.clone()
        };
        return Ok(Candidate {
            id,
            itinerary_id: outer.id.clone(),
            segments: vec![segment],
            baggage: outer.baglimit.clone(),
            price: outer.price,
            stops: 0,
            warnings: outer.warnings(),
        });
    }
    let sub = RawItinerary::deserialize(entry)?;
    let segments = sub.segments()?;
    let id = if !sub.id.is_empty() {
        sub.id.clone()
    } else if !segments.is_empty() {
        segments
            .iter()
            .map(|s| s.id.as_str())
            .collect::<Vec<_>>()
            .join("|")
    } else {
        format!("{}#{}", outer.id, leg)
    };
    Ok(Candidate {
        id,
        itinerary_id: outer.id.clone(),
        stops: segments.len().saturating_sub(1),
        segments,
        baggage: outer.baglimit.clone(),
        price: outer.price,
        warnings: outer.warnings().merge(sub.warnings()),
    })
}

/// Parses one provider response into itineraries with `leg_count` slots each.
pub fn parse_response(
    value: &Value,
    leg_count: usize,
) -> Result<Vec<ParsedItinerary>, ReconcileError> {
    let shape = ResponseShape::detect(value, leg_count)?;
    let (items, _) = envelope(value)?;
    debug!(
        "Response shape {:?} with {} element(s) for {} leg(s)",
        shape,
        items.len(),
        leg_count
    );

    let mut parsed = Vec::new();
    match shape {
        ResponseShape::Empty => {}
        ResponseShape::Flat => {
            for item in items {
                let raw = RawItinerary::deserialize(item)?;
                let candidate = flat_candidate(&raw)?;
                parsed.push(ParsedItinerary {
                    id: raw.id,
                    price: raw.price,
                    slots: vec![Some(candidate)],
                });
            }
        }
        ResponseShape::FlatPerLeg => {
            for (leg, list) in items.iter().enumerate() {
                let list = list.as_array().ok_or_else(|| {
                    ReconcileError::ShapeMismatch(format!("leg {} list is not an array", leg))
                })?;
                for item in list {
                    let raw = RawItinerary::deserialize(item)?;
                    let mut slots = vec![None; leg_count];
                    slots[leg] = Some(flat_candidate(&raw)?);
                    parsed.push(ParsedItinerary {
                        id: raw.id,
                        price: raw.price,
                        slots,
                    });
                }
            }
        }
        ResponseShape::Grouped => {
            for item in items {
                let raw = RawItinerary::deserialize(item)?;
                if raw.route.len() != leg_count {
                    return Err(ReconcileError::ShapeMismatch(format!(
                        "itinerary '{}' has {} route entries for a {}-leg search",
                        raw.id,
                        raw.route.len(),
                        leg_count
                    )));
                }
                let slots = raw
                    .route
                    .iter()
                    .enumerate()
                    .map(|(leg, entry)| grouped_candidate(&raw, leg, entry).map(Some))
                    .collect::<Result<Vec<_>, _>>()?;
                parsed.push(ParsedItinerary {
                    id: raw.id,
                    price: raw.price,
                    slots,
                });
            }
        }
    }
    Ok(parsed)
}
