// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

//! Projects an [`Itinerary`] into provider request batches.
//!
//! `origin` and `destination` may hold pipe-separated alternatives
//! (`"PRG|VIE"`). Every list longer than one must have the same length `k`;
//! the builder then emits `k` batches, batch `a` taking the `a`-th alternative
//! from each list. Single values are reused by every batch.

use chrono::NaiveDate;
use itinera_codec::{Field, FieldValue, Itinerary, LegFilter};
use log::{debug, error};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Provider parameters for one leg.
pub type LegRequest = Map<String, Value>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Cannot search an itinerary with no legs")]
    EmptyItinerary,
    #[error("Leg {leg} has no {field}")]
    MissingAirport { leg: usize, field: Field },
    #[error("Leg {leg}: '{value}' is not a calendar date")]
    InvalidDate { leg: usize, value: String },
    #[error(
        "Inconsistent flexible-airport count: leg {first_leg} {first_field} lists {first_count} \
         alternatives but leg {leg} {field} lists {count}"
    )]
    InconsistentFlexCount {
        first_leg: usize,
        first_field: Field,
        first_count: usize,
        leg: usize,
        field: Field,
        count: usize,
    },
}

/// One provider call: a request per leg.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBatch {
    #[serde(skip)]
    pub index: usize,
    #[serde(skip)]
    pub currency: String,
    pub requests: Vec<LegRequest>,
}

#[derive(Debug, Clone)]
pub struct RequestBuilder {
    today: NaiveDate,
    currency: String,
}

const PROVIDER_DATE_FORMAT: &str = "%d/%m/%Y";

fn provider_name(field: Field) -> Option<&'static str> {
    Some(match field {
        Field::Cabin => "selected_cabins",
        Field::MaxStops => "max_stopovers",
        Field::MinLayover => "stopover_from",
        Field::MaxLayover => "stopover_to",
        Field::DepTimeFrom => "dtime_from",
        Field::DepTimeTo => "dtime_to",
        Field::ArrTimeFrom => "atime_from",
        Field::ArrTimeTo => "atime_to",
        Field::Airlines => "select_airlines",
        Field::ExcludeAirlines => "select_airlines_exclude",
        Field::AirportChange => "conn_on_diff_airport",
        Field::MaxDuration => "max_fly_duration",
        Field::Via => "select_stop_airport",
        Field::Adults => "adults",
        Field::HoldBags => "adult_hold_bag",
        Field::HandBags => "adult_hand_bag",
        // Handled separately since they are always sent.
        Field::Origin | Field::Destination | Field::DateFrom | Field::DateTo => return None,
    })
}

fn number(text: &str) -> Value {
    text.parse::<u64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(text.to_string()))
}

fn provider_value(field: Field, value: &FieldValue) -> Value {
    match (field, value) {
        (Field::AirportChange, FieldValue::Flag(b)) => Value::from(u8::from(*b)),
        (Field::MinLayover | Field::MaxLayover, FieldValue::Text(hours)) => {
            Value::String(format!("{}:00", hours))
        }
        (
            Field::MaxStops
            | Field::MaxDuration
            | Field::Adults
            | Field::HoldBags
            | Field::HandBags,
            FieldValue::Text(n),
        ) => number(n),
        (_, FieldValue::Flag(b)) => Value::Bool(*b),
        (_, FieldValue::Text(s)) => Value::String(s.clone()),
    }
}

fn alternatives(leg: &LegFilter, field: Field) -> Vec<&str> {
    leg.text(field)
        .map(|v| v.split('|').filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

/// Picks alternative `a`, clamped to the last one.
fn pick<'a>(alts: &[&'a str], a: usize) -> Option<&'a str> {
    alts.get(a.min(alts.len().saturating_sub(1))).copied()
}

impl RequestBuilder {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            currency: "EUR".to_string(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Number of parallel batches the itinerary needs.
    pub fn fan_out(&self, itinerary: &Itinerary) -> Result<usize, BuildError> {
        let mut width: Option<(usize, Field, usize)> = None;
        for (leg_idx, leg) in itinerary.legs().iter().enumerate() {
            for field in [Field::Origin, Field::Destination] {
                let count = alternatives(leg, field).len();
                if count <= 1 {
                    continue;
                }
                match width {
                    None => width = Some((leg_idx, field, count)),
                    Some((first_leg, first_field, first_count)) if first_count != count => {
                        return Err(BuildError::InconsistentFlexCount {
                            first_leg,
                            first_field,
                            first_count,
                            leg: leg_idx,
                            field,
                            count,
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(width.map(|(_, _, count)| count).unwrap_or(1))
    }

    /// Builds every batch, or none at all.
    pub fn build(&self, itinerary: &Itinerary) -> Result<Vec<RequestBatch>, BuildError> {
        if itinerary.is_empty() {
            return Err(BuildError::EmptyItinerary);
        }
        let width = self.fan_out(itinerary).map_err(|e| {
            error!("Configuration conflict, no requests issued: {}", e);
            e
        })?;

        let mut batches = Vec::with_capacity(width);
        for a in 0..width {
            let requests = itinerary
                .legs()
                .iter()
                .enumerate()
                .map(|(leg_idx, leg)| self.leg_request(leg_idx, leg, a))
                .collect::<Result<Vec<_>, _>>()?;
            batches.push(RequestBatch {
                index: a,
                currency: self.currency.clone(),
                requests,
            });
        }
        debug!(
            "Built {} request batch(es) for {} leg(s)",
            batches.len(),
            itinerary.len()
        );
        Ok(batches)
    }

    fn leg_request(&self, leg_idx: usize, leg: &LegFilter, a: usize) -> Result<LegRequest, BuildError> {
        let mut params = LegRequest::new();

        for field in [Field::Origin, Field::Destination] {
            let alts = alternatives(leg, field);
            let code = pick(&alts, a).ok_or(BuildError::MissingAirport { leg: leg_idx, field })?;
            let key = if field == Field::Origin { "fly_from" } else { "fly_to" };
            params.insert(key.to_string(), Value::String(code.to_string()));
        }

        let date_from = match leg.text(Field::DateFrom) {
            Some(d) => parse_date(leg_idx, d)?,
            None => self.today,
        };
        let date_to = match leg.text(Field::DateTo) {
            Some(d) => parse_date(leg_idx, d)?,
            None => date_from,
        };
        params.insert(
            "date_from".to_string(),
            Value::String(date_from.format(PROVIDER_DATE_FORMAT).to_string()),
        );
        params.insert(
            "date_to".to_string(),
            Value::String(date_to.format(PROVIDER_DATE_FORMAT).to_string()),
        );

        for (field, value) in leg.iter() {
            if let Some(name) = provider_name(field) {
                params.insert(name.to_string(), provider_value(field, value));
            }
        }
        Ok(params)
    }
}

fn parse_date(leg: usize, value: &str) -> Result<NaiveDate, BuildError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| BuildError::InvalidDate {
        leg,
        value: value.to_string(),
    })
}
