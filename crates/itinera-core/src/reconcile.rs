// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

//! Per-leg candidate tables and pinned selections.
//!
//! A [`Reconciler`] belongs to one search session. Ingested itineraries are
//! cached so that pinning or unpinning a candidate can rebuild every table from
//! the same data. An itinerary contributes to leg `i` only when its slots on
//! every other leg agree with the pins there, so a table never offers an option
//! that cannot be booked with the flights already chosen. A pinned leg keeps its
//! alternatives and the pin can be moved to any of them directly.

use crate::response::{parse_response, Candidate, ParsedItinerary, ReconcileError};
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TableState {
    Empty,
    Populated,
    Selected,
}

#[derive(Debug, Clone, Default)]
pub struct LegTable {
    rows: Vec<Candidate>,
    /// Candidate ids admitted during the current pass.
    seen: HashSet<String>,
    selection: Option<String>,
}

impl LegTable {
    pub fn state(&self) -> TableState {
        if self.selection.is_some() {
            TableState::Selected
        } else if self.rows.is_empty() {
            TableState::Empty
        } else {
            TableState::Populated
        }
    }

    pub fn rows(&self) -> &[Candidate] {
        &self.rows
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    fn admit(&mut self, candidate: &Candidate) -> bool {
        if self.seen.insert(candidate.id.clone()) {
            self.rows.push(candidate.clone());
            true
        } else {
            false
        }
    }

    fn reset_rows(&mut self) {
        self.rows.clear();
        self.seen.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct IngestSummary {
    /// Itineraries parsed from the responses.
    pub itineraries: usize,
    /// Itineraries that contributed to at least one leg table.
    pub admitted: usize,
    /// New rows across all leg tables.
    pub rows_added: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionChange {
    Pinned { leg: usize, id: String },
    Unpinned { leg: usize, id: String },
}

/// The fully pinned trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChosenItinerary {
    pub itinerary_id: String,
    pub price: f64,
    pub legs: Vec<Candidate>,
}

/// Identifies a cached itinerary: its id plus the candidate on each slot.
type CacheKey = (String, Vec<Option<String>>);

fn cache_key(itinerary: &ParsedItinerary) -> CacheKey {
    (
        itinerary.id.clone(),
        itinerary
            .slots
            .iter()
            .map(|slot| slot.as_ref().map(|c| c.id.clone()))
            .collect(),
    )
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    tables: Vec<LegTable>,
    cache: Vec<ParsedItinerary>,
    cached: HashSet<CacheKey>,
}

fn by_price(a: &ParsedItinerary, b: &ParsedItinerary) -> std::cmp::Ordering {
    a.price.total_cmp(&b.price)
}

impl Reconciler {
    pub fn new(leg_count: usize) -> Self {
        Self {
            tables: vec![LegTable::default(); leg_count],
            cache: Vec::new(),
            cached: HashSet::new(),
        }
    }

    pub fn leg_count(&self) -> usize {
        self.tables.len()
    }

    pub fn tables(&self) -> &[LegTable] {
        &self.tables
    }

    pub fn table(&self, leg: usize) -> Option<&LegTable> {
        self.tables.get(leg)
    }

    pub fn selections(&self) -> Vec<Option<&str>> {
        self.tables.iter().map(LegTable::selection).collect()
    }

    /// Drops all rows, pins and cached results.
    pub fn clear(&mut self) {
        for table in &mut self.tables {
            table.reset_rows();
            table.selection = None;
        }
        self.cache.clear();
        self.cached.clear();
    }

    /// Adds provider responses to the tables.
    ///
    /// Every response must parse before anything changes. Rows already present
    /// on a leg are not added again until [`Reconciler::clear`].
    pub fn ingest(&mut self, responses: &[Value]) -> Result<IngestSummary, ReconcileError> {
        let mut incoming = Vec::new();
        for response in responses {
            incoming.extend(parse_response(response, self.leg_count())?);
        }
        incoming.sort_by(by_price);

        let mut summary = self.admit_all(&incoming);
        summary.itineraries = incoming.len();

        for itinerary in incoming {
            if self.cached.insert(cache_key(&itinerary)) {
                self.cache.push(itinerary);
            }
        }
        self.cache.sort_by(by_price);
        self.sort_rows();

        info!(
            "Ingested {} itinerar(ies): {} admitted, {} new row(s)",
            summary.itineraries, summary.admitted, summary.rows_added
        );
        Ok(summary)
    }

    /// Pins `id` on `leg`, or unpins it if it is already pinned, then rebuilds
    /// every table from the cached results.
    pub fn select(&mut self, leg: usize, id: &str) -> Result<SelectionChange, ReconcileError> {
        let table = self
            .tables
            .get_mut(leg)
            .ok_or(ReconcileError::NoSuchLeg(leg))?;

        let change = if table.selection.as_deref() == Some(id) {
            table.selection = None;
            SelectionChange::Unpinned {
                leg,
                id: id.to_string(),
            }
        } else {
            if !table.contains(id) {
                return Err(ReconcileError::UnknownCandidate {
                    leg,
                    id: id.to_string(),
                });
            }
            table.selection = Some(id.to_string());
            SelectionChange::Pinned {
                leg,
                id: id.to_string(),
            }
        };

        debug!("{:?}", change);
        self.rebuild();
        Ok(change)
    }

    /// True once every leg has a pinned candidate.
    pub fn booking_ready(&self) -> bool {
        !self.tables.is_empty() && self.tables.iter().all(|t| t.selection.is_some())
    }

    /// The cheapest cached itinerary matching every pin, once booking is ready.
    ///
    /// For per-leg lists each leg is priced on its own, so the legs are
    /// assembled from separate itineraries and the prices summed.
    pub fn chosen(&self) -> Option<ChosenItinerary> {
        if !self.booking_ready() {
            return None;
        }
        if let Some(whole) = self
            .cache
            .iter()
            .find(|it| it.slots.iter().all(Option::is_some) && self.consistent(it))
        {
            return Some(ChosenItinerary {
                itinerary_id: whole.id.clone(),
                price: whole.price,
                legs: whole.slots.iter().flatten().cloned().collect(),
            });
        }

        let mut legs = Vec::with_capacity(self.leg_count());
        for table in &self.tables {
            let pin = table.selection.as_deref()?;
            legs.push(table.rows.iter().find(|c| c.id == pin)?.clone());
        }
        Some(ChosenItinerary {
            itinerary_id: legs
                .iter()
                .map(|c| c.itinerary_id.as_str())
                .collect::<Vec<_>>()
                .join("+"),
            price: legs.iter().map(|c| c.price).sum(),
            legs,
        })
    }

    /// Every slot that has a candidate must match the pin on its leg.
    fn consistent(&self, itinerary: &ParsedItinerary) -> bool {
        self.consistent_except(itinerary, None)
    }

    /// Like [`Reconciler::consistent`], ignoring the pin on `skip`.
    fn consistent_except(&self, itinerary: &ParsedItinerary, skip: Option<usize>) -> bool {
        self.tables
            .iter()
            .zip(itinerary.slots.iter())
            .enumerate()
            .filter(|(leg, _)| Some(*leg) != skip)
            .all(|(_, (table, slot))| match (&table.selection, slot) {
                (Some(pin), Some(candidate)) => candidate.id == *pin,
                _ => true,
            })
    }

    fn admit_all(&mut self, itineraries: &[ParsedItinerary]) -> IngestSummary {
        let mut summary = IngestSummary::default();
        for itinerary in itineraries {
            let open: Vec<bool> = (0..self.leg_count())
                .map(|leg| self.consistent_except(itinerary, Some(leg)))
                .collect();
            let mut contributed = false;
            for (leg, (table, slot)) in self
                .tables
                .iter_mut()
                .zip(itinerary.slots.iter())
                .enumerate()
            {
                let Some(candidate) = slot else { continue };
                if !open[leg] {
                    continue;
                }
                contributed = true;
                if table.admit(candidate) {
                    summary.rows_added += 1;
                }
            }
            if contributed {
                summary.admitted += 1;
            }
        }
        summary
    }

    fn sort_rows(&mut self) {
        for table in &mut self.tables {
            table.rows.sort_by(|a, b| a.price.total_cmp(&b.price));
        }
    }

    /// A fresh pass over the cache under the current pins.
    fn rebuild(&mut self) {
        for table in &mut self.tables {
            table.reset_rows();
        }
        let cache = std::mem::take(&mut self.cache);
        self.admit_all(&cache);
        self.cache = cache;
        self.sort_rows();
    }
}
