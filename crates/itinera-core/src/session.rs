// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

//! One user's search workflow: itinerary in, leg tables out.
//!
//! Every search gets a ticket from a counter owned by the session. Results are
//! applied only if their ticket is still the latest, so an older search that
//! finishes late can never overwrite a newer one.

use crate::provider::{FlightSearchProvider, ProviderError};
use crate::reconcile::{IngestSummary, Reconciler, SelectionChange};
use crate::request::{BuildError, RequestBatch, RequestBuilder};
use crate::response::ReconcileError;
use itinera_codec::Itinerary;
use log::{error, info, warn};
use rayon::prelude::*;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Cannot build search: {0}")]
    Build(#[from] BuildError),
    #[error("Search failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("Cannot reconcile results: {0}")]
    Reconcile(#[from] ReconcileError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SearchTicket(u64);

impl SearchTicket {
    pub fn sequence(self) -> u64 {
        self.0
    }
}

/// Batches ready to be sent, tagged with the search they belong to.
#[derive(Debug, Clone)]
pub struct PendingSearch {
    pub ticket: SearchTicket,
    pub batches: Vec<RequestBatch>,
}

#[derive(Debug)]
pub struct CompletedSearch {
    pub ticket: SearchTicket,
    /// One response per batch, in batch order.
    pub result: Result<Vec<Value>, ProviderError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Applied(IngestSummary),
    /// A newer search was started; these results were dropped.
    Stale {
        ticket: SearchTicket,
        latest: SearchTicket,
    },
}

/// Sends every batch at once and waits for all of them. The first failure
/// fails the whole search.
pub fn execute(pending: PendingSearch, provider: &dyn FlightSearchProvider) -> CompletedSearch {
    info!(
        "Search #{}: issuing {} batch(es)",
        pending.ticket.0,
        pending.batches.len()
    );
    let result = pending
        .batches
        .par_iter()
        .map(|batch| provider.search(batch))
        .collect::<Result<Vec<_>, _>>();
    CompletedSearch {
        ticket: pending.ticket,
        result,
    }
}

pub struct SearchSession {
    itinerary: Itinerary,
    builder: RequestBuilder,
    reconciler: Reconciler,
    latest: SearchTicket,
}

impl SearchSession {
    pub fn new(itinerary: Itinerary, builder: RequestBuilder) -> Self {
        let reconciler = Reconciler::new(itinerary.len());
        Self {
            itinerary,
            builder,
            reconciler,
            latest: SearchTicket(0),
        }
    }

    pub fn itinerary(&self) -> &Itinerary {
        &self.itinerary
    }

    /// Replaces the itinerary. Existing results no longer apply and any search
    /// still in flight becomes stale.
    pub fn set_itinerary(&mut self, itinerary: Itinerary) {
        self.reconciler = Reconciler::new(itinerary.len());
        self.itinerary = itinerary;
        self.latest = SearchTicket(self.latest.0 + 1);
    }

    pub fn latest_ticket(&self) -> SearchTicket {
        self.latest
    }

    /// Starts a new search. Earlier tickets are stale from this point on, even
    /// if the build fails.
    pub fn prepare(&mut self) -> Result<PendingSearch, SearchError> {
        self.latest = SearchTicket(self.latest.0 + 1);
        let batches = self.builder.build(&self.itinerary)?;
        Ok(PendingSearch {
            ticket: self.latest,
            batches,
        })
    }

    pub fn apply(&mut self, completed: CompletedSearch) -> Result<SearchOutcome, SearchError> {
        if completed.ticket != self.latest {
            warn!(
                "Discarding results of search #{}; search #{} is newer",
                completed.ticket.0, self.latest.0
            );
            return Ok(SearchOutcome::Stale {
                ticket: completed.ticket,
                latest: self.latest,
            });
        }

        self.reconciler.clear();
        let responses = completed.result.map_err(|e| {
            error!("Search #{} failed, no results shown: {}", completed.ticket.0, e);
            e
        })?;
        let summary = self.reconciler.ingest(&responses)?;
        Ok(SearchOutcome::Applied(summary))
    }

    pub fn run(&mut self, provider: &dyn FlightSearchProvider) -> Result<SearchOutcome, SearchError> {
        let pending = self.prepare()?;
        let completed = execute(pending, provider);
        self.apply(completed)
    }

    pub fn select(&mut self, leg: usize, id: &str) -> Result<SelectionChange, SearchError> {
        Ok(self.reconciler.select(leg, id)?)
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn booking_ready(&self) -> bool {
        self.reconciler.booking_ready()
    }
}
