// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use chrono::NaiveDate;
use itinera_core::codec::{Field, Itinerary, LegFilter};
use itinera_core::provider::{FlightSearchProvider, ProviderError, RecordedProvider};
use itinera_core::request::{RequestBatch, RequestBuilder};
use itinera_core::session::{execute, SearchError, SearchOutcome, SearchSession};
use serde_json::{json, Value};

fn session(origin: &str) -> SearchSession {
    let mut leg = LegFilter::new();
    leg.set(Field::Origin, origin).unwrap();
    leg.set(Field::Destination, "LHR").unwrap();
    SearchSession::new(
        Itinerary::new(vec![leg]).unwrap(),
        RequestBuilder::new(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()),
    )
}

fn response(id: &str, price: f64) -> Value {
    json!([{"id": id, "price": price, "route": [{"id": format!("{}-1", id), "flyFrom": "PRG", "flyTo": "LHR"}]}])
}

fn row_ids(s: &SearchSession) -> Vec<String> {
    s.reconciler()
        .table(0)
        .unwrap()
        .rows()
        .iter()
        .map(|c| c.id.clone())
        .collect()
}

/// Fails one batch and answers the rest.
struct FailingProvider {
    fail_batch: usize,
}

impl FlightSearchProvider for FailingProvider {
    fn search(&self, batch: &RequestBatch) -> Result<Value, ProviderError> {
        if batch.index == self.fail_batch {
            Err(ProviderError::Batch {
                batch: batch.index,
                message: "503 Service Unavailable".to_string(),
            })
        } else {
            Ok(response(&format!("ok{}", batch.index), 10.0))
        }
    }
}

#[test]
fn test_late_older_search_is_discarded() {
    let mut s = session("PRG");
    let first = s.prepare().unwrap();
    let second = s.prepare().unwrap();

    let newer = execute(second, &RecordedProvider::new(vec![response("new", 50.0)]));
    let older = execute(first, &RecordedProvider::new(vec![response("old", 10.0)]));

    assert!(matches!(s.apply(newer).unwrap(), SearchOutcome::Applied(_)));
    let outcome = s.apply(older).unwrap();
    assert!(matches!(outcome, SearchOutcome::Stale { ticket, latest } if ticket < latest));
    assert_eq!(row_ids(&s), vec!["new"]);
}

#[test]
fn test_early_older_search_is_discarded() {
    let mut s = session("PRG");
    let first = s.prepare().unwrap();
    let second = s.prepare().unwrap();

    let older = execute(first, &RecordedProvider::new(vec![response("old", 10.0)]));
    assert!(matches!(s.apply(older).unwrap(), SearchOutcome::Stale { .. }));
    assert!(row_ids(&s).is_empty());

    let newer = execute(second, &RecordedProvider::new(vec![response("new", 50.0)]));
    s.apply(newer).unwrap();
    assert_eq!(row_ids(&s), vec!["new"]);
}

#[test]
fn test_one_failed_batch_fails_search() {
    let mut s = session("PRG|VIE|BRQ");
    s.run(&RecordedProvider::new(vec![response("earlier", 70.0)]))
        .unwrap();
    assert_eq!(row_ids(&s), vec!["earlier"]);

    let result = s.run(&FailingProvider { fail_batch: 1 });
    assert!(matches!(
        result,
        Err(SearchError::Provider(ProviderError::Batch { batch: 1, .. }))
    ));
    // Neither the old rows nor the batches that did succeed are shown.
    assert!(row_ids(&s).is_empty());
    assert!(!s.booking_ready());
}

#[test]
fn test_all_batches_reconciled_together() {
    let mut s = session("PRG|VIE");
    let provider = RecordedProvider::new(vec![response("a", 90.0), response("b", 40.0)]);
    s.run(&provider).unwrap();
    assert_eq!(row_ids(&s), vec!["b", "a"]);
}
