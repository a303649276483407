// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use itinera_core::reconcile::{LegTable, Reconciler, SelectionChange};
use serde_json::{json, Value};

fn sub(id: &str) -> Value {
    json!({"id": id, "route": [{"id": format!("{}-seg", id), "flyFrom": "AAA", "flyTo": "BBB"}]})
}

fn grouped(id: &str, price: f64, legs: &[&str]) -> Value {
    json!({"id": id, "price": price, "route": legs.iter().map(|l| sub(l)).collect::<Vec<_>>()})
}

fn ids(table: &LegTable) -> Vec<&str> {
    table.rows().iter().map(|c| c.id.as_str()).collect()
}

fn response() -> Value {
    json!([
        grouped("g1", 100.0, &["a", "b"]),
        grouped("g2", 200.0, &["a", "c"]),
        grouped("g3", 300.0, &["d", "c"]),
    ])
}

#[test]
fn test_pins_narrow_every_leg() {
    let mut r = Reconciler::new(2);
    r.ingest(&[response()]).unwrap();
    assert_eq!(ids(r.table(0).unwrap()), vec!["a", "d"]);
    assert_eq!(ids(r.table(1).unwrap()), vec!["b", "c"]);

    r.select(1, "c").unwrap();
    assert_eq!(ids(r.table(0).unwrap()), vec!["a", "d"]);
    // The pinned leg keeps its alternatives.
    assert_eq!(ids(r.table(1).unwrap()), vec!["b", "c"]);
    // "a" now comes from g2, the cheapest itinerary still bookable with "c".
    assert_eq!(r.table(0).unwrap().rows()[0].itinerary_id, "g2");

    r.select(0, "d").unwrap();
    assert_eq!(ids(r.table(0).unwrap()), vec!["a", "d"]);
    assert_eq!(ids(r.table(1).unwrap()), vec!["c"]);
    assert!(r.booking_ready());
    let chosen = r.chosen().unwrap();
    assert_eq!(chosen.itinerary_id, "g3");
    assert_eq!(chosen.price, 300.0);
}

#[test]
fn test_toggle_restores_full_set() {
    let mut r = Reconciler::new(2);
    r.ingest(&[response()]).unwrap();

    r.select(1, "c").unwrap();
    r.select(0, "d").unwrap();
    assert_eq!(
        r.select(0, "d").unwrap(),
        SelectionChange::Unpinned {
            leg: 0,
            id: "d".to_string()
        }
    );
    assert!(!r.booking_ready());
    assert_eq!(ids(r.table(0).unwrap()), vec!["a", "d"]);

    r.select(1, "c").unwrap();
    assert_eq!(r.selections(), vec![None, None]);
    assert_eq!(ids(r.table(0).unwrap()), vec!["a", "d"]);
    assert_eq!(ids(r.table(1).unwrap()), vec!["b", "c"]);
}

#[test]
fn test_pin_moves_without_unpinning() {
    let mut r = Reconciler::new(2);
    r.ingest(&[json!([
        grouped("g1", 100.0, &["a", "b"]),
        grouped("g2", 200.0, &["d", "b"]),
    ])])
    .unwrap();
    r.select(0, "a").unwrap();
    assert_eq!(ids(r.table(0).unwrap()), vec!["a", "d"]);

    r.select(0, "d").unwrap();
    assert_eq!(r.selections(), vec![Some("d"), None]);
    r.select(1, "b").unwrap();
    assert_eq!(r.chosen().unwrap().itinerary_id, "g2");
}

#[test]
fn test_rows_never_mix_unbookable_options() {
    let mut r = Reconciler::new(2);
    r.ingest(&[response()]).unwrap();
    r.select(0, "a").unwrap();
    // g3 pairs "c" with "d", but "c" is still bookable with "a" through g2.
    assert_eq!(ids(r.table(1).unwrap()), vec!["b", "c"]);
    r.select(1, "b").unwrap();
    assert_eq!(r.chosen().unwrap().itinerary_id, "g1");
}

#[test]
fn test_ingest_twice_adds_no_duplicates() {
    let mut once = Reconciler::new(2);
    once.ingest(&[response()]).unwrap();

    let mut twice = Reconciler::new(2);
    twice.ingest(&[response()]).unwrap();
    let second = twice.ingest(&[response()]).unwrap();
    assert_eq!(second.rows_added, 0);
    assert_eq!(second.itineraries, 3);

    for leg in 0..2 {
        assert_eq!(ids(once.table(leg).unwrap()), ids(twice.table(leg).unwrap()));
    }
}

#[test]
fn test_ingest_after_clear_matches_single_ingest() {
    let mut once = Reconciler::new(2);
    once.ingest(&[response()]).unwrap();

    let mut r = Reconciler::new(2);
    r.ingest(&[response()]).unwrap();
    r.select(0, "a").unwrap();
    r.clear();
    assert!(r.table(0).unwrap().rows().is_empty());
    let summary = r.ingest(&[response()]).unwrap();
    assert_eq!(summary.rows_added, 4);

    for leg in 0..2 {
        assert_eq!(ids(once.table(leg).unwrap()), ids(r.table(leg).unwrap()));
    }
}

#[test]
fn test_batches_merge_into_one_table() {
    let mut r = Reconciler::new(1);
    let first = json!([{"id": "x", "price": 80, "route": [{"id": "s1", "flyFrom": "PRG", "flyTo": "LHR"}]}]);
    let second = json!([{"id": "y", "price": 60, "route": [{"id": "s2", "flyFrom": "VIE", "flyTo": "LHR"}]}]);
    r.ingest(&[first, second]).unwrap();
    assert_eq!(ids(r.table(0).unwrap()), vec!["y", "x"]);
}
