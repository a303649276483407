// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use chrono::NaiveDate;
use itinera_core::codec::{Field, Itinerary, LegFilter};
use itinera_core::request::{BuildError, RequestBuilder};

fn builder() -> RequestBuilder {
    RequestBuilder::new(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap())
}

fn leg(origin: &str, destination: &str) -> LegFilter {
    let mut leg = LegFilter::new();
    leg.set(Field::Origin, origin).unwrap();
    leg.set(Field::Destination, destination).unwrap();
    leg
}

#[test]
fn test_paired_alternatives_fan_out() {
    let it = Itinerary::new(vec![leg("AAA|BBB", "CCC|DDD")]).unwrap();
    let batches = builder().build(&it).unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].index, 0);
    assert_eq!(batches[0].requests[0]["fly_from"], "AAA");
    assert_eq!(batches[0].requests[0]["fly_to"], "CCC");
    assert_eq!(batches[1].index, 1);
    assert_eq!(batches[1].requests[0]["fly_from"], "BBB");
    assert_eq!(batches[1].requests[0]["fly_to"], "DDD");
}

#[test]
fn test_origins_paired_across_legs() {
    let it = Itinerary::new(vec![leg("AAA|BBB", "XXX"), leg("CCC|DDD", "YYY")]).unwrap();
    let batches = builder().build(&it).unwrap();
    assert_eq!(batches.len(), 2);
    let origins: Vec<(&str, &str)> = batches
        .iter()
        .map(|b| {
            (
                b.requests[0]["fly_from"].as_str().unwrap(),
                b.requests[1]["fly_from"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(origins, vec![("AAA", "CCC"), ("BBB", "DDD")]);
}

#[test]
fn test_origin_lengths_two_and_three_conflict() {
    let it = Itinerary::new(vec![leg("AAA|BBB", "XXX"), leg("CCC|DDD|EEE", "YYY")]).unwrap();
    assert_eq!(
        builder().build(&it),
        Err(BuildError::InconsistentFlexCount {
            first_leg: 0,
            first_field: Field::Origin,
            first_count: 2,
            leg: 1,
            field: Field::Origin,
            count: 3,
        })
    );
}

#[test]
fn test_single_values_reused_across_batches() {
    let it = Itinerary::new(vec![leg("PRG|VIE", "LHR"), leg("LHR", "JFK")]).unwrap();
    let batches = builder().build(&it).unwrap();
    assert_eq!(batches.len(), 2);
    for batch in &batches {
        assert_eq!(batch.requests.len(), 2);
        assert_eq!(batch.requests[0]["fly_to"], "LHR");
        assert_eq!(batch.requests[1]["fly_from"], "LHR");
        assert_eq!(batch.requests[1]["fly_to"], "JFK");
    }
    assert_eq!(batches[1].requests[0]["fly_from"], "VIE");
}

#[test]
fn test_mismatched_lengths_issue_nothing() {
    let it = Itinerary::new(vec![leg("AAA|BBB", "CCC"), leg("CCC", "XXX|YYY|ZZZ")]).unwrap();
    assert_eq!(
        builder().build(&it),
        Err(BuildError::InconsistentFlexCount {
            first_leg: 0,
            first_field: Field::Origin,
            first_count: 2,
            leg: 1,
            field: Field::Destination,
            count: 3,
        })
    );
}

#[test]
fn test_no_alternatives_single_batch() {
    let it = Itinerary::new(vec![leg("PRG", "LHR")]).unwrap();
    assert_eq!(builder().fan_out(&it).unwrap(), 1);
}
