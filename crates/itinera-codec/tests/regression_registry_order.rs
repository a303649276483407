// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use itinera_codec::{decode, generate_keys, Field, FIELD_REGISTRY, REGISTRY_VERSION};

/// Share links address fields by position. This list may only grow at the end.
const PINNED_ORDER_V1: [&str; 20] = [
    "origin",
    "destination",
    "date_from",
    "date_to",
    "cabin",
    "max_stops",
    "min_layover",
    "max_layover",
    "dep_time_from",
    "dep_time_to",
    "arr_time_from",
    "arr_time_to",
    "airlines",
    "exclude_airlines",
    "airport_change",
    "max_duration",
    "via",
    "adults",
    "hold_bags",
    "hand_bags",
];

#[test]
fn test_registry_is_append_only() {
    assert!(
        FIELD_REGISTRY.len() >= PINNED_ORDER_V1.len(),
        "Fields were removed from the registry"
    );
    for (i, name) in PINNED_ORDER_V1.iter().enumerate() {
        assert_eq!(
            FIELD_REGISTRY[i].name, *name,
            "Registry position {} changed; old share links would decode incorrectly",
            i
        );
    }
    assert!(REGISTRY_VERSION >= 1);
}

#[test]
fn test_every_field_has_a_key() {
    let keys = generate_keys(Field::ALL.len());
    assert_eq!(keys.len(), FIELD_REGISTRY.len());
    assert_eq!(keys[0], "a");
    assert_eq!(keys[19], "t");
}

#[test]
fn test_link_issued_under_v1_still_decodes() {
    // [{"a":"PRG","b":"LHR","e":"W","n":true}] as issued by the first release
    let token = "W3siYSI6IlBSRyIsImIiOiJMSFIiLCJlIjoiVyIsIm4iOnRydWV9XQ";
    let it = decode(token);
    assert_eq!(it.len(), 1);
    let leg = &it.legs()[0];
    assert_eq!(leg.text(Field::Origin), Some("PRG"));
    assert_eq!(leg.text(Field::Destination), Some("LHR"));
    assert_eq!(leg.text(Field::Cabin), Some("W"));
    assert!(leg.flag(Field::ExcludeAirlines));
}
