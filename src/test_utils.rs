//! Shared proptest strategies for unit tests.

use indexmap::IndexMap;
use proptest::prelude::*;

use crate::payload::PayloadValue;

/// Text fragments, with and without markup, that payload strings are built from.
pub fn arb_text() -> impl Strategy<Value = String> {
    let fragment = prop_oneof![
        prop::string::string_regex("[a-zA-Z0-9 ]{0,12}").unwrap(),
        Just("<b>bold</b>".to_string()),
        Just("<i>it</i>".to_string()),
        Just("<script>alert(1)</script>".to_string()),
        Just("<img src=x onerror=alert(1)>".to_string()),
        Just(r#"<a href="https://example.com" onclick="x()">link</a>"#.to_string()),
        Just("fish & chips".to_string()),
        Just("<style>p{}</style>".to_string()),
    ];
    prop::collection::vec(fragment, 0..4).prop_map(|parts| parts.concat())
}

/// Field names, including some from the credential preset.
pub fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[a-z]{1,8}").unwrap(),
        Just("password".to_string()),
        Just("token".to_string()),
    ]
}

/// Arbitrary nested payloads.
pub fn arb_payload() -> impl Strategy<Value = PayloadValue> {
    let leaf = prop_oneof![
        Just(PayloadValue::Null),
        any::<bool>().prop_map(PayloadValue::Bool),
        any::<i64>().prop_map(|n| PayloadValue::Number(n.into())),
        arb_text().prop_map(PayloadValue::String),
    ];

    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(PayloadValue::Sequence),
            prop::collection::vec((arb_key(), inner), 0..4).prop_map(|pairs| {
                PayloadValue::Mapping(pairs.into_iter().collect::<IndexMap<_, _>>())
            }),
        ]
    })
}
