//! Property tests for the streaming merge state machine.
//!
//! Random chunk sequences over a small id and label pool are replayed into
//! a snapshot. After every merge the section set may only grow, slots keep
//! their positions, and every unit enters at most once.

use std::collections::HashSet;

use cardgrid_core::{Card, Field, Item, Section, UnitId};
use cardgrid_runtime::{MergeOutcome, StreamError, StreamStage, StreamingSnapshot};
use proptest::prelude::*;

const IDS: &[&str] = &["a", "b", "c", "d"];
const LABELS: &[&str] = &["x", "y", "z", ""];
const VALUES: &[&str] = &["42", "Streaming…", "", "7", "loading...", "Acme"];

fn field() -> impl Strategy<Value = Field> {
    (prop::sample::select(LABELS), prop::sample::select(VALUES))
        .prop_map(|(label, value)| Field::new(label, value))
}

fn item() -> impl Strategy<Value = Item> {
    prop::sample::select(VALUES).prop_map(Item::new)
}

fn section() -> impl Strategy<Value = Section> {
    (
        prop::sample::select(IDS),
        prop::collection::vec(field(), 0..4),
        prop::collection::vec(item(), 0..3),
    )
        .prop_map(|(id, fields, items)| {
            let mut section = Section::new(format!("Section {id}")).with_id(id);
            section.fields = fields;
            section.items = items;
            section
        })
}

fn chunks() -> impl Strategy<Value = Vec<Card>> {
    prop::collection::vec(
        prop::collection::vec(section(), 0..4).prop_map(|sections| Card {
            sections,
            ..Card::default()
        }),
        1..12,
    )
}

fn section_ids(snapshot: &StreamingSnapshot) -> Vec<String> {
    snapshot.sections().filter_map(|s| s.id.clone()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn merge_is_monotonic(chunks in chunks()) {
        let mut snapshot = StreamingSnapshot::new();
        for chunk in chunks {
            let before = snapshot.card();
            match snapshot.merge(chunk) {
                Ok(MergeOutcome::Merged(_)) => {}
                Ok(MergeOutcome::Dropped { .. }) => prop_assert!(false, "dropped while streaming"),
                Err(StreamError::DuplicateSectionId(_)) => {
                    prop_assert_eq!(&snapshot.card(), &before);
                    continue;
                }
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }

            let after = snapshot.card();
            prop_assert!(after.sections.len() >= before.sections.len());
            for (old, new) in before.sections.iter().zip(&after.sections) {
                prop_assert_eq!(&old.id, &new.id);
                prop_assert!(new.fields.len() >= old.fields.len());
                prop_assert!(new.items.len() >= old.items.len());
                for (f_old, f_new) in old.fields.iter().zip(&new.fields) {
                    if !f_old.label.is_empty() {
                        prop_assert_eq!(&f_old.label, &f_new.label);
                    }
                    if f_old.has_content() {
                        prop_assert!(f_new.has_content());
                    }
                }
            }
        }
    }

    #[test]
    fn each_unit_enters_once(chunks in chunks()) {
        let mut snapshot = StreamingSnapshot::new();
        let mut from_reports: Vec<UnitId> = Vec::new();
        for chunk in chunks {
            if let Ok(outcome) = snapshot.merge(chunk) {
                from_reports.extend(outcome.entered().iter().cloned());
            }
        }

        let log = snapshot.entered_units();
        prop_assert_eq!(log, from_reports.as_slice());
        let distinct: HashSet<&UnitId> = log.iter().collect();
        prop_assert_eq!(distinct.len(), log.len());

        // Content never reverts to a placeholder, so the units holding
        // content now are exactly the units that ever held it.
        let mut expected: HashSet<UnitId> = HashSet::new();
        for section in snapshot.sections() {
            let key = section.id.clone().unwrap_or_default();
            if section.has_content() {
                expected.insert(UnitId::Section(key.clone()));
            }
            for (slot, f) in section.fields.iter().enumerate() {
                if f.has_content() {
                    expected.insert(UnitId::Field { section: key.clone(), slot });
                }
            }
            for (slot, i) in section.items.iter().enumerate() {
                if i.has_content() {
                    expected.insert(UnitId::Item { section: key.clone(), slot });
                }
            }
        }
        let actual: HashSet<UnitId> = log.iter().cloned().collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn terminal_stage_freezes_snapshot(
        head in chunks(),
        tail in chunks(),
        stop in 0u8..3,
    ) {
        let mut snapshot = StreamingSnapshot::new();
        for chunk in head {
            let _ = snapshot.merge(chunk);
        }
        match stop {
            0 => { snapshot.complete(); }
            1 => { snapshot.abort(); }
            _ => { snapshot.fail("transport closed"); }
        }
        let frozen = snapshot.card();
        let ids = section_ids(&snapshot);
        let entered = snapshot.entered_units().to_vec();

        for chunk in tail {
            let outcome = snapshot.merge(chunk).unwrap();
            prop_assert!(outcome.is_dropped());
        }
        prop_assert!(snapshot.stage().is_terminal());
        prop_assert_ne!(snapshot.stage(), StreamStage::Streaming);
        prop_assert_eq!(snapshot.card(), frozen);
        prop_assert_eq!(section_ids(&snapshot), ids);
        prop_assert_eq!(snapshot.entered_units(), entered.as_slice());
    }
}

#[test]
fn scenario_placeholder_then_value() {
    let mut snapshot = StreamingSnapshot::new();
    snapshot.begin().unwrap();

    let first = snapshot
        .merge_json(r#"{"sections": [{"id": "s1", "fields": [{"label": "X", "value": "Streaming…"}]}]}"#)
        .unwrap();
    assert!(first.entered().is_empty());
    assert!(!snapshot.is_entered(&UnitId::Section("s1".into())));

    let second = snapshot
        .merge_json(r#"{"sections": [{"id": "s1", "fields": [{"label": "X", "value": "42"}]}]}"#)
        .unwrap();
    assert_eq!(second.entered()[0], UnitId::Section("s1".into()));
    assert!(snapshot.is_entered(&UnitId::Section("s1".into())));
}
