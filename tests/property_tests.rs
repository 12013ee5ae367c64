//! Property-based tests for the pure core and the indicator math.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use kiosk_flow::core::{Guard, LegKind, Stage, State, StateHistory};
use kiosk_flow::payment::advance_angle;
use proptest::prelude::*;
use std::collections::HashSet;

prop_compose! {
    fn arbitrary_stage()(index in 0..Stage::ALL.len()) -> Stage {
        Stage::ALL[index]
    }
}

#[test]
fn every_leg_kind_has_exactly_one_row() {
    let kinds: Vec<LegKind> = Stage::ALL
        .iter()
        .filter_map(|stage| stage.leg())
        .map(|leg| leg.kind)
        .collect();
    let unique: HashSet<LegKind> = kinds.iter().copied().collect();

    assert_eq!(kinds.len(), 5);
    assert_eq!(unique.len(), kinds.len());
}

#[test]
fn only_reserved_stage_is_unmatched() {
    let unmatched: Vec<Stage> = Stage::ALL
        .iter()
        .copied()
        .filter(|stage| stage.leg().is_none())
        .collect();

    assert_eq!(unmatched, vec![Stage::AwaitingReturnTransition]);
}

proptest! {
    #[test]
    fn leg_starts_at_its_stage(stage in arbitrary_stage()) {
        if let Some(leg) = stage.leg() {
            prop_assert_eq!(leg.from, stage);
            prop_assert_ne!(leg.to, stage);
            // Destinations are always stages with a leg of their own.
            prop_assert!(leg.to.leg().is_some());
        }
    }

    #[test]
    fn table_is_deterministic(stage in arbitrary_stage()) {
        prop_assert_eq!(stage.leg(), stage.leg());
        prop_assert_eq!(stage.name(), stage.name());
    }

    #[test]
    fn following_legs_never_leaves_the_table(
        start in arbitrary_stage(),
        steps in 0usize..32,
    ) {
        let mut stage = start;
        for _ in 0..steps {
            match stage.leg() {
                Some(leg) => stage = leg.to,
                None => break,
            }
        }
        prop_assert!(Stage::ALL.contains(&stage));
    }

    #[test]
    fn guard_is_deterministic(stage in arbitrary_stage()) {
        let guard = Guard::only_from([Stage::AwaitingFilmingTransition]);
        let first = guard.check(&stage);
        prop_assert_eq!(first, guard.check(&stage));
        prop_assert_eq!(first, stage == Stage::AwaitingFilmingTransition);
    }

    #[test]
    fn angle_stays_in_range(
        speed in 0.0f32..5_000.0,
        frames in prop::collection::vec(0.0f32..2.0, 1..200),
    ) {
        let mut angle = 0.0f32;
        for dt in frames {
            angle = advance_angle(angle, speed, dt);
            prop_assert!(angle > -360.0 && angle <= 0.0, "angle {} out of range", angle);
        }
    }

    #[test]
    fn history_never_exceeds_limit(
        limit in 1usize..16,
        stages in prop::collection::vec(arbitrary_stage(), 0..64),
    ) {
        let mut history = StateHistory::with_limit(limit);
        let mut previous = Stage::Idle;
        for stage in &stages {
            history.record(previous, *stage);
            previous = *stage;
        }

        prop_assert!(history.transitions().len() <= limit);
        prop_assert_eq!(history.total_recorded(), stages.len() as u64);
        if let Some(last) = history.last() {
            prop_assert_eq!(last.sequence, stages.len() as u64);
            prop_assert_eq!(last.to, previous);
        }
    }

    #[test]
    fn history_path_is_contiguous(
        stages in prop::collection::vec(arbitrary_stage(), 1..10),
    ) {
        let mut history = StateHistory::default();
        let mut previous = Stage::Idle;
        let mut expected = vec![Stage::Idle];
        for stage in &stages {
            history.record(previous, *stage);
            previous = *stage;
            expected.push(*stage);
        }

        let path: Vec<Stage> = history.get_path().into_iter().copied().collect();
        prop_assert_eq!(path, expected);
    }

    #[test]
    fn history_roundtrip_serialization(
        stages in prop::collection::vec(arbitrary_stage(), 0..5),
    ) {
        let mut history = StateHistory::default();
        let mut previous = Stage::Idle;
        for stage in &stages {
            history.record(previous, *stage);
            previous = *stage;
        }

        let json = serde_json::to_string(&history).unwrap();
        let deserialized: StateHistory<Stage> = serde_json::from_str(&json).unwrap();

        prop_assert_eq!(history.transitions().len(), deserialized.transitions().len());
        prop_assert_eq!(history.total_recorded(), deserialized.total_recorded());
    }
}
