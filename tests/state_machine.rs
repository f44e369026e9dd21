use medcode_core::pipeline::{ResolveState, StateTracker};

use ResolveState::*;

#[test]
fn happy_path_transitions_are_legal() {
    let mut tracker = StateTracker::new();
    assert_eq!(tracker.state(), Pending);

    for next in [Extracting, Normalizing, Matching, Ranked, Done] {
        tracker.advance(next).unwrap();
        assert_eq!(tracker.state(), next);
    }
    assert!(tracker.state().is_terminal());
}

#[test]
fn cache_hit_short_circuits_pending_to_done() {
    let mut tracker = StateTracker::new();
    tracker.advance(Done).unwrap();
    assert!(tracker.state().is_terminal());
}

#[test]
fn zero_spans_skips_from_extracting_to_ranked() {
    let mut tracker = StateTracker::new();
    tracker.advance(Extracting).unwrap();
    tracker.advance(Ranked).unwrap();
    tracker.advance(Done).unwrap();
}

#[test]
fn all_unmapped_skips_from_normalizing_to_ranked() {
    let mut tracker = StateTracker::new();
    tracker.advance(Extracting).unwrap();
    tracker.advance(Normalizing).unwrap();
    tracker.advance(Ranked).unwrap();
    tracker.advance(Done).unwrap();
}

#[test]
fn failed_is_reachable_from_every_non_terminal_state() {
    for from in [Pending, Extracting, Normalizing, Matching, Ranked] {
        assert!(from.can_transition(Failed), "{from:?} -> Failed must be legal");
    }
}

#[test]
fn terminal_states_admit_no_transitions() {
    for next in [Pending, Extracting, Normalizing, Matching, Ranked, Done, Failed] {
        assert!(!Done.can_transition(next), "Done -> {next:?} must be illegal");
        assert!(!Failed.can_transition(next), "Failed -> {next:?} must be illegal");
    }
}

#[test]
fn backward_and_skipping_transitions_are_rejected() {
    assert!(!Pending.can_transition(Normalizing));
    assert!(!Pending.can_transition(Ranked));
    assert!(!Extracting.can_transition(Done));
    assert!(!Normalizing.can_transition(Extracting));
    assert!(!Matching.can_transition(Normalizing));
    assert!(!Matching.can_transition(Done));
    assert!(!Ranked.can_transition(Matching));

    let mut tracker = StateTracker::new();
    tracker.advance(Extracting).unwrap();
    let err = tracker.advance(Done).unwrap_err();
    assert_eq!(err.from, Extracting);
    assert_eq!(err.to, Done);

    // A rejected transition leaves the tracker where it was.
    assert_eq!(tracker.state(), Extracting);
}
