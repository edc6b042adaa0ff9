use std::time::{Duration, Instant};

use proptest::prelude::*;
use shooter_core::{BlockConfig, JamDetector, JamPredicate};
use shooter_traits::JointState;

fn cfg(duration_ms: u64) -> BlockConfig {
    BlockConfig {
        block_effort: 1.0,
        block_duration: duration_ms as f64 / 1000.0,
        ..BlockConfig::default()
    }
}

const STALLED: JointState = JointState {
    position: 0.3,
    velocity: 0.0,
    effort: 2.0,
};

proptest! {
    // An uninterrupted stall reports a jam exactly once block_duration has
    // elapsed since the first stalled tick.
    #[test]
    fn fires_after_block_duration(duration_ms in 1u64..500) {
        let c = cfg(duration_ms);
        let mut d = JamDetector::new(JamPredicate::default());
        let t0 = Instant::now();
        for ms in 0..duration_ms {
            prop_assert!(!d.is_block(t0 + Duration::from_millis(ms), &STALLED, &c));
        }
        prop_assert!(d.is_block(t0 + Duration::from_millis(duration_ms), &STALLED, &c));
    }

    // Any non-stalled tick restarts the timer.
    #[test]
    fn interruption_restarts_timing(duration_ms in 2u64..200, break_at in 1u64..200) {
        prop_assume!(break_at < duration_ms);
        let c = cfg(duration_ms);
        let mut d = JamDetector::new(JamPredicate::default());
        let t0 = Instant::now();
        for ms in 0..break_at {
            d.is_block(t0 + Duration::from_millis(ms), &STALLED, &c);
        }
        let moving = JointState { velocity: 1.0, ..STALLED };
        prop_assert!(!d.is_block(t0 + Duration::from_millis(break_at), &moving, &c));
        prop_assert!(!d.is_timing());
        let restart = t0 + Duration::from_millis(break_at + 1);
        prop_assert!(!d.is_block(restart, &STALLED, &c));
        prop_assert!(!d.is_block(restart + Duration::from_millis(duration_ms - 1), &STALLED, &c));
        prop_assert!(d.is_block(restart + Duration::from_millis(duration_ms), &STALLED, &c));
    }
}

#[test]
fn weak_effort_never_jams() {
    let c = cfg(10);
    let mut d = JamDetector::default();
    let t0 = Instant::now();
    let weak = JointState {
        effort: 0.5,
        ..STALLED
    };
    for ms in 0..1000 {
        assert!(!d.is_block(t0 + Duration::from_millis(ms), &weak, &c));
    }
}
