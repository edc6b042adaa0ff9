//! Trigger jam detection.
//!
//! A jam is a stall sustained for `block_duration`: effort magnitude at or
//! above `block_effort` while the trigger speed stays within
//! `stall_velocity` of zero. The detector only returns a verdict; the caller
//! decides how to recover.

use std::time::Instant;

use shooter_traits::JointState;

use crate::types::BlockConfig;

/// Stall comparison used by `JamDetector`.
///
/// Stalled when `block_effort > 0`, `|effort| >= block_effort` and
/// `|velocity| <= stall_velocity`. A non-positive `block_effort` disables
/// detection, so the all-zero default configuration never reports a jam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JamPredicate {
    pub stall_velocity: f64,
}

impl Default for JamPredicate {
    fn default() -> Self {
        Self {
            stall_velocity: 0.05,
        }
    }
}

impl JamPredicate {
    #[inline]
    pub fn stalled(&self, joint: &JointState, cfg: &BlockConfig) -> bool {
        cfg.block_effort > 0.0
            && joint.effort.abs() >= cfg.block_effort
            && joint.velocity.abs() <= self.stall_velocity
    }
}

#[derive(Debug, Default, Clone)]
pub struct JamDetector {
    predicate: JamPredicate,
    stalled_since: Option<Instant>,
}

impl JamDetector {
    pub fn new(predicate: JamPredicate) -> Self {
        Self {
            predicate,
            stalled_since: None,
        }
    }

    pub fn predicate(&self) -> &JamPredicate {
        &self.predicate
    }

    /// Whether a stall is currently being timed.
    pub fn is_timing(&self) -> bool {
        self.stalled_since.is_some()
    }

    /// Evaluate one tick. Starts timing on the first stalled tick, keeps the
    /// original start while the stall persists, and clears it as soon as the
    /// stall condition breaks.
    pub fn is_block(&mut self, now: Instant, joint: &JointState, cfg: &BlockConfig) -> bool {
        if !self.predicate.stalled(joint, cfg) {
            self.stalled_since = None;
            return false;
        }
        let since = *self.stalled_since.get_or_insert(now);
        now.saturating_duration_since(since).as_secs_f64() >= cfg.block_duration
    }

    pub fn reset(&mut self) {
        self.stalled_since = None;
    }
}
