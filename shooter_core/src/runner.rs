//! Fixed-rate control loop around `Shooter::update`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use shooter_traits::clock::Clock;

use crate::shooter::Shooter;
use crate::types::State;

#[derive(Debug, Clone, Copy)]
pub struct RunParams {
    pub control_hz: u32,
    /// Stop after this many ticks (`None` = until shutdown).
    pub max_ticks: Option<u64>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            control_hz: 1000,
            max_ticks: None,
        }
    }
}

/// Summary of one run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunStats {
    pub ticks: u64,
    pub transitions: u64,
    pub jams: u64,
    pub feeds: u64,
    /// Ticks whose update plus plant step overran the period.
    pub missed_deadlines: u64,
    pub max_tick_us: u64,
    /// State after the last active tick, before the controller was released.
    pub final_state: State,
}

/// Run the controller at `params.control_hz` until `shutdown` is set or the
/// tick limit is reached.
///
/// `plant` runs after every tick with the control period; simulations use it
/// to advance their model, hardware runs can pass a no-op. The controller is
/// enabled on entry and driven back to PASSIVE (all efforts zero) on exit.
pub fn run<C, F>(
    shooter: &mut Shooter<'_>,
    clock: &C,
    params: &RunParams,
    shutdown: &AtomicBool,
    mut plant: F,
) -> RunStats
where
    C: Clock + ?Sized,
    F: FnMut(Duration),
{
    let period = crate::util::period(params.control_hz);
    let mut stats = RunStats::default();
    shooter.enable();
    tracing::info!(hz = params.control_hz, max_ticks = ?params.max_ticks, "control loop start");

    let mut next = clock.now();
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::debug!("control loop received shutdown signal");
            break;
        }
        if params.max_ticks.is_some_and(|max| stats.ticks >= max) {
            break;
        }

        let start = clock.now();
        if let Some(t) = shooter.update(start, period) {
            stats.transitions += 1;
            tracing::trace!(tick = stats.ticks, from = ?t.from, to = ?t.to, "transition");
        }
        plant(period);
        stats.ticks += 1;

        let busy = clock.elapsed(start);
        let busy_us = u64::try_from(busy.as_micros()).unwrap_or(u64::MAX);
        stats.max_tick_us = stats.max_tick_us.max(busy_us);
        if busy > period {
            stats.missed_deadlines += 1;
        }

        next += period;
        let now = clock.now();
        if next > now {
            clock.sleep(next - now);
        } else {
            // Behind schedule: resynchronise instead of bursting.
            next = now;
        }
    }

    stats.final_state = shooter.state();
    stats.jams = shooter.jams();
    stats.feeds = shooter.feeds();

    shooter.disable();
    shooter.update(clock.now(), period);
    tracing::info!(
        ticks = stats.ticks,
        transitions = stats.transitions,
        jams = stats.jams,
        feeds = stats.feeds,
        missed = stats.missed_deadlines,
        "control loop stopped"
    );
    stats
}
