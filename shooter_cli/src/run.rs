//! Simulated closed-loop run: rig assembly, script delivery and the control
//! loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;
use shooter_config::messages::ScriptEntry;
use shooter_core::ingest::{self, Update};
use shooter_core::runner::{self, RunParams, RunStats};
use shooter_core::{BlockConfig, Config, Exchanges, build_shooter};
use shooter_hardware::{Jam, JointModel, SimRig};
use shooter_traits::clock::{Clock, ManualClock, MonotonicClock};

use crate::rt::{RtRequest, setup_rt_once};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub script: Vec<ScriptEntry>,
    pub duration_ms: u64,
    /// Pace on the wall clock and deliver the script from another thread.
    pub realtime: bool,
    pub jam: Option<Jam>,
    pub rt: Option<RtRequest>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub stats: RunStats,
    pub updates_applied: u64,
    pub updates_rejected: u64,
    pub trigger_position: f64,
    pub wheel_velocities: Vec<f64>,
}

impl RunReport {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "ticks": self.stats.ticks,
            "final_state": format!("{:?}", self.stats.final_state),
            "transitions": self.stats.transitions,
            "feeds": self.stats.feeds,
            "jams": self.stats.jams,
            "missed_deadlines": self.stats.missed_deadlines,
            "max_tick_us": self.stats.max_tick_us,
            "updates_applied": self.updates_applied,
            "updates_rejected": self.updates_rejected,
            "trigger_position": self.trigger_position,
            "wheel_velocities": self.wheel_velocities,
        })
    }
}

/// Simulated joints for every name in the config.
pub fn build_rig(cfg: &shooter_config::Config) -> SimRig {
    let mut rig = SimRig::new();
    for name in &cfg.joints.friction {
        rig.add_joint(name, JointModel::flywheel());
    }
    rig.add_joint(&cfg.joints.trigger, JointModel::trigger());
    if let Some(name) = &cfg.joints.magazine {
        let mut model = JointModel::magazine();
        // Keep the closed position reachable.
        model.min_position = model
            .min_position
            .map(|m| m.min(cfg.shooter.magazine_closed_position));
        rig.add_joint(name, model);
    }
    rig
}

/// Run the controller on the simulated rig until `duration_ms` of control
/// time has elapsed or `shutdown` is set.
pub fn run_sim(
    cfg: &shooter_config::Config,
    opts: &RunOptions,
    shutdown: &AtomicBool,
) -> eyre::Result<RunReport> {
    let mut rig = build_rig(cfg);
    if let Some(jam) = opts.jam {
        rig.set_jam(&cfg.joints.trigger, jam)
            .wrap_err("place trigger obstruction")?;
    }

    let ex = Exchanges::new();
    ingest::apply(&ex, Update::Config(Config::from(&cfg.dynamic)));
    ingest::apply(&ex, Update::Block(BlockConfig::from(&cfg.block)));

    let mut shooter = build_shooter(&mut rig, &ex, cfg).wrap_err("assemble controller")?;

    let hz = cfg.shooter.control_hz;
    let params = RunParams {
        control_hz: hz,
        max_ticks: Some(opts.duration_ms.saturating_mul(u64::from(hz)) / 1000),
    };
    tracing::info!(
        topology = ?cfg.joints.topology,
        hz,
        duration_ms = opts.duration_ms,
        realtime = opts.realtime,
        script_entries = opts.script.len(),
        "simulated run"
    );

    let (stats, applied, rejected) = if opts.realtime {
        if let Some(req) = opts.rt {
            setup_rt_once(req);
        }
        run_realtime(&mut shooter, &rig, &ex, &params, &opts.script, shutdown)
    } else {
        run_fast(&mut shooter, &rig, &ex, &params, &opts.script, shutdown)
    };
    drop(shooter);

    let trigger_position = rig
        .joint(&cfg.joints.trigger)
        .map_or(0.0, |j| j.position);
    let wheel_velocities = cfg
        .joints
        .friction
        .iter()
        .map(|n| rig.joint(n).map_or(0.0, |j| j.velocity))
        .collect();

    Ok(RunReport {
        stats,
        updates_applied: applied,
        updates_rejected: rejected,
        trigger_position,
        wheel_velocities,
    })
}

/// Simulated time: the script is delivered between ticks, so runs are
/// reproducible.
fn run_fast(
    shooter: &mut shooter_core::Shooter<'_>,
    rig: &SimRig,
    ex: &Exchanges,
    params: &RunParams,
    script: &[ScriptEntry],
    shutdown: &AtomicBool,
) -> (RunStats, u64, u64) {
    let clock = ManualClock::new();
    let step_us = shooter_core::util::period_us(params.control_hz);
    let mut pending = script.iter().peekable();
    let mut applied = 0u64;
    let mut rejected = 0u64;
    let mut ticks = 0u64;

    let mut deliver = |until_us: u64| {
        while let Some(entry) = pending.next_if(|e| e.at_ms.saturating_mul(1000) <= until_us) {
            match Update::try_from(entry.message) {
                Ok(u) => {
                    ingest::apply(ex, u);
                    applied += 1;
                }
                Err(err) => {
                    tracing::warn!(at_ms = entry.at_ms, %err, "script entry rejected");
                    rejected += 1;
                }
            }
        }
    };

    deliver(0);
    let stats = runner::run(shooter, &clock, params, shutdown, |period| {
        rig.advance(period);
        ticks += 1;
        deliver(ticks.saturating_mul(step_us));
    });
    (stats, applied, rejected)
}

/// Wall-clock pacing: a player thread feeds the script through the update
/// channel and an ingestor thread publishes it.
fn run_realtime(
    shooter: &mut shooter_core::Shooter<'_>,
    rig: &SimRig,
    ex: &Exchanges,
    params: &RunParams,
    script: &[ScriptEntry],
    shutdown: &AtomicBool,
) -> (RunStats, u64, u64) {
    let clock = MonotonicClock::new();
    let (tx, ingestor) = ingest::channel(64);
    let finished = AtomicBool::new(false);
    let stop_requested = || shutdown.load(Ordering::Relaxed) || finished.load(Ordering::Relaxed);

    std::thread::scope(|s| {
        let pump = s.spawn(|| ingestor.pump(ex, &finished));
        let player = s.spawn(move || {
            let start = clock.now();
            let mut rejected = 0u64;
            for entry in script {
                let due = Duration::from_millis(entry.at_ms);
                loop {
                    if stop_requested() {
                        return rejected;
                    }
                    let elapsed = clock.elapsed(start);
                    if elapsed >= due {
                        break;
                    }
                    clock.sleep((due - elapsed).min(Duration::from_millis(10)));
                }
                match tx.send_message(entry.message) {
                    Ok(()) => {}
                    Err(shooter_core::ShooterError::Update(_)) => rejected += 1,
                    Err(err) => {
                        tracing::warn!(%err, "script player stopped");
                        break;
                    }
                }
            }
            rejected
        });

        let stats = runner::run(shooter, &clock, params, shutdown, |period| {
            rig.advance(period);
        });
        finished.store(true, Ordering::Relaxed);

        let rejected = player.join().unwrap_or_else(|_| {
            tracing::warn!("script player panicked");
            0
        });
        let applied = pump.join().unwrap_or_else(|_| {
            tracing::warn!("ingestor panicked");
            0
        });
        (stats, applied, rejected)
    })
}
