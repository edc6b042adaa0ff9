//! Launcher control state machine.
//!
//! One `update` per control tick: take fresh snapshots of the configuration,
//! jam parameters and operator command, evaluate the state transition, then
//! run the behaviour of the resulting state and the magazine sub-state.
//!
//! States:
//! - PASSIVE: every actuator at zero effort (controller disabled).
//! - READY: flywheels spin to the commanded preset; trigger holds position.
//! - PUSH: as READY, plus the trigger advances `push_angle` per feed cycle.
//! - BLOCK: trigger backs off from a jam, then the interrupted feed is retried.
//! - STOP: flywheels spin down; trigger released.

use std::time::{Duration, Instant};

use shooter_traits::{Actuator, JointState};

use crate::config::Tuning;
use crate::drive::FlywheelDrive;
use crate::exchange::Exchanges;
use crate::jam::JamDetector;
use crate::magazine::Magazine;
use crate::pid::Pid;
use crate::types::{BlockConfig, Config, MagazineState, ShootCommand, State, Transition};

#[derive(Debug, Clone, Copy)]
struct BlockEntry {
    at: Instant,
    position: f64,
}

pub struct Shooter<'a> {
    pub(crate) exchanges: &'a Exchanges,
    pub(crate) drive: Box<dyn FlywheelDrive>,
    pub(crate) trigger: Box<dyn Actuator>,
    pub(crate) trigger_pid: Pid,
    pub(crate) magazine: Option<Magazine>,
    pub(crate) jam: JamDetector,
    pub(crate) tuning: Tuning,

    state: State,
    enabled: bool,
    cmd: ShootCommand,
    config: Config,
    block_cfg: BlockConfig,

    friction_qd_des: f64,
    trigger_q_des: f64,
    pre_jam_q_des: f64,
    backoff_q_des: f64,
    block_entry: Option<BlockEntry>,
    last_feed: Option<Instant>,
    is_out_from_block: bool,

    feeds: u64,
    jams: u64,
}

impl core::fmt::Debug for Shooter<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Shooter")
            .field("state", &self.state)
            .field("enabled", &self.enabled)
            .field("friction_qd_des", &self.friction_qd_des)
            .field("trigger_q_des", &self.trigger_q_des)
            .field("wheels", &self.drive.wheel_count())
            .field("magazine", &self.magazine_state())
            .finish()
    }
}

impl<'a> Shooter<'a> {
    pub(crate) fn new(
        exchanges: &'a Exchanges,
        drive: Box<dyn FlywheelDrive>,
        trigger: Box<dyn Actuator>,
        trigger_pid: Pid,
        magazine: Option<Magazine>,
        jam: JamDetector,
        tuning: Tuning,
    ) -> Self {
        Self {
            exchanges,
            drive,
            trigger,
            trigger_pid,
            magazine,
            jam,
            tuning,
            state: State::Passive,
            enabled: false,
            cmd: ShootCommand::default(),
            config: Config::default(),
            block_cfg: BlockConfig::default(),
            friction_qd_des: 0.0,
            trigger_q_des: 0.0,
            pre_jam_q_des: 0.0,
            backoff_q_des: 0.0,
            block_entry: None,
            last_feed: None,
            is_out_from_block: false,
            feeds: 0,
            jams: 0,
        }
    }

    /// Start a builder.
    pub fn builder() -> crate::builder::ShooterBuilder<
        'a,
        crate::builder::Missing,
        crate::builder::Missing,
        crate::builder::Missing,
    > {
        crate::builder::ShooterBuilder::default()
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn magazine_state(&self) -> MagazineState {
        self.magazine
            .as_ref()
            .map_or(MagazineState::Passive, Magazine::state)
    }

    /// Flywheel speed setpoint of the last tick (rad/s).
    pub fn friction_qd_des(&self) -> f64 {
        self.friction_qd_des
    }

    /// Trigger position target (rad).
    pub fn trigger_q_des(&self) -> f64 {
        self.trigger_q_des
    }

    /// True from the tick that leaves BLOCK until the end of the next tick.
    pub fn is_out_from_block(&self) -> bool {
        self.is_out_from_block
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Command snapshot used by the last tick.
    pub fn command(&self) -> &ShootCommand {
        &self.cmd
    }

    /// Configuration snapshot used by the last tick.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn block_config(&self) -> &BlockConfig {
        &self.block_cfg
    }

    /// Feed cycles started so far.
    pub fn feeds(&self) -> u64 {
        self.feeds
    }

    /// Jams detected so far.
    pub fn jams(&self) -> u64 {
        self.jams
    }

    pub fn wheel_count(&self) -> usize {
        self.drive.wheel_count()
    }

    /// Allow leaving PASSIVE on the next tick.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Force PASSIVE on the next tick.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Run one control tick at time `now`. Returns the last transition taken
    /// during this tick, if any.
    pub fn update(&mut self, now: Instant, period: Duration) -> Option<Transition> {
        self.cmd = self.exchanges.command.read();
        self.config = self.exchanges.config.read();
        self.block_cfg = self.exchanges.block.read();
        let retry = std::mem::take(&mut self.is_out_from_block);

        let mut taken = None;
        let next = self.next_state();
        if next != self.state {
            taken = Some(self.enter(next));
        }

        match self.state {
            State::Passive => self.passive(),
            State::Ready => self.ready(period),
            State::Push => {
                if let Some(t) = self.push(now, period, retry) {
                    taken = Some(t);
                }
            }
            State::Block => {
                if let Some(t) = self.block(now, period) {
                    taken = Some(t);
                }
            }
            State::Stop => self.stop(period),
        }

        if self.state != State::Passive {
            self.magazine(period);
        }
        taken
    }

    fn next_state(&self) -> State {
        if !self.enabled {
            return State::Passive;
        }
        if self.cmd.stop {
            return State::Stop;
        }
        match self.state {
            State::Passive | State::Stop => State::Ready,
            State::Ready => {
                let qd_des = self.config.qd_for(self.cmd.speed);
                if self.cmd.fire_enable
                    && self.drive.speed_error(qd_des) <= self.tuning.push_angle_error
                {
                    State::Push
                } else {
                    State::Ready
                }
            }
            State::Push if !self.cmd.fire_enable => State::Ready,
            s => s,
        }
    }

    fn transition(&mut self, to: State) -> Transition {
        let t = Transition {
            from: self.state,
            to,
        };
        tracing::info!(from = ?t.from, to = ?t.to, "shooter state change");
        self.state = to;
        t
    }

    /// Entry actions for transitions chosen at the start of a tick.
    fn enter(&mut self, next: State) -> Transition {
        let from = self.state;
        if from == State::Block {
            self.block_entry = None;
        }
        match next {
            State::Passive => {
                self.jam.reset();
                self.last_feed = None;
            }
            State::Ready if matches!(from, State::Passive | State::Stop) => {
                self.trigger_q_des = self.trigger.read().position;
                self.trigger_pid.reset();
            }
            State::Push => {
                self.last_feed = None;
                self.jam.reset();
            }
            State::Stop => {
                self.jam.reset();
                self.last_feed = None;
                self.trigger_pid.reset();
            }
            _ => {}
        }
        self.transition(next)
    }

    fn passive(&mut self) {
        self.friction_qd_des = 0.0;
        self.drive.relax();
        self.trigger.write(0.0);
        self.trigger_pid.reset();
        if let Some(m) = self.magazine.as_mut() {
            m.passive();
        }
    }

    fn spin(&mut self, period: Duration) {
        self.friction_qd_des = self.config.qd_for(self.cmd.speed);
        self.move_joint(period);
    }

    fn move_joint(&mut self, period: Duration) {
        self.drive.move_joint(self.friction_qd_des, period);
    }

    /// Drive the trigger toward `trigger_q_des`; returns the commanded effort
    /// and the measured state it was computed from.
    fn hold_trigger(&mut self, period: Duration) -> (f64, JointState) {
        let joint = self.trigger.read();
        let effort = self
            .trigger_pid
            .compute(self.trigger_q_des - joint.position, period);
        self.trigger.write(effort);
        (effort, joint)
    }

    fn ready(&mut self, period: Duration) {
        self.spin(period);
        self.hold_trigger(period);
    }

    fn feed_due(&self, now: Instant) -> bool {
        let rate = self.cmd.rate_hz;
        if !(rate.is_finite() && rate > 0.0) || self.config.push_angle <= 0.0 {
            return false;
        }
        match self.last_feed {
            None => true,
            Some(t) => now.saturating_duration_since(t).as_secs_f64() >= 1.0 / rate,
        }
    }

    /// Wheels close enough to the current setpoint to launch a projectile.
    fn flywheels_up(&self) -> bool {
        let band = (1.0 - self.tuning.enter_push_qd_coef) * self.friction_qd_des.abs();
        self.drive.speed_error(self.friction_qd_des) <= band.max(self.tuning.push_angle_error)
    }

    fn push(&mut self, now: Instant, period: Duration, retry: bool) -> Option<Transition> {
        self.spin(period);
        if retry {
            // The restored target is the interrupted feed; retry it before
            // scheduling the next one.
            self.last_feed = Some(now);
        } else if self.feed_due(now) && self.flywheels_up() {
            self.trigger_q_des += self.config.push_angle;
            self.last_feed = Some(now);
            self.feeds += 1;
        }

        let (effort, joint) = self.hold_trigger(period);
        let seen = JointState { effort, ..joint };
        if !self.jam.is_block(now, &seen, &self.block_cfg) {
            return None;
        }

        self.jams += 1;
        tracing::warn!(
            position = joint.position,
            effort,
            target = self.trigger_q_des,
            "trigger jam detected"
        );
        self.pre_jam_q_des = self.trigger_q_des;
        self.block_entry = Some(BlockEntry {
            at: now,
            position: joint.position,
        });
        self.backoff_q_des = joint.position;
        self.trigger_pid.reset();
        self.jam.reset();
        let t = self.transition(State::Block);
        self.back_off(period);
        Some(t)
    }

    /// Ramp the backoff target away from the jam at `block_speed` and track it.
    fn back_off(&mut self, period: Duration) {
        let Some(entry) = self.block_entry else {
            return;
        };
        let floor = entry.position - self.block_cfg.anti_block_angle.abs();
        let step = self.block_cfg.block_speed.abs() * period.as_secs_f64();
        self.backoff_q_des = (self.backoff_q_des - step).max(floor);
        let q = self.trigger.read().position;
        let effort = self.trigger_pid.compute(self.backoff_q_des - q, period);
        self.trigger.write(effort);
    }

    fn block(&mut self, now: Instant, period: Duration) -> Option<Transition> {
        self.spin(period);
        let Some(entry) = self.block_entry else {
            // No recorded jam to recover from.
            self.trigger_q_des = self.pre_jam_q_des;
            return Some(self.transition(State::Push));
        };

        let q = self.trigger.read().position;
        let backed_off = entry.position - q;
        let elapsed = now.saturating_duration_since(entry.at).as_secs_f64();
        let cfg = self.block_cfg;
        let done = backed_off >= cfg.anti_block_angle.abs() - cfg.anti_block_error.abs();
        if !done && elapsed < cfg.block_duration {
            self.back_off(period);
            return None;
        }

        tracing::info!(backed_off, elapsed, "trigger jam cleared");
        self.trigger_q_des = self.pre_jam_q_des;
        self.block_entry = None;
        self.trigger_pid.reset();
        self.jam.reset();
        self.is_out_from_block = true;
        let t = self.transition(State::Push);
        self.hold_trigger(period);
        Some(t)
    }

    fn stop(&mut self, period: Duration) {
        self.friction_qd_des = 0.0;
        self.move_joint(period);
        self.trigger.write(0.0);
    }

    fn magazine(&mut self, period: Duration) {
        if let Some(m) = self.magazine.as_mut() {
            m.update(self.cmd.magazine_open, &self.config, period);
        }
    }
}
