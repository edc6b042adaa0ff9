//! Magazine gate sub-state machine.

use std::time::Duration;

use shooter_traits::Actuator;

use crate::pid::{Pid, PidGains};
use crate::types::{Config, MagazineState};

pub struct Magazine {
    actuator: Box<dyn Actuator>,
    pid: Pid,
    state: MagazineState,
    closed_position: f64,
    target: f64,
}

impl Magazine {
    pub fn new(actuator: Box<dyn Actuator>, gains: PidGains, closed_position: f64) -> Self {
        Self {
            actuator,
            pid: Pid::new(gains),
            state: MagazineState::Passive,
            closed_position,
            target: closed_position,
        }
    }

    pub fn state(&self) -> MagazineState {
        self.state
    }

    /// Position the gate is currently driven toward.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Select OPEN/CLOSE from the command flag and drive the gate there.
    pub fn update(&mut self, open: bool, config: &Config, period: Duration) {
        let next = if open {
            MagazineState::Open
        } else {
            MagazineState::Close
        };
        if next != self.state {
            tracing::debug!(from = ?self.state, to = ?next, "magazine state change");
            self.state = next;
            self.pid.reset();
        }
        self.target = match self.state {
            MagazineState::Open => config.magazine_q_des,
            _ => self.closed_position,
        };
        let q = self.actuator.read().position;
        let effort = self.pid.compute(self.target - q, period);
        self.actuator.write(effort);
    }

    /// Release the gate: zero effort, back to PASSIVE.
    pub fn passive(&mut self) {
        if self.state != MagazineState::Passive {
            tracing::debug!(from = ?self.state, "magazine passive");
        }
        self.state = MagazineState::Passive;
        self.pid.reset();
        self.actuator.write(0.0);
    }
}
