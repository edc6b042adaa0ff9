//! Simulated launcher hardware.
//!
//! `SimRig` owns a set of named joints integrated with a first-order
//! effort → velocity model and hands them out as `Actuator`s through
//! `ActuatorProvider`. A joint can carry a `Jam`: a hard stop the joint
//! cannot pass in the positive direction until it has backed away from it.
//!
//! The rig is single-threaded (`Rc<RefCell<_>>`): build it and the controller
//! on the thread that runs the control loop, and call `SimRig::advance` once
//! per tick.
pub mod error;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use shooter_traits::{Actuator, ActuatorProvider, JointState};

pub use error::HwError;

/// Plant parameters for one joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointModel {
    /// Rotor inertia (kg·m²).
    pub inertia: f64,
    /// Viscous damping (N·m·s/rad).
    pub damping: f64,
    /// Applied effort is clamped to ±effort_limit (0 = unclamped).
    pub effort_limit: f64,
    /// Optional hard travel limits.
    pub min_position: Option<f64>,
    pub max_position: Option<f64>,
}

impl JointModel {
    pub fn flywheel() -> Self {
        Self {
            inertia: 0.001,
            damping: 0.001,
            effort_limit: 10.0,
            min_position: None,
            max_position: None,
        }
    }

    pub fn trigger() -> Self {
        Self {
            inertia: 0.001,
            damping: 0.01,
            effort_limit: 5.0,
            min_position: None,
            max_position: None,
        }
    }

    pub fn magazine() -> Self {
        Self {
            inertia: 0.002,
            damping: 0.02,
            effort_limit: 2.0,
            min_position: Some(0.0),
            max_position: Some(std::f64::consts::PI),
        }
    }
}

/// Mechanical obstruction on a joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jam {
    /// Position the joint cannot pass while moving forward.
    pub at: f64,
    /// Once the joint has hit the stop and then backed off this far below
    /// `at`, the obstruction is cleared.
    pub clear_after_backoff: f64,
}

#[derive(Debug)]
pub struct SimJoint {
    model: JointModel,
    state: JointState,
    command: f64,
    jam: Option<Jam>,
    jam_engaged: bool,
}

impl SimJoint {
    pub fn new(model: JointModel) -> Self {
        Self {
            model,
            state: JointState::default(),
            command: 0.0,
            jam: None,
            jam_engaged: false,
        }
    }

    pub fn state(&self) -> JointState {
        self.state
    }

    pub fn is_jammed(&self) -> bool {
        self.jam.is_some() && self.jam_engaged
    }

    /// Integrate the joint over `dt` seconds using the last written effort.
    pub fn step(&mut self, dt: f64) {
        if dt <= 0.0 || self.model.inertia <= 0.0 {
            return;
        }
        let u = if self.model.effort_limit > 0.0 {
            self.command
                .clamp(-self.model.effort_limit, self.model.effort_limit)
        } else {
            self.command
        };
        let acc = (u - self.model.damping * self.state.velocity) / self.model.inertia;
        let mut v = self.state.velocity + acc * dt;
        let mut q = self.state.position + v * dt;

        if let Some(max) = self.model.max_position
            && q >= max
        {
            q = max;
            v = v.min(0.0);
        }
        if let Some(min) = self.model.min_position
            && q <= min
        {
            q = min;
            v = v.max(0.0);
        }

        if let Some(jam) = self.jam {
            if q >= jam.at && v >= 0.0 {
                if !self.jam_engaged {
                    tracing::debug!(at = jam.at, "sim joint hit obstruction");
                }
                q = jam.at;
                v = 0.0;
                self.jam_engaged = true;
            } else if self.jam_engaged && q <= jam.at - jam.clear_after_backoff {
                tracing::debug!(at = jam.at, position = q, "sim obstruction cleared");
                self.jam = None;
                self.jam_engaged = false;
            }
        }

        self.state = JointState {
            position: q,
            velocity: v,
            effort: u,
        };
    }
}

/// Actuator handle onto a `SimJoint`.
#[derive(Debug, Clone)]
pub struct SimActuator(Rc<RefCell<SimJoint>>);

impl Actuator for SimActuator {
    fn read(&self) -> JointState {
        self.0.borrow().state
    }

    fn write(&mut self, effort: f64) {
        let mut joint = self.0.borrow_mut();
        joint.command = effort;
        // Readback reports the applied effort immediately, as effort drivers do.
        joint.state.effort = if joint.model.effort_limit > 0.0 {
            effort.clamp(-joint.model.effort_limit, joint.model.effort_limit)
        } else {
            effort
        };
    }
}

/// Collection of named simulated joints.
#[derive(Debug, Default)]
pub struct SimRig {
    joints: HashMap<String, Rc<RefCell<SimJoint>>>,
    order: Vec<String>,
    claimed: Vec<String>,
}

impl SimRig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a joint.
    pub fn with_joint(mut self, name: &str, model: JointModel) -> Self {
        self.add_joint(name, model);
        self
    }

    pub fn add_joint(&mut self, name: &str, model: JointModel) {
        if !self.joints.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.joints
            .insert(name.to_string(), Rc::new(RefCell::new(SimJoint::new(model))));
    }

    /// Place an obstruction on a joint.
    pub fn set_jam(&mut self, name: &str, jam: Jam) -> Result<(), HwError> {
        let joint = self
            .joints
            .get(name)
            .ok_or_else(|| HwError::UnknownJoint(name.to_string()))?;
        let mut j = joint.borrow_mut();
        j.jam = Some(jam);
        j.jam_engaged = false;
        Ok(())
    }

    pub fn joint(&self, name: &str) -> Option<JointState> {
        self.joints.get(name).map(|j| j.borrow().state)
    }

    pub fn is_jammed(&self, name: &str) -> bool {
        self.joints
            .get(name)
            .is_some_and(|j| j.borrow().is_jammed())
    }

    pub fn joint_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Integrate every joint over `dt`.
    pub fn advance(&self, dt: Duration) {
        let dt = dt.as_secs_f64();
        for name in &self.order {
            if let Some(j) = self.joints.get(name) {
                j.borrow_mut().step(dt);
            }
        }
    }
}

impl ActuatorProvider for SimRig {
    fn claim(
        &mut self,
        joint: &str,
    ) -> Result<Box<dyn Actuator>, Box<dyn std::error::Error + Send + Sync>> {
        let handle = self
            .joints
            .get(joint)
            .ok_or_else(|| HwError::UnknownJoint(joint.to_string()))?;
        if self.claimed.iter().any(|c| c == joint) {
            return Err(Box::new(HwError::AlreadyClaimed(joint.to_string())));
        }
        self.claimed.push(joint.to_string());
        tracing::debug!(joint, "sim actuator claimed");
        Ok(Box::new(SimActuator(Rc::clone(handle))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: Duration = Duration::from_millis(1);

    #[test]
    fn positive_effort_spins_joint_forward() {
        let mut rig = SimRig::new().with_joint("w", JointModel::flywheel());
        let mut a = rig.claim("w").expect("claim");
        a.write(1.0);
        for _ in 0..10 {
            rig.advance(DT);
        }
        let s = a.read();
        assert!(s.velocity > 0.0);
        assert!(s.position > 0.0);
        assert_eq!(s.effort, 1.0);
    }

    #[test]
    fn effort_readback_is_clamped() {
        let mut rig = SimRig::new().with_joint("t", JointModel::trigger());
        let mut a = rig.claim("t").expect("claim");
        a.write(100.0);
        assert_eq!(a.read().effort, 5.0);
    }

    #[test]
    fn unknown_and_double_claims_fail() {
        let mut rig = SimRig::new().with_joint("t", JointModel::trigger());
        let err = rig.claim("nope").err().expect("unknown");
        assert!(err.to_string().contains("unknown joint"));
        let _first = rig.claim("t").expect("first claim");
        let err = rig.claim("t").err().expect("second claim");
        assert!(err.to_string().contains("already claimed"));
    }
}
