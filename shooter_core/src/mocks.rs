//! Test and helper actuators for shooter_core.

use std::cell::RefCell;
use std::rc::Rc;

use shooter_traits::{Actuator, JointState};

#[derive(Debug, Default)]
struct Inner {
    state: JointState,
    writes: Vec<f64>,
}

/// Actuator whose measured state is set by the test and whose effort writes
/// are recorded. Clones share the same joint, so a test keeps one clone and
/// hands the other to the controller.
#[derive(Debug, Clone, Default)]
pub struct ScriptedJoint(Rc<RefCell<Inner>>);

impl ScriptedJoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&self, state: JointState) {
        self.0.borrow_mut().state = state;
    }

    pub fn set_position(&self, position: f64) {
        self.0.borrow_mut().state.position = position;
    }

    pub fn set_velocity(&self, velocity: f64) {
        self.0.borrow_mut().state.velocity = velocity;
    }

    pub fn state(&self) -> JointState {
        self.0.borrow().state
    }

    pub fn last_effort(&self) -> Option<f64> {
        self.0.borrow().writes.last().copied()
    }

    pub fn writes(&self) -> Vec<f64> {
        self.0.borrow().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.0.borrow_mut().writes.clear();
    }
}

impl Actuator for ScriptedJoint {
    fn read(&self) -> JointState {
        self.0.borrow().state
    }

    fn write(&mut self, effort: f64) {
        let mut inner = self.0.borrow_mut();
        inner.state.effort = effort;
        inner.writes.push(effort);
    }
}

/// Actuator that reads as a joint at rest and ignores writes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullActuator;

impl Actuator for NullActuator {
    fn read(&self) -> JointState {
        JointState::default()
    }

    fn write(&mut self, _effort: f64) {}
}
