pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Snapshot of one joint as seen by the control tick.
///
/// `effort` is the effort currently applied to the joint (the last command on
/// most drivers; a measured value where the hardware reports one).
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct JointState {
    pub position: f64,
    pub velocity: f64,
    pub effort: f64,
}

/// Effort-controlled joint handle.
///
/// Both calls run inside the real-time tick: implementations must not block
/// and must not fail. A written effort takes effect on the next hardware cycle.
pub trait Actuator {
    fn read(&self) -> JointState;
    fn write(&mut self, effort: f64);
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn read(&self) -> JointState {
        (**self).read()
    }

    fn write(&mut self, effort: f64) {
        (**self).write(effort);
    }
}

/// Hands out actuators by joint name during setup (never from the tick).
pub trait ActuatorProvider {
    fn claim(
        &mut self,
        joint: &str,
    ) -> Result<Box<dyn Actuator>, Box<dyn std::error::Error + Send + Sync>>;
}
