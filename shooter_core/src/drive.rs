//! Flywheel actuation strategies.
//!
//! The state machine decides the flywheel speed setpoint; how many wheels
//! exist and how they are driven toward it is up to the `FlywheelDrive`
//! injected at construction.

use std::time::Duration;

use shooter_traits::Actuator;

use crate::pid::{Pid, PidGains};

/// Per-tick flywheel actuation for one launcher layout.
pub trait FlywheelDrive {
    /// Drive every wheel toward `qd_des` (rad/s, launch direction positive).
    fn move_joint(&mut self, qd_des: f64, period: Duration);

    /// Largest speed error across wheels for the setpoint `qd_des`.
    fn speed_error(&self, qd_des: f64) -> f64;

    /// Zero every wheel effort and reset controller history.
    fn relax(&mut self);

    fn wheel_count(&self) -> usize;
}

impl<D: FlywheelDrive + ?Sized> FlywheelDrive for Box<D> {
    fn move_joint(&mut self, qd_des: f64, period: Duration) {
        (**self).move_joint(qd_des, period);
    }

    fn speed_error(&self, qd_des: f64) -> f64 {
        (**self).speed_error(qd_des)
    }

    fn relax(&mut self) {
        (**self).relax();
    }

    fn wheel_count(&self) -> usize {
        (**self).wheel_count()
    }
}

/// One velocity-controlled friction wheel.
pub struct Wheel {
    actuator: Box<dyn Actuator>,
    pid: Pid,
    /// +1 spins with the setpoint, -1 against it.
    direction: f64,
}

impl Wheel {
    pub fn new(actuator: Box<dyn Actuator>, gains: PidGains) -> Self {
        Self {
            actuator,
            pid: Pid::new(gains),
            direction: 1.0,
        }
    }

    pub fn reversed(mut self) -> Self {
        self.direction = -self.direction;
        self
    }

    #[inline]
    fn drive(&mut self, qd_des: f64, period: Duration) {
        let target = self.direction * qd_des;
        let v = self.actuator.read().velocity;
        let effort = self.pid.compute(target - v, period);
        self.actuator.write(effort);
    }

    #[inline]
    fn error(&self, qd_des: f64) -> f64 {
        (self.direction * qd_des - self.actuator.read().velocity).abs()
    }

    fn relax(&mut self) {
        self.actuator.write(0.0);
        self.pid.reset();
    }
}

/// Launcher with a single friction wheel.
pub struct SingleFlywheel {
    wheel: Wheel,
}

impl SingleFlywheel {
    pub fn new(actuator: Box<dyn Actuator>, gains: PidGains) -> Self {
        Self {
            wheel: Wheel::new(actuator, gains),
        }
    }
}

impl FlywheelDrive for SingleFlywheel {
    fn move_joint(&mut self, qd_des: f64, period: Duration) {
        self.wheel.drive(qd_des, period);
    }

    fn speed_error(&self, qd_des: f64) -> f64 {
        self.wheel.error(qd_des)
    }

    fn relax(&mut self) {
        self.wheel.relax();
    }

    fn wheel_count(&self) -> usize {
        1
    }
}

/// Launcher with a pair of friction wheels; the second wheel counter-rotates
/// so both surfaces move the projectile forward.
pub struct DualFlywheel {
    left: Wheel,
    right: Wheel,
}

impl DualFlywheel {
    pub fn new(left: Box<dyn Actuator>, right: Box<dyn Actuator>, gains: PidGains) -> Self {
        Self {
            left: Wheel::new(left, gains),
            right: Wheel::new(right, gains).reversed(),
        }
    }
}

impl FlywheelDrive for DualFlywheel {
    fn move_joint(&mut self, qd_des: f64, period: Duration) {
        self.left.drive(qd_des, period);
        self.right.drive(qd_des, period);
    }

    fn speed_error(&self, qd_des: f64) -> f64 {
        self.left.error(qd_des).max(self.right.error(qd_des))
    }

    fn relax(&mut self) {
        self.left.relax();
        self.right.relax();
    }

    fn wheel_count(&self) -> usize {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::ScriptedJoint;

    const DT: Duration = Duration::from_millis(1);

    #[test]
    fn dual_drives_wheels_in_opposite_directions() {
        let left = ScriptedJoint::new();
        let right = ScriptedJoint::new();
        let mut drive = DualFlywheel::new(
            Box::new(left.clone()),
            Box::new(right.clone()),
            PidGains::p(1.0, 0.0),
        );
        drive.move_joint(10.0, DT);
        assert_eq!(left.last_effort(), Some(10.0));
        assert_eq!(right.last_effort(), Some(-10.0));
    }

    #[test]
    fn dual_speed_error_is_worst_wheel() {
        let left = ScriptedJoint::new();
        let right = ScriptedJoint::new();
        left.set_velocity(9.5);
        right.set_velocity(-8.0);
        let drive = DualFlywheel::new(
            Box::new(left.clone()),
            Box::new(right.clone()),
            PidGains::p(1.0, 0.0),
        );
        assert!((drive.speed_error(10.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn relax_writes_zero() {
        let wheel = ScriptedJoint::new();
        let mut drive = SingleFlywheel::new(Box::new(wheel.clone()), PidGains::p(1.0, 0.0));
        drive.move_joint(5.0, DT);
        drive.relax();
        assert_eq!(wheel.last_effort(), Some(0.0));
        assert_eq!(drive.wheel_count(), 1);
    }
}
