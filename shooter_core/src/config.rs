//! Static controller tuning fixed at construction.

/// Parameters that do not change while the controller runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    /// Largest flywheel speed error (rad/s) at which feeding may start.
    pub push_angle_error: f64,
    /// Each feed in PUSH waits until the flywheels are within
    /// `(1 - enter_push_qd_coef) * |setpoint|` of the setpoint (or within
    /// `push_angle_error`, whichever is wider).
    pub enter_push_qd_coef: f64,
    /// Magazine gate position in CLOSE (rad).
    pub magazine_closed_position: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            push_angle_error: 1.0,
            enter_push_qd_coef: 0.9,
            magazine_closed_position: 0.0,
        }
    }
}

impl Tuning {
    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if !self.push_angle_error.is_finite() || self.push_angle_error < 0.0 {
            return Err("push_angle_error must be finite and >= 0");
        }
        if !(self.enter_push_qd_coef > 0.0 && self.enter_push_qd_coef <= 1.0) {
            return Err("enter_push_qd_coef must be in (0, 1]");
        }
        if !self.magazine_closed_position.is_finite() {
            return Err("magazine_closed_position must be finite");
        }
        Ok(())
    }
}
