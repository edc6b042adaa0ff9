//! PID controller with backward Euler integration, clamped integral and
//! clamped output.
//!
//! Zero ki disables the integral; zero kd disables the derivative.

use std::time::Duration;

/// PID gains.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PidGains {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain (0 = disabled).
    pub ki: f64,
    /// Derivative gain (0 = disabled).
    pub kd: f64,
    /// Integral term clamp, symmetric (0 = unclamped).
    pub i_clamp: f64,
    /// Output clamp, symmetric (0 = unclamped).
    pub out_max: f64,
}

impl PidGains {
    pub const fn p(kp: f64, out_max: f64) -> Self {
        Self {
            kp,
            ki: 0.0,
            kd: 0.0,
            i_clamp: 0.0,
            out_max,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Pid {
    gains: PidGains,
    integral: f64,
    prev_error: Option<f64>,
    last_output: f64,
}

impl Pid {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            ..Self::default()
        }
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    /// Output of the most recent `compute` (0 after reset).
    pub fn last_output(&self) -> f64 {
        self.last_output
    }

    /// Clear integral and derivative history.
    #[inline]
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
        self.last_output = 0.0;
    }

    /// One control cycle for `error` (setpoint − measurement).
    ///
    /// A zero period returns 0 without touching state. The first cycle after
    /// a reset has no derivative term.
    #[inline]
    pub fn compute(&mut self, error: f64, period: Duration) -> f64 {
        let dt = period.as_secs_f64();
        if dt <= 0.0 || !error.is_finite() {
            return 0.0;
        }
        let g = &self.gains;

        let p_term = g.kp * error;

        let i_term = if g.ki != 0.0 {
            self.integral += g.ki * error * dt;
            if g.i_clamp > 0.0 {
                self.integral = self.integral.clamp(-g.i_clamp, g.i_clamp);
            }
            self.integral
        } else {
            self.integral = 0.0;
            0.0
        };

        let d_term = match self.prev_error {
            Some(prev) if g.kd != 0.0 => g.kd * (error - prev) / dt,
            _ => 0.0,
        };
        self.prev_error = Some(error);

        let raw = p_term + i_term + d_term;
        let out = if g.out_max > 0.0 {
            raw.clamp(-g.out_max, g.out_max)
        } else {
            raw
        };
        self.last_output = out;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: Duration = Duration::from_millis(1);

    #[test]
    fn pure_proportional() {
        let mut pid = Pid::new(PidGains::p(10.0, 0.0));
        let out = pid.compute(1.0, DT);
        assert!((out - 10.0).abs() < 1e-12);
    }

    #[test]
    fn output_is_clamped() {
        let mut pid = Pid::new(PidGains::p(10.0, 2.0));
        assert_eq!(pid.compute(1.0, DT), 2.0);
        assert_eq!(pid.compute(-1.0, DT), -2.0);
    }

    #[test]
    fn integral_accumulates_and_clamps() {
        let mut pid = Pid::new(PidGains {
            ki: 100.0,
            i_clamp: 0.25,
            ..PidGains::default()
        });
        let first = pid.compute(1.0, DT);
        assert!((first - 0.1).abs() < 1e-12);
        for _ in 0..10 {
            pid.compute(1.0, DT);
        }
        assert!((pid.compute(1.0, DT) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn derivative_skips_first_cycle() {
        let mut pid = Pid::new(PidGains {
            kd: 0.01,
            ..PidGains::default()
        });
        assert_eq!(pid.compute(1.0, DT), 0.0);
        let out = pid.compute(2.0, DT);
        assert!((out - 10.0).abs() < 1e-9);
    }

    #[test]
    fn zero_period_is_inert() {
        let mut pid = Pid::new(PidGains::p(1.0, 0.0));
        assert_eq!(pid.compute(5.0, Duration::ZERO), 0.0);
        assert_eq!(pid.last_output(), 0.0);
    }

    #[test]
    fn reset_clears_history() {
        let mut pid = Pid::new(PidGains {
            ki: 10.0,
            ..PidGains::default()
        });
        pid.compute(1.0, DT);
        pid.reset();
        assert_eq!(pid.last_output(), 0.0);
        let out = pid.compute(1.0, DT);
        assert!((out - 0.01).abs() < 1e-12);
    }
}
