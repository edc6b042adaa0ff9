//! `From` implementations bridging `shooter_config` types to `shooter_core`
//! types, plus the checked conversion for inbound commands.

use shooter_config::messages::CommandMsg;

use crate::config::Tuning;
use crate::error::ShooterError;
use crate::jam::JamPredicate;
use crate::pid::PidGains;
use crate::types::{BlockConfig, Config, MuzzleSpeed, ShootCommand};

// ── PidGains ─────────────────────────────────────────────────────────────────

impl From<&shooter_config::PidGains> for PidGains {
    fn from(c: &shooter_config::PidGains) -> Self {
        Self {
            kp: c.kp,
            ki: c.ki,
            kd: c.kd,
            i_clamp: c.i_clamp,
            out_max: c.out_max,
        }
    }
}

// ── Config ───────────────────────────────────────────────────────────────────

impl From<&shooter_config::DynamicCfg> for Config {
    fn from(c: &shooter_config::DynamicCfg) -> Self {
        Self {
            push_angle: c.push_angle,
            magazine_q_des: c.magazine_q_des,
            qd_10: c.qd_10,
            qd_15: c.qd_15,
            qd_16: c.qd_16,
            qd_18: c.qd_18,
            qd_30: c.qd_30,
        }
    }
}

// ── BlockConfig ──────────────────────────────────────────────────────────────

impl From<&shooter_config::BlockCfg> for BlockConfig {
    fn from(c: &shooter_config::BlockCfg) -> Self {
        Self {
            block_effort: c.block_effort,
            block_duration: c.block_duration,
            block_speed: c.block_speed,
            anti_block_angle: c.anti_block_angle,
            anti_block_error: c.anti_block_error,
        }
    }
}

// ── Tuning / JamPredicate ────────────────────────────────────────────────────

impl From<&shooter_config::ShooterCfg> for Tuning {
    fn from(c: &shooter_config::ShooterCfg) -> Self {
        Self {
            push_angle_error: c.push_angle_error,
            enter_push_qd_coef: c.enter_push_qd_coef,
            magazine_closed_position: c.magazine_closed_position,
        }
    }
}

impl From<&shooter_config::ShooterCfg> for JamPredicate {
    fn from(c: &shooter_config::ShooterCfg) -> Self {
        Self {
            stall_velocity: c.stall_velocity,
        }
    }
}

// ── ShootCommand ─────────────────────────────────────────────────────────────

impl TryFrom<&CommandMsg> for ShootCommand {
    type Error = ShooterError;

    fn try_from(c: &CommandMsg) -> Result<Self, Self::Error> {
        let speed = MuzzleSpeed::from_level(c.speed).ok_or_else(|| {
            ShooterError::Update(format!(
                "speed must be one of 10, 15, 16, 18, 30 (got {})",
                c.speed
            ))
        })?;
        if !c.rate_hz.is_finite() || c.rate_hz < 0.0 {
            return Err(ShooterError::Update(format!(
                "rate_hz must be finite and >= 0 (got {})",
                c.rate_hz
            )));
        }
        Ok(Self {
            fire_enable: c.fire_enable,
            speed,
            rate_hz: c.rate_hz,
            magazine_open: c.magazine_open,
            stop: c.stop,
        })
    }
}
