#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas for the launcher controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `[dynamic]` and `[block]` hold the hot-tunable parameters; they are
//!   published once at startup and may be replaced at runtime through
//!   `messages::Message`.
//! - Everything else is read once when the controller is built.
use serde::Deserialize;

pub mod messages;

/// Flywheel layout of the launcher.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// One friction wheel.
    #[default]
    Single,
    /// Two counter-rotating friction wheels.
    Dual,
}

impl Topology {
    pub fn wheel_count(self) -> usize {
        match self {
            Topology::Single => 1,
            Topology::Dual => 2,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Joints {
    #[serde(default)]
    pub topology: Topology,
    /// Friction wheel joint names, in drive order.
    pub friction: Vec<String>,
    pub trigger: String,
    /// Magazine gate joint; launchers without a gate leave this out.
    #[serde(default)]
    pub magazine: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Symmetric clamp on the integral term (0 = unclamped).
    pub i_clamp: f64,
    /// Symmetric output clamp (0 = unclamped).
    pub out_max: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            i_clamp: 0.0,
            out_max: 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PidSet {
    pub friction: PidGains,
    pub trigger: PidGains,
    #[serde(default)]
    pub magazine: PidGains,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ShooterCfg {
    /// Flywheel speed error (rad/s) under which READY may enter PUSH.
    pub push_angle_error: f64,
    /// Fraction of the flywheel setpoint the wheels must hold for each feed
    /// in PUSH, in (0, 1].
    pub enter_push_qd_coef: f64,
    /// Trigger speed (rad/s) at or below which the trigger counts as stalled.
    pub stall_velocity: f64,
    /// Magazine gate position commanded while closed.
    pub magazine_closed_position: f64,
    /// Control loop rate.
    pub control_hz: u32,
}

impl Default for ShooterCfg {
    fn default() -> Self {
        Self {
            push_angle_error: 1.0,
            enter_push_qd_coef: 0.9,
            stall_velocity: 0.05,
            magazine_closed_position: 0.0,
            control_hz: 1000,
        }
    }
}

/// Hot-tunable feed and flywheel parameters.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(default)]
pub struct DynamicCfg {
    pub push_angle: f64,
    pub magazine_q_des: f64,
    pub qd_10: f64,
    pub qd_15: f64,
    pub qd_16: f64,
    pub qd_18: f64,
    pub qd_30: f64,
}

/// Hot-tunable jam detection and recovery parameters.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(default)]
pub struct BlockCfg {
    pub block_effort: f64,
    /// Seconds.
    pub block_duration: f64,
    pub block_speed: f64,
    pub anti_block_angle: f64,
    pub anti_block_error: f64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub joints: Joints,
    pub pid: PidSet,
    #[serde(default)]
    pub shooter: ShooterCfg,
    /// Initial feed/flywheel parameters published at startup.
    #[serde(default)]
    pub dynamic: DynamicCfg,
    /// Initial jam parameters published at startup.
    #[serde(default)]
    pub block: BlockCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))
}

fn check_gains(section: &str, g: &PidGains, need_output: bool) -> eyre::Result<()> {
    for (name, v) in [
        ("kp", g.kp),
        ("ki", g.ki),
        ("kd", g.kd),
        ("i_clamp", g.i_clamp),
        ("out_max", g.out_max),
    ] {
        if !v.is_finite() || v < 0.0 {
            eyre::bail!("pid.{section}.{name} must be finite and >= 0");
        }
    }
    if need_output && g.out_max == 0.0 {
        eyre::bail!("pid.{section}.out_max must be > 0");
    }
    Ok(())
}

impl DynamicCfg {
    pub fn validate(&self) -> eyre::Result<()> {
        for (name, v) in [
            ("push_angle", self.push_angle),
            ("magazine_q_des", self.magazine_q_des),
            ("qd_10", self.qd_10),
            ("qd_15", self.qd_15),
            ("qd_16", self.qd_16),
            ("qd_18", self.qd_18),
            ("qd_30", self.qd_30),
        ] {
            if !v.is_finite() {
                eyre::bail!("dynamic.{name} must be finite");
            }
        }
        if self.push_angle < 0.0 {
            eyre::bail!("dynamic.push_angle must be >= 0");
        }
        for (name, v) in [
            ("qd_10", self.qd_10),
            ("qd_15", self.qd_15),
            ("qd_16", self.qd_16),
            ("qd_18", self.qd_18),
            ("qd_30", self.qd_30),
        ] {
            if v < 0.0 {
                eyre::bail!("dynamic.{name} must be >= 0");
            }
        }
        Ok(())
    }
}

impl BlockCfg {
    pub fn validate(&self) -> eyre::Result<()> {
        for (name, v) in [
            ("block_effort", self.block_effort),
            ("block_duration", self.block_duration),
            ("block_speed", self.block_speed),
            ("anti_block_angle", self.anti_block_angle),
            ("anti_block_error", self.anti_block_error),
        ] {
            if !v.is_finite() || v < 0.0 {
                eyre::bail!("block.{name} must be finite and >= 0");
            }
        }
        if self.block_duration > 60.0 {
            eyre::bail!("block.block_duration is unreasonably large (>60s)");
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Joints
        let wheels = self.joints.topology.wheel_count();
        if self.joints.friction.len() != wheels {
            eyre::bail!(
                "joints.friction must name {} joint(s) for topology {:?}, got {}",
                wheels,
                self.joints.topology,
                self.joints.friction.len()
            );
        }
        let mut names: Vec<&str> = self.joints.friction.iter().map(String::as_str).collect();
        names.push(self.joints.trigger.as_str());
        if let Some(m) = &self.joints.magazine {
            names.push(m.as_str());
        }
        if names.iter().any(|n| n.trim().is_empty()) {
            eyre::bail!("joints: joint names must not be empty");
        }
        for (i, a) in names.iter().enumerate() {
            if names[i + 1..].contains(a) {
                eyre::bail!("joints: joint {a:?} is assigned twice");
            }
        }

        // PID
        check_gains("friction", &self.pid.friction, true)?;
        check_gains("trigger", &self.pid.trigger, true)?;
        check_gains("magazine", &self.pid.magazine, self.joints.magazine.is_some())?;

        // Shooter
        if !self.shooter.push_angle_error.is_finite() || self.shooter.push_angle_error <= 0.0 {
            eyre::bail!("shooter.push_angle_error must be > 0");
        }
        let coef = self.shooter.enter_push_qd_coef;
        if !(coef > 0.0 && coef <= 1.0) {
            eyre::bail!("shooter.enter_push_qd_coef must be in (0, 1]");
        }
        if !self.shooter.stall_velocity.is_finite() || self.shooter.stall_velocity < 0.0 {
            eyre::bail!("shooter.stall_velocity must be >= 0");
        }
        if !self.shooter.magazine_closed_position.is_finite() {
            eyre::bail!("shooter.magazine_closed_position must be finite");
        }
        if !(1..=10_000).contains(&self.shooter.control_hz) {
            eyre::bail!("shooter.control_hz must be in [1, 10000]");
        }

        self.dynamic.validate()?;
        self.block.validate()?;

        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
