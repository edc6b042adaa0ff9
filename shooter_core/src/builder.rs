//! Type-state builder for `Shooter` and the config-driven `build_shooter`
//! constructor.
//!
//! The builder enforces at compile time that the exchanges, the flywheel
//! drive and the trigger are provided before `build()` is available.
//! `try_build()` is always available for dynamic checks.

use std::marker::PhantomData;

use shooter_traits::{Actuator, ActuatorProvider};

use crate::config::Tuning;
use crate::drive::{DualFlywheel, FlywheelDrive, SingleFlywheel};
use crate::error::{BuildError, Result};
use crate::exchange::Exchanges;
use crate::hw_error::map_claim_error;
use crate::jam::{JamDetector, JamPredicate};
use crate::magazine::Magazine;
use crate::pid::{Pid, PidGains};
use crate::shooter::Shooter;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Shooter`. All fields are validated on `build()`.
pub struct ShooterBuilder<'a, X, D, T> {
    exchanges: Option<&'a Exchanges>,
    drive: Option<Box<dyn FlywheelDrive>>,
    trigger: Option<(Box<dyn Actuator>, PidGains)>,
    magazine: Option<(Box<dyn Actuator>, PidGains)>,
    tuning: Tuning,
    predicate: JamPredicate,
    _x: PhantomData<X>,
    _d: PhantomData<D>,
    _t: PhantomData<T>,
}

impl Default for ShooterBuilder<'_, Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            exchanges: None,
            drive: None,
            trigger: None,
            magazine: None,
            tuning: Tuning::default(),
            predicate: JamPredicate::default(),
            _x: PhantomData,
            _d: PhantomData,
            _t: PhantomData,
        }
    }
}

impl<'a, X, D, T> ShooterBuilder<'a, X, D, T> {
    fn retype<X2, D2, T2>(self) -> ShooterBuilder<'a, X2, D2, T2> {
        ShooterBuilder {
            exchanges: self.exchanges,
            drive: self.drive,
            trigger: self.trigger,
            magazine: self.magazine,
            tuning: self.tuning,
            predicate: self.predicate,
            _x: PhantomData,
            _d: PhantomData,
            _t: PhantomData,
        }
    }

    /// Optional magazine gate actuator. Without one the magazine sub-state
    /// stays PASSIVE.
    pub fn with_magazine(mut self, actuator: impl Actuator + 'static, gains: PidGains) -> Self {
        self.magazine = Some((Box::new(actuator), gains));
        self
    }

    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_jam_predicate(mut self, predicate: JamPredicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Validate and build regardless of type-state; missing parts are
    /// reported as `BuildError`.
    pub fn try_build(self) -> Result<Shooter<'a>> {
        let exchanges = self
            .exchanges
            .ok_or_else(|| eyre::Report::new(BuildError::MissingExchanges))?;
        let drive = self
            .drive
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDrive))?;
        let (trigger, trigger_gains) = self
            .trigger
            .ok_or_else(|| eyre::Report::new(BuildError::MissingTrigger))?;
        validate_and_build(
            exchanges,
            drive,
            trigger,
            trigger_gains,
            self.magazine,
            self.tuning,
            self.predicate,
        )
    }
}

impl<'a, D, T> ShooterBuilder<'a, Missing, D, T> {
    pub fn with_exchanges(mut self, exchanges: &'a Exchanges) -> ShooterBuilder<'a, Set, D, T> {
        self.exchanges = Some(exchanges);
        self.retype()
    }
}

impl<'a, X, T> ShooterBuilder<'a, X, Missing, T> {
    pub fn with_drive(
        mut self,
        drive: impl FlywheelDrive + 'static,
    ) -> ShooterBuilder<'a, X, Set, T> {
        self.drive = Some(Box::new(drive));
        self.retype()
    }
}

impl<'a, X, D> ShooterBuilder<'a, X, D, Missing> {
    pub fn with_trigger(
        mut self,
        actuator: impl Actuator + 'static,
        gains: PidGains,
    ) -> ShooterBuilder<'a, X, D, Set> {
        self.trigger = Some((Box::new(actuator), gains));
        self.retype()
    }
}

impl<'a> ShooterBuilder<'a, Set, Set, Set> {
    pub fn build(self) -> Result<Shooter<'a>> {
        self.try_build()
    }
}

fn gains_ok(g: &PidGains) -> bool {
    [g.kp, g.ki, g.kd, g.i_clamp, g.out_max]
        .iter()
        .all(|v| v.is_finite())
        && g.i_clamp >= 0.0
        && g.out_max >= 0.0
}

/// Validate static parameters and assemble the controller.
///
/// Shared by `ShooterBuilder::try_build()` and `build_shooter()`.
fn validate_and_build<'a>(
    exchanges: &'a Exchanges,
    drive: Box<dyn FlywheelDrive>,
    trigger: Box<dyn Actuator>,
    trigger_gains: PidGains,
    magazine: Option<(Box<dyn Actuator>, PidGains)>,
    tuning: Tuning,
    predicate: JamPredicate,
) -> Result<Shooter<'a>> {
    tuning
        .validate()
        .map_err(|m| eyre::Report::new(BuildError::InvalidConfig(m)))?;
    if !predicate.stall_velocity.is_finite() || predicate.stall_velocity < 0.0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "stall_velocity must be finite and >= 0",
        )));
    }
    if drive.wheel_count() == 0 {
        return Err(eyre::Report::new(BuildError::MissingDrive));
    }
    if !gains_ok(&trigger_gains) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "trigger gains must be finite with non-negative clamps",
        )));
    }
    let magazine = match magazine {
        Some((actuator, gains)) => {
            if !gains_ok(&gains) {
                return Err(eyre::Report::new(BuildError::InvalidConfig(
                    "magazine gains must be finite with non-negative clamps",
                )));
            }
            Some(Magazine::new(
                actuator,
                gains,
                tuning.magazine_closed_position,
            ))
        }
        None => None,
    };

    Ok(Shooter::new(
        exchanges,
        drive,
        trigger,
        Pid::new(trigger_gains),
        magazine,
        JamDetector::new(predicate),
        tuning,
    ))
}

fn claim<P: ActuatorProvider + ?Sized>(provider: &mut P, joint: &str) -> Result<Box<dyn Actuator>> {
    provider
        .claim(joint)
        .map_err(|e| map_claim_error(joint, e.as_ref()))
}

/// Build a controller from a validated configuration, claiming every named
/// joint from `provider`. Any claim failure aborts construction.
pub fn build_shooter<'a, P: ActuatorProvider + ?Sized>(
    provider: &mut P,
    exchanges: &'a Exchanges,
    cfg: &shooter_config::Config,
) -> Result<Shooter<'a>> {
    use shooter_config::Topology;

    let wheel_gains = PidGains::from(&cfg.pid.friction);
    let names = &cfg.joints.friction;
    let drive: Box<dyn FlywheelDrive> = match cfg.joints.topology {
        Topology::Single => {
            let name = names
                .first()
                .ok_or_else(|| eyre::Report::new(BuildError::MissingActuator("friction".into())))?;
            Box::new(SingleFlywheel::new(claim(provider, name)?, wheel_gains))
        }
        Topology::Dual => {
            let [left, right] = names.as_slice() else {
                return Err(eyre::Report::new(BuildError::InvalidConfig(
                    "dual topology needs exactly two friction joints",
                )));
            };
            let left = claim(provider, left)?;
            let right = claim(provider, right)?;
            Box::new(DualFlywheel::new(left, right, wheel_gains))
        }
    };
    let trigger = claim(provider, &cfg.joints.trigger)?;
    let magazine = match cfg.joints.magazine.as_deref() {
        Some(name) => Some((claim(provider, name)?, PidGains::from(&cfg.pid.magazine))),
        None => None,
    };

    validate_and_build(
        exchanges,
        drive,
        trigger,
        PidGains::from(&cfg.pid.trigger),
        magazine,
        Tuning::from(&cfg.shooter),
        JamPredicate::from(&cfg.shooter),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{NullActuator, ScriptedJoint};

    #[test]
    fn try_build_reports_missing_parts() {
        let ex = Exchanges::new();
        let err = ShooterBuilder::default()
            .with_exchanges(&ex)
            .with_trigger(NullActuator, PidGains::p(1.0, 0.0))
            .try_build()
            .unwrap_err();
        assert_eq!(err.downcast_ref::<BuildError>(), Some(&BuildError::MissingDrive));

        let err = ShooterBuilder::default()
            .with_drive(SingleFlywheel::new(Box::new(NullActuator), PidGains::default()))
            .with_trigger(NullActuator, PidGains::default())
            .try_build()
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<BuildError>(),
            Some(&BuildError::MissingExchanges)
        );
    }

    #[test]
    fn negative_push_angle_error_is_rejected() {
        let ex = Exchanges::new();
        let err = Shooter::builder()
            .with_exchanges(&ex)
            .with_drive(SingleFlywheel::new(Box::new(NullActuator), PidGains::default()))
            .with_trigger(ScriptedJoint::new(), PidGains::default())
            .with_tuning(Tuning {
                push_angle_error: -1.0,
                ..Tuning::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_feed_speed_coefficient_is_rejected() {
        let ex = Exchanges::new();
        let err = Shooter::builder()
            .with_exchanges(&ex)
            .with_drive(SingleFlywheel::new(Box::new(NullActuator), PidGains::default()))
            .with_trigger(ScriptedJoint::new(), PidGains::default())
            .with_tuning(Tuning {
                enter_push_qd_coef: 0.0,
                ..Tuning::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::InvalidConfig(_))
        ));
    }

    #[test]
    fn magazine_is_optional() {
        let ex = Exchanges::new();
        let s = Shooter::builder()
            .with_exchanges(&ex)
            .with_drive(SingleFlywheel::new(Box::new(NullActuator), PidGains::default()))
            .with_trigger(NullActuator, PidGains::default())
            .build()
            .unwrap();
        assert_eq!(s.magazine_state(), crate::types::MagazineState::Passive);
        assert_eq!(s.wheel_count(), 1);
    }
}
