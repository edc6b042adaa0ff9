//! Maps `Box<dyn Error>` from trait boundaries to typed errors.
//!
//! `shooter_traits::ActuatorProvider` returns `Box<dyn Error + Send + Sync>`
//! for maximum flexibility; this module converts those to `BuildError`, with
//! an optional feature-gated path for `shooter_hardware::HwError` downcasting.

use crate::error::{BuildError, ShooterError};

/// Map a failed actuator claim for `joint` to a typed error.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_claim_error(joint: &str, e: &(dyn std::error::Error + 'static)) -> eyre::Report {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<shooter_hardware::HwError>() {
            return match hw {
                shooter_hardware::HwError::UnknownJoint(_) => {
                    eyre::Report::new(BuildError::MissingActuator(joint.to_string()))
                }
                other => eyre::Report::new(ShooterError::Hardware(other.to_string())),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("unknown") || lower.contains("not found") || lower.contains("missing") {
        eyre::Report::new(BuildError::MissingActuator(joint.to_string()))
    } else {
        eyre::Report::new(ShooterError::Hardware(s))
    }
}
