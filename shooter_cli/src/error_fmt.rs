//! Human-readable error descriptions and structured JSON error formatting.

use shooter_core::error::{BuildError, ShooterError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.chain().find_map(|e| e.downcast_ref::<BuildError>()) {
        return match be {
            BuildError::MissingActuator(joint) => format!(
                "What happened: Actuator '{joint}' could not be claimed.\nLikely causes: The [joints] section names a joint the rig does not provide.\nHow to fix: Check the joint names in the config against the hardware."
            ),
            BuildError::MissingDrive | BuildError::MissingTrigger | BuildError::MissingExchanges => format!(
                "What happened: Controller assembly is incomplete ({be}).\nLikely causes: A required part was not passed to the builder.\nHow to fix: Provide every required part before build()."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the [shooter] or [pid] sections.\nHow to fix: Edit the config file, then rerun `shooter check`."
            ),
        };
    }

    if let Some(se) = err.chain().find_map(|e| e.downcast_ref::<ShooterError>()) {
        return format!(
            "What happened: {se}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
        );
    }

    let msg = chain_message(err);
    let lower = msg.to_ascii_lowercase();

    if lower.starts_with("read config") {
        return format!(
            "What happened: The config file could not be read.\nHow to fix: Pass --config <FILE> with an existing TOML file. Original: {msg}"
        );
    }
    if is_config_problem(&lower) {
        return format!(
            "What happened: Configuration is invalid or incomplete.\nHow to fix: Edit the TOML config and run `shooter check`. Original: {msg}"
        );
    }
    if lower.contains("script") {
        return format!(
            "What happened: The command script could not be loaded.\nHow to fix: One JSON object per line with `at_ms` and `type`. Original: {msg}"
        );
    }

    format!(
        "Something went wrong.\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Every message in the chain, outermost first.
fn chain_message(err: &eyre::Report) -> String {
    err.chain()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

fn is_config_problem(lower: &str) -> bool {
    ["read config", "parse config", "invalid config"]
        .iter()
        .any(|p| lower.starts_with(p))
        || lower.contains(" must ")
}

/// Stable exit codes: 2 for configuration problems, 3 for assembly
/// failures, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err
        .chain()
        .any(|e| e.downcast_ref::<BuildError>().is_some())
    {
        return 3;
    }
    if is_config_problem(&chain_message(err).to_ascii_lowercase()) {
        return 2;
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    let reason = if err
        .chain()
        .any(|e| e.downcast_ref::<BuildError>().is_some())
    {
        "Build"
    } else if err
        .chain()
        .any(|e| e.downcast_ref::<ShooterError>().is_some())
    {
        "Shooter"
    } else {
        "Error"
    };
    serde_json::json!({ "reason": reason, "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_actuator_names_the_joint() {
        let err = eyre::Report::new(BuildError::MissingActuator("trigger".into()));
        assert!(humanize(&err).contains("'trigger'"));
        assert_eq!(exit_code_for_error(&err), 3);
    }

    #[test]
    fn wrapped_build_error_is_still_found() {
        use eyre::WrapErr;
        let err: eyre::Result<()> =
            Err(eyre::Report::new(BuildError::MissingActuator("left".into())));
        let err = err.wrap_err("assemble controller").unwrap_err();
        assert_eq!(exit_code_for_error(&err), 3);
        let json: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(json["reason"], "Build");
    }

    #[test]
    fn validation_message_maps_to_config_exit_code() {
        let err = eyre::eyre!("shooter.control_hz must be in [1, 10000]");
        assert_eq!(exit_code_for_error(&err), 2);
    }

    #[test]
    fn wrapped_validation_keeps_inner_message() {
        use eyre::WrapErr;
        let err: eyre::Result<()> = Err(eyre::eyre!("dynamic.push_angle must be >= 0"));
        let err = err.wrap_err("invalid config cfg.toml").unwrap_err();
        assert!(humanize(&err).contains("push_angle"));
        assert_eq!(exit_code_for_error(&err), 2);
    }

    #[test]
    fn script_errors_mentioning_config_are_not_config_errors() {
        use eyre::WrapErr;
        let err: eyre::Result<()> =
            Err(eyre::eyre!("unknown variant `launch`, expected one of `config`"));
        let err = err.wrap_err("parse script s.jsonl").unwrap_err();
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).contains("command script"));
    }
}
