#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod error_fmt;
mod rt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::run::{RunOptions, run_sim};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: color-eyre install failed: {e}");
    }

    if let Err(err) = real_main(cli) {
        tracing::error!(error = %err, "shooter failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", error_fmt::format_error_json(&err));
        } else {
            eprintln!("{}", error_fmt::humanize(&err));
        }
        std::process::exit(error_fmt::exit_code_for_error(&err));
    }
}

fn load_config(path: &Path) -> eyre::Result<shooter_config::Config> {
    let cfg = shooter_config::load_file(path)?;
    cfg.validate()
        .wrap_err_with(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

fn init_tracing(json: bool, level: &str, logging: &shooter_config::Logging) -> eyre::Result<()> {
    let level = logging.level.as_deref().unwrap_or(level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level '{level}'"))?;

    let console = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let dir = dir.unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file must name a file"))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| eyre::eyre!("tracing init failed: {e}"))
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;

    match cli.cmd {
        Commands::Check => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ok": true,
                        "topology": format!("{:?}", cfg.joints.topology),
                        "wheels": cfg.joints.friction,
                        "trigger": cfg.joints.trigger,
                        "magazine": cfg.joints.magazine,
                        "control_hz": cfg.shooter.control_hz,
                    })
                );
            } else {
                println!(
                    "config OK: {:?} topology, {} wheel(s), trigger '{}', magazine {}, {} Hz",
                    cfg.joints.topology,
                    cfg.joints.friction.len(),
                    cfg.joints.trigger,
                    cfg.joints.magazine.as_deref().unwrap_or("none"),
                    cfg.shooter.control_hz
                );
            }
            Ok(())
        }
        Commands::Run {
            script,
            duration_ms,
            realtime,
            jam_at,
            jam_clear,
            rt,
        } => {
            let script = match script {
                Some(path) => {
                    let text = std::fs::read_to_string(&path)
                        .wrap_err_with(|| format!("read script {}", path.display()))?;
                    shooter_config::messages::parse_script(&text)
                        .wrap_err_with(|| format!("parse script {}", path.display()))?
                }
                None => Vec::new(),
            };
            if jam_clear.is_sign_negative() || !jam_clear.is_finite() {
                eyre::bail!("--jam-clear must be finite and >= 0");
            }
            let opts = RunOptions {
                script,
                duration_ms,
                realtime,
                jam: jam_at.map(|at| shooter_hardware::Jam {
                    at,
                    clear_after_backoff: jam_clear,
                }),
                rt: rt.request(),
            };

            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = Arc::clone(&shutdown);
                if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                    tracing::warn!(error = %e, "ctrl-c handler not installed");
                }
            }

            let report = run_sim(&cfg, &opts, &shutdown)?;
            if cli.json {
                println!("{}", report.to_json());
            } else {
                let s = &report.stats;
                println!(
                    "run complete: {} ticks, final state {:?}",
                    s.ticks, s.final_state
                );
                println!(
                    "transitions: {}, feeds: {}, jams: {}, missed deadlines: {}",
                    s.transitions, s.feeds, s.jams, s.missed_deadlines
                );
                println!(
                    "updates applied: {}, rejected: {}",
                    report.updates_applied, report.updates_rejected
                );
                println!(
                    "trigger at {:.3} rad, wheels at {:?} rad/s",
                    report.trigger_position, report.wheel_velocities
                );
            }
            Ok(())
        }
    }
}
