//! Command-line surface of the `shooter` binary.

use std::path::PathBuf;
use std::sync::OnceLock;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::rt::RtRequest;

/// Keeps the non-blocking file writer flushing until exit.
pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Set once from `--json`; errors printed after a failure follow it.
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "shooter", version, about = "Launcher controller on a simulated rig")]
pub struct Cli {
    /// Controller configuration (TOML)
    #[arg(long, value_name = "FILE", default_value = "etc/shooter.toml")]
    pub config: PathBuf,

    /// Machine-readable output: JSON logs, JSON summary and JSON errors
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Log filter when RUST_LOG is unset (e.g. info, debug, shooter_core=trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive the simulated launcher for a fixed span of control time
    Run {
        /// JSON-lines command script; every line carries `at_ms`
        #[arg(long, value_name = "FILE")]
        script: Option<PathBuf>,
        /// Control time to simulate
        #[arg(long, value_name = "MS", default_value_t = 2000)]
        duration_ms: u64,
        /// Tick on the wall clock and feed the script from a separate thread
        #[arg(long, action = ArgAction::SetTrue)]
        realtime: bool,
        /// Obstruct the trigger at this position (rad)
        #[arg(long, value_name = "RAD")]
        jam_at: Option<f64>,
        /// How far (rad) the trigger must back off to clear the obstruction
        #[arg(long, value_name = "RAD", default_value_t = 0.1)]
        jam_clear: f64,
        #[command(flatten)]
        rt: RtArgs,
    },
    /// Validate the configuration and print what it describes
    Check,
}

/// Real-time scheduling for `run --realtime` (Linux).
#[derive(Args, Debug, Clone, Copy)]
pub struct RtArgs {
    /// Request SCHED_FIFO, CPU pinning and locked memory; failures only warn
    #[arg(
        long = "rt",
        action = ArgAction::SetTrue,
        long_help = "Request real-time scheduling on Linux before the loop starts: SCHED_FIFO at --rt-prio, pinning to --rt-cpu and mlockall per --rt-lock. Each step needs privileges (CAP_SYS_NICE, CAP_IPC_LOCK or root); a step that fails is logged and the run continues."
    )]
    pub enabled: bool,
    /// SCHED_FIFO priority, clamped to the range the OS reports
    #[arg(long = "rt-prio", value_name = "PRIO")]
    pub prio: Option<i32>,
    /// Which pages mlockall keeps resident
    #[arg(long = "rt-lock", value_enum, value_name = "MODE")]
    pub lock: Option<RtLock>,
    /// CPU index to pin the control thread to (default 0)
    #[arg(long = "rt-cpu", value_name = "CPU")]
    pub cpu: Option<usize>,
}

impl RtArgs {
    /// `None` unless `--rt` was given.
    pub fn request(&self) -> Option<RtRequest> {
        self.enabled.then(|| RtRequest {
            prio: self.prio,
            lock: self.lock.unwrap_or_default(),
            cpu: self.cpu,
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Leave memory pageable
    None,
    /// Pages resident now
    Current,
    /// Pages resident now and mapped later
    All,
}

impl Default for RtLock {
    fn default() -> Self {
        if cfg!(target_os = "linux") {
            Self::Current
        } else {
            Self::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rt_flags_are_ignored_without_rt() {
        let cli = Cli::parse_from(["shooter", "run", "--rt-prio", "50"]);
        let Commands::Run { rt, .. } = cli.cmd else {
            panic!("expected run");
        };
        assert!(rt.request().is_none());
    }

    #[test]
    fn rt_request_carries_flags() {
        let cli = Cli::parse_from([
            "shooter", "run", "--rt", "--rt-prio", "50", "--rt-lock", "all", "--rt-cpu", "2",
        ]);
        let Commands::Run { rt, .. } = cli.cmd else {
            panic!("expected run");
        };
        let req = rt.request().expect("requested");
        assert_eq!(req.prio, Some(50));
        assert_eq!(req.lock, RtLock::All);
        assert_eq!(req.cpu, Some(2));
    }
}
