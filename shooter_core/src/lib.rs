#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Launcher control core (hardware-agnostic).
//!
//! This crate provides the hardware-independent control logic for a
//! friction-wheel projectile launcher. All hardware interactions go through
//! `shooter_traits::Actuator`.
//!
//! ## Architecture
//!
//! - **Exchanges**: lock-free snapshot slots for configuration, jam
//!   parameters and operator commands (`exchange` module)
//! - **Control**: the PASSIVE/READY/PUSH/STOP/BLOCK state machine (`Shooter`)
//! - **Flywheels**: single and dual wheel drives (`drive` module)
//! - **Jam handling**: stall detection (`jam`) and backoff in BLOCK
//! - **Magazine**: gate sub-state machine (`magazine` module)
//! - **Ingestion**: validated updates from other threads (`ingest` module)
//! - **Runner**: fixed-rate loop with run statistics (`runner` module)
//!
//! ## Real-time contract
//!
//! `Shooter::update` never waits on another thread. Snapshot reads are
//! wait-free copies; publishing happens on the producer's thread.

pub mod builder;
pub mod config;
pub mod conversions;
pub mod drive;
pub mod error;
pub mod exchange;
pub mod hw_error;
pub mod ingest;
pub mod jam;
pub mod magazine;
pub mod mocks;
pub mod pid;
pub mod runner;
pub mod shooter;
pub mod types;
pub mod util;

pub use builder::{Missing, Set, ShooterBuilder, build_shooter};
pub use config::Tuning;
pub use drive::{DualFlywheel, FlywheelDrive, SingleFlywheel};
pub use error::{BuildError, Result, ShooterError};
pub use exchange::{Exchange, Exchanges};
pub use jam::{JamDetector, JamPredicate};
pub use pid::{Pid, PidGains};
pub use shooter::Shooter;
pub use types::{
    BlockConfig, Config, MagazineState, MuzzleSpeed, ShootCommand, State, Transition,
};
