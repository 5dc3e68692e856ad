//! helpdesk-sim library.
//!
//! Seeded workload harness for helpdesk-core: a roster of staff
//! consoles races claims, replies, releases, and resolutions against a
//! shared in-memory store, then an oracle judges the artifacts against
//! the invariants the core promises (at most one assignee per race,
//! resolution is terminal, threads stay ordered, the live view
//! converges on the store, preview windows are honest prefixes).
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`,
//!   `debug!`, `trace!`).

pub mod campaign;
pub mod console;
pub mod oracle;
pub mod rng;
pub mod run;

pub use campaign::{CampaignConfig, CampaignReport, SeedFailure, run_campaign};
pub use console::{ConsoleStats, StaffConsole};
pub use oracle::{InvariantViolation, OracleResult, RunOracle};
pub use rng::SimRng;
pub use run::{RaceOutcome, SimConfig, SimResult, run_seed};
