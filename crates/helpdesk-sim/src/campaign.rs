//! Campaign runner: many seeds, one verdict.
//!
//! Executes a batch of seeds with shared workload parameters, collects
//! pass/fail per seed, and reports the first failing seed for replay.

use std::ops::Range;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::oracle::{InvariantViolation, RunOracle};
use crate::run::{SimConfig, run_seed};

/// Campaign-level configuration: which seeds to run and the workload
/// shape each seed uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Range of seeds to execute, e.g. `0..50`.
    pub seed_range: Range<u64>,
    pub console_count: usize,
    pub ticket_count: usize,
    pub rounds: u64,
    pub resolve_percent: u8,
    pub release_percent: u8,
    pub bystander_reply_percent: u8,
    pub allow_post_resolution_reply: bool,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        let sim = SimConfig::default();
        Self {
            seed_range: 0..50,
            console_count: sim.console_count,
            ticket_count: sim.ticket_count,
            rounds: sim.rounds,
            resolve_percent: sim.resolve_percent,
            release_percent: sim.release_percent,
            bystander_reply_percent: sim.bystander_reply_percent,
            allow_post_resolution_reply: sim.allow_post_resolution_reply,
        }
    }
}

impl CampaignConfig {
    /// Build the per-seed run configuration.
    #[must_use]
    pub fn sim_config_for_seed(&self, seed: u64) -> SimConfig {
        SimConfig {
            seed,
            console_count: self.console_count,
            ticket_count: self.ticket_count,
            rounds: self.rounds,
            resolve_percent: self.resolve_percent,
            release_percent: self.release_percent,
            bystander_reply_percent: self.bystander_reply_percent,
            allow_post_resolution_reply: self.allow_post_resolution_reply,
        }
    }

    /// Validate configuration before running.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.seed_range.is_empty() {
            bail!("seed_range must not be empty");
        }
        if self.console_count == 0 {
            bail!("console_count must be > 0");
        }
        if self.ticket_count == 0 {
            bail!("ticket_count must be > 0");
        }
        if self.rounds == 0 {
            bail!("rounds must be > 0");
        }
        for (name, value) in [
            ("resolve_percent", self.resolve_percent),
            ("release_percent", self.release_percent),
            ("bystander_reply_percent", self.bystander_reply_percent),
        ] {
            if value > 100 {
                bail!("{name} must be <= 100, got {value}");
            }
        }
        Ok(())
    }
}

/// Failure details for a single seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFailure {
    pub seed: u64,
    /// Rendered invariant violations.
    pub violations: Vec<String>,
}

/// Aggregate report for a campaign run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignReport {
    pub seeds_run: usize,
    pub seeds_passed: usize,
    /// First failing seed, for prioritized replay.
    pub first_failure: Option<u64>,
    pub failures: Vec<SeedFailure>,
    /// Claim races won across every seed.
    pub total_claims_won: u64,
    /// Claim races lost to a competing console across every seed.
    pub total_claims_lost: u64,
}

impl CampaignReport {
    /// True if every seed passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run every seed in the configured range.
///
/// # Errors
///
/// Returns an error if validation fails or a run aborts before its
/// oracle checks (oracle violations are reported, not errors).
pub async fn run_campaign(config: &CampaignConfig) -> Result<CampaignReport> {
    config.validate()?;

    let mut report = CampaignReport {
        seeds_run: 0,
        seeds_passed: 0,
        first_failure: None,
        failures: Vec::new(),
        total_claims_won: 0,
        total_claims_lost: 0,
    };

    for seed in config.seed_range.clone() {
        let result = run_seed(&config.sim_config_for_seed(seed)).await?;
        report.seeds_run += 1;
        report.total_claims_won += result.stats.claims_won;
        report.total_claims_lost += result.stats.claims_lost;

        let verdict = RunOracle::check_all(&result);
        if verdict.passed {
            report.seeds_passed += 1;
            tracing::debug!(seed, "seed passed");
        } else {
            if report.first_failure.is_none() {
                report.first_failure = Some(seed);
            }
            tracing::warn!(seed, violations = verdict.violations.len(), "seed failed");
            report.failures.push(SeedFailure {
                seed,
                violations: verdict
                    .violations
                    .iter()
                    .map(InvariantViolation::to_string)
                    .collect(),
            });
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::{CampaignConfig, run_campaign};

    #[test]
    fn empty_seed_range_is_rejected() {
        let config = CampaignConfig {
            seed_range: 5..5,
            ..CampaignConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_consoles_are_rejected() {
        let config = CampaignConfig {
            console_count: 0,
            ..CampaignConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn a_short_campaign_passes_every_seed() {
        let config = CampaignConfig {
            seed_range: 0..4,
            rounds: 10,
            ..CampaignConfig::default()
        };
        let report = run_campaign(&config).await.unwrap();

        assert_eq!(report.seeds_run, 4);
        assert_eq!(report.seeds_passed, 4);
        assert!(report.all_passed());
        assert_eq!(report.first_failure, None);
        // With four consoles racing every round, losses must show up.
        assert!(report.total_claims_lost > 0);
    }
}
