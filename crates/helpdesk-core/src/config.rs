//! Runtime policy configuration.
//!
//! Loaded from a TOML file when present; every field has a default so a
//! missing or partial file is fine. Policy knobs only — nothing here
//! changes the invariants, just which optional behaviours are allowed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub thread: ThreadPolicy,
    pub retry: RetryConfig,
    pub preview: PreviewConfig,
}

/// Policy for appends against resolved tickets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadPolicy {
    /// When false (the default), appending to a Resolved ticket fails with
    /// an invalid-state error. When true, audit replies remain allowed.
    pub allow_post_resolution_reply: bool,
}

/// Bounded exponential backoff for idempotent store reads.
///
/// Conditional writes are never retried — re-issuing a compare-and-swap
/// blindly could double-apply under some store semantics. Only the
/// re-read of current state is safe to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total read attempts before a transient error surfaces (>= 1).
    pub max_read_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Ceiling on the doubled delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_read_attempts: default_max_read_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Backoff delay before retry number `retry` (1-based), doubled each
    /// time and capped at `max_delay_ms`.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.saturating_sub(1).min(16);
        let ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

/// List/preview windowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// How many tickets the preview window exposes.
    pub preview_len: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            preview_len: default_preview_len(),
        }
    }
}

fn default_max_read_attempts() -> u32 {
    4
}

fn default_base_delay_ms() -> u64 {
    25
}

fn default_max_delay_ms() -> u64 {
    1_000
}

fn default_preview_len() -> usize {
    5
}

/// Load configuration from `path`. A missing file yields defaults; a
/// malformed file is an error (fail loudly rather than run with policies
/// the operator didn't ask for).
pub fn load_config(path: &Path) -> Result<CoreConfig> {
    if !path.exists() {
        return Ok(CoreConfig::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config: CoreConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;
    Ok(config)
}
