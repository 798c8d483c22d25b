use std::time::Duration;

use pinguin_scheduler::{BackoffSchedule, SchedulerConfig};
use serde::Deserialize;

/// The `scheduler` section of the configuration file, mirroring §6's key
/// list one-for-one before being converted into [`SchedulerConfig`].
#[derive(Debug, Deserialize)]
pub struct SchedulerSection {
    #[serde(default = "default_tick_interval_sec")]
    pub tick_interval_sec: u64,
    #[serde(default = "default_batch_limit")]
    pub batch_limit: i64,
    #[serde(default = "default_max_concurrent_dispatches")]
    pub max_concurrent_dispatches: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_backoff_sec")]
    pub base_backoff_sec: u64,
    #[serde(default = "default_max_backoff_sec")]
    pub max_backoff_sec: u64,
    #[serde(default = "default_drain_timeout_sec")]
    pub drain_timeout_sec: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            tick_interval_sec: default_tick_interval_sec(),
            batch_limit: default_batch_limit(),
            max_concurrent_dispatches: default_max_concurrent_dispatches(),
            max_retries: default_max_retries(),
            base_backoff_sec: default_base_backoff_sec(),
            max_backoff_sec: default_max_backoff_sec(),
            drain_timeout_sec: default_drain_timeout_sec(),
        }
    }
}

fn default_tick_interval_sec() -> u64 {
    1
}
fn default_batch_limit() -> i64 {
    100
}
fn default_max_concurrent_dispatches() -> usize {
    16
}
fn default_max_retries() -> u32 {
    5
}
fn default_base_backoff_sec() -> u64 {
    10
}
fn default_max_backoff_sec() -> u64 {
    600
}
fn default_drain_timeout_sec() -> u64 {
    30
}

impl SchedulerSection {
    #[must_use]
    pub fn into_scheduler_config(self) -> SchedulerConfig {
        SchedulerConfig {
            tick_interval: Duration::from_secs(self.tick_interval_sec),
            batch_limit: self.batch_limit,
            max_concurrent_dispatches: self.max_concurrent_dispatches,
            max_retries: self.max_retries,
            backoff: BackoffSchedule::new(Duration::from_secs(self.base_backoff_sec), Duration::from_secs(self.max_backoff_sec)),
            drain_timeout: Duration::from_secs(self.drain_timeout_sec),
        }
    }
}
