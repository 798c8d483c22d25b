use serde::Deserialize;

/// The `limits` section of the configuration file. `max_page_size` is a
/// supplemented field (SPEC_FULL.md's ambient additions) enforcing §4.8's
/// "`ListNotifications` with an enforced `maxPageSize`" requirement, which
/// spec.md names but never gives a config key for.
#[derive(Debug, Deserialize)]
pub struct LimitsSection {
    #[serde(default = "default_connection_timeout_sec")]
    pub connection_timeout_sec: u64,
    #[serde(default = "default_operation_timeout_sec")]
    pub operation_timeout_sec: u64,
    #[serde(default = "default_max_message_size_bytes")]
    pub max_message_size_bytes: usize,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: i64,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            connection_timeout_sec: default_connection_timeout_sec(),
            operation_timeout_sec: default_operation_timeout_sec(),
            max_message_size_bytes: default_max_message_size_bytes(),
            max_payload_bytes: default_max_payload_bytes(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_connection_timeout_sec() -> u64 {
    10
}
fn default_operation_timeout_sec() -> u64 {
    30
}
fn default_max_message_size_bytes() -> usize {
    16 * 1024 * 1024
}
fn default_max_payload_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_max_page_size() -> i64 {
    100
}
