//! Declarative YAML configuration (§6), loaded once at boot.

mod env;
mod limits;
mod scheduler;
mod server;
mod tenants;
mod web;

pub use env::expand_env;
pub use limits::LimitsSection;
pub use scheduler::SchedulerSection;
pub use server::ServerSection;
pub use tenants::TenantConfig;
pub use web::WebSection;

use serde::Deserialize;

use crate::error::ServerError;

/// Top-level configuration for the Pinguin server, loaded from a YAML file
/// after `${VAR}` expansion.
#[derive(Debug, Deserialize)]
pub struct PinguinConfig {
    pub server: ServerSection,
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub limits: LimitsSection,
    pub web: WebSection,
    #[serde(default)]
    pub tenants: Vec<TenantConfig>,
}

/// Reads `path`, expands `${VAR}` placeholders against the process
/// environment, and parses the result as YAML.
pub fn load_config(path: &std::path::Path) -> Result<PinguinConfig, ServerError> {
    let raw = std::fs::read_to_string(path)?;
    let expanded = expand_env(&raw);
    serde_yaml_ng::from_str(&expanded).map_err(|e| ServerError::Config(format!("failed to parse {}: {e}", path.display())))
}
