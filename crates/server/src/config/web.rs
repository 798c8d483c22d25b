use secrecy::SecretString;
use serde::Deserialize;

/// The `web` section of the configuration file: C9's HTTP/UI surface.
#[derive(Debug, Deserialize)]
pub struct WebSection {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    pub tauth_signing_key: SecretString,
}

fn default_http_port() -> u16 {
    8080
}
