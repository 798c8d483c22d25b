use secrecy::SecretString;
use serde::Deserialize;

/// The `server` section of the configuration file: RPC bind port, shared
/// bearer secret, and the persistence/crypto settings C1/C2/C3 need.
#[derive(Debug, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,
    pub grpc_auth_token: SecretString,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    pub master_encryption_key: SecretString,
}

fn default_grpc_port() -> u16 {
    9090
}

fn default_database_path() -> String {
    "pinguin.sqlite".to_owned()
}
