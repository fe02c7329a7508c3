//! Server configuration from CLI arguments and environment variables

use clap::Parser;

use crate::constants::{DEFAULT_TOKEN_TTL_SECS, MIN_SECRET_LEN, PASSWORD_MIN_LEN};
use crate::error::ConfigError;
use crate::gate::PermissionSource;
use crate::identity::is_valid_mobile;

/// assetgate-server - authorization gateway for the asset tracking admin API
#[derive(Parser, Debug, Clone)]
#[command(name = "assetgate-server")]
pub struct Args {
    /// LMDB directory for the credential store
    #[arg(short = 'd', long, env = "ASSETGATE_DB", default_value = "./data/assetgate.mdb")]
    pub db_path: String,

    /// Listen on PORT
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Token signing secret. Without it every token is rejected.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Token lifetime in seconds
    #[arg(long, env = "TOKEN_TTL_SECS", default_value_t = DEFAULT_TOKEN_TTL_SECS)]
    pub token_ttl_secs: u64,

    /// Where route authorization reads permissions from
    #[arg(long, env = "PERMISSION_SOURCE", value_enum, default_value_t = PermissionSource::Token)]
    pub permission_source: PermissionSource,

    /// Mobile number of the initial administrator, created once on an empty store
    #[arg(long, env = "ADMIN_IDENTIFIER")]
    pub admin_identifier: Option<String>,

    /// Email of the initial administrator
    #[arg(long, env = "ADMIN_EMAIL", default_value = "admin@localhost.localdomain")]
    pub admin_email: String,

    /// Password of the initial administrator
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(secret) = &self.jwt_secret {
            if secret.len() < MIN_SECRET_LEN {
                return Err(ConfigError(format!("JWT_SECRET must be at least {} characters", MIN_SECRET_LEN)));
            }
        }
        if self.token_ttl_secs == 0 {
            return Err(ConfigError("TOKEN_TTL_SECS must be positive".into()));
        }
        match (&self.admin_identifier, &self.admin_password) {
            (Some(_), None) | (None, Some(_)) => {
                Err(ConfigError("ADMIN_IDENTIFIER and ADMIN_PASSWORD must be set together".into()))
            }
            (Some(id), Some(_)) if !is_valid_mobile(id) => {
                Err(ConfigError("ADMIN_IDENTIFIER must be a mobile number".into()))
            }
            (Some(_), Some(p)) if p.chars().count() < PASSWORD_MIN_LEN => {
                Err(ConfigError(format!("ADMIN_PASSWORD must be at least {} characters", PASSWORD_MIN_LEN)))
            }
            _ => Ok(()),
        }
    }
}
