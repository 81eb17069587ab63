use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::{env, fs};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,

    pub private_key_file: String,
    pub public_key_file: String,

    pub self_ref_uri: String,

    pub access_token_ttl: i64,
    pub refresh_token_ttl: i64,
    pub verification_ttl: i64,

    #[serde(default)]
    pub booting_options: String,

    pub bootstrap_owner_user_name: String,
    pub bootstrap_owner_email: String,
    #[serde(skip_serializing)]
    pub bootstrap_owner_password: String,
    #[serde(default)]
    pub bootstrap_owner_id: String,
}

/// Soft ceiling applied on top of the configured TTL, not enforced by `config`
/// deserialization itself: the composition root clamps to these after load.
pub const ACCESS_TOKEN_TTL_CEILING: i64 = 86_400;
pub const REFRESH_TOKEN_TTL_CEILING: i64 = 604_800;

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        resolve_database_url_from_env();
        resolve_bootstrap_password_from_file();

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::Environment::with_prefix("MINI_IDP"));

        if let Ok(run_mode) = env::var("RUN_MODE") {
            builder = builder.add_source(
                config::File::with_name(&format!("config/{}", run_mode)).required(false),
            );
        }

        let built = builder.build()?;
        let mut cfg: Config = built.try_deserialize()?;

        cfg.access_token_ttl = cfg.access_token_ttl.min(ACCESS_TOKEN_TTL_CEILING);
        cfg.refresh_token_ttl = cfg.refresh_token_ttl.min(REFRESH_TOKEN_TTL_CEILING);

        Ok(cfg)
    }

    pub fn booting_options(&self) -> Vec<&str> {
        self.booting_options
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn resolve_database_url_from_env() {
    if env::var("MINI_IDP_DATABASE_URL").is_ok() {
        return;
    }

    if let Ok(database_url) = env::var("DATABASE_URL") {
        env::set_var("MINI_IDP_DATABASE_URL", database_url);
    }
}

/// Docker-secret-file convention: `MINI_IDP_BOOTSTRAP_OWNER_PASSWORD_FILE`
/// wins over a literal `MINI_IDP_BOOTSTRAP_OWNER_PASSWORD` when both are set.
fn resolve_bootstrap_password_from_file() {
    let password = env::var("MINI_IDP_BOOTSTRAP_OWNER_PASSWORD_FILE")
        .ok()
        .and_then(|path| fs::read_to_string(path).ok())
        .map(|value| value.trim().to_string());

    if let Some(password) = password {
        env::set_var("MINI_IDP_BOOTSTRAP_OWNER_PASSWORD", password);
    }
}

pub fn init() {
    dotenv().ok();
}
