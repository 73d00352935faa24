//! Service config, taken from the process environment.
//!
//! There is no config file; every input has a default. Only a malformed
//! `PORT`/`HOST` is an error.

pub mod schema;

use pulse_core::env::EnvSource;
use pulse_core::error::Result;

use crate::obs::LogFormat;

pub use schema::ServiceConfig;

pub const ENV_PORT: &str = "PORT";
pub const ENV_HOST: &str = "HOST";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

pub fn load<E: EnvSource + ?Sized>(env: &E) -> Result<ServiceConfig> {
    let mut cfg = ServiceConfig::default();

    if let Some(raw) = env.non_empty(ENV_PORT) {
        cfg.port = schema::parse_port(&raw)?;
    }
    if let Some(raw) = env.non_empty(ENV_HOST) {
        cfg.host = schema::parse_host(&raw)?;
    }
    if let Some(raw) = env.non_empty(ENV_LOG_FORMAT) {
        cfg.log_format = LogFormat::from(raw.as_str());
    }

    Ok(cfg)
}
