use std::net::{IpAddr, SocketAddr};

use pulse_core::error::{PulseError, Result};

use crate::obs::LogFormat;

/// Bootstrap settings; read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub host: IpAddr,
    pub port: u16,
    pub log_format: LogFormat,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_format: LogFormat::default(),
        }
    }
}

impl ServiceConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

pub(crate) fn parse_port(raw: &str) -> Result<u16> {
    raw.trim()
        .parse::<u16>()
        .map_err(|e| PulseError::Config(format!("PORT must be a port number (got {raw:?}): {e}")))
}

pub(crate) fn parse_host(raw: &str) -> Result<IpAddr> {
    raw.trim()
        .parse::<IpAddr>()
        .map_err(|e| PulseError::Config(format!("HOST must be an IP address (got {raw:?}): {e}")))
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}
fn default_port() -> u16 {
    3000
}
