//! # Demo Configuration
//!
//! Settings for the `password-demo` service.

use super::env::{env_var_or_default, env_var_or_default_str};
use crate::constants::{DEFAULT_BIND_ADDRESS, DEFAULT_DEMO_PORT, DEFAULT_DEMO_SECRET_PATH};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Mounted secret file served on `/`
    pub secret_path: PathBuf,
    pub bind_address: IpAddr,
    pub port: u16,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            secret_path: PathBuf::from(DEFAULT_DEMO_SECRET_PATH),
            bind_address: DEFAULT_BIND_ADDRESS
                .parse()
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            port: DEFAULT_DEMO_PORT,
        }
    }
}

impl DemoConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            secret_path: PathBuf::from(env_var_or_default_str(
                "SECRET_PATH",
                DEFAULT_DEMO_SECRET_PATH,
            )),
            bind_address: env_var_or_default("BIND_ADDRESS", defaults.bind_address),
            port: env_var_or_default("DEMO_PORT", defaults.port),
        }
    }

    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}
