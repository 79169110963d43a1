use std::ops::RangeInclusive;

use crate::env::SourceEnv;
use crate::error::ServeError;
use crate::provider::PROVIDER_ADDRESS;

/// Cookie Terraform sets so providers refuse to run outside of it.
pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

/// go-plugin core protocol version, first field of the handshake.
pub const CORE_PROTOCOL_VERSION: u32 = 1;
/// Terraform plugin protocol version served.
pub const PROTOCOL_VERSION: u32 = 6;

const PROTOCOL_VERSIONS_KEY: &str = "PLUGIN_PROTOCOL_VERSIONS";
const MIN_PORT_KEY: &str = "PLUGIN_MIN_PORT";
const MAX_PORT_KEY: &str = "PLUGIN_MAX_PORT";
const CLIENT_CERT_KEY: &str = "PLUGIN_CLIENT_CERT";

/// How the plugin server starts, resolved from the command line and the
/// environment Terraform launches it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOptions {
    pub provider_address: String,
    /// Run standalone and print `TF_REATTACH_PROVIDERS` instead of the handshake.
    pub debug: bool,
    pub port_range: Option<RangeInclusive<u16>>,
    /// Terraform's client certificate; its presence turns on TLS.
    pub client_cert: Option<String>,
}

impl ServeOptions {
    pub fn from_env(env: &SourceEnv, debug: bool) -> Result<Self, ServeError> {
        if !debug {
            if env.var(MAGIC_COOKIE_KEY).as_deref() != Some(MAGIC_COOKIE_VALUE) {
                return Err(ServeError::NotLaunchedAsPlugin);
            }

            if let Some(offered) = env.var(PROTOCOL_VERSIONS_KEY)
                && !offered.trim().is_empty()
                && !offered
                    .split(',')
                    .any(|version| version.trim() == PROTOCOL_VERSION.to_string())
            {
                return Err(ServeError::UnsupportedProtocol { offered });
            }
        }

        let port_range = match (port(env, MIN_PORT_KEY), port(env, MAX_PORT_KEY)) {
            (Some(min), Some(max)) if min <= max => Some(min..=max),
            (Some(min), Some(max)) => return Err(ServeError::InvalidPortRange { min, max }),
            _ => None,
        };

        let client_cert = if debug {
            None
        } else {
            env.var(CLIENT_CERT_KEY).filter(|cert| !cert.trim().is_empty())
        };

        Ok(Self {
            provider_address: PROVIDER_ADDRESS.to_owned(),
            debug,
            port_range,
            client_cert,
        })
    }
}

fn port(env: &SourceEnv, key: &str) -> Option<u16> {
    env.var(key)?.trim().parse().ok()
}
