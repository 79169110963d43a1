use std::collections::BTreeMap;
use std::io::Write;
use std::net::SocketAddr;

use serde::Serialize;

use crate::config::{CORE_PROTOCOL_VERSION, PROTOCOL_VERSION};
use crate::error::ServeError;

/// The go-plugin handshake line: `core|protocol|tcp|addr|grpc[|cert]`.
pub fn handshake_line(addr: SocketAddr, certificate: Option<&str>) -> String {
    let mut line = format!("{CORE_PROTOCOL_VERSION}|{PROTOCOL_VERSION}|tcp|{addr}|grpc");
    if let Some(certificate) = certificate {
        line.push('|');
        line.push_str(certificate);
    }
    line
}

pub fn write_handshake(
    out: &mut impl Write,
    addr: SocketAddr,
    certificate: Option<&str>,
) -> Result<(), ServeError> {
    writeln!(out, "{}", handshake_line(addr, certificate))
        .and_then(|()| out.flush())
        .map_err(ServeError::Handshake)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReattachConfig {
    protocol: &'static str,
    protocol_version: u32,
    pid: u32,
    test: bool,
    addr: ReattachAddr,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReattachAddr {
    network: &'static str,
    string: String,
}

/// Value for `TF_REATTACH_PROVIDERS` pointing Terraform at this process.
pub fn reattach_json(provider_address: &str, addr: SocketAddr) -> Result<String, ServeError> {
    let config = ReattachConfig {
        protocol: "grpc",
        protocol_version: PROTOCOL_VERSION,
        pid: std::process::id(),
        test: true,
        addr: ReattachAddr {
            network: "tcp",
            string: addr.to_string(),
        },
    };
    let providers = BTreeMap::from([(provider_address, config)]);
    Ok(serde_json::to_string(&providers)?)
}

pub fn write_reattach(
    out: &mut impl Write,
    provider_address: &str,
    addr: SocketAddr,
) -> Result<(), ServeError> {
    let json = reattach_json(provider_address, addr)?;
    writeln!(
        out,
        "Provider started. To attach Terraform CLI, set the TF_REATTACH_PROVIDERS \
         environment variable with the following:\n\n\tTF_REATTACH_PROVIDERS='{json}'\n"
    )
    .and_then(|()| out.flush())
    .map_err(ServeError::Handshake)
}
