//! go-plugin gRPC server speaking Terraform plugin protocol 6.
//!
//! Startup order matters to Terraform: the listener must be bound and the
//! health service serving before the handshake line reaches stdout.

pub mod convert;
pub mod handshake;
pub mod service;
pub mod tls;

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::ops::RangeInclusive;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

use crate::config::ServeOptions;
use crate::error::ServeError;
use crate::provider::EnvProvider;

pub use service::{Controller, GrpcProvider};
pub use tls::ServerCertificate;

#[allow(clippy::all, missing_docs)]
pub mod proto {
    pub mod tfplugin6 {
        tonic::include_proto!("tfplugin6");
    }
    pub mod plugin {
        tonic::include_proto!("plugin");
    }
}

use proto::plugin::grpc_controller_server::GrpcControllerServer;
use proto::tfplugin6::provider_server::ProviderServer;

/// Service name go-plugin health-checks.
const HEALTH_SERVICE: &str = "plugin";

/// Bind a loopback listener, on any free port or the first free one in
/// `range`.
pub async fn bind(range: Option<RangeInclusive<u16>>) -> Result<TcpListener, ServeError> {
    let Some(range) = range else {
        return TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .map_err(ServeError::Bind);
    };

    let mut last_error = None;
    for port in range.clone() {
        match TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await {
            Ok(listener) => return Ok(listener),
            Err(err) => last_error = Some(err),
        }
    }
    Err(ServeError::Bind(last_error.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no port available in {range:?}"),
        )
    })))
}

/// Serve `provider` until Terraform asks the plugin to shut down, or until
/// Ctrl-C in debug mode.
pub async fn serve(provider: EnvProvider, options: ServeOptions) -> Result<(), ServeError> {
    let listener = bind(options.port_range.clone()).await?;
    let addr: SocketAddr = listener.local_addr().map_err(ServeError::Bind)?;

    let (mut health, health_service) = tonic_health::server::health_reporter();
    health
        .set_service_status(HEALTH_SERVICE, tonic_health::ServingStatus::Serving)
        .await;

    let certificate = match options.client_cert {
        Some(_) => Some(ServerCertificate::generate()?),
        None => None,
    };

    let mut builder = Server::builder();
    if let Some(certificate) = &certificate {
        builder = builder.tls_config(certificate.tls_config())?;
    }

    let shutdown = Arc::new(Notify::new());
    let router = builder
        .add_service(health_service)
        .add_service(ProviderServer::new(GrpcProvider::new(provider)))
        .add_service(GrpcControllerServer::new(Controller::new(Arc::clone(
            &shutdown,
        ))));

    if options.debug {
        handshake::write_reattach(&mut io::stdout().lock(), &options.provider_address, addr)?;
        let interrupt = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, stopping provider");
            }
            interrupt.notify_one();
        });
    } else {
        let encoded = certificate.as_ref().map(ServerCertificate::handshake_encoding);
        handshake::write_handshake(&mut io::stdout().lock(), addr, encoded.as_deref())?;
    }

    tracing::info!(%addr, tls = certificate.is_some(), "provider listening");
    router
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
            shutdown.notified().await;
        })
        .await?;
    tracing::info!("provider stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_loopback_on_any_port() {
        let listener = bind(None).await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn skips_ports_in_use() {
        let taken = bind(None).await.expect("bind");
        let port = taken.local_addr().expect("addr").port();
        let Some(next) = port.checked_add(1) else {
            return;
        };

        match bind(Some(port..=next)).await {
            Ok(listener) => assert_eq!(listener.local_addr().expect("addr").port(), next),
            // The neighbouring port may belong to another process.
            Err(err) => assert!(matches!(err, ServeError::Bind(_))),
        }
    }
}
