use base64::Engine as _;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use rcgen::CertifiedKey;
use tonic::transport::{Identity, ServerTlsConfig};

use crate::error::ServeError;

/// Self-signed certificate the server presents when Terraform asks for TLS.
///
/// Terraform pins the certificate it receives in the handshake, so a fresh one
/// is generated for every run.
pub struct ServerCertificate {
    cert_pem: String,
    key_pem: String,
    der: Vec<u8>,
}

impl ServerCertificate {
    pub fn generate() -> Result<Self, ServeError> {
        let CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec!["localhost".to_owned()])?;
        Ok(Self {
            cert_pem: cert.pem(),
            key_pem: key_pair.serialize_pem(),
            der: cert.der().to_vec(),
        })
    }

    /// DER bytes in unpadded standard base64, the handshake's last field.
    pub fn handshake_encoding(&self) -> String {
        STANDARD_NO_PAD.encode(&self.der)
    }

    pub fn tls_config(&self) -> ServerTlsConfig {
        ServerTlsConfig::new().identity(Identity::from_pem(&self.cert_pem, &self.key_pem))
    }
}
