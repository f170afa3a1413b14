//! TLS transport to the gateway.
//!
//! Gateways ship with self-signed certificates, so the client accepts any
//! certificate chain. Handshake signatures are still checked against the
//! presented key so the session is at least bound to the peer it talks to.

use std::{io, sync::Arc};

use rustls::{
    ClientConfig,
    DigitallySignedStruct,
    SignatureScheme,
    client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    crypto::{CryptoProvider, ring, verify_tls12_signature, verify_tls13_signature},
    pki_types::{CertificateDer, ServerName, UnixTime},
};
use tokio::net::TcpStream;
use tokio_rustls::{TlsConnector, client::TlsStream};

use crate::{config::LinkConfig, error::LinkError};

/// Encrypted stream to a gateway.
pub type GatewayStream = TlsStream<TcpStream>;

#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Build the client TLS configuration used for gateway links.
///
/// # Errors
///
/// Returns an error if the crypto provider supports none of the default
/// protocol versions.
pub fn client_config() -> Result<ClientConfig, rustls::Error> {
    let provider = Arc::new(ring::default_provider());
    let verifier = Arc::new(AcceptAnyCertificate {
        provider: Arc::clone(&provider),
    });
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();
    Ok(config)
}

/// Open a TLS connection to the gateway named in `config`.
///
/// # Errors
///
/// Returns [`LinkError::Connect`] if the TCP connection fails and
/// [`LinkError::Tls`] if the client configuration, server name or handshake
/// is rejected.
pub async fn connect(config: &LinkConfig) -> Result<GatewayStream, LinkError> {
    let addr = config.address();
    let tcp = TcpStream::connect(&addr)
        .await
        .map_err(|source| LinkError::Connect {
            addr: addr.clone(),
            source,
        })?;
    if let Err(error) = tcp.set_nodelay(true) {
        tracing::debug!(%error, "could not disable Nagle on gateway socket");
    }

    let tls = client_config().map_err(|e| LinkError::Tls(io::Error::other(e)))?;
    let server_name = ServerName::try_from(config.host.clone())
        .map_err(|e| LinkError::Tls(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
    let stream = TlsConnector::from(Arc::new(tls))
        .connect(server_name, tcp)
        .await
        .map_err(LinkError::Tls)?;
    log::info!("TLS link established: addr={addr}");
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_accepts_any_certificate() {
        let verifier = AcceptAnyCertificate {
            provider: Arc::new(ring::default_provider()),
        };
        let cert = CertificateDer::from(vec![0x30, 0x00]);
        let name = ServerName::try_from("gateway.local").expect("valid name");
        let verdict = verifier.verify_server_cert(&cert, &[], &name, &[], UnixTime::now());
        assert!(verdict.is_ok());
        assert!(!verifier.supported_verify_schemes().is_empty());
    }

    #[test]
    fn client_config_builds() {
        let config = client_config().expect("client config");
        assert!(config.alpn_protocols.is_empty());
    }

    #[tokio::test]
    async fn unreachable_gateway_reports_connect_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let config = LinkConfig {
            host: "127.0.0.1".into(),
            port,
            password: "secret".into(),
            ..LinkConfig::default()
        };
        let error = connect(&config).await.expect_err("nothing listens");
        assert!(matches!(error, LinkError::Connect { .. }), "got {error:?}");
    }
}
