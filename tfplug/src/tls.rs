//! Transport security for the plugin server
//!
//! Terraform launches providers with go-plugin's automatic mTLS: it passes
//! its own client certificate in `PLUGIN_CLIENT_CERT` and expects the server
//! certificate back as the last field of the handshake line. The host's
//! certificate is self-signed with the CA flag set, which webpki refuses as
//! an end-entity certificate, so the server pins it instead of chaining to it.

use crate::error::{Result, TfplugError};
use rustls::client::danger::HandshakeSignatureValid;
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, WebPkiSupportedAlgorithms};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, UnixTime};
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::{CertificateError, DigitallySignedStruct, DistinguishedName, SignatureScheme};
use std::path::Path;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;
use tokio_stream::wrappers::ReceiverStream;

/// Environment variable carrying the host's PEM client certificate
pub const CLIENT_CERT_ENV: &str = "PLUGIN_CLIENT_CERT";

/// Certificate and key the server presents
pub struct ServerIdentity {
    pub cert: CertificateDer<'static>,
    key: PrivateKeyDer<'static>,
}

impl ServerIdentity {
    /// Fresh self-signed certificate for `localhost`, the name go-plugin dials
    pub fn generate() -> Result<Self> {
        let rcgen::CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).map_err(|e| {
                TfplugError::TlsError(format!("Failed to generate certificate: {}", e))
            })?;

        Ok(Self {
            cert: cert.der().clone(),
            key: PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der())),
        })
    }

    /// PEM certificate and key from disk
    pub async fn load(cert_path: &Path, key_path: &Path) -> Result<Self> {
        let cert = tokio::fs::read(cert_path)
            .await
            .map_err(|e| TfplugError::TlsError(format!("Failed to read certificate: {}", e)))?;
        let key = tokio::fs::read(key_path)
            .await
            .map_err(|e| TfplugError::TlsError(format!("Failed to read key: {}", e)))?;

        Ok(Self {
            cert: CertificateDer::from_pem_slice(&cert)
                .map_err(|e| TfplugError::TlsError(format!("Invalid certificate: {:?}", e)))?,
            key: PrivateKeyDer::from_pem_slice(&key)
                .map_err(|e| TfplugError::TlsError(format!("Invalid key: {:?}", e)))?,
        })
    }
}

/// Parse the host certificate handed over in `PLUGIN_CLIENT_CERT`
pub fn parse_client_cert(pem: &str) -> Result<CertificateDer<'static>> {
    CertificateDer::from_pem_slice(pem.as_bytes())
        .map_err(|e| TfplugError::TlsError(format!("Invalid {}: {:?}", CLIENT_CERT_ENV, e)))
}

/// Accepts exactly one client certificate
#[derive(Debug)]
struct PinnedClientCert {
    expected: CertificateDer<'static>,
    algorithms: WebPkiSupportedAlgorithms,
}

impl ClientCertVerifier for PinnedClientCert {
    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        &[]
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _now: UnixTime,
    ) -> std::result::Result<ClientCertVerified, rustls::Error> {
        if end_entity.as_ref() == self.expected.as_ref() {
            Ok(ClientCertVerified::assertion())
        } else {
            tracing::warn!("Rejected client certificate that does not match the plugin host's");
            Err(rustls::Error::InvalidCertificate(
                CertificateError::UnknownIssuer,
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

/// TLS acceptor for the gRPC listener; with a client certificate the
/// handshake requires the host to present it
pub fn acceptor(
    identity: ServerIdentity,
    client_cert: Option<CertificateDer<'static>>,
) -> Result<TlsAcceptor> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let algorithms = provider.signature_verification_algorithms;

    let builder = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TfplugError::TlsError(e.to_string()))?;
    let builder = match client_cert {
        Some(expected) => builder.with_client_cert_verifier(Arc::new(PinnedClientCert {
            expected,
            algorithms,
        })),
        None => builder.with_no_client_auth(),
    };

    let mut config = builder
        .with_single_cert(vec![identity.cert], identity.key)
        .map_err(|e| TfplugError::TlsError(e.to_string()))?;
    // grpc-go refuses servers that do not negotiate h2
    config.alpn_protocols = vec![b"h2".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Accept loop that hands tonic only connections whose handshake succeeded
pub fn incoming(
    listener: TcpListener,
    acceptor: TlsAcceptor,
) -> ReceiverStream<std::io::Result<TlsStream<TcpStream>>> {
    let (tx, rx) = mpsc::channel(16);

    tokio::spawn(async move {
        loop {
            let (stream, peer) = tokio::select! {
                _ = tx.closed() => break,
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        continue;
                    }
                },
            };

            let acceptor = acceptor.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                match acceptor.accept(stream).await {
                    Ok(tls) => {
                        let _ = tx.send(Ok(tls)).await;
                    }
                    Err(e) => tracing::warn!(%peer, error = %e, "TLS handshake failed"),
                }
            });
        }
    });

    ReceiverStream::new(rx)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn generated_identity_is_der_certificate() {
        let identity = ServerIdentity::generate().unwrap();

        // DER SEQUENCE tag
        assert_eq!(identity.cert.as_ref()[0], 0x30);
    }

    #[test]
    fn client_cert_parses_from_pem() {
        let host = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();

        let parsed = parse_client_cert(&host.cert.pem()).unwrap();

        assert_eq!(parsed.as_ref(), host.cert.der().as_ref());
    }

    #[test]
    fn client_cert_rejects_garbage() {
        assert!(matches!(
            parse_client_cert("not a certificate"),
            Err(TfplugError::TlsError(_))
        ));
    }

    #[test]
    fn pinned_verifier_accepts_only_the_host_certificate() {
        let host = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let other = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let verifier = PinnedClientCert {
            expected: host.cert.der().clone(),
            algorithms: rustls::crypto::aws_lc_rs::default_provider()
                .signature_verification_algorithms,
        };

        assert!(verifier
            .verify_client_cert(host.cert.der(), &[], UnixTime::now())
            .is_ok());
        assert!(verifier
            .verify_client_cert(other.cert.der(), &[], UnixTime::now())
            .is_err());
        assert!(verifier.client_auth_mandatory());
    }
}
