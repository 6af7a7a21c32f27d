//! TLS configuration for encrypted connections.
//!
//! Server certificates are validated against the system roots (falling back
//! to the bundled Mozilla roots when the system store is empty) or against a
//! caller-supplied PEM bundle. Peer verification can be turned off for
//! development setups with self-signed certificates.

use crate::{Error, Result};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use rustls_pemfile::Item;
use std::fs;
use std::sync::Arc;

/// Client-side TLS settings shared by every connection of a client.
///
/// # Examples
///
/// ```ignore
/// use kvwire::connection::TlsConfig;
///
/// // System roots
/// let tls = TlsConfig::builder().build()?;
///
/// // Custom CA bundle
/// let tls = TlsConfig::builder()
///     .ca_cert_path("/etc/redis/ca.pem")
///     .build()?;
///
/// // Self-signed development server
/// let tls = TlsConfig::builder().verify_peer(false).build()?;
/// ```
#[derive(Clone)]
pub struct TlsConfig {
    ca_cert_path: Option<String>,
    verify_peer: bool,
    client_config: Arc<ClientConfig>,
}

impl TlsConfig {
    /// Start building a TLS configuration.
    pub fn builder() -> TlsConfigBuilder {
        TlsConfigBuilder::default()
    }

    /// Underlying rustls client config.
    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.client_config.clone()
    }

    /// Whether the server certificate is verified.
    pub fn verify_peer(&self) -> bool {
        self.verify_peer
    }

    /// Custom CA bundle, if any.
    pub fn ca_cert_path(&self) -> Option<&str> {
        self.ca_cert_path.as_deref()
    }
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("ca_cert_path", &self.ca_cert_path)
            .field("verify_peer", &self.verify_peer)
            .field("client_config", &"<ClientConfig>")
            .finish()
    }
}

/// Builder for [`TlsConfig`].
pub struct TlsConfigBuilder {
    ca_cert_path: Option<String>,
    verify_peer: bool,
}

impl Default for TlsConfigBuilder {
    fn default() -> Self {
        Self {
            ca_cert_path: None,
            verify_peer: true,
        }
    }
}

impl TlsConfigBuilder {
    /// Trust the certificates in this PEM file instead of the system roots.
    pub fn ca_cert_path(mut self, path: impl Into<String>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    /// Enable or disable server certificate verification (default: enabled).
    ///
    /// **Never disable in production.** Without verification the connection
    /// is open to man-in-the-middle attacks.
    pub fn verify_peer(mut self, verify: bool) -> Self {
        self.verify_peer = verify;
        self
    }

    /// Build the TLS configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the CA file cannot be read or contains no
    /// certificates.
    pub fn build(self) -> Result<TlsConfig> {
        let client_config = if self.verify_peer {
            let root_store = match &self.ca_cert_path {
                Some(ca_path) => load_custom_ca(ca_path)?,
                None => load_system_roots(),
            };
            ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth()
        } else {
            tracing::warn!("TLS peer verification disabled");
            ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerification::new()))
                .with_no_client_auth()
        };

        Ok(TlsConfig {
            ca_cert_path: self.ca_cert_path,
            verify_peer: self.verify_peer,
            client_config: Arc::new(client_config),
        })
    }
}

fn load_system_roots() -> RootCertStore {
    let result = rustls_native_certs::load_native_certs();
    let mut store = RootCertStore::empty();
    let (added, _ignored) = store.add_parsable_certificates(result.certs);

    if added == 0 {
        tracing::debug!(
            errors = result.errors.len(),
            "no usable system root certificates, using bundled roots"
        );
        store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }
    store
}

/// Read every certificate in a PEM file into a root store.
fn load_custom_ca(ca_path: &str) -> Result<RootCertStore> {
    let ca_cert_data = fs::read(ca_path).map_err(|e| {
        Error::Config(format!(
            "failed to read CA certificate file '{}': {}",
            ca_path, e
        ))
    })?;

    let mut reader = std::io::Cursor::new(&ca_cert_data);
    let mut root_store = RootCertStore::empty();
    let mut found_certs = 0;

    loop {
        match rustls_pemfile::read_one(&mut reader) {
            Ok(Some(Item::X509Certificate(cert))) => {
                let _ = root_store.add_parsable_certificates(std::iter::once(cert));
                found_certs += 1;
            }
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(_) => {
                return Err(Error::Config(format!(
                    "failed to parse CA certificate from '{}'",
                    ca_path
                )));
            }
        }
    }

    if found_certs == 0 {
        return Err(Error::Config(format!(
            "no valid certificates found in '{}'",
            ca_path
        )));
    }

    Ok(root_store)
}

/// Accepts any server certificate; handshake signatures are still checked.
#[derive(Debug)]
struct NoVerification {
    provider: Arc<CryptoProvider>,
}

impl NoVerification {
    fn new() -> Self {
        let provider = CryptoProvider::get_default()
            .cloned()
            .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()));
        Self { provider }
    }
}

impl ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// SNI server name for `hostname`.
///
/// Accepts DNS names and IP literals; a trailing dot is dropped.
///
/// # Errors
///
/// Returns [`Error::Config`] if the hostname is empty, too long or contains
/// characters that cannot appear in a host name.
pub fn parse_server_name(hostname: &str) -> Result<ServerName<'static>> {
    let hostname = hostname
        .trim_end_matches('.')
        .trim_start_matches('[')
        .trim_end_matches(']');

    if hostname.is_empty() || hostname.len() > 253 {
        return Err(Error::Config(format!(
            "invalid hostname for TLS: '{}'",
            hostname
        )));
    }

    if !hostname
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == ':')
    {
        return Err(Error::Config(format!(
            "invalid hostname for TLS: '{}'",
            hostname
        )));
    }

    ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::Config(format!("invalid hostname for TLS: '{}'", hostname)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_config_builder_defaults() {
        let tls = TlsConfigBuilder::default();
        assert!(tls.verify_peer);
        assert!(tls.ca_cert_path.is_none());
    }

    #[test]
    fn test_tls_config_with_system_roots() {
        let tls = TlsConfig::builder().build().unwrap();
        assert!(tls.verify_peer());
        assert!(tls.ca_cert_path().is_none());
    }

    #[test]
    fn test_tls_config_without_verification() {
        let tls = TlsConfig::builder().verify_peer(false).build().unwrap();
        assert!(!tls.verify_peer());
    }

    #[test]
    fn test_tls_config_missing_ca_file() {
        let err = TlsConfig::builder()
            .ca_cert_path("/nonexistent/ca.pem")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_tls_config_ca_file_without_certs() {
        let path = std::env::temp_dir().join(format!("kvwire-empty-ca-{}.pem", std::process::id()));
        fs::write(&path, b"not a certificate\n").unwrap();
        let result = TlsConfig::builder()
            .ca_cert_path(path.to_string_lossy())
            .build();
        let _ = fs::remove_file(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_server_name_valid() {
        assert!(parse_server_name("localhost").is_ok());
        assert!(parse_server_name("redis.internal.example.com").is_ok());
        assert!(parse_server_name("example.com.").is_ok());
    }

    #[test]
    fn test_parse_server_name_ip_literals() {
        assert!(matches!(
            parse_server_name("127.0.0.1").unwrap(),
            ServerName::IpAddress(_)
        ));
        assert!(matches!(
            parse_server_name("[::1]").unwrap(),
            ServerName::IpAddress(_)
        ));
    }

    #[test]
    fn test_parse_server_name_invalid() {
        assert!(parse_server_name("").is_err());
        assert!(parse_server_name("bad host").is_err());
        assert!(parse_server_name("host/path").is_err());
    }

    #[test]
    fn test_tls_config_debug() {
        let tls = TlsConfig::builder().build().unwrap();
        let debug_str = format!("{:?}", tls);
        assert!(debug_str.contains("TlsConfig"));
        assert!(debug_str.contains("verify_peer"));
    }
}
