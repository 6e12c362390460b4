//! Connection establishment (plain TCP or TLS)

use crate::{config::ServerConfig, Error, Result};
use rustls::{Certificate, ClientConfig, PrivateKey, RootCertStore, ServerName};
use std::io::BufReader;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

/// Trait for connection streams (TCP or TLS)
pub trait ConnectionStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> ConnectionStream for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// An established connection to the server
pub type Connection = Box<dyn ConnectionStream>;

/// Connect to the configured server
///
/// TLS is used when a CA file is configured; a client certificate and key
/// are presented when both are set.
pub async fn connect(config: &ServerConfig) -> Result<Connection> {
    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Connecting to {}", addr);

    let stream = TcpStream::connect(&addr)
        .await
        .map_err(|e| Error::Connection(format!("Failed to connect to {}: {}", addr, e)))?;

    if !config.use_tls() {
        return Ok(Box::new(stream));
    }

    let tls_config = tls_config(config)?;
    let server_name = ServerName::try_from(config.host.as_str())
        .map_err(|e| Error::Connection(format!("Invalid server name {}: {}", config.host, e)))?;

    tracing::debug!("Starting TLS handshake with {}", config.host);
    let stream = TlsConnector::from(Arc::new(tls_config))
        .connect(server_name, stream)
        .await
        .map_err(|e| Error::Connection(format!("TLS handshake failed: {}", e)))?;

    Ok(Box::new(stream))
}

/// Build the client TLS configuration from the configured files
fn tls_config(config: &ServerConfig) -> Result<ClientConfig> {
    let ca_file = config
        .ca_file
        .as_deref()
        .ok_or_else(|| Error::Config("TLS requires a CA file".to_string()))?;

    let mut roots = RootCertStore::empty();
    for cert in load_certificates(ca_file)? {
        roots.add(&cert)?;
    }

    let builder = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots);

    let tls_config = match (&config.cert_file, &config.key_file) {
        (Some(cert_file), Some(key_file)) => {
            let certs = load_certificates(cert_file)?;
            let key = load_private_key(key_file)?;
            builder.with_client_auth_cert(certs, key)?
        }
        _ => builder.with_no_client_auth(),
    };

    tracing::info!("TLS configuration loaded");
    Ok(tls_config)
}

/// Load certificates from file
fn load_certificates(filename: &str) -> Result<Vec<Certificate>> {
    let certfile = std::fs::File::open(filename)
        .map_err(|e| Error::Config(format!("Failed to open certificate file {}: {}", filename, e)))?;
    let mut reader = BufReader::new(certfile);

    let certs = rustls_pemfile::certs(&mut reader)
        .map_err(|e| Error::Config(format!("Failed to parse certificate file {}: {}", filename, e)))?;

    if certs.is_empty() {
        return Err(Error::Config(format!("No certificates found in {}", filename)));
    }

    Ok(certs.into_iter().map(Certificate).collect())
}

/// Load private key from file (PKCS#8 or PKCS#1)
fn load_private_key(filename: &str) -> Result<PrivateKey> {
    let open = || {
        std::fs::File::open(filename)
            .map(BufReader::new)
            .map_err(|e| Error::Config(format!("Failed to open key file {}: {}", filename, e)))
    };

    let mut keys = rustls_pemfile::pkcs8_private_keys(&mut open()?)
        .map_err(|e| Error::Config(format!("Failed to parse key file {}: {}", filename, e)))?;

    if keys.is_empty() {
        keys = rustls_pemfile::rsa_private_keys(&mut open()?)
            .map_err(|e| Error::Config(format!("Failed to parse key file {}: {}", filename, e)))?;
    }

    keys.into_iter()
        .next()
        .map(PrivateKey)
        .ok_or_else(|| Error::Config(format!("No private keys found in {}", filename)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_ca_file_is_config_error() {
        let config = ServerConfig {
            ca_file: Some("/nonexistent/ca.pem".to_string()),
            ..ServerConfig::default()
        };
        assert!(matches!(tls_config(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_file_without_pem_blocks_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a certificate").unwrap();
        let path = file.path().to_str().unwrap();

        assert!(load_certificates(path).is_err());
        assert!(load_private_key(path).is_err());
    }
}
