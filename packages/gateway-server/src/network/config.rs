//! Listener settings for the gateway's HTTP surface.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;

/// Where and how the gateway accepts HTTP connections.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Host or IP literal to bind. IPv6 literals may be given bare.
    pub host: String,
    /// 0 lets the OS pick a port; [`NetworkModule::start`](super::NetworkModule::start)
    /// reports the one chosen.
    pub port: u16,
    pub tls: Option<TlsConfig>,
    /// Browser origins allowed by CORS. A `*` entry allows every origin.
    pub cors_origins: Vec<String>,
    /// Grace period for in-flight flows once shutdown is signalled.
    pub drain_timeout: Duration,
    /// Largest request body accepted; bigger bodies are answered with 413.
    pub max_body_bytes: usize,
}

impl NetworkConfig {
    /// `host:port` suitable for `TcpListener::bind`, bracketing IPv6
    /// literals.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    #[must_use]
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|origin| origin.trim() == "*")
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            tls: None,
            cors_origins: vec!["*".to_string()],
            drain_timeout: Duration::from_secs(30),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// PEM certificate chain and private key for HTTPS.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl TlsConfig {
    /// TLS is on when both paths are given and off when neither is.
    ///
    /// # Errors
    ///
    /// Returns an error when only one of the two paths is set.
    pub fn from_paths(cert: Option<PathBuf>, key: Option<PathBuf>) -> anyhow::Result<Option<Self>> {
        match (cert, key) {
            (Some(cert_path), Some(key_path)) => Ok(Some(Self { cert_path, key_path })),
            (None, None) => Ok(None),
            (Some(_), None) => bail!("TLS certificate given without a private key"),
            (None, Some(_)) => bail!("TLS private key given without a certificate"),
        }
    }
}
