//! Webhook server configuration
//!
//! Every flag can also be set through the environment so the same image runs
//! unchanged under different Deployments.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;

use crate::{Error, Result, DEFAULT_LISTEN_ADDR};

/// Arguments of the `serve` subcommand
#[derive(Args, Clone, Debug, PartialEq, Eq)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "SPODITOR_LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen: SocketAddr,

    /// PEM certificate chain for the webhook's TLS endpoint
    ///
    /// Must be given together with --tls-key. Without either, the server
    /// speaks plain HTTP (only useful behind a TLS-terminating proxy).
    #[arg(long, env = "SPODITOR_TLS_CERT")]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key matching --tls-cert
    #[arg(long, env = "SPODITOR_TLS_KEY")]
    pub tls_key: Option<PathBuf>,

    /// Deny pods whose ss-arg annotations fail to apply instead of admitting
    /// them unchanged
    #[arg(long, env = "SPODITOR_FAIL_CLOSED")]
    pub fail_closed: bool,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 9443))),
            tls_cert: None,
            tls_key: None,
            fail_closed: false,
        }
    }
}

/// Certificate and key file locations
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsPaths {
    /// PEM certificate chain
    pub cert: PathBuf,
    /// PEM private key
    pub key: PathBuf,
}

/// Validated server configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind the server
    pub addr: SocketAddr,
    /// TLS material; `None` serves plain HTTP
    pub tls: Option<TlsPaths>,
    /// Deny instead of admit when the pipeline fails
    pub fail_closed: bool,
}

impl ServeArgs {
    /// Validate the flags into a [`ServerConfig`]
    pub fn server_config(&self) -> Result<ServerConfig> {
        let tls = match (&self.tls_cert, &self.tls_key) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.clone(),
                key: key.clone(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(Error::config("--tls-cert given without --tls-key")),
            (None, Some(_)) => return Err(Error::config("--tls-key given without --tls-cert")),
        };

        Ok(ServerConfig {
            addr: self.listen,
            tls,
            fail_closed: self.fail_closed,
        })
    }
}
