//! Server module for running Terraform providers
//!
//! This module starts the gRPC server, prints the go-plugin handshake line
//! Terraform reads from stdout, and shuts down on Ctrl-C, `StopProvider` or
//! the host's controller `Shutdown`.

use crate::context::Context;
use crate::error::{Result, TfplugError};
use crate::grpc::{GrpcProviderServer, PluginController};
use crate::proto::{GrpcControllerServer, ProviderServer};
use crate::provider::Provider;
use crate::tls::{self, ServerIdentity, CLIENT_CERT_ENV};
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use std::future::Future;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tonic::transport::Server;

/// Cookie go-plugin hosts set so a provider binary can tell it was launched
/// by Terraform
pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

const CORE_PROTOCOL_VERSION: u32 = 1;
const PLUGIN_PROTOCOL_VERSION: u32 = 6;

/// Log level for the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a Terraform log level name; `JSON` is Terraform's trace mode
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" | "json" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Level from `TF_LOG_PROVIDER`, falling back to `TF_LOG`, default info
    pub fn from_env() -> Self {
        ["TF_LOG_PROVIDER", "TF_LOG"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find_map(|value| Self::parse(&value))
            .unwrap_or(LogLevel::Info)
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// PEM certificate; TLS is enabled only when both paths are set
    pub cert_path: Option<PathBuf>,
    /// PEM private key
    pub key_path: Option<PathBuf>,
    /// PEM certificate of the plugin host; when set, connections must
    /// present it over TLS
    pub client_cert: Option<String>,
    /// Maximum message size in bytes
    pub max_message_size: usize,
    /// Log level
    pub log_level: LogLevel,
    /// How long in-flight requests may run once shutdown starts
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cert_path: None,
            key_path: None,
            client_cert: None,
            max_message_size: 256 << 20, // 256MB
            log_level: LogLevel::Info,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `TF_PLUGIN_CERT`, `TF_PLUGIN_KEY`,
    /// `PLUGIN_CLIENT_CERT` and the Terraform log level variables
    pub fn from_env() -> Self {
        let mut config = Self::default().with_log_level(LogLevel::from_env());
        if let Ok(cert) = std::env::var("TF_PLUGIN_CERT") {
            if !cert.is_empty() {
                config = config.with_cert_path(PathBuf::from(cert));
            }
        }
        if let Ok(key) = std::env::var("TF_PLUGIN_KEY") {
            if !key.is_empty() {
                config = config.with_key_path(PathBuf::from(key));
            }
        }
        if let Ok(pem) = std::env::var(CLIENT_CERT_ENV) {
            if !pem.is_empty() {
                config = config.with_client_cert(pem);
            }
        }
        config
    }

    /// Set the certificate path
    pub fn with_cert_path(mut self, path: PathBuf) -> Self {
        self.cert_path = Some(path);
        self
    }

    /// Set the key path
    pub fn with_key_path(mut self, path: PathBuf) -> Self {
        self.key_path = Some(path);
        self
    }

    /// Require TLS clients to present this PEM certificate
    pub fn with_client_cert(mut self, pem: String) -> Self {
        self.client_cert = Some(pem);
        self
    }

    /// Set the log level
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Set the shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    fn tls_paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) => Some((cert, key)),
            _ => None,
        }
    }
}

/// Fails unless the process was started by a go-plugin host
pub fn check_magic_cookie() -> Result<()> {
    match std::env::var(MAGIC_COOKIE_KEY) {
        Ok(value) if value == MAGIC_COOKIE_VALUE => Ok(()),
        _ => Err(TfplugError::NotLaunchedByTerraform),
    }
}

/// go-plugin handshake: `core|protocol|network|address|grpc[|cert]`
pub fn handshake_line(addr: SocketAddr, server_cert_der: Option<&[u8]>) -> String {
    let mut line = format!(
        "{}|{}|tcp|{}|grpc",
        CORE_PROTOCOL_VERSION, PLUGIN_PROTOCOL_VERSION, addr
    );
    if let Some(der) = server_cert_der {
        line.push('|');
        line.push_str(&STANDARD_NO_PAD.encode(der));
    }
    line
}

/// Main entry point for running a provider
pub async fn serve<P: Provider + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    check_magic_cookie()?;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    run(provider, config, listener, |line| {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", line)?;
        stdout.flush()?;
        Ok(())
    })
    .await
}

/// Serve on `listener`, handing the handshake line to `announce` once the
/// transport is ready
pub(crate) async fn run<P, F>(
    provider: P,
    config: ServerConfig,
    listener: TcpListener,
    announce: F,
) -> Result<()>
where
    P: Provider + 'static,
    F: FnOnce(&str) -> Result<()>,
{
    let client_cert = config
        .client_cert
        .as_deref()
        .map(tls::parse_client_cert)
        .transpose()?;

    // go-plugin's automatic mTLS expects a server certificate whenever it
    // passed its own
    let identity = match config.tls_paths() {
        Some((cert_path, key_path)) => Some(ServerIdentity::load(cert_path, key_path).await?),
        None if client_cert.is_some() => Some(ServerIdentity::generate()?),
        None => None,
    };

    let grpc_server = GrpcProviderServer::new(provider);
    let stop = grpc_server.stop_context();
    let provider_service = ProviderServer::new(grpc_server)
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);
    let controller_service = GrpcControllerServer::new(PluginController::new(stop.clone()));

    let addr = listener.local_addr()?;
    let server_cert = identity.as_ref().map(|identity| identity.cert.clone());
    announce(&handshake_line(addr, server_cert.as_deref()))?;
    tracing::info!(
        %addr,
        tls = server_cert.is_some(),
        client_auth = client_cert.is_some(),
        "Provider server listening"
    );

    let interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
            interrupt.cancel();
        }
    });

    let router = Server::builder()
        .add_service(provider_service)
        .add_service(controller_service);
    let shutdown_signal = stop.clone();
    let shutdown = async move { shutdown_signal.cancelled().await };

    match identity {
        Some(identity) => {
            let acceptor = tls::acceptor(identity, client_cert)?;
            let incoming = tls::incoming(listener, acceptor);
            drive(
                router.serve_with_incoming_shutdown(incoming, shutdown),
                &stop,
                config.shutdown_timeout,
            )
            .await
        }
        None => {
            let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);
            drive(
                router.serve_with_incoming_shutdown(incoming, shutdown),
                &stop,
                config.shutdown_timeout,
            )
            .await
        }
    }
}

/// Run the server until it stops, giving in-flight requests `timeout` once
/// shutdown starts
async fn drive<S>(server: S, stop: &Context, timeout: Duration) -> Result<()>
where
    S: Future<Output = std::result::Result<(), tonic::transport::Error>>,
{
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        _ = async {
            stop.cancelled().await;
            tokio::time::sleep(timeout).await;
        } => {
            tracing::warn!(?timeout, "Graceful shutdown timed out");
        }
    }

    Ok(())
}
