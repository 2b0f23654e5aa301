use slack::SlackProvider;
use tfplug::{LogLevel, ServerConfig, TfplugError};

#[tokio::main]
async fn main() {
    // stdout carries the plugin handshake, so logs go to stderr
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(LogLevel::from_env()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::debug!(address = slack::PROVIDER_ADDRESS, "Starting provider");

    let config = ServerConfig::from_env();
    if let Err(e) = tfplug::serve(SlackProvider::new(), config).await {
        match e {
            TfplugError::NotLaunchedByTerraform => eprintln!("{}", e),
            e => tracing::error!(error = %e, "Provider server failed"),
        }
        std::process::exit(1);
    }
}
