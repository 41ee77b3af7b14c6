use std::process::ExitCode;

use horoscope_mailer::config::RunConfig;
use horoscope_mailer::job::{LiveBackends, Orchestrator};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Install rustls crypto provider before any TLS usage
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("Warning: a rustls crypto provider was already installed");
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Horoscope mailer starting");

    let outcome = Orchestrator::new(LiveBackends)
        .run(RunConfig::from_env)
        .await;

    if !outcome.is_success() {
        eprintln!("Error: {outcome}");
        eprintln!("  Check the configuration and provider status, then re-run the job.");
    }

    outcome.exit_code()
}
