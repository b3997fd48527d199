//! Spoditor - mutating admission webhook for StatefulSet pods

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spoditor::config::ServeArgs;
use spoditor::crd::crd_manifests;
use spoditor::pipeline::MutationPipeline;
use spoditor::webhook::{serve, WebhookState};

/// Spoditor - per-ordinal pod specialization for StatefulSets
#[derive(Parser, Debug)]
#[command(name = "spoditor", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,

    /// Webhook server flags
    ///
    /// Serves POST /mutate-v1-pod for a MutatingWebhookConfiguration on
    /// pods, plus GET /healthz.
    #[command(flatten)]
    serve: ServeArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install crypto provider before any TLS config is built
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: Failed to install crypto provider: {:?}", e);
        std::process::exit(1);
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.crd {
        let crd = crd_manifests()?;
        println!("{crd}");
        return Ok(());
    }

    run_server(cli.serve).await
}

/// Build the pipeline and serve until the server fails
async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let config = args.server_config()?;

    let pipeline = MutationPipeline::default();
    tracing::info!(handlers = ?pipeline.handler_names(), "registered argumentation handlers");

    let state = Arc::new(WebhookState::new(Arc::new(pipeline), config.fail_closed));
    serve(config, state).await?;
    Ok(())
}
