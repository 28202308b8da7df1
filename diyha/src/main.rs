use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, instrument, trace, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

mod cli;

use diyha_remote as remote;
use diyha_util as util;

use crate::cli::{Cli, Command};
use crate::remote::{
    Category, EndpointRegistry, Publisher, RemoteConfig, RequestConfig, Resolver, StatePayload,
};
use crate::util::types::Hostname;

fn initialize_tracing() {
    // Initialize tracing subscriber for human-readable logs
    tracing_subscriber::registry()
        .with(
            // Use some log defaults. These can be overriden using
            // RUST_LOG
            EnvFilter::try_from_default_env().unwrap_or(
                EnvFilter::default()
                    .add_directive("debug".parse().unwrap())
                    .add_directive("hyper=error".parse().unwrap())
                    .add_directive("hyper_util=error".parse().unwrap())
                    .add_directive("reqwest=info".parse().unwrap()),
            ),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .event_format(fmt::format().compact().with_target(false).without_time()),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    initialize_tracing();

    let cli = cli::parse();

    let identity = match cli.hostname.clone() {
        Some(hostname) => hostname,
        None => Hostname::local().context("could not determine this node's identity")?,
    };

    let request_defaults = RequestConfig::default();
    let config = RemoteConfig {
        server_address: cli.server_address.clone(),
        request: RequestConfig {
            timeout: cli.request_timeout.unwrap_or(request_defaults.timeout),
        },
    };

    run(identity, config, cli).await
}

#[instrument(name = "diyha", skip_all, err)]
async fn run(identity: Hostname, config: RemoteConfig, cli: Cli) -> Result<()> {
    trace!(identity = %identity, remote = ?config, "using config:");

    let registry = Arc::new(
        EndpointRegistry::with_defaults(&config.server_address)
            .context("invalid server address")?,
    );
    let client = config.client();
    let resolver = Resolver::new(client.clone(), Arc::clone(&registry), identity);

    match cli.command {
        Command::Resolve => {
            for (category, result) in resolver.resolve_all().await {
                match result {
                    Ok(id) => info!("{category} resolved to id {id}"),
                    Err(err) => warn!("{category} unresolved: {err}"),
                }
            }

            let snapshot = registry.snapshot().await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::Publish {
            category,
            mut payload,
        } => {
            let publisher = Publisher::new(client, Arc::clone(&registry));
            publish_once(&resolver, &publisher, category, &mut payload).await?;
        }
    }

    Ok(())
}

async fn publish_once(
    resolver: &Resolver,
    publisher: &Publisher,
    category: Category,
    payload: &mut StatePayload,
) -> Result<()> {
    let id = resolver
        .resolve(category)
        .await
        .with_context(|| format!("failed to resolve {category} for '{}'", resolver.identity()))?;
    info!("{category} resolved to id {id}");

    publisher
        .publish(category, payload)
        .await
        .with_context(|| format!("failed to publish {category} state"))?;
    info!("published {category} state");

    Ok(())
}
