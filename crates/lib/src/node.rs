//! Node runner: checks the credential, connects to rosbridge, wires the bridge between
//! the input and output topics, and serves until shutdown or until the server disconnects.

use crate::bridge::{self, Bridge};
use crate::bus::RosbridgeClient;
use crate::config::{Config, API_KEY_ENV};
use crate::llm::OpenAiClient;
use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Conditions that stop the node before it serves any message.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("{} not found in the environment", API_KEY_ENV)]
    MissingCredential,
}

fn build_completion_client(config: &Config, api_key: Option<String>) -> Result<OpenAiClient> {
    let api_key = api_key.ok_or(StartupError::MissingCredential)?;
    OpenAiClient::new(&config.openai, &config.openai.base_url, api_key)
        .context("building OpenAI client")
}

/// Run the node until SIGINT/SIGTERM. See [`run_node_until`].
pub async fn run_node(config: Config, api_key: Option<String>) -> Result<()> {
    run_node_until(config, api_key, shutdown_signal()).await
}

/// Run the node until `shutdown` completes or the rosbridge server closes the connection.
/// `config` is used as given; env overrides are applied by the caller (`config::apply_env_overrides`).
/// A missing `api_key` fails with [`StartupError::MissingCredential`] before the bus is touched.
pub async fn run_node_until(
    config: Config,
    api_key: Option<String>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let completion = build_completion_client(&config, api_key)?;
    let bus = &config.bus;
    let queue_size = bus.queue_size.max(1);
    let bus_url = bus.url.trim();

    let mut client = RosbridgeClient::connect(bus_url, &bus.node_name)
        .await
        .with_context(|| format!("connecting to rosbridge at {}", bus_url))?;
    let publisher = client
        .advertise(&bus.output_topic, queue_size)
        .await
        .with_context(|| format!("advertising {}", bus.output_topic))?;
    log::info!("using model {}", completion.model());
    let bridge = Bridge::new(Arc::new(completion), Arc::new(publisher));

    let (inbound_tx, inbound_rx) = mpsc::channel(queue_size);
    let reader = client
        .subscribe(&bus.input_topic, queue_size, inbound_tx)
        .await
        .with_context(|| format!("subscribing to {}", bus.input_topic))?;
    log::info!("Node started. Awaiting input on {}.", bus.input_topic);

    tokio::select! {
        _ = bridge.run(inbound_rx) => {
            log::warn!("rosbridge connection closed, stopping node");
        }
        _ = shutdown => {
            log::info!("shutdown signal received, unregistering topics");
        }
    }

    reader.abort();
    if let Err(e) = client.unsubscribe(&bus.input_topic).await {
        log::debug!("unsubscribe on shutdown: {}", e);
    }
    if let Err(e) = client.unadvertise(&bus.output_topic).await {
        log::debug!("unadvertise on shutdown: {}", e);
    }
    client.close().await;
    log::info!("node stopped");
    Ok(())
}

/// One-shot query against the configured completion service. Same credential rule as the node.
pub async fn ask(config: &Config, api_key: Option<String>, prompt: &str) -> Result<String> {
    let completion = build_completion_client(config, api_key)?;
    Ok(bridge::query_completion(&completion, prompt).await)
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
