//! nomad-graphite - Nomad client capacity reporter
//!
//! This binary runs once per invocation on a Nomad client node, usually from
//! cron or a periodic job. It reads the node's capacity and running
//! allocations from the local agent and sends eight figures to Graphite.

use anyhow::{Context, Result};
use bridge_lib::{NomadClient, Pipeline};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

const BRIDGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Report Nomad client node resources to Graphite
#[derive(Parser, Debug)]
#[command(name = "nomad-graphite")]
#[command(author, version, about = "Report Nomad client node resources to Graphite", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, env = "NOMAD_GRAPHITE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Host and port of the carbon server [default: 127.0.0.1:2003]
    #[arg(long)]
    pub graphite_addr: Option<String>,

    /// Address of the Nomad agent [default: http://127.0.0.1:4646]
    #[arg(long)]
    pub addr: Option<String>,

    /// TLS certificate to use when connecting to Nomad
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// TLS key to use when connecting to Nomad
    #[arg(long)]
    pub tls_key: Option<PathBuf>,

    /// TLS CA cert to use to validate the Nomad server certificate
    #[arg(long)]
    pub tls_ca_cert: Option<PathBuf>,

    /// Do not validate the Nomad server certificate
    #[arg(long)]
    pub tls_insecure: bool,

    /// Log metrics instead of sending them to carbon
    #[arg(long)]
    pub dry_run: bool,

    /// Seconds to wait for the carbon connection [default: 5]
    #[arg(long)]
    pub connect_timeout_secs: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        config::BridgeConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_overrides(&cli);

    init_tracing(config.log_json);

    let host = hostname::get()
        .context("Failed to determine local hostname")?
        .to_string_lossy()
        .into_owned();

    let target = config.sink_target();
    let pipeline = Pipeline::new(host);
    pipeline
        .logger()
        .log_startup(BRIDGE_VERSION, &config.nomad_addr, &target.to_string());

    let tls = config.tls();
    if tls.has_identity() {
        info!(insecure = tls.insecure, "Using TLS client identity for Nomad");
    } else if tls.has_ignored_options() {
        warn!(
            ca_cert = ?tls.ca_cert,
            insecure = tls.insecure,
            "TLS CA and insecure options need --tls-cert and --tls-key; ignoring them"
        );
    }
    let client =
        NomadClient::with_tls(&config.nomad_addr, &tls).context("Failed to create Nomad client")?;

    match pipeline.run(&client, &target).await {
        Ok(summary) => {
            info!(
                node_id = %summary.identity.node_id,
                metrics = summary.metrics_written,
                "Reported node resources"
            );
            Ok(())
        }
        Err(e) => {
            pipeline.logger().log_failure(&e);
            Err(anyhow::Error::new(e).context("Run failed"))
        }
    }
}
