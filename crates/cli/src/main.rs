use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use disco_core::{AddressableType, DuckType, Populatable};
use disco_kubehub::ControllerConfig;
use disco_reconciler::SpecValidator;
use kube::CustomResourceExt;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "discoctl", version, about = "DuckType controller")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the DuckType controller against the current cluster
    Run {
        /// Name reported as the source of emitted events
        #[arg(long = "controller-name", env = "DISCO_CONTROLLER_NAME", default_value = "ducktype-controller")]
        controller_name: String,
        /// Seconds before a failed key is retried
        #[arg(long = "requeue-secs", env = "DISCO_REQUEUE_SECS", default_value_t = 30)]
        requeue_secs: u64,
    },
    /// Print the DuckType CustomResourceDefinition
    Crd,
    /// Print a fully populated Addressable resource shape
    Addressable,
}

fn init_tracing() {
    let env = std::env::var("DISCO_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("DISCO_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid DISCO_METRICS_ADDR; expected host:port");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { controller_name, requeue_secs } => {
            init_metrics();
            let cfg = ControllerConfig { controller_name, requeue: Duration::from_secs(requeue_secs.max(1)) };
            info!(controller = %cfg.controller_name, "run invoked");
            disco_kubehub::run(cfg, Arc::new(SpecValidator)).await?;
        }
        Commands::Crd => {
            let crd = DuckType::crd();
            match cli.output {
                Output::Human => print!("{}", serde_yaml::to_string(&crd).context("rendering CRD as YAML")?),
                Output::Json => println!("{}", serde_json::to_string_pretty(&crd)?),
            }
        }
        Commands::Addressable => {
            let mut full = AddressableType::default();
            full.populate();
            match cli.output {
                Output::Human => {
                    let url = full.status.address.as_ref().and_then(|a| a.url.as_ref());
                    println!("status.address.url: {}", url.map(|u| u.as_str()).unwrap_or("-"));
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&full)?),
            }
        }
    }

    Ok(())
}
