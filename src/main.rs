//! CLI entry point.
//!
//! Mirrors the original CLI's single long-running subcommand (`sync-catalog`)
//! and the teacher's `clap`-derive layout (bin/src/main.rs), generalized from
//! a project-management toolchain to this daemon's one command.

use clap::Parser;
use eureka_aws_sync::adapter::{AwsAdapter, EurekaAdapter};
use eureka_aws_sync::config::Config;
use eureka_aws_sync::metrics::{CadenceMetricsSink, MetricsSink, NoopMetricsSink};
use eureka_aws_sync::registry::{CloudMapClient, EurekaHttpClient};
use eureka_aws_sync::supervisor::{ShutdownReason, Supervisor};
use std::collections::HashSet;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

/// Reconciles an AWS Cloud Map namespace and a Eureka server.
#[derive(Parser)]
#[command(name = "eureka-aws-sync")]
#[command(about = "Reconciles an AWS Cloud Map namespace and a Eureka server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the reconciliation daemon until terminated.
    SyncCatalog {
        #[arg(long)]
        to_aws: bool,
        #[arg(long)]
        to_eureka: bool,
        #[arg(long)]
        aws_namespace_id: String,
        #[arg(long, default_value = "")]
        aws_service_prefix: String,
        #[arg(long, default_value = "")]
        eureka_service_prefix: String,
        #[arg(long, default_value = "30s")]
        aws_poll_interval: String,
        #[arg(long, default_value = "30s")]
        eureka_poll_interval: String,
        #[arg(long, default_value_t = 60)]
        aws_dns_ttl: i64,
        #[arg(long)]
        stale: bool,
        #[arg(long)]
        eureka_domain: String,
        #[arg(long, value_delimiter = ',', required = true)]
        eureka_allow_list: Vec<String>,
        #[arg(long, default_value = "stage-v2")]
        environment: String,
        #[arg(long)]
        statsd_host: Option<String>,
        #[arg(long, default_value_t = 8125)]
        statsd_port: u16,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async_main())
}

async fn async_main() -> ExitCode {
    let cli = Cli::parse();
    let Command::SyncCatalog {
        to_aws,
        to_eureka,
        aws_namespace_id,
        aws_service_prefix,
        eureka_service_prefix,
        aws_poll_interval,
        eureka_poll_interval,
        aws_dns_ttl,
        stale,
        eureka_domain,
        eureka_allow_list,
        environment,
        statsd_host,
        statsd_port,
    } = cli.command;

    let config = Config {
        to_aws,
        to_eureka,
        aws_namespace_id,
        aws_service_prefix,
        eureka_service_prefix,
        aws_poll_interval: parse_duration(&aws_poll_interval),
        eureka_poll_interval: parse_duration(&eureka_poll_interval),
        aws_dns_ttl,
        stale,
        eureka_domain,
        eureka_allow_list,
        environment,
    };

    if let Err(error) = config.validate() {
        error!(%error, "startup configuration invalid");
        return ExitCode::FAILURE;
    }

    match run(config, statsd_host, statsd_port).await {
        Ok(ShutdownReason::Requested) => {
            info!("shut down cleanly");
            ExitCode::SUCCESS
        }
        Ok(ShutdownReason::WorkerFailure) => {
            error!("shutting down due to an unexpected worker exit");
            ExitCode::FAILURE
        }
        Err(error) => {
            error!(%error, "fatal startup error");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    config: Config,
    statsd_host: Option<String>,
    statsd_port: u16,
) -> anyhow::Result<ShutdownReason> {
    let metrics: Arc<dyn MetricsSink> = match statsd_host {
        Some(host) => Arc::new(CadenceMetricsSink::new(&host, statsd_port, config.environment.clone())?),
        None => Arc::new(NoopMetricsSink),
    };

    let eureka_client = Arc::new(EurekaHttpClient::new(config.eureka_domain.clone()));
    let allow_list: HashSet<String> = config.eureka_allow_list.iter().cloned().collect();
    let eureka_adapter = Arc::new(EurekaAdapter::new(
        eureka_client,
        allow_list,
        config.eureka_service_prefix.clone(),
        metrics.clone(),
    ));

    let aws_config = aws_config::load_from_env().await;
    let aws_sdk_client = aws_sdk_servicediscovery::Client::new(&aws_config);
    let cloud_map_client = Arc::new(CloudMapClient::new(aws_sdk_client));
    let aws_adapter = Arc::new(AwsAdapter::new(
        cloud_map_client,
        config.aws_namespace_id.clone(),
        config.aws_service_prefix.clone(),
        config.aws_dns_ttl,
        metrics.clone(),
    ));

    let supervisor = Supervisor::new(
        eureka_adapter,
        aws_adapter,
        config.aws_poll_interval,
        config.eureka_poll_interval,
        config.to_aws,
        config.to_eureka,
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stop_tx.send(true);
        }
    });

    Ok(supervisor.run(stop_rx).await)
}

fn parse_duration(value: &str) -> Duration {
    humantime::parse_duration(value).unwrap_or(Duration::from_secs(30))
}
