//! Owns the lifecycle of the four long-lived workers: starts them, waits for
//! either an external stop request or the first unexpected exit, tears the
//! rest down, and joins everyone before returning.
//!
//! Grounded in SPEC_FULL.md §4.4 and the Design Notes' "collaboration at
//! equal peer" guidance: the two adapters are siblings owned here as
//! `Arc<dyn SideAdapter>`, never holding references to each other.

use crate::adapter::{AwsAdapter, EurekaAdapter, SideAdapter};
use crate::sync::SyncWorker;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Why the supervisor tore everything down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// An external caller (signal handler, test) requested a stop.
    Requested,
    /// A worker task exited without having observed the stop signal.
    WorkerFailure,
}

pub struct Supervisor {
    eureka: Arc<EurekaAdapter>,
    aws: Arc<AwsAdapter>,
    aws_poll_interval: Duration,
    eureka_poll_interval: Duration,
    to_aws: bool,
    to_eureka: bool,
}

impl Supervisor {
    pub fn new(
        eureka: Arc<EurekaAdapter>,
        aws: Arc<AwsAdapter>,
        aws_poll_interval: Duration,
        eureka_poll_interval: Duration,
        to_aws: bool,
        to_eureka: bool,
    ) -> Self {
        Self { eureka, aws, aws_poll_interval, eureka_poll_interval, to_aws, to_eureka }
    }

    /// Start all four workers and block until either `external_stop` fires or
    /// a worker exits unexpectedly. Returns the reason shutdown happened.
    pub async fn run(&self, mut external_stop: watch::Receiver<bool>) -> ShutdownReason {
        let (internal_stop_tx, internal_stop_rx) = watch::channel(false);
        let (eureka_trigger_tx, eureka_trigger_rx) = mpsc::channel(1);
        let (aws_trigger_tx, aws_trigger_rx) = mpsc::channel(1);

        let mut workers: JoinSet<&'static str> = JoinSet::new();

        {
            let eureka = self.eureka.clone();
            let stop = internal_stop_rx.clone();
            let trigger = eureka_trigger_tx.clone();
            let interval = self.eureka_poll_interval;
            workers.spawn(async move {
                eureka.poll_loop(stop, trigger, interval).await;
                "eureka-poller"
            });
        }
        {
            let aws = self.aws.clone();
            let stop = internal_stop_rx.clone();
            let trigger = aws_trigger_tx.clone();
            let interval = self.aws_poll_interval;
            workers.spawn(async move {
                aws.poll_loop(stop, trigger, interval).await;
                "aws-poller"
            });
        }
        {
            let worker = SyncWorker::new(
                "eureka-to-aws",
                self.eureka.clone() as Arc<dyn SideAdapter>,
                self.aws.clone() as Arc<dyn SideAdapter>,
                self.to_aws,
            );
            let stop = internal_stop_rx.clone();
            workers.spawn(async move {
                worker.run(eureka_trigger_rx, stop).await;
                "eureka-to-aws-syncer"
            });
        }
        {
            let worker = SyncWorker::new(
                "aws-to-eureka",
                self.aws.clone() as Arc<dyn SideAdapter>,
                self.eureka.clone() as Arc<dyn SideAdapter>,
                self.to_eureka,
            );
            let stop = internal_stop_rx.clone();
            workers.spawn(async move {
                worker.run(aws_trigger_rx, stop).await;
                "aws-to-eureka-syncer"
            });
        }

        let reason = tokio::select! {
            _ = external_stop.changed() => {
                info!("supervisor observed external stop request");
                ShutdownReason::Requested
            }
            joined = workers.join_next() => {
                match joined {
                    Some(Ok(name)) => {
                        error!(worker = name, "worker exited unexpectedly before stop was requested");
                        ShutdownReason::WorkerFailure
                    }
                    Some(Err(join_error)) => {
                        error!(%join_error, "worker task panicked");
                        ShutdownReason::WorkerFailure
                    }
                    None => {
                        warn!("worker set was empty at select time");
                        ShutdownReason::WorkerFailure
                    }
                }
            }
        };

        let _ = internal_stop_tx.send(true);
        while let Some(result) = workers.join_next().await {
            if let Err(join_error) = result {
                error!(%join_error, "worker task panicked during shutdown join");
            }
        }

        reason
    }
}
