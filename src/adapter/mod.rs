//! Side adapters: the fetch/normalize/apply boundary between the abstract
//! registry wire clients and the catalog/diff core.
//!
//! Grounded in SPEC_FULL.md §4.1's symmetric contract; `EurekaAdapter` and
//! `AwsAdapter` are two independent implementations of the same
//! [`SideAdapter`] trait so the sync worker and supervisor can be written
//! once, generically, against either direction.

pub mod aws_adapter;
pub mod eureka_adapter;

pub use aws_adapter::AwsAdapter;
pub use eureka_adapter::EurekaAdapter;

use crate::error::RegistryError;
use crate::model::{Node, Service, ServiceMap};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Common contract shared by both sides of the sync.
///
/// `fetch` and the `apply_*` methods are the only ones allowed to call out to
/// a registry; `snapshot*` methods only ever read the in-memory catalog.
#[async_trait]
pub trait SideAdapter: Send + Sync {
    /// Read the authoritative catalog from this side's registry and replace
    /// the stored snapshot atomically. Leaves the stored catalog untouched on
    /// failure.
    async fn fetch(&self) -> Result<(), RegistryError>;

    /// The current stored catalog, with healths rekeyed into the peer's
    /// identifier space (see SPEC_FULL.md §4.1 "Rekeying").
    async fn rekeyed_snapshot(&self) -> ServiceMap;

    async fn snapshot(&self) -> ServiceMap;
    async fn snapshot_service(&self, name: &str) -> Option<Service>;
    async fn snapshot_node(&self, name: &str, host: &str, port: u16) -> Option<Node>;

    /// Create/register everything named in `diff` on this side.
    async fn apply_create(&self, diff: &ServiceMap);

    /// Deregister/delete everything named in `diff` from this side.
    async fn apply_remove(&self, diff: &ServiceMap);

    /// Poll on a fixed interval until `stop` is flipped, emitting a
    /// best-effort trigger on every successful fetch.
    async fn poll_loop(&self, stop: watch::Receiver<bool>, trigger: mpsc::Sender<()>, interval: Duration);
}

/// Shared poll-loop skeleton: every adapter ticks on the same cadence,
/// fetches, logs failures without aborting, and emits a capacity-1,
/// drop-on-full trigger on success.
pub(crate) async fn run_poll_loop<F, Fut>(
    mut stop: watch::Receiver<bool>,
    trigger: mpsc::Sender<()>,
    interval: Duration,
    span_name: &'static str,
    mut fetch: F,
) where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<(), RegistryError>>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match fetch().await {
                    Ok(()) => {
                        // Non-blocking send: a pending trigger already covers this one.
                        let _ = trigger.try_send(());
                    }
                    Err(error) => {
                        tracing::warn!(span = span_name, %error, "poll fetch failed, will retry next tick");
                    }
                }
            }
            _ = stop.changed() => {
                if *stop.borrow() {
                    tracing::info!(span = span_name, "poll loop observed stop signal, exiting");
                    return;
                }
            }
        }
    }
}
