//! One direction of reconciliation: watch a trigger channel, diff source
//! against target, apply.
//!
//! Grounded in SPEC_FULL.md §4.3; the same worker type runs both
//! Eureka→AWS and AWS→Eureka by construction, just with `source`/`target`
//! swapped.

use crate::adapter::SideAdapter;
use crate::diff::only_in_first;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// A single sync direction, wired to a trigger channel fed by the source
/// adapter's poller and a cooperative stop signal.
pub struct SyncWorker {
    name: &'static str,
    source: Arc<dyn SideAdapter>,
    target: Arc<dyn SideAdapter>,
    enabled: Arc<AtomicBool>,
}

impl SyncWorker {
    pub fn new(
        name: &'static str,
        source: Arc<dyn SideAdapter>,
        target: Arc<dyn SideAdapter>,
        enabled: bool,
    ) -> Self {
        Self { name, source, target, enabled: Arc::new(AtomicBool::new(enabled)) }
    }

    /// Run until `stop` is flipped. Each trigger does one best-effort
    /// create-then-remove pass; failures inside a pass are handled entirely
    /// by the adapters and never abort the loop.
    pub async fn run(&self, mut trigger: mpsc::Receiver<()>, mut stop: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                received = trigger.recv() => {
                    match received {
                        Some(()) => self.run_once().await,
                        None => {
                            warn!(worker = self.name, "trigger channel closed, exiting");
                            return;
                        }
                    }
                }
                _ = stop.changed() => {
                    if *stop.borrow() {
                        info!(worker = self.name, "sync worker observed stop signal, exiting");
                        return;
                    }
                }
            }
        }
    }

    async fn run_once(&self) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }

        let source_map = self.source.rekeyed_snapshot().await;
        let target_map = self.target.rekeyed_snapshot().await;

        let create = only_in_first(&source_map, &target_map);
        if !create.is_empty() {
            info!(worker = self.name, count = create.len(), "applying creates");
            self.target.apply_create(&create).await;
        }

        let remove = only_in_first(&target_map, &source_map);
        if !remove.is_empty() {
            info!(worker = self.name, count = remove.len(), "applying removes");
            self.target.apply_remove(&remove).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use crate::model::{Node, Service, ServiceMap};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeAdapter {
        services: Mutex<ServiceMap>,
        created: Mutex<Vec<ServiceMap>>,
        removed: Mutex<Vec<ServiceMap>>,
    }

    impl FakeAdapter {
        fn new(services: ServiceMap) -> Self {
            Self { services: Mutex::new(services), created: Mutex::new(Vec::new()), removed: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl SideAdapter for FakeAdapter {
        async fn fetch(&self) -> Result<(), RegistryError> {
            Ok(())
        }

        async fn rekeyed_snapshot(&self) -> ServiceMap {
            self.services.lock().unwrap().clone()
        }

        async fn snapshot(&self) -> ServiceMap {
            self.services.lock().unwrap().clone()
        }

        async fn snapshot_service(&self, name: &str) -> Option<Service> {
            self.services.lock().unwrap().get(name).cloned()
        }

        async fn snapshot_node(&self, name: &str, host: &str, port: u16) -> Option<Node> {
            self.services
                .lock()
                .unwrap()
                .get(name)
                .and_then(|s| s.nodes.get(host))
                .and_then(|p| p.get(&port))
                .cloned()
        }

        async fn apply_create(&self, diff: &ServiceMap) {
            self.created.lock().unwrap().push(diff.clone());
        }

        async fn apply_remove(&self, diff: &ServiceMap) {
            self.removed.lock().unwrap().push(diff.clone());
        }

        async fn poll_loop(&self, _stop: watch::Receiver<bool>, _trigger: mpsc::Sender<()>, _interval: Duration) {}
    }

    fn service_with_node() -> Service {
        let mut s = Service { name: "checkout".to_string(), ..Default::default() };
        s.nodes.entry("1.1.1.1".to_string()).or_default().insert(1, Node::default());
        s
    }

    #[tokio::test]
    async fn trigger_computes_and_applies_create_diff() {
        let mut source_map = ServiceMap::new();
        source_map.insert("checkout".to_string(), service_with_node());
        let source = Arc::new(FakeAdapter::new(source_map));
        let target = Arc::new(FakeAdapter::new(ServiceMap::new()));

        let worker = SyncWorker::new("to-aws", source.clone(), target.clone(), true);
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (stop_tx, stop_rx) = watch::channel(false);

        trigger_tx.send(()).await.unwrap();
        let handle = tokio::spawn(async move { worker.run(trigger_rx, stop_rx).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        stop_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(target.created.lock().unwrap().len(), 1);
        assert!(target.created.lock().unwrap()[0].contains_key("checkout"));
    }

    #[tokio::test]
    async fn disabled_worker_never_applies() {
        let mut source_map = ServiceMap::new();
        source_map.insert("checkout".to_string(), service_with_node());
        let source = Arc::new(FakeAdapter::new(source_map));
        let target = Arc::new(FakeAdapter::new(ServiceMap::new()));

        let worker = SyncWorker::new("to-aws", source.clone(), target.clone(), false);
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (stop_tx, stop_rx) = watch::channel(false);

        trigger_tx.send(()).await.unwrap();
        let handle = tokio::spawn(async move { worker.run(trigger_rx, stop_rx).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        stop_tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(target.created.lock().unwrap().is_empty());
    }
}
