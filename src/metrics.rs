//! Metrics emission, abstracted behind a trait so sync workers never depend
//! directly on a statsd socket.
//!
//! Grounded in the original source's `datadog-go/statsd` usage: gauges and
//! counters, each carrying a fixed `environment` tag. `cadence` is the
//! published Rust statsd/DogStatsD client and the direct analogue of that
//! dependency.

use cadence::{Counted, Gauged, StatsdClient};
use std::net::UdpSocket;
use tracing::warn;

/// Emits the handful of counters/gauges this daemon defines in SPEC_FULL.md §6.
///
/// Every method is infallible from the caller's perspective: a failed emission
/// is logged and swallowed, never propagated into the sync loop.
pub trait MetricsSink: Send + Sync {
    fn aws_services_count(&self, count: i64);
    fn aws_services_updated(&self, count: i64);
    fn aws_instance_update_error(&self);
    fn aws_instance_health_updated(&self);
    fn aws_instance_health_update_error(&self);
}

/// Production sink, backed by a DogStatsD-compatible UDP client.
pub struct CadenceMetricsSink {
    client: StatsdClient,
    environment: String,
}

impl CadenceMetricsSink {
    pub fn new(host: &str, port: u16, environment: impl Into<String>) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        let sink = cadence::UdpMetricSink::from((host, port), socket)?;
        let client = StatsdClient::from_sink("eureka_aws.sync", sink);
        Ok(Self { client, environment: environment.into() })
    }
}

impl MetricsSink for CadenceMetricsSink {
    fn aws_services_count(&self, count: i64) {
        if let Err(e) = self
            .client
            .gauge_with_tags("aws.services.count", count as u64)
            .with_tag("environment", &self.environment)
            .try_send()
        {
            warn!(error = %e, "failed to emit aws.services.count gauge");
        }
    }

    fn aws_services_updated(&self, count: i64) {
        if let Err(e) = self
            .client
            .count_with_tags("aws.services.updated_count", count)
            .with_tag("environment", &self.environment)
            .try_send()
        {
            warn!(error = %e, "failed to emit aws.services.updated_count counter");
        }
    }

    fn aws_instance_update_error(&self) {
        if let Err(e) = self
            .client
            .count_with_tags("aws.instances.update_error", 1)
            .with_tag("environment", &self.environment)
            .try_send()
        {
            warn!(error = %e, "failed to emit aws.instances.update_error counter");
        }
    }

    fn aws_instance_health_updated(&self) {
        if let Err(e) = self
            .client
            .count_with_tags("aws.instances.health_updated", 1)
            .with_tag("environment", &self.environment)
            .try_send()
        {
            warn!(error = %e, "failed to emit aws.instances.health_updated counter");
        }
    }

    fn aws_instance_health_update_error(&self) {
        if let Err(e) = self
            .client
            .count_with_tags("aws.instances.health_update_error", 1)
            .with_tag("environment", &self.environment)
            .try_send()
        {
            warn!(error = %e, "failed to emit aws.instances.health_update_error counter");
        }
    }
}

/// No-op sink used in tests and anywhere metrics are not wired up.
#[derive(Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn aws_services_count(&self, _count: i64) {}
    fn aws_services_updated(&self, _count: i64) {}
    fn aws_instance_update_error(&self) {}
    fn aws_instance_health_updated(&self) {}
    fn aws_instance_health_update_error(&self) {}
}
