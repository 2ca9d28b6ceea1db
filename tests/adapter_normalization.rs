//! Exercises the Eureka and AWS adapters' fetch/normalize step end to end
//! against in-memory fakes of each wire trait, rather than live registries.

use async_trait::async_trait;
use eureka_aws_sync::adapter::{AwsAdapter, EurekaAdapter, SideAdapter};
use eureka_aws_sync::error::RegistryError;
use eureka_aws_sync::metrics::NoopMetricsSink;
use eureka_aws_sync::registry::aws::{
    AwsInstanceSummary, AwsNamespaceInfo, AwsServiceSummary, AwsWireClient, CreateServiceInput,
    CreateServiceOutcome, IMPORTED_FROM_EUREKA_DESCRIPTION,
};
use eureka_aws_sync::registry::eureka::{
    EurekaApplication, EurekaDataCenterMetadata, EurekaInstance, EurekaInstanceRegistration,
    EurekaWireClient,
};
use eureka_aws_sync::Health;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

struct FakeEureka {
    applications: Vec<EurekaApplication>,
}

#[async_trait]
impl EurekaWireClient for FakeEureka {
    async fn get_applications(&self) -> Result<Vec<EurekaApplication>, RegistryError> {
        Ok(self.applications.clone())
    }

    async fn register_instance(
        &self,
        _app: &str,
        _instance: EurekaInstanceRegistration,
    ) -> Result<(), RegistryError> {
        Ok(())
    }

    async fn deregister_instance(&self, _app: &str, _instance_id: &str) -> Result<(), RegistryError> {
        Ok(())
    }
}

struct FakeAws {
    namespace: AwsNamespaceInfo,
    services: Vec<AwsServiceSummary>,
    instances: HashMap<String, Vec<AwsInstanceSummary>>,
}

#[async_trait]
impl AwsWireClient for FakeAws {
    async fn get_namespace(&self, _namespace_id: &str) -> Result<AwsNamespaceInfo, RegistryError> {
        Ok(self.namespace.clone())
    }

    async fn list_services(&self, _namespace_id: &str) -> Result<Vec<AwsServiceSummary>, RegistryError> {
        Ok(self.services.clone())
    }

    async fn discover_instances(
        &self,
        _namespace_name: &str,
        service_name: &str,
    ) -> Result<Vec<AwsInstanceSummary>, RegistryError> {
        Ok(self.instances.get(service_name).cloned().unwrap_or_default())
    }

    async fn get_instances_health(
        &self,
        _service_id: &str,
        instance_ids: &[String],
    ) -> Result<HashMap<String, String>, RegistryError> {
        Ok(instance_ids.iter().map(|id| (id.clone(), "HEALTHY".to_string())).collect())
    }

    async fn create_service(&self, _input: CreateServiceInput) -> Result<CreateServiceOutcome, RegistryError> {
        Ok(CreateServiceOutcome { service_id: "svc-created".to_string() })
    }

    async fn register_instance(
        &self,
        _service_id: &str,
        _instance_id: &str,
        _attributes: HashMap<String, String>,
    ) -> Result<(), RegistryError> {
        Ok(())
    }

    async fn update_instance_health(
        &self,
        _service_id: &str,
        _instance_id: &str,
        _healthy: bool,
    ) -> Result<(), RegistryError> {
        Ok(())
    }

    async fn deregister_instance(&self, _service_id: &str, _instance_id: &str) -> Result<(), RegistryError> {
        Ok(())
    }

    async fn delete_service(&self, _service_id: &str) -> Result<(), RegistryError> {
        Ok(())
    }
}

#[tokio::test]
async fn eureka_transform_matches_seeded_fixture_from_the_spec() {
    let applications = vec![EurekaApplication {
        name: "s1".to_string(),
        instance: vec![EurekaInstance {
            app: "s1".to_string(),
            host_name: "ignored".to_string(),
            ip_addr: "ignored".to_string(),
            instance_id: "ignored".to_string(),
            status: "UP".to_string(),
            port: Some(1),
            data_center_metadata: EurekaDataCenterMetadata {
                instance_id: "i-nstanceIDs1".to_string(),
                local_ipv4: "1.1.1.1".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }],
    }];

    let client = Arc::new(FakeEureka { applications });
    let allow_list: HashSet<String> = ["s1".to_string()].into_iter().collect();
    let adapter = EurekaAdapter::new(client, allow_list, String::new(), Arc::new(NoopMetricsSink));

    adapter.fetch().await.unwrap();
    let service = adapter.snapshot_service("s1").await.unwrap();

    assert!(!service.from_aws);
    assert_eq!(service.nodes["1.1.1.1"][&1].instance_id, "i-nstanceIDs1");
    assert_eq!(service.healths["i-nstanceIDs1"], Health::Healthy);
}

#[tokio::test]
async fn eureka_down_and_starting_map_to_unhealthy_not_absent() {
    let make_app = |status: &str| EurekaApplication {
        name: "s1".to_string(),
        instance: vec![EurekaInstance {
            app: "s1".to_string(),
            status: status.to_string(),
            port: Some(1),
            data_center_metadata: EurekaDataCenterMetadata {
                instance_id: "i1".to_string(),
                local_ipv4: "1.1.1.1".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }],
    };

    for status in ["DOWN", "STARTING"] {
        let client = Arc::new(FakeEureka { applications: vec![make_app(status)] });
        let allow_list: HashSet<String> = ["s1".to_string()].into_iter().collect();
        let adapter = EurekaAdapter::new(client, allow_list, String::new(), Arc::new(NoopMetricsSink));
        adapter.fetch().await.unwrap();
        let service = adapter.snapshot_service("s1").await.unwrap();
        assert_eq!(service.healths.get("i1"), Some(&Health::Unhealthy), "status {status} must map to Unhealthy");
    }
}

#[tokio::test]
async fn aws_adapter_strips_prefix_and_tags_origin_only_for_sentinel_description() {
    let mut instances = HashMap::new();
    instances.insert(
        "eureka-checkout".to_string(),
        vec![AwsInstanceSummary {
            instance_id: "i1_1.1.1.1_80".to_string(),
            ipv4: "1.1.1.1".to_string(),
            port: 80,
            attributes: HashMap::new(),
            healthy: Some(true),
        }],
    );

    let client = Arc::new(FakeAws {
        namespace: AwsNamespaceInfo { id: "ns-1".to_string(), name: "vela.local".to_string() },
        services: vec![
            AwsServiceSummary {
                id: "svc-1".to_string(),
                name: "eureka-checkout".to_string(),
                description: IMPORTED_FROM_EUREKA_DESCRIPTION.to_string(),
            },
            AwsServiceSummary {
                id: "svc-2".to_string(),
                name: "native".to_string(),
                description: String::new(),
            },
        ],
        instances,
    });

    let adapter = AwsAdapter::new(client, "ns-1".to_string(), "eureka-".to_string(), 60, Arc::new(NoopMetricsSink));
    adapter.fetch().await.unwrap();

    let imported = adapter.snapshot_service("checkout").await.unwrap();
    assert!(imported.from_eureka);
    assert_eq!(imported.nodes["1.1.1.1"][&80].instance_id, "i1_1.1.1.1_80");

    let native = adapter.snapshot_service("native").await.unwrap();
    assert!(!native.from_eureka);
    assert!(!native.from_aws);
}
