//! AWS Cloud Map wire client.
//!
//! Grounded in the original source's `aws` package (service discovery calls
//! against `servicediscovery.ServiceDiscovery`), carried into the teacher's
//! async-trait client shape used by `EurekaRegistry`.

use crate::error::RegistryError;
use async_trait::async_trait;
use aws_sdk_servicediscovery::Client;
use std::collections::HashMap;

/// Sentinel AWS writes (and this daemon reads back) on the description of any
/// service it created on Eureka's behalf.
pub const IMPORTED_FROM_EUREKA_DESCRIPTION: &str = "Imported from Eureka";

/// The namespace this daemon reconciles against, resolved once at startup.
#[derive(Debug, Clone, Default)]
pub struct AwsNamespaceInfo {
    pub id: String,
    pub name: String,
}

/// One Cloud Map service under the daemon's namespace.
#[derive(Debug, Clone, Default)]
pub struct AwsServiceSummary {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl AwsServiceSummary {
    /// Whether this service carries the marker this daemon writes when it
    /// imports a service from Eureka.
    pub fn imported_from_eureka(&self) -> bool {
        self.description == IMPORTED_FROM_EUREKA_DESCRIPTION
    }
}

/// One Cloud Map instance, as returned by `DiscoverInstances`.
#[derive(Debug, Clone, Default)]
pub struct AwsInstanceSummary {
    pub instance_id: String,
    pub ipv4: String,
    pub port: u16,
    pub attributes: HashMap<String, String>,
    pub healthy: Option<bool>,
}

/// Input to create a Cloud Map service for one Eureka-origin application.
#[derive(Debug, Clone)]
pub struct CreateServiceInput {
    pub name: String,
    pub namespace_id: String,
    pub description: String,
    /// SRV record TTL, set only for non-HTTP namespaces.
    pub dns_ttl: Option<i64>,
}

/// Result of a `create_service` call.
#[derive(Debug, Clone)]
pub struct CreateServiceOutcome {
    pub service_id: String,
}

/// Abstract operations this daemon needs against AWS Cloud Map.
#[async_trait]
pub trait AwsWireClient: Send + Sync {
    async fn get_namespace(&self, namespace_id: &str) -> Result<AwsNamespaceInfo, RegistryError>;

    async fn list_services(&self, namespace_id: &str) -> Result<Vec<AwsServiceSummary>, RegistryError>;

    async fn discover_instances(
        &self,
        namespace_name: &str,
        service_name: &str,
    ) -> Result<Vec<AwsInstanceSummary>, RegistryError>;

    async fn get_instances_health(
        &self,
        service_id: &str,
        instance_ids: &[String],
    ) -> Result<HashMap<String, String>, RegistryError>;

    async fn create_service(
        &self,
        input: CreateServiceInput,
    ) -> Result<CreateServiceOutcome, RegistryError>;

    async fn register_instance(
        &self,
        service_id: &str,
        instance_id: &str,
        attributes: HashMap<String, String>,
    ) -> Result<(), RegistryError>;

    async fn update_instance_health(
        &self,
        service_id: &str,
        instance_id: &str,
        healthy: bool,
    ) -> Result<(), RegistryError>;

    async fn deregister_instance(&self, service_id: &str, instance_id: &str) -> Result<(), RegistryError>;

    async fn delete_service(&self, service_id: &str) -> Result<(), RegistryError>;
}

/// Production Cloud Map client wrapping the AWS SDK.
pub struct CloudMapClient {
    client: Client,
}

impl CloudMapClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AwsWireClient for CloudMapClient {
    async fn get_namespace(&self, namespace_id: &str) -> Result<AwsNamespaceInfo, RegistryError> {
        let output = self
            .client
            .get_namespace()
            .id(namespace_id)
            .send()
            .await
            .map_err(|e| RegistryError::backend("aws", format!("GetNamespace: {e}")))?;

        let namespace = output
            .namespace()
            .ok_or_else(|| RegistryError::backend("aws", "GetNamespace returned no namespace"))?;

        Ok(AwsNamespaceInfo {
            id: namespace.id().unwrap_or_default().to_string(),
            name: namespace.name().unwrap_or_default().to_string(),
        })
    }

    async fn list_services(&self, namespace_id: &str) -> Result<Vec<AwsServiceSummary>, RegistryError> {
        let mut summaries = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.client.list_services();
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }
            let output = request
                .send()
                .await
                .map_err(|e| RegistryError::backend("aws", format!("ListServices: {e}")))?;

            for service in output.services() {
                summaries.push(AwsServiceSummary {
                    id: service.id().unwrap_or_default().to_string(),
                    name: service.name().unwrap_or_default().to_string(),
                    description: service.description().unwrap_or_default().to_string(),
                });
            }

            next_token = output.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        let _ = namespace_id;
        Ok(summaries)
    }

    async fn discover_instances(
        &self,
        namespace_name: &str,
        service_name: &str,
    ) -> Result<Vec<AwsInstanceSummary>, RegistryError> {
        let output = self
            .client
            .discover_instances()
            .namespace_name(namespace_name)
            .service_name(service_name)
            .health_status(aws_sdk_servicediscovery::types::HealthStatusFilter::All)
            .send()
            .await
            .map_err(|e| RegistryError::backend("aws", format!("DiscoverInstances: {e}")))?;

        let mut summaries = Vec::new();
        for instance in output.instances() {
            let attributes: HashMap<String, String> = instance
                .attributes()
                .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default();

            let port = attributes
                .get("AWS_INSTANCE_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or_default();
            let ipv4 = attributes.get("AWS_INSTANCE_IPV4").cloned().unwrap_or_default();

            summaries.push(AwsInstanceSummary {
                instance_id: instance.instance_id().unwrap_or_default().to_string(),
                ipv4,
                port,
                attributes,
                healthy: instance.health_status().map(|s| {
                    matches!(s, aws_sdk_servicediscovery::types::HealthStatus::Healthy)
                }),
            });
        }
        Ok(summaries)
    }

    async fn get_instances_health(
        &self,
        service_id: &str,
        instance_ids: &[String],
    ) -> Result<HashMap<String, String>, RegistryError> {
        let output = self
            .client
            .get_instances_health_status()
            .service_id(service_id)
            .set_instances(Some(instance_ids.to_vec()))
            .send()
            .await
            .map_err(|e| RegistryError::backend("aws", format!("GetInstancesHealthStatus: {e}")))?;

        let status = output
            .status()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.as_str().to_string())).collect())
            .unwrap_or_default();
        Ok(status)
    }

    async fn create_service(
        &self,
        input: CreateServiceInput,
    ) -> Result<CreateServiceOutcome, RegistryError> {
        let mut request = self
            .client
            .create_service()
            .name(&input.name)
            .namespace_id(&input.namespace_id)
            .description(&input.description);

        if let Some(ttl) = input.dns_ttl {
            let record = aws_sdk_servicediscovery::types::DnsRecord::builder()
                .r#type(aws_sdk_servicediscovery::types::RecordType::Srv)
                .ttl(ttl)
                .build()
                .map_err(|e| RegistryError::backend("aws", format!("building SRV record: {e}")))?;
            let dns_config = aws_sdk_servicediscovery::types::DnsConfig::builder()
                .dns_records(record)
                .build()
                .map_err(|e| RegistryError::backend("aws", format!("building dns config: {e}")))?;
            request = request.dns_config(dns_config);
        }

        let output = match request.send().await {
            Ok(output) => output,
            Err(sdk_error) => {
                // The original source special-cases this error code and logs it
                // at info rather than error level (see catalog/aws.go's create()
                // switch on ErrCodeServiceAlreadyExists); surface it as a typed
                // variant so the adapter can do the same instead of treating it
                // as a generic backend failure.
                use aws_sdk_servicediscovery::operation::create_service::CreateServiceError;
                if matches!(
                    sdk_error.as_service_error(),
                    Some(CreateServiceError::ServiceAlreadyExists(_))
                ) {
                    return Err(RegistryError::ServiceAlreadyExists { service: input.name });
                }
                return Err(RegistryError::backend("aws", format!("CreateService: {sdk_error}")));
            }
        };

        let service = output
            .service()
            .ok_or_else(|| RegistryError::backend("aws", "CreateService returned no service"))?;

        Ok(CreateServiceOutcome { service_id: service.id().unwrap_or_default().to_string() })
    }

    async fn register_instance(
        &self,
        service_id: &str,
        instance_id: &str,
        attributes: HashMap<String, String>,
    ) -> Result<(), RegistryError> {
        self.client
            .register_instance()
            .service_id(service_id)
            .instance_id(instance_id)
            .set_attributes(Some(attributes))
            .send()
            .await
            .map_err(|e| RegistryError::backend("aws", format!("RegisterInstance: {e}")))?;
        Ok(())
    }

    async fn update_instance_health(
        &self,
        service_id: &str,
        instance_id: &str,
        healthy: bool,
    ) -> Result<(), RegistryError> {
        let status = if healthy {
            aws_sdk_servicediscovery::types::CustomHealthStatus::Healthy
        } else {
            aws_sdk_servicediscovery::types::CustomHealthStatus::Unhealthy
        };

        self.client
            .update_instance_custom_health_status()
            .service_id(service_id)
            .instance_id(instance_id)
            .status(status)
            .send()
            .await
            .map_err(|e| RegistryError::backend("aws", format!("UpdateInstanceCustomHealthStatus: {e}")))?;
        Ok(())
    }

    async fn deregister_instance(&self, service_id: &str, instance_id: &str) -> Result<(), RegistryError> {
        self.client
            .deregister_instance()
            .service_id(service_id)
            .instance_id(instance_id)
            .send()
            .await
            .map_err(|e| RegistryError::backend("aws", format!("DeregisterInstance: {e}")))?;
        Ok(())
    }

    async fn delete_service(&self, service_id: &str) -> Result<(), RegistryError> {
        self.client
            .delete_service()
            .id(service_id)
            .send()
            .await
            .map_err(|e| RegistryError::backend("aws", format!("DeleteService: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imported_from_eureka_matches_exact_sentinel_only() {
        let imported = AwsServiceSummary {
            description: IMPORTED_FROM_EUREKA_DESCRIPTION.to_string(),
            ..Default::default()
        };
        assert!(imported.imported_from_eureka());

        let native = AwsServiceSummary { description: "hand-created".to_string(), ..Default::default() };
        assert!(!native.imported_from_eureka());
    }
}
