//! Eureka wire client.
//!
//! Grounded in the teacher's `EurekaRegistry` (packages/service-discovery/src/eureka.rs):
//! same `reqwest::Client` + `build_url` shape, generalized from registering one
//! instance of the daemon itself to fetching/writing the whole application list
//! this daemon reconciles.

use crate::error::RegistryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Datacenter metadata carried on a Eureka instance, as populated by the AWS
/// datacenter info block (or `MyOwn` for non-AWS instances).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EurekaDataCenterMetadata {
    #[serde(rename = "instanceId", default)]
    pub instance_id: String,
    #[serde(rename = "local-ipv4", default)]
    pub local_ipv4: String,
    #[serde(rename = "local-hostname", default)]
    pub local_hostname: String,
    #[serde(rename = "public-hostname", default)]
    pub public_hostname: String,
    #[serde(rename = "public-ipv4", default)]
    pub public_ipv4: String,
    #[serde(rename = "availability-zone", default)]
    pub availability_zone: String,
}

/// One Eureka instance as returned by `GET /apps`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EurekaInstance {
    pub app: String,
    #[serde(rename = "hostName", default)]
    pub host_name: String,
    #[serde(rename = "ipAddr", default)]
    pub ip_addr: String,
    #[serde(rename = "instanceId", default)]
    pub instance_id: String,
    #[serde(default)]
    pub status: String,
    pub port: Option<u16>,
    #[serde(rename = "homePageUrl", default)]
    pub home_page_url: String,
    #[serde(rename = "statusPageUrl", default)]
    pub status_page_url: String,
    #[serde(rename = "healthCheckUrl", default)]
    pub health_check_url: String,
    #[serde(rename = "dataCenterMetadata", default)]
    pub data_center_metadata: EurekaDataCenterMetadata,
}

/// One Eureka application (a named group of instances).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EurekaApplication {
    pub name: String,
    #[serde(default)]
    pub instance: Vec<EurekaInstance>,
}

#[derive(Debug, Clone, Deserialize)]
struct EurekaApplicationsResponse {
    applications: EurekaApplicationsBody,
}

#[derive(Debug, Clone, Deserialize)]
struct EurekaApplicationsBody {
    application: Vec<EurekaApplication>,
}

/// The instance payload written when registering a service with Eureka.
#[derive(Debug, Clone, Serialize)]
pub struct EurekaInstanceRegistration {
    pub instance_id: String,
    pub host_name: String,
    pub ip_addr: String,
    pub port: u16,
    pub status: String,
    pub home_page_url: Option<String>,
    pub status_page_url: Option<String>,
    pub health_check_url: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Abstract operations this daemon needs against a Eureka server.
///
/// Implementations carry no reconciliation logic; they only translate between
/// the wire shapes above and HTTP/whatever transport backs them.
#[async_trait]
pub trait EurekaWireClient: Send + Sync {
    async fn get_applications(&self) -> Result<Vec<EurekaApplication>, RegistryError>;

    async fn register_instance(
        &self,
        app: &str,
        instance: EurekaInstanceRegistration,
    ) -> Result<(), RegistryError>;

    async fn deregister_instance(&self, app: &str, instance_id: &str) -> Result<(), RegistryError>;
}

/// Production Eureka client, talking the REST/JSON dialect of the Eureka v2 API.
pub struct EurekaHttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl EurekaHttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build eureka http client");
        Self { client, base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl EurekaWireClient for EurekaHttpClient {
    async fn get_applications(&self) -> Result<Vec<EurekaApplication>, RegistryError> {
        let url = self.build_url("/apps");
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| RegistryError::network(format!("fetching eureka apps: {e}")))?;

        if !response.status().is_success() {
            return Err(RegistryError::backend(
                "eureka",
                format!("GET {url} returned {}", response.status()),
            ));
        }

        let parsed: EurekaApplicationsResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::serialization(format!("parsing eureka apps: {e}")))?;
        Ok(parsed.applications.application)
    }

    async fn register_instance(
        &self,
        app: &str,
        instance: EurekaInstanceRegistration,
    ) -> Result<(), RegistryError> {
        let url = self.build_url(&format!("/apps/{app}"));
        let response = self
            .client
            .post(&url)
            .json(&instance)
            .send()
            .await
            .map_err(|e| RegistryError::network(format!("registering eureka instance: {e}")))?;

        if !response.status().is_success() {
            return Err(RegistryError::backend(
                "eureka",
                format!("POST {url} returned {}", response.status()),
            ));
        }
        Ok(())
    }

    async fn deregister_instance(&self, app: &str, instance_id: &str) -> Result<(), RegistryError> {
        let url = self.build_url(&format!("/apps/{app}/{instance_id}"));
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| RegistryError::network(format!("deregistering eureka instance: {e}")))?;

        if !response.status().is_success() {
            return Err(RegistryError::backend(
                "eureka",
                format!("DELETE {url} returned {}", response.status()),
            ));
        }
        Ok(())
    }
}
