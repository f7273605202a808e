//! Generic resources
//!
//! Operations on any resource addressed by its full ID. The api-version is
//! the caller's, since it differs per resource provider.

use reqwest::Method;

use crate::arm::client::ArmClient;
use crate::error::{Error, Result};
use crate::lro::LongRunningOperation;
use crate::models::GenericResource;
use crate::paging::{Page, Pager};
use crate::resourceids::{GenericResourceId, ResourceGroupId, ResourceId};

/// api-version for listing resources in a resource group
pub const LIST_API_VERSION: &str = "2021-04-01";

/// Client for resource-ID-addressed operations
#[derive(Clone)]
pub struct GenericResourcesClient {
    client: ArmClient,
}

impl GenericResourcesClient {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    /// Resource URL for a validated ID
    fn id_url(&self, resource_id: &str, api_version: &str) -> Result<String> {
        let id = GenericResourceId::parse(resource_id)?;
        Ok(self.client.resource_url(&id.id(), api_version))
    }

    /// Get a resource by ID
    pub async fn get_by_id(&self, resource_id: &str, api_version: &str) -> Result<GenericResource> {
        let url = self.id_url(resource_id, api_version)?;
        self.client.get("ResourcesClient.GetByID", &url).await
    }

    /// Start creating or replacing a resource by ID
    pub async fn begin_create_or_update_by_id(
        &self,
        resource_id: &str,
        api_version: &str,
        resource: &GenericResource,
    ) -> Result<LongRunningOperation> {
        let url = self.id_url(resource_id, api_version)?;
        let body = serde_json::to_value(resource).map_err(|source| Error::Decode {
            operation: "ResourcesClient.CreateOrUpdateByID".to_string(),
            url: url.clone(),
            source,
        })?;

        self.client
            .begin("ResourcesClient.CreateOrUpdateByID", Method::PUT, &url, Some(body))
            .await
    }

    /// Start deleting a resource by ID
    pub async fn begin_delete_by_id(
        &self,
        resource_id: &str,
        api_version: &str,
    ) -> Result<LongRunningOperation> {
        let url = self.id_url(resource_id, api_version)?;
        self.client
            .begin("ResourcesClient.DeleteByID", Method::DELETE, &url, None)
            .await
    }

    pub fn pager(&self) -> Pager<GenericResource> {
        self.client.pager("ResourcesClient.ListByResourceGroup")
    }

    /// URL of the first page of resources in a group
    pub fn list_by_resource_group_url(&self, group: &ResourceGroupId) -> String {
        self.client
            .resource_url(&format!("{}/resources", group.id()), LIST_API_VERSION)
    }

    /// First page of resources in a group
    pub async fn list_by_resource_group(&self, group: &ResourceGroupId) -> Result<Page<GenericResource>> {
        self.pager()
            .fetch(&self.list_by_resource_group_url(group))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::auth::StaticTokenCredential;
    use crate::arm::environment::Environment;
    use std::sync::Arc;

    const SUB: &str = "00000000-0000-0000-0000-000000000001";

    fn resources() -> GenericResourcesClient {
        let client = ArmClient::new(Arc::new(StaticTokenCredential::new("t")), SUB, Environment::China).unwrap();
        GenericResourcesClient::new(client)
    }

    #[test]
    fn test_id_url_rejects_non_resource_ids() {
        let err = resources().id_url("/not/a/resource", "2023-01-01").unwrap_err();
        assert!(matches!(err, Error::InvalidResourceId(_)));
    }

    #[test]
    fn test_id_url_uses_environment_endpoint() {
        let id = format!("/subscriptions/{}/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acct", SUB);
        assert_eq!(
            resources().id_url(&id, "2023-01-01").unwrap(),
            format!("https://management.chinacloudapi.cn{}?api-version=2023-01-01", id)
        );
    }

    #[test]
    fn test_list_by_resource_group_url() {
        let group = ResourceGroupId::new(SUB, "rg");
        assert_eq!(
            resources().list_by_resource_group_url(&group),
            format!(
                "https://management.chinacloudapi.cn/subscriptions/{}/resourceGroups/rg/resources?api-version=2021-04-01",
                SUB
            )
        );
    }
}
