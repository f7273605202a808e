//! Resource groups
//!
//! `Microsoft.Resources/resourceGroups` operations for one subscription.

use futures::Stream;
use reqwest::Method;
use tokio_util::sync::CancellationToken;

use crate::arm::client::{add_query_params, ArmClient};
use crate::error::Result;
use crate::lro::{LongRunningOperation, PollOptions};
use crate::models::{ResourceGroup, ResourceGroupPatch};
use crate::paging::{Page, Pager};

pub const API_VERSION: &str = "2022-09-01";

/// Optional OData parameters for `list`
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// e.g. `tagName eq 'env' and tagValue eq 'prod'`
    pub filter: Option<String>,
    pub top: Option<u32>,
}

/// Client for resource group operations
#[derive(Clone)]
pub struct ResourceGroupsClient {
    client: ArmClient,
}

impl ResourceGroupsClient {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    fn group_url(&self, name: &str) -> String {
        self.client.subscription_url(
            &format!("resourcegroups/{}", urlencoding::encode(name)),
            API_VERSION,
        )
    }

    /// Get a resource group
    pub async fn get(&self, name: &str) -> Result<ResourceGroup> {
        self.client
            .get("ResourceGroupsClient.Get", &self.group_url(name))
            .await
    }

    /// Whether a resource group exists (HEAD: 204 or 404)
    pub async fn check_existence(&self, name: &str) -> Result<bool> {
        self.client
            .head("ResourceGroupsClient.CheckExistence", &self.group_url(name))
            .await
    }

    /// Create or replace a resource group
    pub async fn create_or_update(&self, name: &str, group: &ResourceGroup) -> Result<ResourceGroup> {
        tracing::info!("Creating or updating resource group {} in {}", name, group.location);
        self.client
            .put("ResourceGroupsClient.CreateOrUpdate", &self.group_url(name), group)
            .await
    }

    /// Update tags or `managedBy` of a resource group
    pub async fn update(&self, name: &str, patch: &ResourceGroupPatch) -> Result<ResourceGroup> {
        self.client
            .patch("ResourceGroupsClient.Update", &self.group_url(name), patch)
            .await
    }

    /// Start deleting a resource group and everything in it
    pub async fn begin_delete(&self, name: &str) -> Result<LongRunningOperation> {
        tracing::info!("Deleting resource group {}", name);
        self.client
            .begin(
                "ResourceGroupsClient.Delete",
                Method::DELETE,
                &self.group_url(name),
                None,
            )
            .await
    }

    /// Delete a resource group and wait for the deletion to finish
    pub async fn delete(&self, name: &str, options: PollOptions, cancel: &CancellationToken) -> Result<()> {
        let mut operation = self.begin_delete(name).await?.with_options(options);
        operation.poll_until_done(cancel).await?;
        Ok(())
    }

    /// URL of the first list page
    pub fn list_url(&self, options: &ListOptions) -> String {
        let url = self.client.subscription_url("resourcegroups", API_VERSION);
        let top = options.top.map(|t| t.to_string());

        let mut params = Vec::new();
        if let Some(filter) = options.filter.as_deref() {
            params.push(("$filter", filter));
        }
        if let Some(top) = top.as_deref() {
            params.push(("$top", top));
        }
        add_query_params(&url, &params)
    }

    pub fn pager(&self) -> Pager<ResourceGroup> {
        self.client.pager("ResourceGroupsClient.List")
    }

    /// First page of resource groups
    pub async fn list(&self, options: &ListOptions) -> Result<Page<ResourceGroup>> {
        self.pager().fetch(&self.list_url(options)).await
    }

    /// Page following `page`
    pub async fn list_next(&self, page: &Page<ResourceGroup>) -> Result<Page<ResourceGroup>> {
        self.pager().load_more(page).await
    }

    /// Every resource group, across all pages
    pub async fn list_all(&self, options: &ListOptions) -> Result<Vec<ResourceGroup>> {
        self.pager().complete(&self.list_url(options), |_| true).await
    }

    /// Lazily stream resource groups
    pub fn list_stream<'a>(
        &self,
        pager: &'a Pager<ResourceGroup>,
        options: &ListOptions,
    ) -> impl Stream<Item = Result<ResourceGroup>> + 'a {
        pager.stream(&self.list_url(options))
    }
}
