//! Typed resource IDs

use std::fmt;

use super::parser::{ParseError, ParseResult};
use super::segment::Segment;
use super::ResourceId;

/// `/subscriptions/{subscriptionId}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    pub subscription_id: String,
}

impl SubscriptionId {
    pub fn new(subscription_id: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
        }
    }
}

impl ResourceId for SubscriptionId {
    fn segments() -> Vec<Segment> {
        vec![
            Segment::static_segment("staticSubscriptions", "subscriptions"),
            Segment::subscription_id("subscriptionId"),
        ]
    }

    fn from_parse_result(result: &ParseResult) -> Result<Self, ParseError> {
        Ok(Self::new(result.get("subscriptionId")?))
    }

    fn id(&self) -> String {
        format!("/subscriptions/{}", self.subscription_id)
    }
}

/// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceGroupId {
    pub subscription_id: String,
    pub resource_group_name: String,
}

impl ResourceGroupId {
    pub fn new(subscription_id: &str, resource_group_name: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            resource_group_name: resource_group_name.to_string(),
        }
    }

    pub fn subscription(&self) -> SubscriptionId {
        SubscriptionId::new(&self.subscription_id)
    }
}

impl ResourceId for ResourceGroupId {
    fn segments() -> Vec<Segment> {
        vec![
            Segment::static_segment("staticSubscriptions", "subscriptions"),
            Segment::subscription_id("subscriptionId"),
            Segment::static_segment("staticResourceGroups", "resourceGroups"),
            Segment::resource_group("resourceGroupName"),
        ]
    }

    fn from_parse_result(result: &ParseResult) -> Result<Self, ParseError> {
        Ok(Self::new(
            result.get("subscriptionId")?,
            result.get("resourceGroupName")?,
        ))
    }

    fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group_name
        )
    }
}

/// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Network/virtualNetworks/{virtualNetworkName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualNetworkId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub virtual_network_name: String,
}

impl VirtualNetworkId {
    pub fn new(subscription_id: &str, resource_group_name: &str, virtual_network_name: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            resource_group_name: resource_group_name.to_string(),
            virtual_network_name: virtual_network_name.to_string(),
        }
    }

    pub fn resource_group(&self) -> ResourceGroupId {
        ResourceGroupId::new(&self.subscription_id, &self.resource_group_name)
    }
}

impl ResourceId for VirtualNetworkId {
    fn segments() -> Vec<Segment> {
        let mut segments = ResourceGroupId::segments();
        segments.extend([
            Segment::static_segment("staticProviders", "providers"),
            Segment::resource_provider("staticMicrosoftNetwork", "Microsoft.Network"),
            Segment::static_segment("staticVirtualNetworks", "virtualNetworks"),
            Segment::user_specified("virtualNetworkName"),
        ]);
        segments
    }

    fn from_parse_result(result: &ParseResult) -> Result<Self, ParseError> {
        Ok(Self::new(
            result.get("subscriptionId")?,
            result.get("resourceGroupName")?,
            result.get("virtualNetworkName")?,
        ))
    }

    fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/virtualNetworks/{}",
            self.subscription_id, self.resource_group_name, self.virtual_network_name
        )
    }
}

/// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Storage/storageAccounts/{storageAccountName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageAccountId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub storage_account_name: String,
}

impl StorageAccountId {
    pub fn new(subscription_id: &str, resource_group_name: &str, storage_account_name: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            resource_group_name: resource_group_name.to_string(),
            storage_account_name: storage_account_name.to_string(),
        }
    }

    pub fn resource_group(&self) -> ResourceGroupId {
        ResourceGroupId::new(&self.subscription_id, &self.resource_group_name)
    }
}

impl ResourceId for StorageAccountId {
    fn segments() -> Vec<Segment> {
        let mut segments = ResourceGroupId::segments();
        segments.extend([
            Segment::static_segment("staticProviders", "providers"),
            Segment::resource_provider("staticMicrosoftStorage", "Microsoft.Storage"),
            Segment::static_segment("staticStorageAccounts", "storageAccounts"),
            Segment::user_specified("storageAccountName"),
        ]);
        segments
    }

    fn from_parse_result(result: &ParseResult) -> Result<Self, ParseError> {
        Ok(Self::new(
            result.get("subscriptionId")?,
            result.get("resourceGroupName")?,
            result.get("storageAccountName")?,
        ))
    }

    fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts/{}",
            self.subscription_id, self.resource_group_name, self.storage_account_name
        )
    }
}

/// `{scope}/providers/Microsoft.Authorization/roleAssignments/{roleAssignmentName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopedRoleAssignmentId {
    /// Any resource ID, starting with `/`
    pub scope: String,
    pub role_assignment_name: String,
}

impl ScopedRoleAssignmentId {
    pub fn new(scope: &str, role_assignment_name: &str) -> Self {
        Self {
            scope: scope.to_string(),
            role_assignment_name: role_assignment_name.to_string(),
        }
    }
}

impl ResourceId for ScopedRoleAssignmentId {
    fn segments() -> Vec<Segment> {
        vec![
            Segment::scope("scope"),
            Segment::static_segment("staticProviders", "providers"),
            Segment::resource_provider("staticMicrosoftAuthorization", "Microsoft.Authorization"),
            Segment::static_segment("staticRoleAssignments", "roleAssignments"),
            Segment::user_specified("roleAssignmentName"),
        ]
    }

    fn from_parse_result(result: &ParseResult) -> Result<Self, ParseError> {
        Ok(Self::new(result.get("scope")?, result.get("roleAssignmentName")?))
    }

    fn id(&self) -> String {
        format!(
            "{}/providers/Microsoft.Authorization/roleAssignments/{}",
            self.scope.trim_end_matches('/'),
            self.role_assignment_name
        )
    }
}

macro_rules! display_as_id {
    ($($ty:ty),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.id())
                }
            }
        )*
    };
}

display_as_id!(
    SubscriptionId,
    ResourceGroupId,
    VirtualNetworkId,
    StorageAccountId,
    ScopedRoleAssignmentId,
);
