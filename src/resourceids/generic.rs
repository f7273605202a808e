//! Structural parsing of provider resource IDs
//!
//! Unlike the typed IDs, [`GenericResourceId`] accepts any provider namespace
//! and any depth of child resources:
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{ns}/{type}/{name}[/{childType}/{childName}...]`

use std::fmt;
use std::str::FromStr;

use super::ids::ResourceGroupId;
use super::parser::ParseError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericResourceId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub provider_namespace: String,
    /// `(type, name)` pairs from the outermost resource inwards
    pub resources: Vec<(String, String)>,
}

impl GenericResourceId {
    /// Parse any provider resource ID; the `subscriptions`, `resourceGroups`
    /// and `providers` keywords are matched case-insensitively.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let malformed = |reason: &str| ParseError::Malformed {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim_end_matches('/');
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Err(malformed("resource IDs must start with '/'"));
        };

        let parts: Vec<&str> = rest.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(malformed("resource IDs may not contain empty segments"));
        }
        if parts.len() < 8 {
            return Err(malformed(
                "expected /subscriptions/{id}/resourceGroups/{name}/providers/{namespace}/{type}/{name}",
            ));
        }

        let keyword = |index: usize, expected: &str| -> Result<(), ParseError> {
            if parts[index].eq_ignore_ascii_case(expected) {
                Ok(())
            } else {
                Err(ParseError::SegmentMismatch {
                    input: input.to_string(),
                    position: index,
                    expected: expected.to_string(),
                    actual: parts[index].to_string(),
                    pattern: "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/{namespace}/{type}/{name}".to_string(),
                    example: "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/example-resource-group/providers/Microsoft.Network/virtualNetworks/vnet1".to_string(),
                })
            }
        };

        keyword(0, "subscriptions")?;
        keyword(2, "resourceGroups")?;
        keyword(4, "providers")?;

        if uuid::Uuid::parse_str(parts[1]).is_err() {
            return Err(ParseError::InvalidSubscriptionId {
                input: input.to_string(),
                value: parts[1].to_string(),
            });
        }

        let type_name_pairs = &parts[6..];
        if type_name_pairs.len() % 2 != 0 {
            return Err(malformed("every resource type must be followed by a name"));
        }

        Ok(Self {
            subscription_id: parts[1].to_string(),
            resource_group_name: parts[3].to_string(),
            provider_namespace: parts[5].to_string(),
            resources: type_name_pairs
                .chunks(2)
                .map(|pair| (pair[0].to_string(), pair[1].to_string()))
                .collect(),
        })
    }

    /// Full resource type, e.g. `Microsoft.Network/virtualNetworks/subnets`
    pub fn resource_type(&self) -> String {
        let mut full = self.provider_namespace.clone();
        for (ty, _) in &self.resources {
            full.push('/');
            full.push_str(ty);
        }
        full
    }

    /// Name of the innermost resource
    pub fn name(&self) -> &str {
        self.resources
            .last()
            .map(|(_, name)| name.as_str())
            .unwrap_or_default()
    }

    /// The parent resource, or `None` for a top-level resource
    pub fn parent(&self) -> Option<Self> {
        if self.resources.len() < 2 {
            return None;
        }
        let mut parent = self.clone();
        parent.resources.pop();
        Some(parent)
    }

    pub fn resource_group(&self) -> ResourceGroupId {
        ResourceGroupId::new(&self.subscription_id, &self.resource_group_name)
    }

    pub fn id(&self) -> String {
        let mut id = format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}",
            self.subscription_id, self.resource_group_name, self.provider_namespace
        );
        for (ty, name) in &self.resources {
            id.push('/');
            id.push_str(ty);
            id.push('/');
            id.push_str(name);
        }
        id
    }
}

impl FromStr for GenericResourceId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for GenericResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}
