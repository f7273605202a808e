//! Resource ID Registry
//!
//! Lookup table from resource type (`Microsoft.Network/virtualNetworks`) to
//! its ID pattern and default API version. Built once at startup with
//! [`ResourceIdRegistry::builtin`] and passed by reference; callers can layer
//! their own definitions on top with [`ResourceIdRegistry::load_json`].

use std::collections::HashMap;

use serde::Deserialize;

use super::ids::{
    ResourceGroupId, ScopedRoleAssignmentId, StorageAccountId, SubscriptionId, VirtualNetworkId,
};
use super::parser::{ParseError, ParseResult, Parser};
use super::segment::{pattern, segments_from_pattern, Segment};
use super::ResourceId;
use crate::error::{Error, Result};

/// Embedded resource type files (compiled into the binary)
const RESOURCE_TYPE_FILES: &[&str] = &[
    include_str!("types/resources.json"),
    include_str!("types/network.json"),
    include_str!("types/compute.json"),
    include_str!("types/storage.json"),
];

/// Resource type definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceTypeDef {
    pub display_name: String,
    pub pattern: String,
    #[serde(default)]
    pub api_version: Option<String>,
}

/// Root structure of the resource type files
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceTypeConfig {
    #[serde(default)]
    pub resource_types: HashMap<String, ResourceTypeDef>,
}

/// A registered resource ID type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdType {
    pub resource_type: String,
    pub display_name: String,
    pub segments: Vec<Segment>,
    /// API version used when the caller does not name one
    pub api_version: Option<String>,
}

impl ResourceIdType {
    pub fn pattern(&self) -> String {
        pattern(&self.segments)
    }

    pub fn parse(&self, input: &str, insensitively: bool) -> std::result::Result<ParseResult, ParseError> {
        Parser::new(&self.segments).parse(input, insensitively)
    }
}

/// Lookup table of known resource ID types
#[derive(Debug, Clone, Default)]
pub struct ResourceIdRegistry {
    /// Keyed by lower-cased resource type
    types: HashMap<String, ResourceIdType>,
}

impl ResourceIdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the typed IDs plus the embedded resource type files
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();

        registry.register_id::<SubscriptionId>(
            "Microsoft.Resources/subscriptions",
            "Subscription",
            Some("2022-12-01"),
        );
        registry.register_id::<ResourceGroupId>(
            "Microsoft.Resources/resourceGroups",
            "Resource Group",
            Some(crate::services::resource_groups::API_VERSION),
        );
        registry.register_id::<VirtualNetworkId>(
            "Microsoft.Network/virtualNetworks",
            "Virtual Network",
            Some("2023-11-01"),
        );
        registry.register_id::<StorageAccountId>(
            "Microsoft.Storage/storageAccounts",
            "Storage Account",
            Some("2023-01-01"),
        );
        registry.register_id::<ScopedRoleAssignmentId>(
            "Microsoft.Authorization/roleAssignments",
            "Role Assignment",
            Some("2022-04-01"),
        );

        for content in RESOURCE_TYPE_FILES {
            registry.load_json(content)?;
        }

        Ok(registry)
    }

    /// Add or replace a resource type
    pub fn register(&mut self, id_type: ResourceIdType) {
        self.types
            .insert(id_type.resource_type.to_lowercase(), id_type);
    }

    /// Register a typed ID under a resource type name
    pub fn register_id<T: ResourceId>(
        &mut self,
        resource_type: &str,
        display_name: &str,
        api_version: Option<&str>,
    ) {
        self.register(ResourceIdType {
            resource_type: resource_type.to_string(),
            display_name: display_name.to_string(),
            segments: T::segments(),
            api_version: api_version.map(str::to_string),
        });
    }

    /// Load resource type definitions from a JSON document, returning how many
    /// were added
    pub fn load_json(&mut self, content: &str) -> Result<usize> {
        let config: ResourceTypeConfig = serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse resource type definitions: {}", e)))?;

        let count = config.resource_types.len();
        for (resource_type, def) in config.resource_types {
            let segments = segments_from_pattern(&def.pattern)?;
            self.register(ResourceIdType {
                resource_type,
                display_name: def.display_name,
                segments,
                api_version: def.api_version,
            });
        }

        Ok(count)
    }

    /// Look up a resource type (case-insensitive)
    pub fn get(&self, resource_type: &str) -> Option<&ResourceIdType> {
        self.types.get(&resource_type.to_lowercase())
    }

    /// All registered resource type names, sorted
    pub fn resource_types(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .types
            .values()
            .map(|t| t.resource_type.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Find the registered type whose pattern matches `input`
    ///
    /// Matching is case-insensitive. Longer patterns are tried first so the
    /// most specific type wins.
    pub fn identify(&self, input: &str) -> Option<(&ResourceIdType, ParseResult)> {
        let mut candidates: Vec<&ResourceIdType> = self.types.values().collect();
        candidates.sort_by(|a, b| {
            b.segments
                .len()
                .cmp(&a.segments.len())
                .then_with(|| a.resource_type.cmp(&b.resource_type))
        });

        candidates
            .into_iter()
            .find_map(|t| t.parse(input, true).ok().map(|parsed| (t, parsed)))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
