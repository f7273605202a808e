//! Property-based tests using proptest
//!
//! These tests verify resource ID parsing and formatting, casing
//! normalisation and registry identification using randomized inputs.

use azrm::resourceids::{
    GenericResourceId, ResourceGroupId, ResourceId, ResourceIdRegistry, ScopedRoleAssignmentId,
    StorageAccountId, VirtualNetworkId,
};
use proptest::prelude::*;
use uuid::Uuid;

/// Generate a subscription ID
fn arb_subscription() -> impl Strategy<Value = String> {
    any::<u128>().prop_map(|n| Uuid::from_u128(n).to_string())
}

/// Generate a resource name (no slashes)
fn arb_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9._-]{0,30}"
}

/// Randomly flip the casing of ASCII letters
fn scramble_case(input: &str, flips: &[bool]) -> String {
    input
        .chars()
        .zip(flips.iter().cycle())
        .map(|(c, flip)| {
            if *flip {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

proptest! {
    /// Formatting then parsing a resource group ID gives back the same ID
    #[test]
    fn resource_group_id_round_trips(sub in arb_subscription(), name in arb_name()) {
        let id = ResourceGroupId::new(&sub, &name);
        let parsed = ResourceGroupId::parse(&id.id()).unwrap();
        prop_assert_eq!(parsed, id);
    }

    /// Same for a provider resource
    #[test]
    fn virtual_network_id_round_trips(
        sub in arb_subscription(),
        group in arb_name(),
        name in arb_name(),
    ) {
        let id = VirtualNetworkId::new(&sub, &group, &name);
        let formatted = id.id();
        prop_assert_eq!(VirtualNetworkId::parse(&formatted).unwrap(), id);
        prop_assert!(VirtualNetworkId::validate(&formatted).is_empty());
    }

    /// A trailing slash is tolerated
    #[test]
    fn trailing_slash_is_ignored(sub in arb_subscription(), group in arb_name(), name in arb_name()) {
        let id = StorageAccountId::new(&sub, &group, &name);
        prop_assert_eq!(StorageAccountId::parse(&format!("{}/", id.id())).unwrap(), id);
    }

    /// Insensitive parsing accepts any casing of fixed segments and
    /// normalises them, leaving user values untouched
    #[test]
    fn insensitive_parse_normalises_fixed_segments(
        sub in arb_subscription(),
        group in arb_name(),
        name in arb_name(),
        flips in prop::collection::vec(any::<bool>(), 1..16),
    ) {
        let input = format!(
            "/{}/{}/{}/{}/{}/{}/{}/{}",
            scramble_case("subscriptions", &flips),
            sub,
            scramble_case("resourceGroups", &flips),
            group,
            scramble_case("providers", &flips),
            scramble_case("Microsoft.Network", &flips),
            scramble_case("virtualNetworks", &flips),
            name,
        );

        let parsed = VirtualNetworkId::parse_insensitively(&input).unwrap();
        prop_assert_eq!(&parsed, &VirtualNetworkId::new(&sub, &group, &name));
        prop_assert_eq!(parsed.id(), VirtualNetworkId::new(&sub, &group, &name).id());
    }

    /// Strict parsing rejects any casing change in a fixed segment
    #[test]
    fn strict_parse_rejects_wrong_casing(sub in arb_subscription(), group in arb_name()) {
        let input = format!("/SUBSCRIPTIONS/{}/resourceGroups/{}", sub, group);
        prop_assert!(ResourceGroupId::parse(&input).is_err());
        prop_assert!(!ResourceGroupId::validate(&input).is_empty());
        prop_assert!(ResourceGroupId::parse_insensitively(&input).is_ok());
    }

    /// Anything not starting with '/' is never a valid ID
    #[test]
    fn ids_without_leading_slash_are_rejected(input in "[a-zA-Z0-9][a-zA-Z0-9/._-]{0,60}") {
        prop_assert!(ResourceGroupId::parse(&input).is_err());
        prop_assert!(GenericResourceId::parse(&input).is_err());
    }

    /// Non-UUID subscription segments are rejected
    #[test]
    fn non_uuid_subscription_is_rejected(sub in "[g-z]{1,20}", group in arb_name()) {
        let input = format!("/subscriptions/{}/resourceGroups/{}", sub, group);
        prop_assert!(ResourceGroupId::parse(&input).is_err());
    }

    /// Generic IDs of any depth round trip, and their parent drops one level
    #[test]
    fn generic_id_round_trips(
        sub in arb_subscription(),
        group in arb_name(),
        namespace in "Microsoft\\.[A-Z][a-zA-Z]{2,12}",
        resources in prop::collection::vec(("[a-z][a-zA-Z]{2,15}", arb_name()), 1..4),
    ) {
        let mut input = format!("/subscriptions/{}/resourceGroups/{}/providers/{}", sub, group, namespace);
        for (ty, name) in &resources {
            input.push_str(&format!("/{}/{}", ty, name));
        }

        let parsed = GenericResourceId::parse(&input).unwrap();
        prop_assert_eq!(parsed.id(), input.clone());
        prop_assert_eq!(parsed.name(), resources.last().unwrap().1.as_str());
        prop_assert_eq!(parsed.resource_group(), ResourceGroupId::new(&sub, &group));

        match parsed.parent() {
            Some(parent) => {
                prop_assert_eq!(parent.resources.len(), resources.len() - 1);
                prop_assert!(input.starts_with(&parent.id()));
            }
            None => prop_assert_eq!(resources.len(), 1),
        }
    }

    /// Role assignments round trip under any scope
    #[test]
    fn scoped_id_round_trips(sub in arb_subscription(), group in arb_name(), name in arb_name()) {
        let scope = ResourceGroupId::new(&sub, &group).id();
        let id = ScopedRoleAssignmentId::new(&scope, &name);
        let parsed = ScopedRoleAssignmentId::parse(&id.id()).unwrap();
        prop_assert_eq!(parsed.scope, scope);
        prop_assert_eq!(parsed.role_assignment_name, name);
    }
}

#[test]
fn registry_identifies_builtin_types() {
    let registry = ResourceIdRegistry::builtin().expect("builtin registry");
    let sub = Uuid::from_u128(7).to_string();

    let vnet = VirtualNetworkId::new(&sub, "rg", "vnet1").id();
    let (id_type, parsed) = registry.identify(&vnet).expect("vnet should be identified");
    assert_eq!(id_type.resource_type, "Microsoft.Network/virtualNetworks");
    assert_eq!(parsed.get("virtualNetworkName").unwrap(), "vnet1");

    let subnet = format!("{}/subnets/default", vnet);
    let (id_type, _) = registry.identify(&subnet).expect("subnet should be identified");
    assert_eq!(id_type.resource_type, "Microsoft.Network/virtualNetworks/subnets");

    let group = format!("/SUBSCRIPTIONS/{}/RESOURCEGROUPS/rg", sub);
    let (id_type, _) = registry.identify(&group).expect("group should be identified");
    assert_eq!(id_type.resource_type, "Microsoft.Resources/resourceGroups");

    assert!(registry.identify("/not/a/known/id").is_none());
}
