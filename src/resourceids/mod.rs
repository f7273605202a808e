//! Resource identifiers
//!
//! Typed parse/format/validate helpers for ARM resource IDs such as
//! `/subscriptions/{id}/resourceGroups/{rg}/providers/{ns}/{type}/{name}`.
//!
//! # Module Structure
//!
//! - [`segment`] - segment kinds and pattern strings
//! - [`parser`] - matching an input string against a pattern
//! - [`ids`] - typed IDs for commonly used resource types
//! - [`generic`] - structural parsing of any provider resource ID
//! - [`registry`] - explicit lookup table from resource type to pattern
//!
//! # Example
//!
//! ```
//! use azrm::resourceids::{ResourceId, VirtualNetworkId};
//!
//! let id = VirtualNetworkId::parse_insensitively(
//!     "/subscriptions/12345678-1234-9876-4563-123456789012/resourcegroups/rg1/providers/Microsoft.Network/virtualNetworks/vnet1",
//! )
//! .unwrap();
//! assert_eq!(id.virtual_network_name, "vnet1");
//! assert!(id.id().contains("/resourceGroups/rg1/"));
//! ```

pub mod generic;
pub mod ids;
pub mod parser;
pub mod registry;
pub mod segment;

pub use generic::GenericResourceId;
pub use ids::{
    ResourceGroupId, ScopedRoleAssignmentId, StorageAccountId, SubscriptionId, VirtualNetworkId,
};
pub use parser::{ParseError, ParseResult, Parser};
pub use registry::{ResourceIdRegistry, ResourceIdType};
pub use segment::{Segment, SegmentKind};

/// A typed resource ID with a fixed segment pattern
pub trait ResourceId: Sized {
    /// The pattern this ID matches
    fn segments() -> Vec<Segment>;

    /// Build the typed ID from parsed values
    fn from_parse_result(result: &ParseResult) -> Result<Self, ParseError>;

    /// Format the ID back into its canonical string form
    fn id(&self) -> String;

    /// Parse an ID whose fixed segments use canonical casing
    fn parse(input: &str) -> Result<Self, ParseError> {
        let segments = Self::segments();
        let result = Parser::new(&segments).parse(input, false)?;
        Self::from_parse_result(&result)
    }

    /// Parse an ID accepting any casing of its fixed segments
    fn parse_insensitively(input: &str) -> Result<Self, ParseError> {
        let segments = Self::segments();
        let result = Parser::new(&segments).parse(input, true)?;
        Self::from_parse_result(&result)
    }

    /// Validation errors for `input`, empty when it is a valid ID
    fn validate(input: &str) -> Vec<String> {
        match Self::parse(input) {
            Ok(_) => Vec::new(),
            Err(e) => vec![e.to_string()],
        }
    }
}
