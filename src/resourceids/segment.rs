//! Resource ID segments
//!
//! A resource ID pattern is an ordered list of segments. Fixed segments
//! (`subscriptions`, `Microsoft.Network`) must match literally; the others
//! capture a value under the segment's name.

use super::parser::ParseError;

/// Kind of a resource ID segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Fixed literal such as `subscriptions` or `virtualNetworks`
    Static,
    /// Fixed provider namespace such as `Microsoft.Network`
    ResourceProvider,
    /// Subscription UUID
    SubscriptionId,
    /// Resource group name
    ResourceGroup,
    /// Any caller-chosen name
    UserSpecified,
    /// An arbitrary resource ID prefix spanning one or more path parts
    Scope,
}

/// One segment of a resource ID pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub name: String,
    /// Literal value for static and provider segments
    pub fixed_value: Option<String>,
    pub example_value: String,
}

impl Segment {
    pub fn static_segment(name: &str, value: &str) -> Self {
        Self {
            kind: SegmentKind::Static,
            name: name.to_string(),
            fixed_value: Some(value.to_string()),
            example_value: value.to_string(),
        }
    }

    pub fn resource_provider(name: &str, value: &str) -> Self {
        Self {
            kind: SegmentKind::ResourceProvider,
            name: name.to_string(),
            fixed_value: Some(value.to_string()),
            example_value: value.to_string(),
        }
    }

    pub fn subscription_id(name: &str) -> Self {
        Self {
            kind: SegmentKind::SubscriptionId,
            name: name.to_string(),
            fixed_value: None,
            example_value: "12345678-1234-9876-4563-123456789012".to_string(),
        }
    }

    pub fn resource_group(name: &str) -> Self {
        Self {
            kind: SegmentKind::ResourceGroup,
            name: name.to_string(),
            fixed_value: None,
            example_value: "example-resource-group".to_string(),
        }
    }

    pub fn user_specified(name: &str) -> Self {
        Self {
            kind: SegmentKind::UserSpecified,
            name: name.to_string(),
            fixed_value: None,
            example_value: format!("{}Value", name),
        }
    }

    pub fn scope(name: &str) -> Self {
        Self {
            kind: SegmentKind::Scope,
            name: name.to_string(),
            fixed_value: None,
            example_value: "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/some-resource-group"
                .to_string(),
        }
    }

    /// True for segments that must match a literal
    pub fn is_fixed(&self) -> bool {
        self.fixed_value.is_some()
    }

    /// How the segment appears in a human-readable pattern
    fn pattern_part(&self) -> String {
        match &self.fixed_value {
            Some(value) => value.clone(),
            None => format!("{{{}}}", self.name),
        }
    }
}

/// Render segments as `/subscriptions/{subscriptionId}/...`
pub fn pattern(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| match s.kind {
            // Scope values carry their own leading slash
            SegmentKind::Scope => s.pattern_part(),
            _ => format!("/{}", s.pattern_part()),
        })
        .collect()
}

/// Render segments with example values
pub fn example(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| match s.kind {
            SegmentKind::Scope => s.example_value.clone(),
            _ => format!("/{}", s.example_value),
        })
        .collect()
}

/// Build segments from a pattern string.
///
/// `{subscriptionId}` becomes a subscription segment, `{resourceGroupName}` a
/// resource group, `{scope}` a scope and any other `{name}` a user-specified
/// segment. The literal following `providers` is a resource provider; every
/// other literal is static.
pub fn segments_from_pattern(pattern: &str) -> Result<Vec<Segment>, ParseError> {
    let malformed = |reason: &str| ParseError::Malformed {
        input: pattern.to_string(),
        reason: reason.to_string(),
    };

    let Some(rest) = pattern.strip_prefix('/') else {
        return Err(malformed("patterns must start with '/'"));
    };

    let mut segments = Vec::new();
    let mut previous_literal: Option<&str> = None;
    let mut scopes = 0;

    for part in rest.split('/') {
        if part.is_empty() {
            return Err(malformed("patterns may not contain empty segments"));
        }

        if let Some(name) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
            if name.is_empty() {
                return Err(malformed("placeholder names may not be empty"));
            }
            let segment = match name {
                "subscriptionId" => Segment::subscription_id(name),
                "resourceGroupName" => Segment::resource_group(name),
                "scope" => {
                    scopes += 1;
                    Segment::scope(name)
                }
                _ => Segment::user_specified(name),
            };
            segments.push(segment);
            previous_literal = None;
            continue;
        }

        let name = format!("static{}", upper_first(part).replace('.', ""));
        if previous_literal == Some("providers") {
            segments.push(Segment::resource_provider(&name, part));
        } else {
            segments.push(Segment::static_segment(&name, part));
        }
        previous_literal = Some(part);
    }

    if scopes > 1 {
        return Err(malformed("a pattern may contain at most one scope"));
    }

    Ok(segments)
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_from_pattern() {
        let segments = segments_from_pattern(
            "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Web/sites/{siteName}",
        )
        .unwrap();

        let kinds: Vec<SegmentKind> = segments.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SegmentKind::Static,
                SegmentKind::SubscriptionId,
                SegmentKind::Static,
                SegmentKind::ResourceGroup,
                SegmentKind::Static,
                SegmentKind::ResourceProvider,
                SegmentKind::Static,
                SegmentKind::UserSpecified,
            ]
        );
        assert_eq!(segments[5].name, "staticMicrosoftWeb");
        assert_eq!(segments[7].name, "siteName");
    }

    #[test]
    fn test_pattern_and_example_render() {
        let segments = segments_from_pattern(
            "/{scope}/providers/Microsoft.Authorization/roleAssignments/{roleAssignmentName}",
        )
        .unwrap();

        assert_eq!(
            pattern(&segments),
            "{scope}/providers/Microsoft.Authorization/roleAssignments/{roleAssignmentName}"
        );
        assert!(example(&segments).starts_with("/subscriptions/"));
        assert!(example(&segments).ends_with("/roleAssignments/roleAssignmentNameValue"));
    }

    #[test]
    fn test_malformed_patterns() {
        assert!(segments_from_pattern("subscriptions/{subscriptionId}").is_err());
        assert!(segments_from_pattern("/subscriptions//x").is_err());
        assert!(segments_from_pattern("/{scope}/x/{scope}").is_err());
        assert!(segments_from_pattern("/{}").is_err());
    }
}
