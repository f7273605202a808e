//! Resource ID parser
//!
//! Matches an input string against a segment pattern. Insensitive parsing
//! accepts any casing for fixed segments and normalises them to the
//! canonical casing, so `/SUBSCRIPTIONS/x/resourcegroups/y` parses to the same
//! values as the correctly-cased ID.

use thiserror::Error;

use super::segment::{example, pattern, Segment, SegmentKind};

/// Errors produced while parsing a resource ID
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("parsing {input:?}: resource IDs must start with '/'; expected the format {pattern:?}, for example {example:?}")]
    MissingLeadingSlash {
        input: String,
        pattern: String,
        example: String,
    },

    #[error("parsing {input:?}: expected {expected} segments but got {actual}; expected the format {pattern:?}, for example {example:?}")]
    SegmentCount {
        input: String,
        expected: usize,
        actual: usize,
        pattern: String,
        example: String,
    },

    #[error("parsing {input:?}: segment {position} should be {expected:?} but got {actual:?}; expected the format {pattern:?}, for example {example:?}")]
    SegmentMismatch {
        input: String,
        position: usize,
        expected: String,
        actual: String,
        pattern: String,
        example: String,
    },

    #[error("parsing {input:?}: the segment {name:?} was empty")]
    EmptySegment { input: String, name: String },

    #[error("parsing {input:?}: {value:?} is not a valid subscription ID (expected a UUID)")]
    InvalidSubscriptionId { input: String, value: String },

    #[error("parsing {input:?}: the segment {name:?} was not found")]
    MissingSegment { input: String, name: String },

    #[error("parsing {input:?}: {reason}")]
    Malformed { input: String, reason: String },
}

/// Values captured from a successfully parsed ID, in pattern order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult {
    pub values: Vec<(String, String)>,
    pub raw_input: String,
}

impl ParseResult {
    /// Look up a captured value by segment name
    pub fn get(&self, name: &str) -> Result<&str, ParseError> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ParseError::MissingSegment {
                input: self.raw_input.clone(),
                name: name.to_string(),
            })
    }
}

/// Parser for one segment pattern
pub struct Parser<'a> {
    segments: &'a [Segment],
}

impl<'a> Parser<'a> {
    pub fn new(segments: &'a [Segment]) -> Self {
        Self { segments }
    }

    /// Parse `input` against the pattern
    pub fn parse(&self, input: &str, insensitively: bool) -> Result<ParseResult, ParseError> {
        let trimmed = match input.strip_suffix('/') {
            Some(t) if !t.is_empty() => t,
            _ => input,
        };

        let Some(rest) = trimmed.strip_prefix('/') else {
            return Err(ParseError::MissingLeadingSlash {
                input: input.to_string(),
                pattern: pattern(self.segments),
                example: example(self.segments),
            });
        };

        let parts: Vec<&str> = rest.split('/').collect();
        let mut values = Vec::with_capacity(self.segments.len());

        let scope_index = self
            .segments
            .iter()
            .position(|s| s.kind == SegmentKind::Scope);

        match scope_index {
            None => {
                if parts.len() != self.segments.len() {
                    return Err(self.count_error(input, parts.len()));
                }
                for (position, (segment, part)) in self.segments.iter().zip(&parts).enumerate() {
                    values.push(self.match_segment(input, position, segment, part, insensitively)?);
                }
            }
            Some(scope_at) => {
                // The scope takes at least one part
                if parts.len() < self.segments.len() {
                    return Err(self.count_error(input, parts.len()));
                }
                let suffix_len = self.segments.len() - scope_at - 1;
                let scope_end = parts.len() - suffix_len;

                for position in 0..scope_at {
                    let segment = &self.segments[position];
                    values.push(self.match_segment(input, position, segment, parts[position], insensitively)?);
                }

                let scope_parts = &parts[scope_at..scope_end];
                if scope_parts.iter().any(|p| p.is_empty()) {
                    return Err(ParseError::EmptySegment {
                        input: input.to_string(),
                        name: self.segments[scope_at].name.clone(),
                    });
                }
                values.push((
                    self.segments[scope_at].name.clone(),
                    format!("/{}", scope_parts.join("/")),
                ));

                for offset in 0..suffix_len {
                    let segment = &self.segments[scope_at + 1 + offset];
                    let part = parts[scope_end + offset];
                    values.push(self.match_segment(input, scope_end + offset, segment, part, insensitively)?);
                }
            }
        }

        Ok(ParseResult {
            values,
            raw_input: input.to_string(),
        })
    }

    fn match_segment(
        &self,
        input: &str,
        position: usize,
        segment: &Segment,
        part: &str,
        insensitively: bool,
    ) -> Result<(String, String), ParseError> {
        if let Some(expected) = &segment.fixed_value {
            let matches = if insensitively {
                part.eq_ignore_ascii_case(expected)
            } else {
                part == expected
            };
            if !matches {
                return Err(ParseError::SegmentMismatch {
                    input: input.to_string(),
                    position,
                    expected: expected.clone(),
                    actual: part.to_string(),
                    pattern: pattern(self.segments),
                    example: example(self.segments),
                });
            }
            return Ok((segment.name.clone(), expected.clone()));
        }

        if part.is_empty() {
            return Err(ParseError::EmptySegment {
                input: input.to_string(),
                name: segment.name.clone(),
            });
        }

        if segment.kind == SegmentKind::SubscriptionId && uuid::Uuid::parse_str(part).is_err() {
            return Err(ParseError::InvalidSubscriptionId {
                input: input.to_string(),
                value: part.to_string(),
            });
        }

        Ok((segment.name.clone(), part.to_string()))
    }

    fn count_error(&self, input: &str, actual: usize) -> ParseError {
        ParseError::SegmentCount {
            input: input.to_string(),
            expected: self.segments.len(),
            actual,
            pattern: pattern(self.segments),
            example: example(self.segments),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resourceids::segment::segments_from_pattern;

    const SUB: &str = "12345678-1234-9876-4563-123456789012";

    fn vnet_segments() -> Vec<Segment> {
        segments_from_pattern(
            "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Network/virtualNetworks/{virtualNetworkName}",
        )
        .unwrap()
    }

    #[test]
    fn test_parse_exact() {
        let segments = vnet_segments();
        let input = format!(
            "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.Network/virtualNetworks/vnet1",
            SUB
        );
        let result = Parser::new(&segments).parse(&input, false).unwrap();
        assert_eq!(result.get("subscriptionId").unwrap(), SUB);
        assert_eq!(result.get("resourceGroupName").unwrap(), "rg1");
        assert_eq!(result.get("virtualNetworkName").unwrap(), "vnet1");
    }

    #[test]
    fn test_parse_sensitive_rejects_wrong_casing() {
        let segments = vnet_segments();
        let input = format!(
            "/subscriptions/{}/resourcegroups/rg1/providers/microsoft.network/virtualnetworks/vnet1",
            SUB
        );
        let err = Parser::new(&segments).parse(&input, false).unwrap_err();
        assert!(matches!(err, ParseError::SegmentMismatch { position: 2, .. }));
    }

    #[test]
    fn test_parse_insensitive_normalises_fixed_segments() {
        let segments = vnet_segments();
        let input = format!(
            "/SUBSCRIPTIONS/{}/resourcegroups/RG1/providers/microsoft.network/VIRTUALNETWORKS/Vnet1/",
            SUB
        );
        let result = Parser::new(&segments).parse(&input, true).unwrap();
        assert_eq!(result.get("staticMicrosoftNetwork").unwrap(), "Microsoft.Network");
        // user values keep their casing
        assert_eq!(result.get("resourceGroupName").unwrap(), "RG1");
        assert_eq!(result.get("virtualNetworkName").unwrap(), "Vnet1");
    }

    #[test]
    fn test_parse_errors() {
        let segments = vnet_segments();
        let parser = Parser::new(&segments);

        assert!(matches!(
            parser.parse("subscriptions/x", false),
            Err(ParseError::MissingLeadingSlash { .. })
        ));
        assert!(matches!(
            parser.parse(&format!("/subscriptions/{}/resourceGroups/rg1", SUB), false),
            Err(ParseError::SegmentCount { expected: 8, actual: 4, .. })
        ));
        assert!(matches!(
            parser.parse(
                "/subscriptions/not-a-uuid/resourceGroups/rg1/providers/Microsoft.Network/virtualNetworks/v",
                false
            ),
            Err(ParseError::InvalidSubscriptionId { .. })
        ));
        assert!(matches!(
            parser.parse(
                &format!("/subscriptions/{}/resourceGroups//providers/Microsoft.Network/virtualNetworks/v", SUB),
                false
            ),
            Err(ParseError::EmptySegment { .. })
        ));
    }

    #[test]
    fn test_parse_error_message_shows_pattern() {
        let segments = vnet_segments();
        let err = Parser::new(&segments).parse("/subscriptions", false).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("{virtualNetworkName}"));
        assert!(message.contains("virtualNetworkNameValue"));
    }

    #[test]
    fn test_parse_scope() {
        let segments = segments_from_pattern(
            "/{scope}/providers/Microsoft.Authorization/roleAssignments/{roleAssignmentName}",
        )
        .unwrap();
        let input = format!(
            "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.Authorization/roleAssignments/ra1",
            SUB
        );
        let result = Parser::new(&segments).parse(&input, false).unwrap();
        assert_eq!(
            result.get("scope").unwrap(),
            format!("/subscriptions/{}/resourceGroups/rg1", SUB)
        );
        assert_eq!(result.get("roleAssignmentName").unwrap(), "ra1");

        // scope needs at least one part
        assert!(Parser::new(&segments)
            .parse("/providers/Microsoft.Authorization/roleAssignments/ra1", false)
            .is_err());
    }
}
