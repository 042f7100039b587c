// Assertion failure types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Assertion error code constants
///
/// Error code range: 4001-4008
pub struct AssertionErrorCodes {}

impl AssertionErrorCodes {
    /// Extracted value differs from the expected literal
    pub const MISMATCH: i32 = 4001;

    /// One or more expected substrings are absent
    pub const MISSING_SUBSTRINGS: i32 = 4002;

    /// A substring that must not appear was found
    pub const UNEXPECTED_SUBSTRING: i32 = 4003;

    /// Resource address is not in the plan
    pub const RESOURCE_NOT_FOUND: i32 = 4004;

    /// Resource address is in the plan but should not be
    pub const UNEXPECTED_RESOURCE: i32 = 4005;

    /// Resource has no attribute with the requested name
    pub const ATTRIBUTE_NOT_FOUND: i32 = 4006;

    /// Value has a different shape than the caller cast it to
    pub const WRONG_SHAPE: i32 = 4007;

    /// Collection has an unexpected number of elements
    pub const CARDINALITY: i32 = 4008;
}

/// Log an assertion failure with structured context
pub fn log_assertion_error(err: &AssertionError, scenario: &str) {
    warn!(
        "Assertion failed in {}: code={}, message={}",
        scenario,
        err.code(),
        err.message()
    );
}

/// Failures of the harness's own checks
///
/// Each variant carries enough of the expected and actual values to
/// diagnose the failure without re-running the scenario.
#[derive(Debug, Clone, PartialEq)]
pub enum AssertionError {
    Mismatch {
        context: String,
        expected: String,
        actual: String,
    },

    MissingSubstrings {
        missing: Vec<String>,
        text: String,
    },

    UnexpectedSubstring {
        needle: String,
        text: String,
    },

    ResourceNotFound {
        address: String,
        available: Vec<String>,
    },

    UnexpectedResource {
        address: String,
    },

    AttributeNotFound {
        address: String,
        attribute: String,
    },

    WrongShape {
        expected: &'static str,
        found: &'static str,
        value: String,
    },

    Cardinality {
        context: String,
        expected: usize,
        actual: usize,
    },
}

impl ErrorCode for AssertionError {
    fn code(&self) -> i32 {
        match self {
            AssertionError::Mismatch { .. } => AssertionErrorCodes::MISMATCH,
            AssertionError::MissingSubstrings { .. } => AssertionErrorCodes::MISSING_SUBSTRINGS,
            AssertionError::UnexpectedSubstring { .. } => {
                AssertionErrorCodes::UNEXPECTED_SUBSTRING
            }
            AssertionError::ResourceNotFound { .. } => AssertionErrorCodes::RESOURCE_NOT_FOUND,
            AssertionError::UnexpectedResource { .. } => AssertionErrorCodes::UNEXPECTED_RESOURCE,
            AssertionError::AttributeNotFound { .. } => AssertionErrorCodes::ATTRIBUTE_NOT_FOUND,
            AssertionError::WrongShape { .. } => AssertionErrorCodes::WRONG_SHAPE,
            AssertionError::Cardinality { .. } => AssertionErrorCodes::CARDINALITY,
        }
    }

    fn message(&self) -> String {
        match self {
            AssertionError::Mismatch {
                context,
                expected,
                actual,
            } => format!("{context}: expected {expected}, got {actual}"),
            AssertionError::MissingSubstrings { missing, text } => format!(
                "expected text to contain {} missing substring(s): {:?}\n--- actual text ---\n{}",
                missing.len(),
                missing,
                text
            ),
            AssertionError::UnexpectedSubstring { needle, text } => format!(
                "expected text not to contain {:?}\n--- actual text ---\n{}",
                needle, text
            ),
            AssertionError::ResourceNotFound { address, available } => format!(
                "resource {address} not found in plan (planned: {})",
                available.join(", ")
            ),
            AssertionError::UnexpectedResource { address } => {
                format!("resource {address} should not be planned")
            }
            AssertionError::AttributeNotFound { address, attribute } => {
                format!("resource {address} has no attribute {attribute:?}")
            }
            AssertionError::WrongShape {
                expected,
                found,
                value,
            } => format!("expected a {expected} value, found {found}: {value}"),
            AssertionError::Cardinality {
                context,
                expected,
                actual,
            } => format!("{context}: expected {expected} element(s), found {actual}"),
        }
    }
}

impl fmt::Display for AssertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssertionError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for AssertionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assertion_error_codes() {
        assert_eq!(
            AssertionError::UnexpectedResource {
                address: "aws_iam_policy.x".into()
            }
            .code(),
            AssertionErrorCodes::UNEXPECTED_RESOURCE
        );
        assert_eq!(
            AssertionError::Cardinality {
                context: "subnet_ids".into(),
                expected: 1,
                actual: 2
            }
            .code(),
            4008
        );
    }

    #[test]
    fn test_missing_substrings_lists_every_needle() {
        let err = AssertionError::MissingSubstrings {
            missing: vec!["\"vpc\" is not set".into(), "\"eks\" is not set".into()],
            text: "Error: No value for required variable".into(),
        };
        let message = err.message();
        assert!(message.contains("2 missing"));
        assert!(message.contains("\\\"vpc\\\" is not set"));
        assert!(message.contains("--- actual text ---"));
    }

    #[test]
    fn test_mismatch_reports_expected_and_actual() {
        let err = AssertionError::Mismatch {
            context: "helm_release.nfs.name".into(),
            expected: "\"bitbucket-nfs\"".into(),
            actual: "\"nfs\"".into(),
        };
        assert_eq!(
            err.message(),
            "helm_release.nfs.name: expected \"bitbucket-nfs\", got \"nfs\""
        );
    }
}
