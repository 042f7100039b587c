//! Assertion primitives over plans, values and diagnostic text.
//!
//! Each primitive is independent and returns `Result<(), AssertionError>` so
//! callers can either propagate with `?` or collect several failures before
//! reporting. Diagnostic text is only ever checked by substring containment.

use crate::error::AssertionError;
use crate::plan::Plan;
use crate::value::Value;

/// Exact structural equality between an expected literal and an extracted value.
pub fn equals(context: &str, expected: &Value, actual: &Value) -> Result<(), AssertionError> {
    if expected == actual {
        Ok(())
    } else {
        Err(AssertionError::Mismatch {
            context: context.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

pub fn contains(text: &str, needle: &str) -> Result<(), AssertionError> {
    contains_all(text, [needle])
}

/// Every needle must appear somewhere in `text`, in any order.
///
/// All missing needles are reported together rather than stopping at the first.
pub fn contains_all<'a, I>(text: &str, needles: I) -> Result<(), AssertionError>
where
    I: IntoIterator<Item = &'a str>,
{
    let missing: Vec<String> = needles
        .into_iter()
        .filter(|needle| !text.contains(needle))
        .map(str::to_string)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AssertionError::MissingSubstrings {
            missing,
            text: text.to_string(),
        })
    }
}

pub fn not_contains(text: &str, needle: &str) -> Result<(), AssertionError> {
    if text.contains(needle) {
        Err(AssertionError::UnexpectedSubstring {
            needle: needle.to_string(),
            text: text.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Element count of a list or map (character count for strings).
pub fn cardinality(context: &str, value: &Value, expected: usize) -> Result<(), AssertionError> {
    let actual = value.len().ok_or_else(|| AssertionError::WrongShape {
        expected: "collection",
        found: value.kind(),
        value: value.to_string(),
    })?;
    if actual == expected {
        Ok(())
    } else {
        Err(AssertionError::Cardinality {
            context: context.to_string(),
            expected,
            actual,
        })
    }
}

pub fn resource_present(plan: &Plan, address: &str) -> Result<(), AssertionError> {
    plan.resource(address).map(|_| ())
}

pub fn resource_absent(plan: &Plan, address: &str) -> Result<(), AssertionError> {
    if plan.resource_exists(address) {
        Err(AssertionError::UnexpectedResource {
            address: address.to_string(),
        })
    } else {
        Ok(())
    }
}
