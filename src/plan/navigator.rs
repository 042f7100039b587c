//! Address-based lookups over a parsed [`Plan`].
//!
//! Lookups that a test depends on fail loudly with an [`AssertionError`]
//! rather than returning a default.

use crate::error::AssertionError;
use crate::value::Value;

use super::{Plan, PlannedResource};

impl Plan {
    pub fn resource_exists(&self, address: &str) -> bool {
        self.resources.contains_key(address)
    }

    /// Planned resource at `address`, or `ResourceNotFound` listing what was planned.
    pub fn resource(&self, address: &str) -> Result<&PlannedResource, AssertionError> {
        self.resources
            .get(address)
            .ok_or_else(|| AssertionError::ResourceNotFound {
                address: address.to_string(),
                available: self.resources.keys().cloned().collect(),
            })
    }

    /// Resolved value of a declared root variable.
    pub fn variable(&self, name: &str) -> Result<&Value, AssertionError> {
        self.variables
            .get(name)
            .ok_or_else(|| AssertionError::AttributeNotFound {
                address: "variables".to_string(),
                attribute: name.to_string(),
            })
    }

    /// Addresses starting with `prefix`, e.g. every resource under `module.eks.`.
    pub fn addresses_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> {
        self.addresses()
            .filter(move |address| address.starts_with(prefix))
    }
}

impl PlannedResource {
    /// Raw attribute value; callers cast with the `Value::as_*` accessors.
    pub fn attribute(&self, name: &str) -> Result<&Value, AssertionError> {
        self.values
            .get(name)
            .ok_or_else(|| self.attribute_missing(name))
    }

    /// Nested attribute lookup with a dotted path (`scaling_config.0.desired_size`).
    pub fn attribute_path(&self, path: &str) -> Result<&Value, AssertionError> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let root = self.attribute(head)?;
        match rest {
            Some(rest) => root.path(rest).ok_or_else(|| self.attribute_missing(path)),
            None => Ok(root),
        }
    }

    fn attribute_missing(&self, attribute: &str) -> AssertionError {
        AssertionError::AttributeNotFound {
            address: self.address.clone(),
            attribute: attribute.to_string(),
        }
    }
}
