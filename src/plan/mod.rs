//! Parsed plan model.
//!
//! The engine renders a saved plan as JSON (`show -json`). This module reads
//! that document into a [`Plan`]: planned resources indexed by address, the
//! resolved root variables, and the change actions per address. Child module
//! trees are flattened; each resource keeps the address the engine gave it.

mod navigator;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::value::Value;

/// A successfully computed plan, keyed by resource address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    format_version: String,
    terraform_version: Option<String>,
    resources: BTreeMap<String, PlannedResource>,
    variables: BTreeMap<String, Value>,
    changes: BTreeMap<String, Vec<ChangeAction>>,
}

/// One resource instance the plan would create or change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedResource {
    pub address: String,
    pub module_address: Option<String>,
    pub mode: String,
    pub resource_type: String,
    pub name: String,
    pub index: Option<Value>,
    pub provider_name: String,
    pub values: BTreeMap<String, Value>,
}

/// Action recorded for an address in `resource_changes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeAction {
    NoOp,
    Create,
    Read,
    Update,
    Delete,
    #[serde(other)]
    Other,
}

impl Plan {
    /// Parse the JSON rendering of a saved plan.
    pub fn from_json(json: &str) -> Result<Self, HarnessError> {
        let raw: RawPlan = serde_json::from_str(json).map_err(|err| {
            HarnessError::OutputUnparseable {
                reason: format!("invalid plan JSON: {err}"),
            }
        })?;
        let format_version = raw
            .format_version
            .ok_or_else(|| HarnessError::OutputUnparseable {
                reason: "plan JSON has no format_version".to_string(),
            })?;

        let mut resources = BTreeMap::new();
        if let Some(planned) = raw.planned_values {
            collect_resources(planned.root_module, &mut resources);
        }

        let variables = raw
            .variables
            .into_iter()
            .map(|(name, variable)| (name, variable.value))
            .collect();

        let changes = raw
            .resource_changes
            .into_iter()
            .map(|change| (change.address, change.change.actions))
            .collect();

        Ok(Self {
            format_version,
            terraform_version: raw.terraform_version,
            resources,
            variables,
            changes,
        })
    }

    pub fn format_version(&self) -> &str {
        &self.format_version
    }

    pub fn terraform_version(&self) -> Option<&str> {
        self.terraform_version.as_deref()
    }

    pub fn resources(&self) -> &BTreeMap<String, PlannedResource> {
        &self.resources
    }

    pub fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Change actions for an address; empty when the engine recorded none.
    pub fn actions(&self, address: &str) -> &[ChangeAction] {
        self.changes
            .get(address)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn collect_resources(module: RawModule, into: &mut BTreeMap<String, PlannedResource>) {
    let module_address = module.address;
    for resource in module.resources {
        into.insert(
            resource.address.clone(),
            PlannedResource {
                address: resource.address,
                module_address: module_address.clone(),
                mode: resource.mode,
                resource_type: resource.resource_type,
                name: resource.name,
                index: resource.index,
                provider_name: resource.provider_name,
                values: resource.values,
            },
        );
    }
    for child in module.child_modules {
        collect_resources(child, into);
    }
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    format_version: Option<String>,
    #[serde(default)]
    terraform_version: Option<String>,
    #[serde(default)]
    variables: BTreeMap<String, RawVariable>,
    #[serde(default)]
    planned_values: Option<RawPlannedValues>,
    #[serde(default)]
    resource_changes: Vec<RawResourceChange>,
}

#[derive(Debug, Deserialize)]
struct RawVariable {
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct RawPlannedValues {
    #[serde(default)]
    root_module: RawModule,
}

#[derive(Debug, Default, Deserialize)]
struct RawModule {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    resources: Vec<RawResource>,
    #[serde(default)]
    child_modules: Vec<RawModule>,
}

#[derive(Debug, Deserialize)]
struct RawResource {
    address: String,
    #[serde(default = "default_mode")]
    mode: String,
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    index: Option<Value>,
    #[serde(default)]
    provider_name: String,
    #[serde(default)]
    values: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawResourceChange {
    address: String,
    change: RawChange,
}

#[derive(Debug, Deserialize)]
struct RawChange {
    #[serde(default)]
    actions: Vec<ChangeAction>,
}

fn default_mode() -> String {
    "managed".to_string()
}
