//! In-process definitions of the modules under test.
//!
//! The simulated backend plans against these instead of a real engine. Each
//! definition declares its input variables (type and optional default), the
//! validation rules attached to them, and how a successful configuration
//! renders into planned resources.

mod bitbucket;
mod eks;
mod nfs;
pub mod yaml;

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::fixtures::Fixture;
use crate::value::Value;

static REGISTRY: Lazy<BTreeMap<&'static str, ModuleDefinition>> = Lazy::new(|| {
    [eks::definition(), bitbucket::definition(), nfs::definition()]
        .into_iter()
        .map(|definition| (definition.path, definition))
        .collect()
});

/// Definition registered for `path`, if any.
pub fn lookup(path: &str) -> Option<&'static ModuleDefinition> {
    REGISTRY.get(path)
}

pub fn paths() -> impl Iterator<Item = &'static str> {
    REGISTRY.keys().copied()
}

/// Declared type of an input variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    String,
    Number,
    Bool,
    List,
    Map,
    Any,
}

impl VarType {
    fn describe(self) -> &'static str {
        match self {
            VarType::String => "a string",
            VarType::Number => "a number",
            VarType::Bool => "a bool",
            VarType::List => "a list",
            VarType::Map => "a map or object",
            VarType::Any => "any value",
        }
    }

    /// Convert a supplied value the way the engine does for primitives.
    ///
    /// Numbers and bools become strings for string variables, numeric and
    /// boolean strings parse for number and bool variables. Anything else
    /// must already have the declared shape.
    pub fn convert(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (VarType::Any, _) => Some(value.clone()),
            (_, Value::Null) => Some(Value::Null),
            (VarType::String, Value::Str(_)) => Some(value.clone()),
            (VarType::String, Value::Int(i)) => Some(Value::Str(i.to_string())),
            (VarType::String, Value::Float(f)) => Some(Value::Str(f.to_string())),
            (VarType::String, Value::Bool(b)) => Some(Value::Str(b.to_string())),
            (VarType::Number, Value::Int(_) | Value::Float(_)) => Some(value.clone()),
            (VarType::Number, Value::Str(s)) => parse_number(s),
            (VarType::Bool, Value::Bool(_)) => Some(value.clone()),
            (VarType::Bool, Value::Str(s)) => match s.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            (VarType::List, Value::List(_)) => Some(value.clone()),
            (VarType::Map, Value::Map(_)) => Some(value.clone()),
            _ => None,
        }
    }
}

fn parse_number(text: &str) -> Option<Value> {
    if let Ok(int) = text.trim().parse::<i64>() {
        return Some(Value::Int(int));
    }
    text.trim().parse::<f64>().ok().map(Value::Float)
}

/// One declared input variable. No default means the variable is required.
#[derive(Debug, Clone)]
pub struct VariableSpec {
    pub name: &'static str,
    pub var_type: VarType,
    pub default: Option<Value>,
}

impl VariableSpec {
    pub fn required(name: &'static str, var_type: VarType) -> Self {
        Self {
            name,
            var_type,
            default: None,
        }
    }

    pub fn optional(name: &'static str, var_type: VarType, default: impl Into<Value>) -> Self {
        Self {
            name,
            var_type,
            default: Some(default.into()),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// A validation block attached to `variable`.
///
/// The check sees every resolved variable, so a rule may compare fields.
#[derive(Clone)]
pub struct ValidationRule {
    pub variable: &'static str,
    pub check: fn(&Fixture) -> bool,
    pub message: &'static str,
}

/// Why a configuration cannot be planned.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    MissingRequired {
        variable: String,
        line: usize,
    },
    /// Required variable explicitly set to `null`.
    NullRequired {
        variable: String,
        line: usize,
    },
    WrongType {
        variable: String,
        expected: &'static str,
        line: usize,
    },
    RuleFailed {
        variable: String,
        value: Value,
        message: &'static str,
        line: usize,
    },
}

/// A resource instance the module would plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceTemplate {
    pub module: Option<String>,
    pub resource_type: String,
    pub name: String,
    pub index: Option<Value>,
    pub provider: String,
    pub values: BTreeMap<String, Value>,
}

impl ResourceTemplate {
    pub fn new(resource_type: &str, name: &str, provider: &str) -> Self {
        Self {
            module: None,
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            index: None,
            provider: format!("registry.terraform.io/hashicorp/{provider}"),
            values: BTreeMap::new(),
        }
    }

    pub fn in_module(mut self, module: &str) -> Self {
        self.module = Some(module.to_string());
        self
    }

    pub fn indexed(mut self, index: impl Into<Value>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with(mut self, attribute: &str, value: impl Into<Value>) -> Self {
        self.values.insert(attribute.to_string(), value.into());
        self
    }

    /// Full address, e.g. `module.eks.aws_eks_cluster.this[0]`.
    pub fn address(&self) -> String {
        let mut address = match &self.module {
            Some(module) => format!("{module}.{}.{}", self.resource_type, self.name),
            None => format!("{}.{}", self.resource_type, self.name),
        };
        match &self.index {
            Some(Value::Str(key)) => address.push_str(&format!("[{key:?}]")),
            Some(index) => address.push_str(&format!("[{index}]")),
            None => {}
        }
        address
    }
}

pub struct ModuleDefinition {
    pub path: &'static str,
    pub variables: Vec<VariableSpec>,
    pub rules: Vec<ValidationRule>,
    pub render: fn(&Fixture) -> Vec<ResourceTemplate>,
}

impl ModuleDefinition {
    /// Resolve `overrides` against the declared variables.
    ///
    /// Required variables that are missing or `null` are reported on their
    /// own, all of them. Otherwise every type mismatch and every failing rule
    /// is collected; nothing short-circuits. A `null` optional variable takes
    /// its default. On success returns the resolved variables.
    pub fn resolve(&self, overrides: &Fixture) -> Result<Fixture, Vec<Violation>> {
        let unset: Vec<Violation> = self
            .variables
            .iter()
            .enumerate()
            .filter(|(_, spec)| spec.is_required())
            .filter_map(|(index, spec)| {
                let variable = spec.name.to_string();
                let line = declaration_line(index);
                match overrides.get(spec.name) {
                    None => Some(Violation::MissingRequired { variable, line }),
                    Some(Value::Null) => Some(Violation::NullRequired { variable, line }),
                    Some(_) => None,
                }
            })
            .collect();
        if !unset.is_empty() {
            return Err(unset);
        }

        let mut violations = Vec::new();
        let mut resolved = Fixture::new();
        for (index, spec) in self.variables.iter().enumerate() {
            let supplied = match overrides.get(spec.name) {
                None | Some(Value::Null) => spec.default.as_ref(),
                supplied => supplied,
            };
            let Some(supplied) = supplied else {
                continue;
            };
            match spec.var_type.convert(supplied) {
                Some(value) => {
                    resolved.insert(spec.name.to_string(), value);
                }
                None => violations.push(Violation::WrongType {
                    variable: spec.name.to_string(),
                    expected: spec.var_type.describe(),
                    line: declaration_line(index),
                }),
            }
        }

        for rule in &self.rules {
            // rules only run against variables that converted cleanly
            let Some(value) = resolved.get(rule.variable) else {
                continue;
            };
            if !(rule.check)(&resolved) {
                violations.push(Violation::RuleFailed {
                    variable: rule.variable.to_string(),
                    value: value.clone(),
                    message: rule.message,
                    line: self.line_of(rule.variable),
                });
            }
        }

        if violations.is_empty() {
            Ok(resolved)
        } else {
            Err(violations)
        }
    }

    pub fn render(&self, resolved: &Fixture) -> Vec<ResourceTemplate> {
        (self.render)(resolved)
    }

    pub fn variable(&self, name: &str) -> Option<&VariableSpec> {
        self.variables.iter().find(|spec| spec.name == name)
    }

    fn line_of(&self, name: &str) -> usize {
        self.variables
            .iter()
            .position(|spec| spec.name == name)
            .map(declaration_line)
            .unwrap_or(1)
    }
}

fn declaration_line(index: usize) -> usize {
    index * 4 + 1
}

pub(crate) fn str_var<'a>(vars: &'a Fixture, name: &str) -> Option<&'a str> {
    vars.get(name).and_then(|value| value.as_str().ok())
}

pub(crate) fn num_var(vars: &Fixture, name: &str) -> Option<f64> {
    match vars.get(name)? {
        Value::Str(text) => text.trim().parse().ok(),
        other => other.as_f64().ok(),
    }
}

pub(crate) fn has_exact_keys(value: Option<&Value>, keys: &[&str]) -> bool {
    match value {
        Some(Value::Map(entries)) => {
            entries.len() == keys.len() && keys.iter().all(|key| entries.contains_key(*key))
        }
        _ => false,
    }
}

/// Value of `name` in the resolved variables, `Null` if unset.
pub(crate) fn var(vars: &Fixture, name: &str) -> Value {
    vars.get(name).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::fixture;

    #[test]
    fn registry_holds_the_three_modules() {
        assert_eq!(
            paths().collect::<Vec<_>>(),
            vec!["AWS/eks", "products/bitbucket", "products/bitbucket/nfs"]
        );
        assert!(lookup("AWS/rds").is_none());
    }

    #[test]
    fn missing_required_variables_are_reported_alone() {
        let eks = lookup("AWS/eks").unwrap();
        let violations = eks.resolve(&Fixture::new()).unwrap_err();
        let names: Vec<_> = violations
            .iter()
            .map(|violation| match violation {
                Violation::MissingRequired { variable, .. } => variable.as_str(),
                other => panic!("unexpected violation {other:?}"),
            })
            .collect();
        assert_eq!(
            names,
            vec!["cluster_name", "vpc_id", "subnets", "instance_types", "desired_capacity"]
        );
    }

    #[test]
    fn null_counts_as_unset() {
        let nfs = lookup("products/bitbucket/nfs").unwrap();
        let mut vars = fixture("nfs_valid").clone();
        vars.insert("namespace".into(), Value::Null);
        assert_eq!(
            nfs.resolve(&vars).unwrap_err(),
            vec![Violation::NullRequired {
                variable: "namespace".into(),
                line: 1
            }]
        );

        let mut vars = fixture("nfs_valid").clone();
        vars.insert("chart_name".into(), Value::Null);
        let resolved = nfs.resolve(&vars).unwrap();
        assert_eq!(resolved.get("chart_name"), nfs.variable("chart_name").unwrap().default.as_ref());
    }

    #[test]
    fn primitives_convert_like_the_engine() {
        assert_eq!(VarType::String.convert(&Value::Int(1)), Some(Value::from("1")));
        assert_eq!(VarType::Number.convert(&Value::from("3")), Some(Value::Int(3)));
        assert_eq!(VarType::Number.convert(&Value::from("three")), None);
        assert_eq!(VarType::Bool.convert(&Value::from("true")), Some(Value::Bool(true)));
        assert_eq!(VarType::List.convert(&Value::from("a")), None);
    }

    #[test]
    fn defaults_fill_optional_variables() {
        let nfs = lookup("products/bitbucket/nfs").unwrap();
        let resolved = nfs
            .resolve(&crate::fixtures::without(fixture("nfs_valid"), &["capacity"]))
            .unwrap();
        assert_eq!(resolved.get("capacity"), Some(&Value::from("10Gi")));
    }

    #[test]
    fn addresses_quote_string_keys() {
        let group = ResourceTemplate::new("aws_eks_node_group", "workers", "aws")
            .in_module("module.eks.module.node_groups")
            .indexed("appNodes");
        assert_eq!(
            group.address(),
            "module.eks.module.node_groups.aws_eks_node_group.workers[\"appNodes\"]"
        );
        let cluster = ResourceTemplate::new("aws_eks_cluster", "this", "aws")
            .in_module("module.eks")
            .indexed(0);
        assert_eq!(cluster.address(), "module.eks.aws_eks_cluster.this[0]");
    }

    #[test]
    fn exact_keys_rejects_extra_and_missing() {
        let config = Value::map([("a", Value::Int(1)), ("b", Value::Int(2))]);
        assert!(has_exact_keys(Some(&config), &["a", "b"]));
        assert!(!has_exact_keys(Some(&config), &["a"]));
        assert!(!has_exact_keys(Some(&config), &["a", "c"]));
        assert!(!has_exact_keys(None, &["a"]));
    }
}
