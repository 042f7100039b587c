//! Options builder: fixture + module path → execution-ready plan descriptor.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::fixtures::Fixture;

/// Immutable description of one planning run.
///
/// Built once per scenario by [`build`] and read-only afterwards; the
/// `with_*` methods return a modified copy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanOptions {
    module: String,
    vars: Fixture,
    input: bool,
    lock: bool,
    no_color: bool,
    env: BTreeMap<String, String>,
}

/// Convert an optional fixture and a module path into a [`PlanOptions`].
///
/// The fixture is cloned, never modified. `None` yields zero overrides so the
/// engine falls back to module defaults (or fails on required variables).
/// Runs are always non-interactive: prompts and state locking are disabled.
pub fn build(fixture: Option<&Fixture>, module_path: &str) -> PlanOptions {
    PlanOptions {
        module: module_path.to_string(),
        vars: fixture.cloned().unwrap_or_default(),
        input: false,
        lock: false,
        no_color: true,
        env: BTreeMap::from([
            ("TF_IN_AUTOMATION".to_string(), "1".to_string()),
            ("TF_INPUT".to_string(), "0".to_string()),
        ]),
    }
}

impl PlanOptions {
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn vars(&self) -> &Fixture {
        &self.vars
    }

    pub fn has_overrides(&self) -> bool {
        !self.vars.is_empty()
    }

    pub fn is_interactive(&self) -> bool {
        self.input
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Copy of these options with one more environment variable.
    pub fn with_env(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.env.insert(key.into(), value.into());
        next
    }

    /// Flags shared by every engine step.
    pub fn common_flags(&self) -> Vec<String> {
        let mut flags = vec![format!("-input={}", self.input)];
        if self.no_color {
            flags.push("-no-color".to_string());
        }
        flags
    }

    /// Flags for the plan step (common flags plus locking).
    pub fn plan_flags(&self) -> Vec<String> {
        let mut flags = self.common_flags();
        flags.push(format!("-lock={}", self.lock));
        flags
    }

    /// Overrides rendered as a `*.tfvars.json` document.
    pub fn var_file_json(&self) -> String {
        let object: serde_json::Map<String, serde_json::Value> = self
            .vars
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect();
        serde_json::to_string_pretty(&serde_json::Value::Object(object))
            .unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::fixture;
    use crate::value::Value;

    #[test]
    fn absent_fixture_yields_zero_overrides() {
        let options = build(None, "products/bitbucket/nfs");
        assert_eq!(options.module(), "products/bitbucket/nfs");
        assert!(!options.has_overrides());
        assert_eq!(options.var_file_json(), "{}");
    }

    #[test]
    fn build_copies_the_fixture() {
        let source = fixture("eks_valid");
        let before = source.clone();
        let options = build(Some(source), "AWS/eks");
        assert_eq!(options.vars(), source);
        assert_eq!(source, &before);
    }

    #[test]
    fn runs_are_non_interactive() {
        let options = build(None, "AWS/eks");
        assert!(!options.is_interactive());
        assert_eq!(options.plan_flags(), vec!["-input=false", "-no-color", "-lock=false"]);
        assert_eq!(options.env().get("TF_INPUT").map(String::as_str), Some("0"));
    }

    #[test]
    fn with_env_leaves_original_untouched() {
        let options = build(None, "AWS/eks");
        let extended = options.with_env("TF_LOG", "DEBUG");
        assert!(options.env().get("TF_LOG").is_none());
        assert_eq!(extended.env().get("TF_LOG").map(String::as_str), Some("DEBUG"));
    }

    #[test]
    fn var_file_preserves_nested_values() {
        let options = build(Some(fixture("eks_valid")), "AWS/eks");
        let parsed: serde_json::Value = serde_json::from_str(&options.var_file_json()).unwrap();
        assert_eq!(parsed["desired_capacity"], 1);
        assert_eq!(parsed["subnets"], serde_json::json!(["subnet1", "subnet2"]));
        assert_eq!(
            Value::from(parsed["cluster_name"].clone()),
            Value::from("dummy-cluster-name")
        );
    }
}
