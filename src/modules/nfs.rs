use super::{str_var, yaml, ModuleDefinition, ResourceTemplate, VarType, VariableSpec};
use crate::fixtures::Fixture;
use crate::value::Value;

pub const PATH: &str = "products/bitbucket/nfs";

/// Release name is fixed; `chart_name` only feeds `nameOverride`.
pub const RELEASE_NAME: &str = "bitbucket-nfs";

pub(super) fn definition() -> ModuleDefinition {
    ModuleDefinition {
        path: PATH,
        variables: vec![
            VariableSpec::required("namespace", VarType::String),
            VariableSpec::optional("chart_name", VarType::String, "nfs-server"),
            VariableSpec::optional("capacity", VarType::String, "10Gi"),
            VariableSpec::optional("requests_cpu", VarType::String, "0.25"),
            VariableSpec::optional("requests_memory", VarType::String, "256Mi"),
            VariableSpec::optional("limits_cpu", VarType::String, "0.25"),
            VariableSpec::optional("limits_memory", VarType::String, "256Mi"),
        ],
        rules: Vec::new(),
        render,
    }
}

pub(super) struct Sizing<'a> {
    pub namespace: &'a str,
    pub chart_name: &'a str,
    pub capacity: &'a str,
    pub requests_cpu: &'a str,
    pub requests_memory: &'a str,
    pub limits_cpu: &'a str,
    pub limits_memory: &'a str,
}

pub(super) fn release(sizing: &Sizing<'_>) -> ResourceTemplate {
    let values = Value::map([
        ("nameOverride", Value::from(sizing.chart_name)),
        ("persistence", Value::map([("size", Value::from(sizing.capacity))])),
        (
            "resources",
            Value::map([
                (
                    "limits",
                    Value::map([
                        ("cpu", Value::from(sizing.limits_cpu)),
                        ("memory", Value::from(sizing.limits_memory)),
                    ]),
                ),
                (
                    "requests",
                    Value::map([
                        ("cpu", Value::from(sizing.requests_cpu)),
                        ("memory", Value::from(sizing.requests_memory)),
                    ]),
                ),
            ]),
        ),
    ]);

    ResourceTemplate::new("helm_release", "nfs", "helm")
        .with("name", RELEASE_NAME)
        .with("namespace", sizing.namespace)
        .with("chart", "modules/products/bitbucket/nfs/nfs-server")
        .with("status", "deployed")
        .with("values", Value::list([yaml::encode(&values)]))
}

fn render(vars: &Fixture) -> Vec<ResourceTemplate> {
    let text = |name: &str| str_var(vars, name).unwrap_or_default();
    vec![release(&Sizing {
        namespace: text("namespace"),
        chart_name: text("chart_name"),
        capacity: text("capacity"),
        requests_cpu: text("requests_cpu"),
        requests_memory: text("requests_memory"),
        limits_cpu: text("limits_cpu"),
        limits_memory: text("limits_memory"),
    })]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, fixture};
    use crate::modules::Violation;

    #[test]
    fn only_namespace_is_required() {
        let violations = definition().resolve(&Fixture::new()).unwrap_err();
        assert_eq!(
            violations,
            vec![Violation::MissingRequired {
                variable: "namespace".to_string(),
                line: 1
            }]
        );
    }

    #[test]
    fn chart_name_lands_in_name_override() {
        let nfs = definition();
        let resources = nfs.render(&nfs.resolve(fixture("nfs_valid")).unwrap());
        assert_eq!(resources.len(), 1);
        let values = resources[0].values.get("values").unwrap().as_list().unwrap();
        assert!(values[0]
            .as_str()
            .unwrap()
            .starts_with(&format!("\"nameOverride\": \"{}\"\n", fixtures::NFS_CHART_NAME_OVERRIDE)));
        assert_eq!(resources[0].values.get("name"), Some(&Value::from(RELEASE_NAME)));
    }
}
