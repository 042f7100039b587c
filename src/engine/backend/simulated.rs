use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Map, Value as Json};
use tracing::debug;

use crate::error::HarnessError;
use crate::modules::{self, ModuleDefinition, ResourceTemplate, Violation};
use crate::options::PlanOptions;

use super::{PlanningBackend, RawPlanOutcome, Workspace};

const FORMAT_VERSION: &str = "1.2";
const ENGINE_VERSION: &str = "1.5.7";

/// In-process engine that plans against the registered module definitions.
///
/// Deterministic for identical inputs and free of external processes, which
/// makes it the default for the contract suites.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedBackend;

impl SimulatedBackend {
    pub fn new() -> Self {
        SimulatedBackend
    }

    fn definition(&self, module: &str) -> Result<&'static ModuleDefinition, HarnessError> {
        modules::lookup(module).ok_or_else(|| HarnessError::ModuleNotFound {
            module: module.to_string(),
        })
    }
}

impl PlanningBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn initialize(&self, workspace: &Workspace, options: &PlanOptions) -> Result<(), HarnessError> {
        self.definition(options.module())?;
        workspace.write_var_file(options)?;
        workspace.mark_initialized(options.module())
    }

    fn plan(&self, workspace: &Workspace, options: &PlanOptions) -> Result<RawPlanOutcome, HarnessError> {
        if !workspace.is_initialized(options.module()) {
            return Err(HarnessError::NotInitialized {
                module: options.module().to_string(),
            });
        }
        let definition = self.definition(options.module())?;

        match definition.resolve(options.vars()) {
            Ok(resolved) => {
                let resources = definition.render(&resolved);
                debug!(module = options.module(), resources = resources.len(), "simulated plan");
                Ok(RawPlanOutcome::Planned(render_plan(&resolved, &resources)))
            }
            Err(violations) => {
                debug!(module = options.module(), violations = violations.len(), "simulated rejection");
                Ok(RawPlanOutcome::Rejected {
                    text: render_diagnostics(&violations),
                    exit_code: Some(1),
                })
            }
        }
    }
}

fn render_diagnostics(violations: &[Violation]) -> String {
    let blocks: Vec<String> = violations.iter().map(render_violation).collect();
    format!("\n{}\n", blocks.join("\n"))
}

fn render_violation(violation: &Violation) -> String {
    match violation {
        Violation::MissingRequired { variable, line } => format!(
            "Error: No value for required variable\n\n  on variables.tf line {line}:\n  {line}: variable \"{variable}\" {{\n\nThe root module input variable \"{variable}\" is not set, and has no default value. Use a -var or -var-file command line argument to provide a value for this variable.\n"
        ),
        Violation::NullRequired { variable, line } => format!(
            "Error: Required variable not set\n\n  on variables.tf line {line}:\n  {line}: variable \"{variable}\" {{\n\nThe root module input variable \"{variable}\" is required, but the given value is null.\n"
        ),
        Violation::WrongType {
            variable,
            expected,
            line,
        } => format!(
            "Error: Invalid value for input variable\n\n  on overrides.tfvars.json line 1:\n\nThe given value is not suitable for var.{variable} declared at variables.tf:{line},1-{}: {expected} is required.\n",
            variable.len() + 13
        ),
        Violation::RuleFailed {
            variable,
            value,
            message,
            line,
        } => format!(
            "Error: Invalid value for variable\n\n  on variables.tf line {line}:\n  {line}: variable \"{variable}\" {{\n    ├────────────────\n    │ var.{variable} is {value}\n\n{message}\n\nThis was checked by the validation rule at variables.tf:{},3-13.\n",
            line + 2
        ),
    }
}

/// Render resolved variables and resources the way `show -json` does.
fn render_plan(resolved: &crate::fixtures::Fixture, resources: &[ResourceTemplate]) -> String {
    let variables: Map<String, Json> = resolved
        .iter()
        .map(|(name, value)| (name.clone(), json!({ "value": value.to_json() })))
        .collect();

    let mut by_module: BTreeMap<Option<String>, Vec<&ResourceTemplate>> = BTreeMap::new();
    let mut module_addresses = BTreeSet::new();
    for resource in resources {
        by_module.entry(resource.module.clone()).or_default().push(resource);
        let mut current = resource.module.clone();
        while let Some(address) = current {
            current = parent_module(&address);
            module_addresses.insert(address);
        }
    }

    let resource_changes: Vec<Json> = resources
        .iter()
        .map(|resource| {
            let mut change = resource_json(resource);
            if let Some(object) = change.as_object_mut() {
                object.remove("values");
                object.remove("schema_version");
                object.insert(
                    "change".to_string(),
                    json!({
                        "actions": ["create"],
                        "before": null,
                        "after": values_json(resource),
                    }),
                );
            }
            change
        })
        .collect();

    let document = json!({
        "format_version": FORMAT_VERSION,
        "terraform_version": ENGINE_VERSION,
        "variables": variables,
        "planned_values": {
            "root_module": module_json(None, &by_module, &module_addresses),
        },
        "resource_changes": resource_changes,
    });
    document.to_string()
}

fn module_json(
    address: Option<&str>,
    by_module: &BTreeMap<Option<String>, Vec<&ResourceTemplate>>,
    module_addresses: &BTreeSet<String>,
) -> Json {
    let resources: Vec<Json> = by_module
        .get(&address.map(str::to_string))
        .map(|resources| resources.iter().map(|resource| resource_json(resource)).collect())
        .unwrap_or_default();
    let children: Vec<Json> = module_addresses
        .iter()
        .filter(|candidate| parent_module(candidate).as_deref() == address)
        .map(|child| module_json(Some(child.as_str()), by_module, module_addresses))
        .collect();

    let mut module = Map::new();
    if let Some(address) = address {
        module.insert("address".to_string(), Json::from(address));
    }
    module.insert("resources".to_string(), Json::Array(resources));
    if !children.is_empty() {
        module.insert("child_modules".to_string(), Json::Array(children));
    }
    Json::Object(module)
}

fn resource_json(resource: &ResourceTemplate) -> Json {
    let mut object = Map::new();
    object.insert("address".to_string(), Json::from(resource.address()));
    object.insert("mode".to_string(), Json::from("managed"));
    object.insert("type".to_string(), Json::from(resource.resource_type.as_str()));
    object.insert("name".to_string(), Json::from(resource.name.as_str()));
    if let Some(index) = &resource.index {
        object.insert("index".to_string(), index.to_json());
    }
    object.insert("provider_name".to_string(), Json::from(resource.provider.as_str()));
    object.insert("schema_version".to_string(), Json::from(0));
    object.insert("values".to_string(), values_json(resource));
    Json::Object(object)
}

fn values_json(resource: &ResourceTemplate) -> Json {
    Json::Object(
        resource
            .values
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect(),
    )
}

/// `module.a.module.b` → `module.a`; top-level modules have no parent.
fn parent_module(address: &str) -> Option<String> {
    address
        .rfind(".module.")
        .map(|split| address[..split].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::fixture;
    use crate::options;
    use crate::plan::Plan;

    fn run(options: &PlanOptions) -> RawPlanOutcome {
        let backend = SimulatedBackend::new();
        let workspace = Workspace::create().unwrap();
        backend.initialize(&workspace, options).unwrap();
        backend.plan(&workspace, options).unwrap()
    }

    fn planned(outcome: RawPlanOutcome) -> String {
        match outcome {
            RawPlanOutcome::Planned(json) => json,
            other => panic!("expected a plan, got {other:?}"),
        }
    }

    #[test]
    fn plan_without_initialize_is_fatal() {
        let backend = SimulatedBackend::new();
        let workspace = Workspace::create().unwrap();
        let opts = options::build(Some(fixture("nfs_valid")), "products/bitbucket/nfs");
        assert_eq!(
            backend.plan(&workspace, &opts),
            Err(HarnessError::NotInitialized {
                module: "products/bitbucket/nfs".into()
            })
        );
    }

    #[test]
    fn unknown_module_fails_initialize() {
        let backend = SimulatedBackend::new();
        let workspace = Workspace::create().unwrap();
        let opts = options::build(None, "AWS/rds");
        assert!(matches!(
            backend.initialize(&workspace, &opts),
            Err(HarnessError::ModuleNotFound { .. })
        ));
    }

    #[test]
    fn rendered_plan_nests_child_modules() {
        let json = planned(run(&options::build(Some(fixture("eks_with_irsa")), "AWS/eks")));
        let document: Json = serde_json::from_str(&json).unwrap();
        let eks = &document["planned_values"]["root_module"]["child_modules"][0];
        assert_eq!(eks["address"], "module.eks");
        assert_eq!(
            eks["child_modules"][0]["address"],
            "module.eks.module.node_groups"
        );

        let plan = Plan::from_json(&json).unwrap();
        assert!(plan.resource_exists("module.eks.aws_iam_openid_connect_provider.oidc_provider[0]"));
        assert_eq!(plan.resources().len(), plan.addresses().count());
    }

    #[test]
    fn intermediate_modules_without_resources_are_emitted() {
        let json = planned(run(&options::build(Some(fixture("bitbucket_valid")), "products/bitbucket")));
        let plan = Plan::from_json(&json).unwrap();
        let db = plan
            .resource("module.database.module.db.aws_db_instance.this[0]")
            .unwrap();
        assert_eq!(db.module_address.as_deref(), Some("module.database.module.db"));
    }

    #[test]
    fn rejection_text_uses_engine_markers() {
        let (text, exit_code) = match run(&options::build(None, "AWS/eks")) {
            RawPlanOutcome::Rejected { text, exit_code } => (text, exit_code),
            other => panic!("expected a rejection, got {other:?}"),
        };
        assert_eq!(exit_code, Some(1));
        assert_eq!(text.matches("Error: No value for required variable").count(), 5);
        assert!(text.contains("\"desired_capacity\" is not set"));
    }

    #[test]
    fn identical_inputs_render_identical_output() {
        let opts = options::build(Some(fixture("bitbucket_valid")), "products/bitbucket");
        assert_eq!(run(&opts), run(&opts));
    }

    #[test]
    fn parent_of_nested_module() {
        assert_eq!(
            parent_module("module.eks.module.node_groups").as_deref(),
            Some("module.eks")
        );
        assert_eq!(parent_module("module.eks"), None);
    }
}
