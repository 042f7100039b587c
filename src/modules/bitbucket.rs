use once_cell::sync::Lazy;
use regex::Regex;

use super::{
    has_exact_keys, nfs, num_var, str_var, var, yaml, ModuleDefinition, ResourceTemplate,
    ValidationRule, VarType, VariableSpec,
};
use crate::fixtures::Fixture;
use crate::value::Value;

pub const PATH: &str = "products/bitbucket";
pub const CHART_REPOSITORY: &str = "https://atlassian.github.io/data-center-helm-charts";

const CONFIGURATION_KEYS: [&str; 6] = ["helm_version", "cpu", "mem", "min_heap", "max_heap", "license"];
const ADMIN_KEYS: [&str; 4] = [
    "admin_username",
    "admin_password",
    "admin_display_name",
    "admin_email_address",
];

static ENVIRONMENT_NAME: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9-]{1,24}$").ok());

pub(super) fn definition() -> ModuleDefinition {
    ModuleDefinition {
        path: PATH,
        variables: vec![
            VariableSpec::required("environment_name", VarType::String),
            VariableSpec::required("namespace", VarType::String),
            VariableSpec::required("vpc", VarType::Map),
            VariableSpec::required("eks", VarType::Map),
            VariableSpec::required("db_major_engine_version", VarType::String),
            VariableSpec::required("db_allocated_storage", VarType::Number),
            VariableSpec::required("db_instance_class", VarType::String),
            VariableSpec::required("db_iops", VarType::Number),
            VariableSpec::required("bitbucket_configuration", VarType::Map),
            VariableSpec::required("admin_configuration", VarType::Map),
            VariableSpec::optional("display_name", VarType::String, "Bitbucket"),
            VariableSpec::optional("ingress", VarType::Any, Value::Null),
            VariableSpec::optional("replica_count", VarType::Number, 1),
            VariableSpec::optional("nfs_requests_cpu", VarType::String, "0.25"),
            VariableSpec::optional("nfs_requests_memory", VarType::String, "256Mi"),
            VariableSpec::optional("nfs_limits_cpu", VarType::String, "0.25"),
            VariableSpec::optional("nfs_limits_memory", VarType::String, "256Mi"),
            VariableSpec::required("elasticsearch_cpu", VarType::String),
            VariableSpec::required("elasticsearch_mem", VarType::String),
            VariableSpec::required("elasticsearch_storage", VarType::Number),
            VariableSpec::required("elasticsearch_replicas", VarType::Number),
        ],
        rules: vec![
            ValidationRule {
                variable: "environment_name",
                check: valid_environment_name,
                message: "Invalid environment name. Valid name is up to 25 characters starting with alphabet and followed by alphanumerics. '-' is allowed as well.",
            },
            ValidationRule {
                variable: "bitbucket_configuration",
                check: |vars| has_exact_keys(vars.get("bitbucket_configuration"), &CONFIGURATION_KEYS),
                message: "Bitbucket configuration is not valid.",
            },
            ValidationRule {
                variable: "admin_configuration",
                check: |vars| has_exact_keys(vars.get("admin_configuration"), &ADMIN_KEYS),
                message: "Bitbucket administrator configuration is not valid.",
            },
            ValidationRule {
                variable: "display_name",
                check: |vars| {
                    str_var(vars, "display_name")
                        .is_some_and(|name| !name.is_empty() && name.chars().count() < 255)
                },
                message: "Bitbucket display name must be a non-empty value less than 255 characters.",
            },
            ValidationRule {
                variable: "elasticsearch_replicas",
                check: |vars| {
                    num_var(vars, "elasticsearch_replicas")
                        .is_some_and(|n| n.fract() == 0.0 && (2.0..=8.0).contains(&n))
                },
                message: "Invalid elasticsearch replicas. Valid replicas is a positive integer in range of [2,8].",
            },
        ],
        render,
    }
}

fn valid_environment_name(vars: &Fixture) -> bool {
    match (ENVIRONMENT_NAME.as_ref(), str_var(vars, "environment_name")) {
        (Some(pattern), Some(name)) => pattern.is_match(name),
        _ => false,
    }
}

fn render(vars: &Fixture) -> Vec<ResourceTemplate> {
    let namespace = var(vars, "namespace");
    let environment = str_var(vars, "environment_name").unwrap_or_default();
    let configuration = var(vars, "bitbucket_configuration");
    let setting = |key: &str| configuration.get(key).cloned().unwrap_or_default();

    let values = Value::map([
        ("replicaCount", var(vars, "replica_count")),
        (
            "bitbucket",
            Value::map([
                ("displayName", var(vars, "display_name")),
                (
                    "resources",
                    Value::map([
                        (
                            "container",
                            Value::map([(
                                "requests",
                                Value::map([("cpu", setting("cpu")), ("memory", setting("mem"))]),
                            )]),
                        ),
                        (
                            "jvm",
                            Value::map([
                                ("minHeap", setting("min_heap")),
                                ("maxHeap", setting("max_heap")),
                            ]),
                        ),
                    ]),
                ),
            ]),
        ),
    ]);

    let mut resources = vec![
        ResourceTemplate::new("helm_release", "bitbucket", "helm")
            .with("name", "bitbucket")
            .with("namespace", namespace.clone())
            .with("chart", "bitbucket")
            .with("repository", CHART_REPOSITORY)
            .with("version", setting("helm_version"))
            .with("status", "deployed")
            .with("values", Value::list([yaml::encode(&values)])),
        ResourceTemplate::new("aws_db_instance", "this", "aws")
            .in_module("module.database.module.db")
            .indexed(0)
            .with("identifier", format!("bitbucket-{environment}"))
            .with("engine", "postgres")
            .with("engine_version", var(vars, "db_major_engine_version"))
            .with("allocated_storage", var(vars, "db_allocated_storage"))
            .with("instance_class", var(vars, "db_instance_class"))
            .with("iops", var(vars, "db_iops")),
        ResourceTemplate::new("helm_release", "elasticsearch", "helm")
            .in_module("module.elasticsearch")
            .with("name", "bitbucket-elasticsearch")
            .with("namespace", namespace.clone())
            .with("chart", "elasticsearch")
            .with("status", "deployed")
            .with(
                "values",
                Value::list([yaml::encode(&Value::map([
                    ("replicas", var(vars, "elasticsearch_replicas")),
                    (
                        "resources",
                        Value::map([(
                            "requests",
                            Value::map([
                                ("cpu", var(vars, "elasticsearch_cpu")),
                                ("memory", var(vars, "elasticsearch_mem")),
                            ]),
                        )]),
                    ),
                    (
                        "volumeClaimTemplate",
                        Value::map([(
                            "resources",
                            Value::map([(
                                "requests",
                                Value::map([(
                                    "storage",
                                    Value::from(format!(
                                        "{}Gi",
                                        var(vars, "elasticsearch_storage")
                                    )),
                                )]),
                            )]),
                        )]),
                    ),
                ]))]),
            ),
    ];

    let nfs_release = nfs::release(&nfs::Sizing {
        namespace: namespace.as_str().unwrap_or_default(),
        chart_name: "bitbucket-nfs",
        capacity: "10Gi",
        requests_cpu: str_var(vars, "nfs_requests_cpu").unwrap_or_default(),
        requests_memory: str_var(vars, "nfs_requests_memory").unwrap_or_default(),
        limits_cpu: str_var(vars, "nfs_limits_cpu").unwrap_or_default(),
        limits_memory: str_var(vars, "nfs_limits_memory").unwrap_or_default(),
    })
    .in_module("module.nfs");
    resources.push(nfs_release);
    resources
}
