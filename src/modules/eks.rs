use once_cell::sync::Lazy;
use regex::Regex;

use super::{num_var, str_var, var, yaml, ModuleDefinition, ResourceTemplate, ValidationRule, VarType, VariableSpec};
use crate::fixtures::Fixture;
use crate::value::Value;

pub const PATH: &str = "AWS/eks";

static CLUSTER_NAME: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9-]{1,37}$").ok());

pub(super) fn definition() -> ModuleDefinition {
    ModuleDefinition {
        path: PATH,
        variables: vec![
            VariableSpec::required("cluster_name", VarType::String),
            VariableSpec::required("vpc_id", VarType::String),
            VariableSpec::required("subnets", VarType::List),
            VariableSpec::required("instance_types", VarType::List),
            VariableSpec::required("desired_capacity", VarType::String),
            VariableSpec::optional("max_cluster_capacity", VarType::Number, 10),
            VariableSpec::optional("enable_irsa", VarType::Bool, false),
        ],
        rules: vec![
            ValidationRule {
                variable: "cluster_name",
                check: valid_cluster_name,
                message: "Invalid EKS cluster name. Valid name is up to 38 characters starting with alphabet and followed by alphanumerics. '-' is allowed as well.",
            },
            ValidationRule {
                variable: "desired_capacity",
                check: |vars| {
                    num_var(vars, "desired_capacity")
                        .is_some_and(|n| n.fract() == 0.0 && (1.0..=10.0).contains(&n))
                },
                message: "Desired capacity must be between 1 and 10, inclusive.",
            },
            ValidationRule {
                variable: "max_cluster_capacity",
                check: |vars| {
                    match (num_var(vars, "max_cluster_capacity"), num_var(vars, "desired_capacity")) {
                        (Some(max), Some(desired)) => max >= desired,
                        _ => false,
                    }
                },
                message: "Maximum cluster capacity must not be lower than the desired capacity.",
            },
        ],
        render,
    }
}

fn valid_cluster_name(vars: &Fixture) -> bool {
    match (CLUSTER_NAME.as_ref(), str_var(vars, "cluster_name")) {
        (Some(pattern), Some(name)) => pattern.is_match(name),
        _ => false,
    }
}

fn render(vars: &Fixture) -> Vec<ResourceTemplate> {
    let cluster_name = var(vars, "cluster_name");
    let subnets = var(vars, "subnets");
    // workers stay in the first subnet only
    let first_subnet: Vec<Value> = subnets
        .as_list()
        .ok()
        .and_then(|items| items.first())
        .cloned()
        .into_iter()
        .collect();
    let desired = num_var(vars, "desired_capacity").unwrap_or_default() as i64;
    let max = num_var(vars, "max_cluster_capacity").unwrap_or_default() as i64;

    let mut resources = vec![
        ResourceTemplate::new("aws_eks_cluster", "this", "aws")
            .in_module("module.eks")
            .indexed(0)
            .with("name", cluster_name.clone())
            .with(
                "vpc_config",
                Value::List(vec![Value::map([
                    ("subnet_ids", subnets.clone()),
                    ("vpc_id", var(vars, "vpc_id")),
                ])]),
            ),
        ResourceTemplate::new("aws_eks_node_group", "workers", "aws")
            .in_module("module.eks.module.node_groups")
            .indexed("appNodes")
            .with("cluster_name", cluster_name.clone())
            .with("node_group_name", "appNodes")
            .with("instance_types", var(vars, "instance_types"))
            .with("subnet_ids", Value::List(first_subnet))
            .with(
                "scaling_config",
                Value::List(vec![Value::map([
                    ("desired_size", Value::Int(desired)),
                    ("max_size", Value::Int(max)),
                    ("min_size", Value::Int(1)),
                ])]),
            ),
        ResourceTemplate::new("helm_release", "cluster-autoscaler", "helm")
            .with("name", "cluster-autoscaler")
            .with("chart", "cluster-autoscaler")
            .with("repository", "https://kubernetes.github.io/autoscaler")
            .with("namespace", "kube-system")
            .with("status", "deployed")
            .with(
                "values",
                Value::list([yaml::encode(&Value::map([
                    (
                        "autoDiscovery",
                        Value::map([("clusterName", cluster_name.clone())]),
                    ),
                    ("rbac", Value::map([("create", Value::Bool(true))])),
                ]))]),
            ),
        ResourceTemplate::new("aws_iam_policy", "cluster_autoscaler", "aws").with(
            "name",
            format!("{}-cluster-autoscaler", cluster_name.as_str().unwrap_or_default()),
        ),
    ];

    if vars.get("enable_irsa") == Some(&Value::Bool(true)) {
        resources.push(
            ResourceTemplate::new("aws_iam_openid_connect_provider", "oidc_provider", "aws")
                .in_module("module.eks")
                .indexed(0)
                .with("client_id_list", Value::list(["sts.amazonaws.com"])),
        );
    }
    resources
}
