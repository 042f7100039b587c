//! Fixture store for the contract suites.
//!
//! Fixtures are named variable sets fed to a module under test: some valid,
//! some deliberately broken. The built-in set is constructed once per process
//! and never mutated afterwards, so concurrent scenarios can share it freely.
//! Additional fixtures can be discovered on disk as `<name>.fixture.json`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;

use crate::value::Value;

/// Variable name → value. `None` where a fixture is expected means "no overrides".
pub type Fixture = BTreeMap<String, Value>;

/// Default location for on-disk fixture files.
pub const DEFAULT_FIXTURE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures");

pub const NFS_NAMESPACE: &str = "dummy-namespace";
pub const NFS_CHART_NAME_OVERRIDE: &str = "test-nfs";
pub const NFS_CAPACITY: &str = "10Gi";
pub const NFS_REQUESTS_CPU: &str = "1";
pub const NFS_REQUESTS_MEMORY: &str = "1Gi";
pub const NFS_LIMITS_CPU: &str = "2";
pub const NFS_LIMITS_MEMORY: &str = "2Gi";

static BUILTIN: Lazy<FixtureStore> = Lazy::new(FixtureStore::builtin);

/// Access the process-wide built-in fixtures.
pub fn builtin() -> &'static FixtureStore {
    &BUILTIN
}

/// Look up a built-in fixture, panicking with the known names when absent.
///
/// Intended for test code, where an unknown fixture name is a typo.
#[track_caller]
pub fn fixture(name: &str) -> &'static Fixture {
    match BUILTIN.get(name) {
        Some(fixture) => fixture,
        None => panic!(
            "unknown fixture {name:?}; known fixtures: {}",
            BUILTIN.names().collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Named, immutable collection of fixtures.
#[derive(Debug, Clone, Default)]
pub struct FixtureStore {
    fixtures: BTreeMap<String, Fixture>,
}

impl FixtureStore {
    pub fn get(&self, name: &str) -> Option<&Fixture> {
        self.fixtures.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Fixture> {
        self.get(name)
            .ok_or_else(|| anyhow!("Fixture '{name}' is not defined"))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fixtures.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fixtures.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    /// Combine with fixtures discovered on disk; disk entries win on name clashes.
    pub fn merged_with(&self, catalog: &FixtureCatalog) -> Result<FixtureStore> {
        let mut merged = self.clone();
        for metadata in catalog.discover()? {
            let fixture = catalog.load(&metadata.name)?;
            merged.fixtures.insert(metadata.name, fixture);
        }
        Ok(merged)
    }

    fn builtin() -> Self {
        let eks_valid = eks_valid();
        let bitbucket_valid = bitbucket_valid();

        let mut fixtures = BTreeMap::new();
        fixtures.insert("vpc_default".to_string(), as_fixture(vpc_default()));
        fixtures.insert(
            "eks_invalid_cluster_name".to_string(),
            with_overrides(
                &eks_valid,
                &single("cluster_name", Value::from("1-dummy-cluster-name")),
            ),
        );
        fixtures.insert(
            "eks_desired_capacity_over_limit".to_string(),
            with_overrides(&eks_valid, &single("desired_capacity", Value::Int(11))),
        );
        fixtures.insert(
            "eks_desired_capacity_under_limit".to_string(),
            with_overrides(&eks_valid, &single("desired_capacity", Value::Int(0))),
        );
        fixtures.insert(
            "eks_with_irsa".to_string(),
            with_overrides(&eks_valid, &single("enable_irsa", Value::Bool(true))),
        );
        fixtures.insert("eks_valid".to_string(), eks_valid);
        fixtures.insert(
            "bitbucket_invalid".to_string(),
            bitbucket_invalid(&bitbucket_valid),
        );
        fixtures.insert("bitbucket_valid".to_string(), bitbucket_valid);
        fixtures.insert("nfs_valid".to_string(), nfs_valid());

        Self { fixtures }
    }
}

/// Copy `base` and apply `overrides` on top of it.
///
/// Nested maps merge key by key; a `Value::Null` override removes the key.
/// The base fixture is never modified.
pub fn with_overrides(base: &Fixture, overrides: &Fixture) -> Fixture {
    let mut merged = base.clone();
    merge_into(&mut merged, overrides);
    merged
}

/// Copy `base` without the listed variables.
pub fn without(base: &Fixture, names: &[&str]) -> Fixture {
    base.iter()
        .filter(|(key, _)| !names.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn merge_into(target: &mut BTreeMap<String, Value>, overrides: &BTreeMap<String, Value>) {
    for (key, value) in overrides {
        match (target.get_mut(key), value) {
            (_, Value::Null) => {
                target.remove(key);
            }
            (Some(Value::Map(existing)), Value::Map(nested)) => merge_into(existing, nested),
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

fn single(key: &str, value: Value) -> Fixture {
    BTreeMap::from([(key.to_string(), value)])
}

fn as_fixture(value: Value) -> Fixture {
    match value {
        Value::Map(entries) => entries,
        _ => Fixture::new(),
    }
}

fn vpc_default() -> Value {
    Value::map([
        ("vpc_id", Value::from("dummy_vpc_id")),
        (
            "private_subnets",
            Value::list(["dummy_private_subnet_1", "dummy_private_subnet_2"]),
        ),
        (
            "public_subnets",
            Value::list(["dummy_public_subnet_1", "dummy_public_subnet_2"]),
        ),
    ])
}

fn eks_valid() -> Fixture {
    as_fixture(Value::map([
        ("cluster_name", Value::from("dummy-cluster-name")),
        ("vpc_id", Value::from("dummy_vpc_id")),
        ("subnets", Value::list(["subnet1", "subnet2"])),
        (
            "instance_types",
            Value::list(["instance_type1", "instance_type2"]),
        ),
        ("desired_capacity", Value::Int(1)),
    ]))
}

fn bitbucket_valid() -> Fixture {
    as_fixture(Value::map([
        ("environment_name", Value::from("dummy-environment")),
        ("namespace", Value::from("dummy-namespace")),
        (
            "eks",
            Value::map([
                (
                    "kubernetes_provider_config",
                    Value::map([
                        ("host", Value::from("dummy-host")),
                        ("token", Value::from("dummy-token")),
                        ("cluster_ca_certificate", Value::from("dummy-certificate")),
                    ]),
                ),
                ("cluster_security_group", Value::from("dummy-sg")),
                ("cluster_size", Value::Int(2)),
            ]),
        ),
        ("vpc", vpc_default()),
        ("db_major_engine_version", Value::from("13")),
        ("db_allocated_storage", Value::Int(5)),
        ("db_instance_class", Value::from("dummy_db_instance_class")),
        ("db_iops", Value::Int(1000)),
        (
            "admin_configuration",
            Value::map([
                ("admin_username", Value::from("dummy_admin_username")),
                ("admin_password", Value::from("dummy_admin_password")),
                ("admin_display_name", Value::from("dummy_admin_display_name")),
                ("admin_email_address", Value::from("dummy_admin_email_address")),
            ]),
        ),
        ("display_name", Value::from("dummy_display_name")),
        ("ingress", Value::map(Vec::<(String, Value)>::new())),
        ("replica_count", Value::Int(1)),
        (
            "bitbucket_configuration",
            Value::map([
                ("helm_version", Value::from("1.2.0")),
                ("cpu", Value::from("1")),
                ("mem", Value::from("1Gi")),
                ("min_heap", Value::from("256m")),
                ("max_heap", Value::from("512m")),
                ("license", Value::from("dummy_license")),
            ]),
        ),
        ("nfs_requests_cpu", Value::from("0.25")),
        ("nfs_requests_memory", Value::from("256Mi")),
        ("nfs_limits_cpu", Value::from("0.25")),
        ("nfs_limits_memory", Value::from("256Mi")),
        ("elasticsearch_cpu", Value::from("1")),
        ("elasticsearch_mem", Value::from("1Gi")),
        ("elasticsearch_storage", Value::Int(10)),
        ("elasticsearch_replicas", Value::Int(2)),
    ]))
}

/// Every independently validated Bitbucket input broken at once.
fn bitbucket_invalid(valid: &Fixture) -> Fixture {
    let overrides = as_fixture(Value::map([
        (
            "environment_name",
            Value::from("1-invalid-environment-name-exceeding-the-limit"),
        ),
        // unknown key plus dropped required keys
        (
            "bitbucket_configuration",
            Value::map([
                ("min_heap", Value::Null),
                ("max_heap", Value::Null),
                ("license", Value::Null),
                ("invalid_key", Value::from("unexpected")),
            ]),
        ),
        (
            "admin_configuration",
            Value::map([
                ("admin_password", Value::Null),
                ("admin_email_address", Value::Null),
            ]),
        ),
        ("elasticsearch_replicas", Value::Int(-1)),
        ("display_name", Value::from("")),
    ]));
    with_overrides(valid, &overrides)
}

fn nfs_valid() -> Fixture {
    as_fixture(Value::map([
        ("namespace", Value::from(NFS_NAMESPACE)),
        ("chart_name", Value::from(NFS_CHART_NAME_OVERRIDE)),
        ("capacity", Value::from(NFS_CAPACITY)),
        ("requests_cpu", Value::from(NFS_REQUESTS_CPU)),
        ("requests_memory", Value::from(NFS_REQUESTS_MEMORY)),
        ("limits_cpu", Value::from(NFS_LIMITS_CPU)),
        ("limits_memory", Value::from(NFS_LIMITS_MEMORY)),
    ]))
}

/// Metadata describing a fixture file on disk.
#[derive(Clone, Debug)]
pub struct FixtureMetadata {
    pub name: String,
    pub path: PathBuf,
}

/// Catalog responsible for discovering fixture files on disk.
pub struct FixtureCatalog {
    root: PathBuf,
}

impl FixtureCatalog {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List all `*.fixture.json` files by name.
    pub fn discover(&self) -> Result<Vec<FixtureMetadata>> {
        let mut fixtures = Vec::new();
        if !self.root.exists() {
            return Ok(fixtures);
        }

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let Some(name) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_suffix(".fixture.json"))
            else {
                continue;
            };
            fixtures.push(FixtureMetadata {
                name: name.to_string(),
                path: path.clone(),
            });
        }

        fixtures.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(fixtures)
    }

    /// Load a fixture by name or by direct path.
    pub fn load(&self, fixture: &str) -> Result<Fixture> {
        let path = self.resolve_fixture_path(fixture)?;
        let json = fs::read_to_string(&path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        let value: Value =
            serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?;
        match value {
            Value::Map(entries) => Ok(entries),
            other => Err(anyhow!(
                "Fixture {} must be a JSON object (found {})",
                path.display(),
                other.kind()
            )),
        }
    }

    fn resolve_fixture_path(&self, fixture: &str) -> Result<PathBuf> {
        let as_path = Path::new(fixture);
        if as_path.is_file() {
            return Ok(as_path.to_path_buf());
        }

        let candidate = self.root.join(format!("{fixture}.fixture.json"));
        if candidate.exists() {
            Ok(candidate)
        } else {
            Err(anyhow!(
                "Fixture '{fixture}' not found in {}",
                self.root.display()
            ))
        }
    }
}

impl Default for FixtureCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_FIXTURE_ROOT)
    }
}
