//! Declarative check manifests.
//!
//! A manifest lists checks as JSON so a run can be configured without writing
//! Rust. Loading validates the document against the bundled JSON Schema
//! (`schema/check_manifest.schema.json`) before deserializing, and rejects
//! unknown `schema_version` values rather than guess at their meaning.
//! Expectations become probes that re-resolve their identifier at run time
//! and describe what they found.

use crate::harness::Harness;
use crate::namespace::{FUNCTION_MARKER, Namespace, resolve_identifier};
use crate::probe::{Probe, ProbeVerdict};
use crate::registry::CheckDefinition;
use anyhow::{Context, Result, anyhow, bail};
use jsonschema::JSONSchema;
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

/// The only manifest version this build understands.
pub const MANIFEST_SCHEMA_VERSION: &str = "capprobe_manifest_v1";

const MANIFEST_SCHEMA: &str = include_str!("../schema/check_manifest.schema.json");

#[derive(Debug, Clone, Deserialize)]
pub struct CheckManifest {
    pub schema_version: String,
    pub checks: Vec<ManifestCheck>,
}

#[derive(Debug, Clone, Deserialize)]
/// One manifest entry; mirrors [`CheckDefinition`] with a declarative probe.
pub struct ManifestCheck {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub expect: Option<Expectation>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Assertion applied to the resolved value of a check.
pub enum Expectation {
    Type {
        #[serde(rename = "type")]
        expected: ValueKind,
    },
    Equals {
        value: Value,
    },
    NonEmpty,
    Truthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
/// JSON type of a namespace value, with the function marker told apart from
/// ordinary strings.
pub enum ValueKind {
    Function,
    Object,
    Array,
    String,
    Number,
    Boolean,
}

impl ValueKind {
    /// `None` for JSON null, which the namespace treats as an unset global.
    pub fn of(value: &Value) -> Option<Self> {
        let kind = match value {
            Value::String(text) if text == FUNCTION_MARKER => ValueKind::Function,
            Value::String(_) => ValueKind::String,
            Value::Object(_) => ValueKind::Object,
            Value::Array(_) => ValueKind::Array,
            Value::Number(_) => ValueKind::Number,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Null => return None,
        };
        Some(kind)
    }

    fn name_of(value: &Value) -> &'static str {
        Self::of(value).map_or("null", |kind| kind.as_str())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Function => "function",
            ValueKind::Object => "object",
            ValueKind::Array => "array",
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
        }
    }
}

impl Expectation {
    /// Judge `value`; mismatches are errors carrying what was expected.
    pub fn evaluate(&self, value: &Value) -> Result<ProbeVerdict> {
        match self {
            Expectation::Type { expected } => {
                if ValueKind::of(value) != Some(*expected) {
                    bail!(
                        "expected {} but found {}",
                        expected.as_str(),
                        ValueKind::name_of(value)
                    );
                }
                Ok(ProbeVerdict::Detail(expected.as_str().to_string()))
            }
            Expectation::Equals { value: wanted } => {
                if value != wanted {
                    bail!("expected {wanted} but found {value}");
                }
                Ok(ProbeVerdict::Detail(format!("equals {wanted}")))
            }
            Expectation::NonEmpty => {
                let len = match value {
                    Value::String(text) => text.chars().count(),
                    Value::Array(items) => items.len(),
                    Value::Object(map) => map.len(),
                    other => bail!("{} value has no length", ValueKind::name_of(other)),
                };
                if len == 0 {
                    return Ok(ProbeVerdict::False);
                }
                Ok(ProbeVerdict::Detail(format!("{len} entries")))
            }
            Expectation::Truthy => Ok(ProbeVerdict::from(!matches!(value, Value::Bool(false)))),
        }
    }
}

impl CheckManifest {
    /// Read, validate and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("opening manifest {}", path.display()))?;
        let value: Value = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing manifest {}", path.display()))?;
        Self::from_value(value).with_context(|| format!("loading manifest {}", path.display()))
    }

    /// Validate an already parsed manifest document.
    pub fn from_value(value: Value) -> Result<Self> {
        validate_against_schema(&value)?;
        let manifest: CheckManifest =
            serde_json::from_value(value).context("deserializing check manifest")?;
        if manifest.schema_version != MANIFEST_SCHEMA_VERSION {
            bail!(
                "manifest schema_version '{}' is not supported (expected {})",
                manifest.schema_version,
                MANIFEST_SCHEMA_VERSION
            );
        }
        Ok(manifest)
    }

    /// Register every check in file order; duplicate names follow the
    /// registry's last-write-wins rule.
    pub fn register_into(&self, harness: &mut Harness) {
        let namespace = Arc::clone(harness.namespace());
        for check in &self.checks {
            harness.register(check.definition(&namespace));
        }
        tracing::debug!(
            checks = self.checks.len(),
            registered = harness.registry().len(),
            "registered manifest checks"
        );
    }
}

impl ManifestCheck {
    fn definition(&self, namespace: &Arc<dyn Namespace>) -> CheckDefinition {
        let mut definition = CheckDefinition::new(self.name.clone()).aliases(self.aliases.clone());
        if let Some(category) = &self.category {
            definition = definition.category(category.clone());
        }
        if let Some(expect) = &self.expect {
            definition = definition.with_probe(expectation_probe(
                Arc::clone(namespace),
                self.name.clone(),
                expect.clone(),
            ));
        }
        definition
    }
}

fn expectation_probe(namespace: Arc<dyn Namespace>, name: String, expect: Expectation) -> Probe {
    Probe::new(move || {
        let value = resolve_identifier(namespace.as_ref(), &name)
            .ok_or_else(|| anyhow!("{name} no longer resolves"))?;
        expect.evaluate(&value)
    })
}

fn validate_against_schema(value: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(MANIFEST_SCHEMA).context("parsing bundled manifest schema")?;
    let compiled = JSONSchema::compile(&schema)
        .map_err(|err| anyhow!("compiling bundled manifest schema: {err}"))?;
    if let Err(errors) = compiled.validate(value) {
        let details = errors
            .map(|err| format!("{} at {}", err, err.instance_path))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("check manifest failed schema validation:\n{details}");
    }
    Ok(())
}
