//! JSON-backed namespace loaded from disk or built in tests.

use crate::namespace::Namespace;
use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// String value that stands in for a callable in a JSON namespace.
pub const FUNCTION_MARKER: &str = "<function>";

#[derive(Debug, Clone, Default)]
/// Namespace whose globals are the keys of a JSON object.
pub struct JsonNamespace {
    globals: Map<String, Value>,
}

impl JsonNamespace {
    pub fn new(globals: Map<String, Value>) -> Self {
        Self { globals }
    }

    /// Wrap a JSON value; anything but an object is rejected because a scope
    /// without named entries cannot resolve identifiers.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(globals) => Ok(Self { globals }),
            other => bail!(
                "namespace must be a JSON object, got {}",
                json_type_name(&other)
            ),
        }
    }

    /// Read and parse a namespace file.
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("opening namespace {}", path.display()))?;
        let value: Value = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing namespace {}", path.display()))?;
        Self::from_value(value).with_context(|| format!("loading namespace {}", path.display()))
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.globals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.globals.is_empty()
    }
}

impl Namespace for JsonNamespace {
    fn get(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
