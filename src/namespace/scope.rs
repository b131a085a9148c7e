//! The namespace seam and the single lookup routine every check shares.

use crate::namespace::IdentifierPath;
use crate::probe::panic_message;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};

/// Read-only capability scope injected into the harness.
///
/// Implementations only answer top-level names; [`resolve_identifier`] owns
/// the traversal so every namespace gets the same "absent instead of error"
/// behavior for nested paths.
pub trait Namespace: Send + Sync {
    /// Look up a top-level entry by name.
    fn get(&self, name: &str) -> Option<&Value>;
}

/// Resolve a possibly dotted identifier against `namespace`.
///
/// Returns `None` when the identifier is malformed, a segment is missing, an
/// intermediate value cannot be indexed, the final value is JSON `null`, or
/// the namespace implementation panics. Never propagates a failure.
pub fn resolve_identifier(namespace: &dyn Namespace, raw: &str) -> Option<Value> {
    let path = IdentifierPath::parse(raw)?;
    match panic::catch_unwind(AssertUnwindSafe(|| lookup(namespace, &path))) {
        Ok(found) => found,
        Err(payload) => {
            tracing::warn!(
                identifier = %path,
                panic = %panic_message(payload.as_ref()),
                "namespace lookup panicked; treating identifier as absent"
            );
            None
        }
    }
}

fn lookup(namespace: &dyn Namespace, path: &IdentifierPath) -> Option<Value> {
    let (_, rest) = path.segments().split_first()?;
    let mut current = namespace.get(path.root())?;
    for segment in rest {
        current = index(current, segment)?;
    }
    if current.is_null() {
        return None;
    }
    Some(current.clone())
}

fn index<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|idx| items.get(idx)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::JsonNamespace;
    use serde_json::json;

    fn sample() -> JsonNamespace {
        JsonNamespace::from_value(json!({
            "getgenv": "<function>",
            "crypt": {"base64": {"encode": "<function>"}, "hash": null},
            "drawing": {"fonts": ["UI", "System"]},
            "version": 3
        }))
        .expect("object namespace")
    }

    #[test]
    fn resolves_top_level_and_nested_identifiers() {
        let ns = sample();
        assert_eq!(resolve_identifier(&ns, "getgenv"), Some(json!("<function>")));
        assert_eq!(
            resolve_identifier(&ns, "crypt.base64.encode"),
            Some(json!("<function>"))
        );
        assert_eq!(resolve_identifier(&ns, "drawing.fonts.1"), Some(json!("System")));
        assert!(resolve_identifier(&ns, "crypt.base64").is_some());
    }

    #[test]
    fn misses_are_absent_rather_than_errors() {
        let ns = sample();
        assert_eq!(resolve_identifier(&ns, "missing"), None);
        assert_eq!(resolve_identifier(&ns, "crypt.missing.encode"), None);
        // scalars cannot be indexed
        assert_eq!(resolve_identifier(&ns, "version.major"), None);
        assert_eq!(resolve_identifier(&ns, "getgenv.inner"), None);
        assert_eq!(resolve_identifier(&ns, "drawing.fonts.7"), None);
        assert_eq!(resolve_identifier(&ns, "drawing.fonts.first"), None);
        // explicit null behaves like an unset global
        assert_eq!(resolve_identifier(&ns, "crypt.hash"), None);
        assert_eq!(resolve_identifier(&ns, "crypt..encode"), None);
        assert_eq!(resolve_identifier(&ns, ""), None);
    }

    struct PanickingNamespace;

    impl Namespace for PanickingNamespace {
        fn get(&self, name: &str) -> Option<&Value> {
            panic!("lookup of {name} exploded");
        }
    }

    #[test]
    fn panicking_namespace_resolves_to_absent() {
        assert_eq!(resolve_identifier(&PanickingNamespace, "anything"), None);
        assert_eq!(resolve_identifier(&PanickingNamespace, "a.b.c"), None);
    }
}
