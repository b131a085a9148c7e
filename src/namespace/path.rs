//! Dotted identifier paths such as `crypt.base64.encode`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// A parsed identifier: one or more non-empty segments.
///
/// Parsing never fails loudly; malformed input yields `None` so callers can
/// fold it into the same "capability absent" branch as a lookup miss.
pub struct IdentifierPath(Vec<String>);

impl IdentifierPath {
    /// Split `raw` on `.` after trimming surrounding whitespace.
    ///
    /// Returns `None` for an empty identifier or one with an empty segment
    /// (`a..b`, `.a`, `a.`).
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let segments: Vec<String> = trimmed.split('.').map(str::to_string).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return None;
        }
        Some(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The top-level name looked up directly in the namespace.
    pub fn root(&self) -> &str {
        // parse() guarantees at least one segment
        &self.0[0]
    }

    pub fn is_nested(&self) -> bool {
        self.0.len() > 1
    }
}

impl fmt::Display for IdentifierPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_dotted_identifiers() {
        let plain = IdentifierPath::parse("getgenv").expect("plain identifier");
        assert_eq!(plain.segments(), ["getgenv"]);
        assert!(!plain.is_nested());

        let dotted = IdentifierPath::parse(" crypt.base64.encode ").expect("dotted identifier");
        assert_eq!(dotted.root(), "crypt");
        assert_eq!(dotted.segments().len(), 3);
        assert!(dotted.is_nested());
        assert_eq!(dotted.to_string(), "crypt.base64.encode");
    }

    #[test]
    fn rejects_empty_segments() {
        for raw in ["", "   ", ".", "a..b", ".a", "a."] {
            assert!(
                IdentifierPath::parse(raw).is_none(),
                "{raw:?} should not parse"
            );
        }
    }
}
