use serde::{Serialize, Serializer};
use std::fmt;

/// Location of a value inside a tree. Numeric segments index sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path expression. Both `items.0.id` and `items[0].id` are accepted.
    pub fn parse(expr: &str) -> Self {
        let mut segments = Vec::new();

        for part in expr.split('.') {
            let mut rest = part;
            while let Some(open) = rest.find('[') {
                let Some(close) = rest[open..].find(']').map(|c| open + c) else {
                    break;
                };
                if open > 0 {
                    segments.push(rest[..open].to_string());
                }
                let inner = rest[open + 1..close].trim_matches(|c: char| c == '"' || c == '\'');
                if !inner.is_empty() {
                    segments.push(inner.to_string());
                }
                rest = &rest[close + 1..];
            }
            if !rest.is_empty() {
                segments.push(rest.to_string());
            }
        }

        Self { segments }
    }

    pub fn child(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(expr: &str) -> Self {
        Self::parse(expr)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted() {
        let path = FieldPath::parse("data.list");
        assert_eq!(path.segments(), &["data", "list"]);
        assert_eq!(path.to_string(), "data.list");
    }

    #[test]
    fn test_parse_brackets() {
        let path = FieldPath::parse("items[0].owner['id']");
        assert_eq!(path.segments(), &["items", "0", "owner", "id"]);
        assert_eq!(path.to_string(), "items.0.owner.id");
    }

    #[test]
    fn test_parse_empty() {
        assert!(FieldPath::parse("").is_root());
    }

    #[test]
    fn test_child() {
        let path = FieldPath::root().child("a").child("b");
        assert_eq!(path.to_string(), "a.b");
        assert_eq!(path.len(), 2);
    }
}
