use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

/// Interner for node ids. Only the id strings are shared between trees;
/// every `Tree` keeps its own maps.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// An interned node identifier: 4 bytes, Copy, O(1) Eq and Hash.
///
/// Raw nodes may carry numeric or string ids. Both are canonicalised to a
/// string, so `-1` and `"-1"` name the same node.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Spur);

impl NodeId {
    /// Intern a string as a NodeId, or return the existing one.
    pub fn intern(s: &str) -> Self {
        NodeId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Read an id out of a JSON value. Numbers and strings are accepted.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::intern(s)),
            Value::Number(n) => Some(Self::intern(&n.to_string())),
            _ => None,
        }
    }

    /// Render the id as a JSON value: integers go back out as numbers.
    pub fn to_value(&self) -> Value {
        match self.as_str().parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(self.as_str().to_string()),
        }
    }

    /// Generate a unique id with a prefix (e.g. `docs_copy_3`), used for copies.
    pub fn with_prefix(prefix: &str) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{prefix}_copy_{n}"))
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::intern(s)
    }
}

impl From<i64> for NodeId {
    fn from(n: i64) -> Self {
        Self::intern(&n.to_string())
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        NodeId::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom("node id must be a string or a number"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn interning_roundtrip() {
        let a = NodeId::intern("docs");
        let b = NodeId::intern("docs");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "docs");
    }

    #[test]
    fn numeric_and_string_ids_coincide() {
        let a = NodeId::from_value(&json!(-1)).unwrap();
        let b = NodeId::from_value(&json!("-1")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_value(), json!(-1));
        assert_eq!(NodeId::intern("x1").to_value(), json!("x1"));
    }

    #[test]
    fn non_scalar_ids_are_rejected() {
        assert!(NodeId::from_value(&json!({"a": 1})).is_none());
        assert!(NodeId::from_value(&json!(null)).is_none());
    }

    #[test]
    fn prefixed_ids_are_unique() {
        let a = NodeId::with_prefix("a");
        let b = NodeId::with_prefix("a");
        assert_ne!(a, b);
    }
}
