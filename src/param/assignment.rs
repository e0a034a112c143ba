//! Parameter assignments ("parameter sets").

use super::value::Value;
use std::collections::BTreeMap;
use std::fmt;

/// One concrete value per declared parameter.
///
/// Equality and hashing are by content: two assignments holding the same
/// `name -> value` pairs are the same key, whatever order they were built
/// in. Assignments are never mutated once built; [`with`](Self::with)
/// returns a new one.
///
/// ```
/// use u_explore::param::{Assignment, Value};
///
/// let a = Assignment::from_pairs([("x", Value::Int(1)), ("y", Value::Bool(true))]);
/// let b = Assignment::from_pairs([("y", Value::Bool(true)), ("x", Value::Int(1))]);
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Assignment {
    values: BTreeMap<String, Value>,
}

/// An ordered group of assignments submitted to the evaluator together.
pub type Batch = Vec<Assignment>;

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an assignment from `(name, value)` pairs. Later duplicates win.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns a copy with `name` set to `value`.
    pub fn with(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut values = self.values.clone();
        values.insert(name.into(), value.into());
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterates `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str("}")
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_with_does_not_mutate() {
        let a = Assignment::from_pairs([("x", 1)]);
        let b = a.with("x", 2);
        assert_eq!(a.get("x"), Some(&Value::Int(1)));
        assert_eq!(b.get("x"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_hash_by_content() {
        let mut set = HashSet::new();
        set.insert(Assignment::from_pairs([("a", 1.5), ("b", 2.0)]));
        assert!(set.contains(&Assignment::from_pairs([("b", 2.0), ("a", 1.5)])));
        assert!(!set.contains(&Assignment::from_pairs([("a", 1.5)])));
    }

    #[test]
    fn test_display() {
        let a = Assignment::from_pairs([("b", Value::Bool(false)), ("a", Value::Int(3))]);
        assert_eq!(a.to_string(), "{a=3, b=false}");
    }
}
