//! Concrete parameter values.

use jiff::civil::DateTime;
use jiff::SignedDuration;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Reference instant for converting dates to seconds.
pub(crate) const EPOCH: DateTime = jiff::civil::datetime(1970, 1, 1, 0, 0, 0, 0);

/// A 3D point value.
///
/// Equality and hashing use the bit patterns of the coordinates, with
/// `-0.0` folded into `0.0`, so points can be part of a deduplication key.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Component-wise `self <= other`.
    pub fn le_all(&self, other: &Point) -> bool {
        self.x <= other.x && self.y <= other.y && self.z <= other.z
    }

    pub(crate) fn components(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub(crate) fn from_components(c: [f64; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        float_key(self.x) == float_key(other.x)
            && float_key(self.y) == float_key(other.y)
            && float_key(self.z) == float_key(other.z)
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        float_key(self.x).hash(state);
        float_key(self.y).hash(state);
        float_key(self.z).hash(state);
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{},{},{}}}", self.x, self.y, self.z)
    }
}

/// A concrete, typed parameter value.
///
/// `Value` is `Eq + Hash` so that [`Assignment`](super::Assignment)s built
/// from it can key the fitness cache. Floats are compared by bit pattern
/// (`-0.0 == 0.0`, and a NaN equals itself).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(DateTime),
    Point(Point),
    /// Free-form value; only produced for enumerated parameters.
    Text(String),
}

fn float_key(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => float_key(*a) == float_key(*b),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Point(a), Value::Point(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Int(v) => v.hash(state),
            Value::Float(v) => float_key(*v).hash(state),
            Value::Bool(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
            Value::Point(v) => v.hash(state),
            Value::Text(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{v}"),
            Value::Point(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl Value {
    /// Numeric view of the value.
    ///
    /// Booleans map to `0.0`/`1.0` and dates to seconds since 1970-01-01.
    /// Points and text have no scalar view.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::Date(d) => Some(date_to_seconds(*d)),
            Value::Point(_) => None,
            Value::Text(s) => match s.as_str() {
                "true" => Some(1.0),
                "false" => Some(0.0),
                other => other.trim().parse().ok(),
            },
        }
    }

    pub fn as_point(&self) -> Option<Point> {
        match self {
            Value::Point(p) => Some(*p),
            Value::Int(v) => Some(Point::new(*v as f64, *v as f64, *v as f64)),
            Value::Float(v) => Some(Point::new(*v, *v, *v)),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Date(_) => "date",
            Value::Point(_) => "point",
            Value::Text(_) => "text",
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime> for Value {
    fn from(v: DateTime) -> Self {
        Value::Date(v)
    }
}

impl From<Point> for Value {
    fn from(v: Point) -> Self {
        Value::Point(v)
    }
}

pub(crate) fn date_to_seconds(d: DateTime) -> f64 {
    d.duration_since(EPOCH).as_secs() as f64
}

pub(crate) fn seconds_to_date(secs: f64) -> DateTime {
    EPOCH.saturating_add(SignedDuration::from_secs(secs.round() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_negative_zero_equals_zero() {
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
        let mut set = HashSet::new();
        set.insert(Value::Float(-0.0));
        assert!(set.contains(&Value::Float(0.0)));
    }

    #[test]
    fn test_variants_do_not_cross_compare() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Bool(true), Value::Int(1));
    }

    #[test]
    fn test_as_f64() {
        assert_eq!(Value::Bool(true).as_f64(), Some(1.0));
        assert_eq!(Value::Int(-3).as_f64(), Some(-3.0));
        assert_eq!(Value::Text("2.5".into()).as_f64(), Some(2.5));
        assert_eq!(Value::Point(Point::default()).as_f64(), None);
    }

    #[test]
    fn test_date_seconds_round_trip() {
        let d = jiff::civil::datetime(2024, 3, 1, 12, 30, 15, 0);
        assert_eq!(seconds_to_date(date_to_seconds(d)), d);
    }

    #[test]
    fn test_point_display() {
        assert_eq!(Point::new(1.0, 2.5, 0.0).to_string(), "{1,2.5,0}");
    }
}
