//! Parameter declarations and their value domains.

use super::value::{date_to_seconds, seconds_to_date, Point, Value};
use crate::error::{Error, Result};
use jiff::civil::DateTime;
use rand::{Rng, RngExt};
use tracing::warn;

/// Default number of slices used to derive a step when none is declared.
pub const DEFAULT_SLICES: usize = 9;

/// Relative tolerance used when deciding whether a ladder rung reached `max`.
const LADDER_EPSILON: f64 = 1e-9;

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParamKind {
    Int,
    Float,
    Bool,
    Date,
    Point,
    /// Values come exclusively from the `among` list.
    Enumerated,
}

/// Declarative description of one tunable parameter.
///
/// When `among` is present it takes precedence over `min`/`max`/`step`.
/// A missing or non-positive `step` is replaced by a default derived from
/// the range and the slice count, so value ladders always terminate.
///
/// ```
/// use u_explore::param::{ParameterSpec, Value};
///
/// let spec = ParameterSpec::int("agents", 0, 10).with_step(5);
/// assert_eq!(spec.values(9), vec![Value::Int(0), Value::Int(5), Value::Int(10)]);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParamKind,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub step: Option<Value>,
    pub among: Option<Vec<Value>>,
}

/// Resolved numeric view of a spec, with bounds ordered.
enum Domain<'a> {
    Among(&'a [Value]),
    Bool,
    Int { lo: i64, hi: i64 },
    Float { lo: f64, hi: f64 },
    Date { lo: f64, hi: f64 },
    Point { lo: Point, hi: Point },
}

impl ParameterSpec {
    fn bare(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            min: None,
            max: None,
            step: None,
            among: None,
        }
    }

    pub fn int(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            min: Some(Value::Int(min)),
            max: Some(Value::Int(max)),
            ..Self::bare(name, ParamKind::Int)
        }
    }

    pub fn float(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            min: Some(Value::Float(min)),
            max: Some(Value::Float(max)),
            ..Self::bare(name, ParamKind::Float)
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::bare(name, ParamKind::Bool)
    }

    pub fn date(name: impl Into<String>, min: DateTime, max: DateTime) -> Self {
        Self {
            min: Some(Value::Date(min)),
            max: Some(Value::Date(max)),
            ..Self::bare(name, ParamKind::Date)
        }
    }

    pub fn point(name: impl Into<String>, min: Point, max: Point) -> Self {
        Self {
            min: Some(Value::Point(min)),
            max: Some(Value::Point(max)),
            ..Self::bare(name, ParamKind::Point)
        }
    }

    /// A parameter restricted to an explicit list of values.
    pub fn enumerated<V: Into<Value>>(name: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            among: Some(values.into_iter().map(Into::into).collect()),
            ..Self::bare(name, ParamKind::Enumerated)
        }
    }

    /// Sets the step. Dates step in seconds; points accept a scalar or a
    /// per-component point.
    pub fn with_step(mut self, step: impl Into<Value>) -> Self {
        self.step = Some(step.into());
        self
    }

    /// Restricts the parameter to an explicit value list, keeping its kind.
    pub fn with_among<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.among = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// A parameter with an empty `among` list has no value to offer.
    pub fn is_degenerate(&self) -> bool {
        matches!(&self.among, Some(v) if v.is_empty())
    }

    /// Checks that the declaration is usable.
    ///
    /// Missing bounds on a ranged kind are fatal. Inverted bounds, bad
    /// steps and empty `among` lists only log a warning: they are
    /// normalised when values are generated.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::config("parameter name must not be empty"));
        }
        if self.is_degenerate() {
            warn!(param = %self.name, "empty among list, parameter skipped");
            return Ok(());
        }
        if self.step.is_some() && self.explicit_step().is_none() && self.explicit_point_step().is_none() {
            warn!(param = %self.name, "non-positive step replaced by the default");
        }
        if let (Some(lo), Some(hi)) = (
            self.min.as_ref().and_then(Value::as_f64),
            self.max.as_ref().and_then(Value::as_f64),
        ) {
            if lo > hi {
                warn!(param = %self.name, min = lo, max = hi, "min greater than max, bounds swapped");
            }
        }
        if self.among.is_some() || self.kind == ParamKind::Bool {
            return Ok(());
        }
        if self.kind == ParamKind::Enumerated {
            return Err(Error::config(format!(
                "enumerated parameter '{}' needs an among list",
                self.name
            )));
        }
        let (Some(min), Some(max)) = (&self.min, &self.max) else {
            return Err(Error::config(format!(
                "parameter '{}' needs both min and max",
                self.name
            )));
        };
        let ok = match self.kind {
            ParamKind::Int | ParamKind::Float => min.as_f64().is_some() && max.as_f64().is_some(),
            ParamKind::Date => min.as_date().is_some() && max.as_date().is_some(),
            ParamKind::Point => min.as_point().is_some() && max.as_point().is_some(),
            ParamKind::Bool | ParamKind::Enumerated => true,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::config(format!(
                "bounds of parameter '{}' do not match its kind {:?}",
                self.name, self.kind
            )))
        }
    }

    fn domain(&self) -> Domain<'_> {
        if let Some(among) = &self.among {
            return Domain::Among(among);
        }
        let num = |v: &Option<Value>| v.as_ref().and_then(Value::as_f64).unwrap_or(0.0);
        match self.kind {
            ParamKind::Bool => Domain::Bool,
            ParamKind::Int => {
                let (lo, hi) = ordered(num(&self.min), num(&self.max));
                Domain::Int {
                    lo: lo.round() as i64,
                    hi: hi.round() as i64,
                }
            }
            ParamKind::Float => {
                let (lo, hi) = ordered(num(&self.min), num(&self.max));
                Domain::Float { lo, hi }
            }
            ParamKind::Date => {
                let (lo, hi) = ordered(num(&self.min), num(&self.max));
                Domain::Date { lo, hi }
            }
            ParamKind::Point => {
                let pt = |v: &Option<Value>| v.as_ref().and_then(Value::as_point).unwrap_or_default();
                let (a, b) = (pt(&self.min), pt(&self.max));
                let lo = Point::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z));
                let hi = Point::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z));
                Domain::Point { lo, hi }
            }
            // validate() rejects this; treat as empty.
            ParamKind::Enumerated => Domain::Among(&[]),
        }
    }

    fn explicit_step(&self) -> Option<f64> {
        self.step
            .as_ref()
            .and_then(Value::as_f64)
            .filter(|s| s.is_finite() && *s > 0.0)
    }

    fn explicit_point_step(&self) -> Option<Point> {
        let p = self.step.as_ref().and_then(Value::as_point)?;
        let c = p.components();
        if c.iter().all(|s| s.is_finite()) && c.iter().any(|s| *s > 0.0) {
            Some(p)
        } else {
            None
        }
    }

    fn default_step(range: f64, slices: usize) -> f64 {
        range / (slices.max(2) - 1) as f64
    }

    fn scalar_step(&self, lo: f64, hi: f64, slices: usize) -> f64 {
        self.explicit_step()
            .unwrap_or_else(|| Self::default_step(hi - lo, slices))
    }

    fn point_step(&self, lo: Point, hi: Point, slices: usize) -> Point {
        let fallback = Point::from_components(
            [hi.x - lo.x, hi.y - lo.y, hi.z - lo.z].map(|r| Self::default_step(r, slices)),
        );
        match self.explicit_point_step() {
            Some(step) => {
                // Components that cannot advance fall back to the default.
                let s = step.components();
                let f = fallback.components();
                Point::from_components([0, 1, 2].map(|i| if s[i] > 0.0 { s[i] } else { f[i] }))
            }
            None => fallback,
        }
    }

    /// The ordered list of values explored for this parameter.
    ///
    /// `among` wins when present. Otherwise the ladder starts at `min` and
    /// advances by `step` (or `(max - min) / (slices - 1)`) while the value
    /// stays within `max`. A degenerate parameter yields an empty list.
    pub fn values(&self, slices: usize) -> Vec<Value> {
        match self.domain() {
            Domain::Among(v) => v.to_vec(),
            Domain::Bool => vec![Value::Bool(false), Value::Bool(true)],
            Domain::Int { lo, hi } => {
                let range = (hi - lo) as f64;
                let step = self.scalar_step(lo as f64, hi as f64, slices).max(1.0);
                let n = (range / step + LADDER_EPSILON).floor() as i64;
                let mut out: Vec<Value> = Vec::with_capacity(n as usize + 1);
                for i in 0..=n {
                    let v = Value::Int(lo + (step * i as f64) as i64);
                    if out.last() != Some(&v) {
                        out.push(v);
                    }
                }
                out
            }
            Domain::Float { lo, hi } => float_ladder(lo, hi, self.scalar_step(lo, hi, slices))
                .into_iter()
                .map(Value::Float)
                .collect(),
            Domain::Date { lo, hi } => {
                let step = self.scalar_step(lo, hi, slices).round().max(1.0);
                let mut out: Vec<Value> = Vec::new();
                for s in float_ladder(lo, hi, step) {
                    let v = Value::Date(seconds_to_date(s));
                    if out.last() != Some(&v) {
                        out.push(v);
                    }
                }
                out
            }
            Domain::Point { lo, hi } => {
                let inc = self.point_step(lo, hi, slices).components();
                let (l, h) = (lo.components(), hi.components());
                let n = (0..3)
                    .filter(|&i| inc[i] > 0.0)
                    .map(|i| ((h[i] - l[i]) / inc[i] + LADDER_EPSILON).floor() as usize)
                    .min()
                    .unwrap_or(0);
                (0..=n)
                    .map(|k| {
                        Value::Point(Point::from_components([0, 1, 2].map(|i| {
                            if inc[i] > 0.0 {
                                (l[i] + inc[i] * k as f64).min(h[i])
                            } else {
                                l[i]
                            }
                        })))
                    })
                    .collect()
            }
        }
    }

    /// Number of values an exhaustive exploration visits for this parameter.
    pub fn dimension(&self, slices: usize) -> usize {
        self.values(slices).len()
    }

    /// Maps a unit-interval coordinate into the domain.
    ///
    /// Integers and `among` lists are split into equal-width bins; floats,
    /// dates and points are scaled linearly (points use `u` on every axis).
    pub fn from_unit(&self, u: f64) -> Value {
        let u = if u.is_finite() { u.clamp(0.0, 1.0) } else { 0.0 };
        match self.domain() {
            Domain::Among(v) => {
                if v.is_empty() {
                    return Value::Text(String::new());
                }
                let idx = ((u * v.len() as f64).floor() as usize).min(v.len() - 1);
                v[idx].clone()
            }
            Domain::Bool => Value::Bool(u >= 0.5),
            Domain::Int { lo, hi } => {
                let width = (hi - lo + 1) as f64;
                Value::Int((lo + (u * width).floor() as i64).min(hi))
            }
            Domain::Float { lo, hi } => Value::Float(lo + u * (hi - lo)),
            Domain::Date { lo, hi } => Value::Date(seconds_to_date(lo + u * (hi - lo))),
            Domain::Point { lo, hi } => Value::Point(Point::new(
                lo.x + u * (hi.x - lo.x),
                lo.y + u * (hi.y - lo.y),
                lo.z + u * (hi.z - lo.z),
            )),
        }
    }

    /// Inverse of [`from_unit`](Self::from_unit), up to binning.
    ///
    /// Returns `None` when the value does not belong to the domain's type
    /// or the range is empty.
    pub fn to_unit(&self, value: &Value) -> Option<f64> {
        let scale = |v: f64, lo: f64, hi: f64| {
            if hi > lo {
                Some(((v - lo) / (hi - lo)).clamp(0.0, 1.0))
            } else {
                None
            }
        };
        match self.domain() {
            Domain::Among(v) => {
                let idx = v.iter().position(|x| x == value)?;
                if v.len() < 2 {
                    return None;
                }
                Some(idx as f64 / (v.len() - 1) as f64)
            }
            Domain::Bool => value.as_f64(),
            Domain::Int { lo, hi } => scale(value.as_f64()?, lo as f64, hi as f64),
            Domain::Float { lo, hi } | Domain::Date { lo, hi } => scale(value.as_f64()?, lo, hi),
            Domain::Point { lo, hi } => {
                let p = value.as_point()?;
                scale(p.x, lo.x, hi.x)
                    .or_else(|| scale(p.y, lo.y, hi.y))
                    .or_else(|| scale(p.z, lo.z, hi.z))
            }
        }
    }

    /// Draws a random value, used for chromosome genes.
    ///
    /// Parameters with a declared step (or an `among` list) draw from their
    /// ladder; unstepped ranges draw uniformly. Returns `None` for a
    /// degenerate parameter.
    pub fn random_value<R: Rng>(&self, rng: &mut R, slices: usize) -> Option<Value> {
        let stepped = self.step.is_some();
        match self.domain() {
            Domain::Among(v) => {
                if v.is_empty() {
                    None
                } else {
                    Some(v[rng.random_range(0..v.len())].clone())
                }
            }
            Domain::Bool => Some(Value::Bool(rng.random_bool(0.5))),
            _ if stepped => {
                let ladder = self.values(slices);
                if ladder.is_empty() {
                    None
                } else {
                    Some(ladder[rng.random_range(0..ladder.len())].clone())
                }
            }
            Domain::Int { lo, hi } => Some(Value::Int(rng.random_range(lo..=hi))),
            Domain::Float { lo, hi } => Some(Value::Float(lo + rng.random::<f64>() * (hi - lo))),
            Domain::Date { lo, hi } => Some(Value::Date(seconds_to_date(
                lo + rng.random::<f64>() * (hi - lo),
            ))),
            Domain::Point { lo, hi } => {
                let x = lo.x + rng.random::<f64>() * (hi.x - lo.x);
                let y = lo.y + rng.random::<f64>() * (hi.y - lo.y);
                let z = lo.z + rng.random::<f64>() * (hi.z - lo.z);
                Some(Value::Point(Point::new(x, y, z)))
            }
        }
    }

    /// Values one step away from `value`, staying inside the domain.
    ///
    /// Lower neighbour first, then upper. Integers without a declared step
    /// move by one.
    pub fn neighbors(&self, value: &Value, slices: usize) -> Vec<Value> {
        match self.domain() {
            Domain::Among(v) => match v.iter().position(|x| x == value) {
                Some(idx) => {
                    let mut out = Vec::with_capacity(2);
                    if idx > 0 {
                        out.push(v[idx - 1].clone());
                    }
                    if idx + 1 < v.len() {
                        out.push(v[idx + 1].clone());
                    }
                    out
                }
                None => Vec::new(),
            },
            Domain::Bool => match value {
                Value::Bool(b) => vec![Value::Bool(!b)],
                _ => Vec::new(),
            },
            Domain::Int { lo, hi } => {
                let Some(x) = value.as_f64() else {
                    return Vec::new();
                };
                let x = x.round() as i64;
                let step = self.explicit_step().map_or(1, |s| (s.round() as i64).max(1));
                [x - step, x + step]
                    .into_iter()
                    .filter(|v| *v >= lo && *v <= hi)
                    .map(Value::Int)
                    .collect()
            }
            Domain::Float { lo, hi } => {
                let Some(x) = value.as_f64() else {
                    return Vec::new();
                };
                let step = self.scalar_step(lo, hi, slices);
                if step <= 0.0 {
                    return Vec::new();
                }
                let tol = step * LADDER_EPSILON;
                [x - step, x + step]
                    .into_iter()
                    .filter(|v| *v >= lo - tol && *v <= hi + tol)
                    .map(|v| Value::Float(v.clamp(lo, hi)))
                    .collect()
            }
            Domain::Date { lo, hi } => {
                let Some(d) = value.as_date() else {
                    return Vec::new();
                };
                let x = date_to_seconds(d);
                let step = self.scalar_step(lo, hi, slices).round().max(1.0);
                [x - step, x + step]
                    .into_iter()
                    .filter(|v| *v >= lo && *v <= hi)
                    .map(|v| Value::Date(seconds_to_date(v)))
                    .collect()
            }
            Domain::Point { lo, hi } => {
                let Some(p) = value.as_point() else {
                    return Vec::new();
                };
                let inc = self.point_step(lo, hi, slices).components();
                let (l, h, c) = (lo.components(), hi.components(), p.components());
                let mut out = Vec::new();
                for axis in 0..3 {
                    if inc[axis] <= 0.0 {
                        continue;
                    }
                    for delta in [-inc[axis], inc[axis]] {
                        let v = c[axis] + delta;
                        if v >= l[axis] && v <= h[axis] {
                            let mut moved = c;
                            moved[axis] = v;
                            out.push(Value::Point(Point::from_components(moved)));
                        }
                    }
                }
                out
            }
        }
    }

    /// Parses a raw field into this parameter's kind.
    ///
    /// A field matching the display form of an `among` entry resolves to
    /// that entry.
    pub fn coerce(&self, raw: &str) -> std::result::Result<Value, String> {
        let raw = raw.trim();
        if let Some(among) = &self.among {
            if let Some(v) = among.iter().find(|v| v.to_string() == raw) {
                return Ok(v.clone());
            }
        }
        match self.kind {
            ParamKind::Int => raw
                .parse::<i64>()
                .ok()
                .or_else(|| {
                    raw.parse::<f64>()
                        .ok()
                        .filter(|f| f.fract() == 0.0)
                        .map(|f| f as i64)
                })
                .map(Value::Int)
                .ok_or_else(|| format!("'{raw}' is not an int")),
            ParamKind::Float => raw
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format!("'{raw}' is not a float")),
            ParamKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(format!("'{raw}' is not a bool")),
            },
            ParamKind::Date => raw
                .parse::<DateTime>()
                .or_else(|_| raw.parse::<jiff::civil::Date>().map(|d| d.at(0, 0, 0, 0)))
                .map(Value::Date)
                .map_err(|_| format!("'{raw}' is not a date")),
            ParamKind::Point => parse_point(raw)
                .map(Value::Point)
                .ok_or_else(|| format!("'{raw}' is not a point")),
            ParamKind::Enumerated => Ok(Value::Text(raw.to_string())),
        }
    }

    /// Converts an already typed value into this parameter's kind.
    pub fn coerce_value(&self, value: Value) -> std::result::Result<Value, String> {
        match (self.kind, value) {
            (ParamKind::Enumerated, v) => Ok(v),
            (_, Value::Text(s)) => self.coerce(&s),
            (ParamKind::Int, Value::Int(v)) => Ok(Value::Int(v)),
            (ParamKind::Int, Value::Float(f)) if f.fract() == 0.0 => Ok(Value::Int(f as i64)),
            (ParamKind::Float, Value::Float(f)) => Ok(Value::Float(f)),
            (ParamKind::Float, Value::Int(v)) => Ok(Value::Float(v as f64)),
            (ParamKind::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
            (ParamKind::Date, Value::Date(d)) => Ok(Value::Date(d)),
            (ParamKind::Point, v) => v
                .as_point()
                .map(Value::Point)
                .ok_or_else(|| format!("{} value cannot become a point", v.type_name())),
            (kind, v) => Err(format!(
                "{} value {v} does not fit parameter kind {kind:?}",
                v.type_name()
            )),
        }
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

fn float_ladder(lo: f64, hi: f64, step: f64) -> Vec<f64> {
    let range = hi - lo;
    if range <= 0.0 || !(step > 0.0) || !step.is_finite() {
        return vec![lo];
    }
    let n = (range / step + LADDER_EPSILON).floor() as usize;
    (0..=n).map(|i| (lo + step * i as f64).min(hi)).collect()
}

fn parse_point(raw: &str) -> Option<Point> {
    let inner = raw.trim().trim_start_matches('{').trim_end_matches('}');
    let parts: Vec<f64> = inner
        .split([',', ';'])
        .map(|s| s.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [x, y] => Some(Point::new(*x, *y, 0.0)),
        [x, y, z] => Some(Point::new(*x, *y, *z)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    #[test]
    fn test_float_ladder_default_step() {
        let spec = ParameterSpec::float("rate", 0.0, 1.0);
        let values = spec.values(DEFAULT_SLICES);
        assert_eq!(values.len(), 9);
        assert_eq!(values[0], Value::Float(0.0));
        assert_eq!(values[8], Value::Float(1.0));
    }

    #[test]
    fn test_int_ladder_step_overshoot() {
        // 0, 3; 6 would pass max
        let spec = ParameterSpec::int("n", 0, 4).with_step(3);
        assert_eq!(spec.values(9), vec![Value::Int(0), Value::Int(3)]);
    }

    #[test]
    fn test_int_ladder_small_range_uses_unit_step() {
        let spec = ParameterSpec::int("n", 1, 3);
        assert_eq!(
            spec.values(9),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn test_zero_step_terminates() {
        let spec = ParameterSpec::float("x", 0.0, 2.0).with_step(0.0);
        assert_eq!(spec.values(5).len(), 5);
        let spec = ParameterSpec::float("x", 0.0, 2.0).with_step(-1.0);
        assert_eq!(spec.values(5).len(), 5);
    }

    #[test]
    fn test_empty_range() {
        let spec = ParameterSpec::float("x", 1.0, 1.0);
        assert_eq!(spec.values(9), vec![Value::Float(1.0)]);
    }

    #[test]
    fn test_inverted_bounds_are_swapped() {
        let spec = ParameterSpec::int("n", 3, 1);
        assert_eq!(spec.values(9).len(), 3);
    }

    #[test]
    fn test_among_takes_precedence() {
        let spec = ParameterSpec::int("n", 0, 100).with_among([7, 9]);
        assert_eq!(spec.values(9), vec![Value::Int(7), Value::Int(9)]);
    }

    #[test]
    fn test_degenerate_among() {
        let spec = ParameterSpec::enumerated::<Value>("e", vec![]);
        assert!(spec.is_degenerate());
        assert!(spec.values(9).is_empty());
        let mut rng = create_rng(1);
        assert!(spec.random_value(&mut rng, 9).is_none());
    }

    #[test]
    fn test_date_ladder() {
        let start = jiff::civil::datetime(2024, 1, 1, 0, 0, 0, 0);
        let end = jiff::civil::datetime(2024, 1, 1, 0, 0, 10, 0);
        let spec = ParameterSpec::date("start", start, end).with_step(5);
        let values = spec.values(9);
        assert_eq!(values.len(), 3);
        assert_eq!(values[2], Value::Date(end));
    }

    #[test]
    fn test_point_ladder() {
        let spec = ParameterSpec::point("loc", Point::new(0.0, 0.0, 0.0), Point::new(2.0, 4.0, 0.0))
            .with_step(Point::new(1.0, 2.0, 0.0));
        let values = spec.values(9);
        assert_eq!(values.len(), 3);
        assert_eq!(values[1], Value::Point(Point::new(1.0, 2.0, 0.0)));
    }

    #[test]
    fn test_from_unit_int_bins() {
        let spec = ParameterSpec::int("n", 0, 3);
        assert_eq!(spec.from_unit(0.0), Value::Int(0));
        assert_eq!(spec.from_unit(0.3), Value::Int(1));
        assert_eq!(spec.from_unit(1.0), Value::Int(3));
    }

    #[test]
    fn test_unit_round_trip_float() {
        let spec = ParameterSpec::float("x", -2.0, 2.0);
        let v = spec.from_unit(0.25);
        assert_eq!(v, Value::Float(-1.0));
        assert!((spec.to_unit(&v).unwrap_or(f64::NAN) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_neighbors_at_bounds() {
        let spec = ParameterSpec::int("n", 0, 5);
        assert_eq!(spec.neighbors(&Value::Int(0), 9), vec![Value::Int(1)]);
        assert_eq!(
            spec.neighbors(&Value::Int(3), 9),
            vec![Value::Int(2), Value::Int(4)]
        );
        let e = ParameterSpec::enumerated("e", ["a", "b", "c"]);
        assert_eq!(e.neighbors(&Value::from("c"), 9), vec![Value::from("b")]);
        assert_eq!(
            ParameterSpec::boolean("b").neighbors(&Value::Bool(true), 9),
            vec![Value::Bool(false)]
        );
    }

    #[test]
    fn test_random_value_respects_step() {
        let spec = ParameterSpec::float("x", 0.0, 1.0).with_step(0.25);
        let mut rng = create_rng(5);
        for _ in 0..50 {
            let v = spec.random_value(&mut rng, 9).and_then(|v| v.as_f64()).unwrap_or(f64::NAN);
            assert!((v * 4.0 - (v * 4.0).round()).abs() < 1e-12, "{v} not on ladder");
        }
    }

    #[test]
    fn test_coerce() {
        assert_eq!(ParameterSpec::int("n", 0, 9).coerce(" 4 "), Ok(Value::Int(4)));
        assert_eq!(ParameterSpec::int("n", 0, 9).coerce("4.0"), Ok(Value::Int(4)));
        assert!(ParameterSpec::int("n", 0, 9).coerce("4.5").is_err());
        assert_eq!(ParameterSpec::boolean("b").coerce("TRUE"), Ok(Value::Bool(true)));
        assert_eq!(
            ParameterSpec::point("p", Point::default(), Point::new(1.0, 1.0, 1.0)).coerce("{1,0.5}"),
            Ok(Value::Point(Point::new(1.0, 0.5, 0.0)))
        );
        let e = ParameterSpec::enumerated("e", [Value::Int(2), Value::from("x")]);
        assert_eq!(e.coerce("2"), Ok(Value::Int(2)));
        assert_eq!(e.coerce("y"), Ok(Value::from("y")));
    }

    #[test]
    fn test_validate() {
        assert!(ParameterSpec::float("x", 0.0, 1.0).validate().is_ok());
        assert!(ParameterSpec::boolean("b").validate().is_ok());
        let mut broken = ParameterSpec::float("x", 0.0, 1.0);
        broken.max = None;
        assert!(broken.validate().is_err());
        let mut enumerated = ParameterSpec::enumerated("e", ["a"]);
        enumerated.among = None;
        assert!(enumerated.validate().is_err());
    }
}
