use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ---------------------------------------------------------------------------
// MetadataValue – a single cell (or row label) of the metadata table
// ---------------------------------------------------------------------------

/// A dynamically-typed metadata value mirroring common dataframe dtypes.
/// Row labels use the same type and are searched in order, so
/// `MetadataValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date string kept as text for simplicity.
    Date(String),
    Null,
}

// -- Manual Eq/Ord so we can put MetadataValue in BTreeSet --

impl Eq for MetadataValue {}

impl PartialOrd for MetadataValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetadataValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use MetadataValue::*;
        fn discriminant(v: &MetadataValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                // Integers and floats share a rank so mixed numeric labels sort by value.
                Integer(_) | Float(_) => 2,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Integer(a), Float(b)) => (*a as f64).total_cmp(b).then(std::cmp::Ordering::Less),
            (Float(a), Integer(b)) => a.total_cmp(&(*b as f64)).then(std::cmp::Ordering::Greater),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for MetadataValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            MetadataValue::String(s) | MetadataValue::Date(s) => s.hash(state),
            MetadataValue::Integer(i) => i.hash(state),
            MetadataValue::Float(f) => f.to_bits().hash(state),
            MetadataValue::Bool(b) => b.hash(state),
            MetadataValue::Null => {}
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v:.4}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Date(d) => write!(f, "{d}"),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

impl MetadataValue {
    /// Try to interpret the value as an `f64` (used for wavelength labels).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Integer view, accepting floats that carry no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Integer(i) => Some(*i),
            MetadataValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    /// Form used to match labels: a float with no fractional part becomes the
    /// equal integer, so `5.0` finds the row labeled `5` and vice versa.
    pub(crate) fn label_key(&self) -> MetadataValue {
        match (self, self.as_i64()) {
            (MetadataValue::Float(_), Some(i)) => MetadataValue::Integer(i),
            _ => self.clone(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) | MetadataValue::Date(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MetadataValue::Null)
    }

    /// Guess a typed value from free text: empty → Null, then integer,
    /// float, boolean, falling back to a string.
    pub fn infer(s: &str) -> Self {
        if s.is_empty() {
            return MetadataValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return MetadataValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return MetadataValue::Float(f);
        }
        if s == "true" || s == "false" {
            return MetadataValue::Bool(s == "true");
        }
        MetadataValue::String(s.to_string())
    }
}

// -- Conversions --

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Integer(v)
    }
}

impl From<i32> for MetadataValue {
    fn from(v: i32) -> Self {
        MetadataValue::Integer(v as i64)
    }
}

impl From<usize> for MetadataValue {
    fn from(v: usize) -> Self {
        MetadataValue::Integer(v as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Bool(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::String(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::String(v)
    }
}

impl From<&JsonValue> for MetadataValue {
    fn from(val: &JsonValue) -> Self {
        match val {
            JsonValue::String(s) => MetadataValue::String(s.clone()),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    MetadataValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    MetadataValue::Float(f)
                } else {
                    MetadataValue::String(n.to_string())
                }
            }
            JsonValue::Bool(b) => MetadataValue::Bool(*b),
            JsonValue::Null => MetadataValue::Null,
            other => MetadataValue::String(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Spectrum – one row-oriented record
// ---------------------------------------------------------------------------

/// A single spectrum as exchanged with loaders and plotting code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    /// Wavelength axis (x).
    pub x: Vec<f64>,
    /// Intensity axis (y) – same length as `x`.
    pub y: Vec<f64>,
    /// Dynamic metadata columns: column_name → value.
    pub metadata: BTreeMap<String, MetadataValue>,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_infer_types() {
        assert_eq!(MetadataValue::infer(""), MetadataValue::Null);
        assert_eq!(MetadataValue::infer("42"), MetadataValue::Integer(42));
        assert_eq!(MetadataValue::infer("1.5"), MetadataValue::Float(1.5));
        assert_eq!(MetadataValue::infer("true"), MetadataValue::Bool(true));
        assert_eq!(MetadataValue::infer("A"), MetadataValue::from("A"));
    }

    #[test]
    fn test_json_conversion() {
        assert_eq!(MetadataValue::from(&json!(3)), MetadataValue::Integer(3));
        assert_eq!(MetadataValue::from(&json!(0.25)), MetadataValue::Float(0.25));
        assert_eq!(MetadataValue::from(&json!(null)), MetadataValue::Null);
        assert_eq!(
            MetadataValue::from(&json!([1, 2])),
            MetadataValue::String("[1,2]".to_string())
        );
    }

    #[test]
    fn test_mixed_numeric_order() {
        let set: BTreeSet<MetadataValue> = [
            MetadataValue::Float(2.5),
            MetadataValue::Integer(3),
            MetadataValue::Integer(1),
            MetadataValue::Null,
        ]
        .into_iter()
        .collect();
        let ordered: Vec<_> = set.into_iter().collect();
        assert_eq!(
            ordered,
            vec![
                MetadataValue::Null,
                MetadataValue::Integer(1),
                MetadataValue::Float(2.5),
                MetadataValue::Integer(3),
            ]
        );
    }

    #[test]
    fn test_integral_float_as_i64() {
        assert_eq!(MetadataValue::Float(4.0).as_i64(), Some(4));
        assert_eq!(MetadataValue::Float(4.5).as_i64(), None);
        assert_eq!(MetadataValue::from("4").as_i64(), None);
    }

    #[test]
    fn test_label_key_merges_integral_floats() {
        assert_eq!(MetadataValue::Float(5.0).label_key(), MetadataValue::Integer(5));
        assert_eq!(MetadataValue::Float(5.5).label_key(), MetadataValue::Float(5.5));
        assert_eq!(MetadataValue::Integer(5).label_key(), MetadataValue::Integer(5));
        assert_eq!(MetadataValue::from("5").label_key(), MetadataValue::from("5"));
    }
}
