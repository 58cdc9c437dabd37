//! Attribute values attached to operations.
//!
//! Attributes are the non-SSA payload of an operation: axis lists, transpose
//! flags, scalar literals. They are stored under string keys and compared by
//! kind plus encoded value, which is what the matcher's bind-then-verify
//! discipline needs.

use std::collections::BTreeMap;

/// Keyed attribute storage for one operation.
///
/// Ordered by key so iteration and debug output are deterministic.
pub type AttrMap = BTreeMap<String, Attribute>;

/// Attribute payload stored under a string key on an operation.
///
/// Float payloads compare by their bit encoding, so `Attribute` equality is
/// total: two attributes are equal iff they have the same kind and the same
/// encoded value.
#[derive(Debug, Clone)]
pub enum Attribute {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Bools(Vec<bool>),
    Strs(Vec<String>),
}

impl Attribute {
    /// Kind name of this attribute, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Attribute::Int(_) => "int",
            Attribute::Float(_) => "float",
            Attribute::Bool(_) => "bool",
            Attribute::Str(_) => "str",
            Attribute::Ints(_) => "ints",
            Attribute::Floats(_) => "floats",
            Attribute::Bools(_) => "bools",
            Attribute::Strs(_) => "strs",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Attribute::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Attribute::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Attribute::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            Attribute::Ints(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            Attribute::Floats(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bools(&self) -> Option<&[bool]> {
        match self {
            Attribute::Bools(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_strs(&self) -> Option<&[String]> {
        match self {
            Attribute::Strs(v) => Some(v),
            _ => None,
        }
    }
}

/// Bit-encoded float comparison keeps equality total (NaN == NaN when the
/// payload bits agree, -0.0 != 0.0).
fn float_eq(a: f64, b: f64) -> bool {
    a.to_bits() == b.to_bits()
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Attribute::Int(a), Attribute::Int(b)) => a == b,
            (Attribute::Float(a), Attribute::Float(b)) => float_eq(*a, *b),
            (Attribute::Bool(a), Attribute::Bool(b)) => a == b,
            (Attribute::Str(a), Attribute::Str(b)) => a == b,
            (Attribute::Ints(a), Attribute::Ints(b)) => a == b,
            (Attribute::Floats(a), Attribute::Floats(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| float_eq(*x, *y))
            }
            (Attribute::Bools(a), Attribute::Bools(b)) => a == b,
            (Attribute::Strs(a), Attribute::Strs(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Attribute {}

impl From<i64> for Attribute {
    fn from(v: i64) -> Self {
        Attribute::Int(v)
    }
}

impl From<f64> for Attribute {
    fn from(v: f64) -> Self {
        Attribute::Float(v)
    }
}

impl From<bool> for Attribute {
    fn from(v: bool) -> Self {
        Attribute::Bool(v)
    }
}

impl From<&str> for Attribute {
    fn from(v: &str) -> Self {
        Attribute::Str(v.to_string())
    }
}

impl From<String> for Attribute {
    fn from(v: String) -> Self {
        Attribute::Str(v)
    }
}

impl From<Vec<i64>> for Attribute {
    fn from(v: Vec<i64>) -> Self {
        Attribute::Ints(v)
    }
}

impl From<Vec<f64>> for Attribute {
    fn from(v: Vec<f64>) -> Self {
        Attribute::Floats(v)
    }
}

impl From<Vec<bool>> for Attribute {
    fn from(v: Vec<bool>) -> Self {
        Attribute::Bools(v)
    }
}

/// Build an [`AttrMap`] from `(key, value)` pairs.
///
/// Convenience for tests and registry builders:
///
/// ```ignore
/// let attrs = attrs([("axis", Attribute::Int(-1))]);
/// ```
pub fn attrs<K, V, I>(entries: I) -> AttrMap
where
    K: Into<String>,
    V: Into<Attribute>,
    I: IntoIterator<Item = (K, V)>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}
