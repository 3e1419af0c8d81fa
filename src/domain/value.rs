//! Leaf values stored under node keys.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Callable stored in place of a value; evaluated with a binding's argument list.
#[derive(Clone)]
pub struct DeferredValue(Arc<dyn Fn(&[String]) -> PrefValue + Send + Sync>);

impl DeferredValue {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[String]) -> PrefValue + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, args: &[String]) -> PrefValue {
        (self.0)(args)
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for DeferredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeferredValue(..)")
    }
}

/// A preference value.
///
/// Absence is modelled as `Option::None` at the API boundary, never as a variant.
#[derive(Debug, Clone)]
pub enum PrefValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<PrefValue>),
    /// Unordered collection, compared without regard to element order.
    Set(Vec<PrefValue>),
    Map(BTreeMap<String, PrefValue>),
    Deferred(DeferredValue),
}

impl PrefValue {
    pub fn deferred<F>(f: F) -> Self
    where
        F: Fn(&[String]) -> PrefValue + Send + Sync + 'static,
    {
        Self::Deferred(DeferredValue::new(f))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Deferred(_) => "deferred",
        }
    }
}

/// Semantic equality: containers compare element-wise, sets ignore order,
/// numbers compare numerically and deferred values by identity.
impl PartialEq for PrefValue {
    fn eq(&self, other: &Self) -> bool {
        use PrefValue::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Int(a), Float(b)) | (Float(b), Int(a)) => (*a as f64) == *b,
            (Text(a), Text(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Set(a), Set(b)) => same_elements(a, b),
            (Map(a), Map(b)) => a == b,
            (Deferred(a), Deferred(b)) => a.same(b),
            _ => false,
        }
    }
}

fn same_elements(a: &[PrefValue], b: &[PrefValue]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut unmatched: Vec<&PrefValue> = b.iter().collect();
    for item in a {
        match unmatched.iter().position(|candidate| *candidate == item) {
            Some(pos) => {
                unmatched.swap_remove(pos);
            }
            None => return false,
        }
    }
    true
}

impl fmt::Display for PrefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::List(items) | Self::Set(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Self::Deferred(_) => f.write_str("<deferred>"),
        }
    }
}

impl From<bool> for PrefValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

macro_rules! int_into_pref {
    ($($t:ty),*) => {
        $(
            impl From<$t> for PrefValue {
                fn from(v: $t) -> Self {
                    Self::Int(v as i64)
                }
            }
        )*
    };
}

int_into_pref!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for PrefValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for PrefValue {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

impl From<&str> for PrefValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for PrefValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<PrefValue>> for PrefValue {
    fn from(v: Vec<PrefValue>) -> Self {
        Self::List(v)
    }
}

impl From<BTreeMap<String, PrefValue>> for PrefValue {
    fn from(v: BTreeMap<String, PrefValue>) -> Self {
        Self::Map(v)
    }
}
