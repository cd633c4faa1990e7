//! State-tree value types.
//!
//! A watched container exposes its state as a tree of [`StateValue`]s. The
//! tree supports the same shapes as JSON plus a distinct integer type, and
//! converts losslessly to and from `serde_json::Value`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// An immutable point-in-time handle on a full state tree.
///
/// Containers hand out a new `Snapshot` after every state-changing
/// transition and the same one otherwise, so `Arc::ptr_eq` answers
/// "did state change at all" without walking the tree.
pub type Snapshot = Arc<StateValue>;

/// Possible values a state tree can hold.
///
/// # Examples
///
/// ```
/// use vigil::StateValue;
///
/// let bool_val = StateValue::Bool(true);
/// let int_val = StateValue::Int(7);
/// let string_val = StateValue::String("hello".to_string());
///
/// assert!(bool_val.is_bool());
/// assert!(int_val.is_int());
/// assert!(string_val.is_string());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum StateValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<StateValue>),
    Map(BTreeMap<String, StateValue>),
}

#[allow(missing_docs)]
impl StateValue {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    pub const fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[StateValue]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_map(&self) -> Option<&BTreeMap<String, StateValue>> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Looks up a direct child of a `Map` value by key.
    ///
    /// Returns `None` for non-map values and missing keys alike.
    pub fn get(&self, key: &str) -> Option<&StateValue> {
        match self {
            Self::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Looks up an element of a `List` value by index.
    pub fn index(&self, idx: usize) -> Option<&StateValue> {
        match self {
            Self::List(items) => items.get(idx),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl Default for StateValue {
    fn default() -> Self {
        Self::Null
    }
}

impl std::fmt::Display for StateValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Convenient From implementations
impl From<bool> for StateValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for StateValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for StateValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for StateValue {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for StateValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for StateValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for StateValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<StateValue>> for StateValue {
    fn from(v: Vec<StateValue>) -> Self {
        Self::List(v)
    }
}

impl From<BTreeMap<String, StateValue>> for StateValue {
    fn from(v: BTreeMap<String, StateValue>) -> Self {
        Self::Map(v)
    }
}

impl From<serde_json::Value> for StateValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<StateValue> for serde_json::Value {
    fn from(v: StateValue) -> Self {
        match v {
            StateValue::Null => Self::Null,
            StateValue::Bool(b) => Self::Bool(b),
            StateValue::Int(n) => Self::from(n),
            StateValue::Float(n) => serde_json::Number::from_f64(n).map_or(Self::Null, Self::Number),
            StateValue::String(s) => Self::String(s),
            StateValue::List(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            StateValue::Map(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}
