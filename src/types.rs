use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A value bound to a statement parameter or returned in a result row.
///
/// One enum serves both directions so bindings, rows, and quoting never need
/// to branch on driver-specific types:
/// ```rust
/// use sql_aware::prelude::*;
///
/// let bound = DbValue::Text("a%".into());
/// assert_eq!(bound.as_text(), Some("a%"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    /// 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Text value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL
    Null,
    /// JSON document
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl DbValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(0) => Some(false),
            Self::Int(1) => Some(true),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Timestamp(dt) => Some(*dt),
            Self::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// JSON rendering used by debug dumps of parameter snapshots.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Int(v) => JsonValue::from(*v),
            Self::Float(v) => JsonValue::from(*v),
            Self::Text(s) => JsonValue::from(s.as_str()),
            Self::Bool(b) => JsonValue::from(*b),
            Self::Timestamp(dt) => JsonValue::from(dt.format("%F %T%.f").to_string()),
            Self::Null => JsonValue::Null,
            Self::JSON(j) => j.clone(),
            Self::Blob(bytes) => JsonValue::from(
                bytes.iter().map(|b| format!("{b:02x}")).collect::<String>(),
            ),
        }
    }

    /// Wrap the value in a shared cell for live-reference binding.
    #[must_use]
    pub fn into_ref(self) -> ValueRef {
        Rc::new(RefCell::new(self))
    }
}

/// A caller-owned, mutable binding slot.
///
/// Bound through [`Statement::bind_param`](crate::Statement::bind_param); the
/// current contents are re-read at every execute, so mutating the cell
/// between executes changes what runs and what gets reconstructed.
pub type ValueRef = Rc<RefCell<DbValue>>;

/// Type hint forwarded to the driver alongside a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Character data
    Str,
    /// Integer data
    Int,
    /// Boolean data
    Bool,
    /// Large object / binary data
    Lob,
    /// SQL NULL
    Null,
}

/// How the underlying client reports failures.
///
/// [`Connection::connect`](crate::Connection::connect) defaults an
/// unspecified mode to `Exception`; the driver contract decides what the
/// other modes mean for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum ErrorMode {
    /// Raise an error on every failure (the default).
    Exception,
    /// Report failures as warnings where the driver supports it.
    Warning,
    /// Suppress failure reporting; callers inspect return codes.
    Silent,
}
