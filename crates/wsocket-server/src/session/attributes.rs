//! Per-connection attribute store.
//!
//! Values are a closed set of types ([`AttrValue`]). The typed getters return
//! `Option` like a (value, found) pair; [`Attributes::try_get`] tells an absent
//! key apart from a value of another type.

use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i32),
    Int64(i64),
    Bool(bool),
}

impl AttrValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Str(_) => "string",
            AttrValue::Int(_) => "int",
            AttrValue::Int64(_) => "int64",
            AttrValue::Bool(_) => "bool",
        }
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_owned())
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int64(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttrError {
    #[error("attribute not set")]
    Missing,
    #[error("attribute is {found}, not {expected}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
}

/// A type that can be read back out of an [`AttrValue`].
pub trait AttrType: Sized {
    const NAME: &'static str;
    fn from_attr(v: &AttrValue) -> Option<Self>;
}

impl AttrType for String {
    const NAME: &'static str = "string";
    fn from_attr(v: &AttrValue) -> Option<Self> {
        match v {
            AttrValue::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl AttrType for i32 {
    const NAME: &'static str = "int";
    fn from_attr(v: &AttrValue) -> Option<Self> {
        match v {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl AttrType for i64 {
    const NAME: &'static str = "int64";
    fn from_attr(v: &AttrValue) -> Option<Self> {
        match v {
            AttrValue::Int64(i) => Some(*i),
            _ => None,
        }
    }
}

impl AttrType for bool {
    const NAME: &'static str = "bool";
    fn from_attr(v: &AttrValue) -> Option<Self> {
        match v {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Created empty with its connection and dropped with it.
#[derive(Debug, Default)]
pub struct Attributes {
    map: DashMap<String, AttrValue>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.map.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<AttrValue> {
        self.map.get(key).map(|v| v.value().clone())
    }

    pub fn remove(&self, key: &str) -> Option<AttrValue> {
        self.map.remove(key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn try_get<T: AttrType>(&self, key: &str) -> Result<T, AttrError> {
        let v = self.map.get(key).ok_or(AttrError::Missing)?;
        T::from_attr(v.value()).ok_or(AttrError::WrongType {
            expected: T::NAME,
            found: v.value().type_name(),
        })
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.try_get(key).ok()
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        self.try_get(key).ok()
    }

    pub fn get_int64(&self, key: &str) -> Option<i64> {
        self.try_get(key).ok()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.try_get(key).ok()
    }
}
