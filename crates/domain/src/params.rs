//! Call-site arguments for key rendering and source queries

use std::collections::BTreeMap;
use std::fmt;

use crate::errors::KeyArgsError;

/// A single argument value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl ParamValue {
    /// Type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "str",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Named arguments, ordered by name so iteration is deterministic
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: BTreeMap<String, ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument, replacing any previous value under the same name
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Argument names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Required value of any type
    pub fn value(&self, name: &str) -> Result<&ParamValue, KeyArgsError> {
        self.get(name).ok_or_else(|| KeyArgsError::Missing { name: name.to_string() })
    }

    /// Required string argument
    pub fn str(&self, name: &str) -> Result<&str, KeyArgsError> {
        match self.value(name)? {
            ParamValue::Str(s) => Ok(s),
            other => Err(mistyped(name, "str", other)),
        }
    }

    /// Required integer argument
    pub fn int(&self, name: &str) -> Result<i64, KeyArgsError> {
        match self.value(name)? {
            ParamValue::Int(i) => Ok(*i),
            other => Err(mistyped(name, "int", other)),
        }
    }

    /// Required boolean argument
    pub fn bool(&self, name: &str) -> Result<bool, KeyArgsError> {
        match self.value(name)? {
            ParamValue::Bool(b) => Ok(*b),
            other => Err(mistyped(name, "bool", other)),
        }
    }

    /// Fail with [`KeyArgsError::Unexpected`] on the first argument not in
    /// `allowed`
    pub fn only(&self, allowed: &[&str]) -> Result<(), KeyArgsError> {
        match self.names().find(|name| !allowed.contains(name)) {
            Some(name) => Err(KeyArgsError::Unexpected { name: name.to_string() }),
            None => Ok(()),
        }
    }
}

fn mistyped(name: &str, expected: &'static str, found: &ParamValue) -> KeyArgsError {
    KeyArgsError::Mistyped { name: name.to_string(), expected, found: found.type_name() }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}
