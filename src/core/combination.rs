//! Combinations: immutable flag-name → scalar mappings, one per build variant.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SpecializeError};

/// A build-time flag value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue
{
    Null,
    Bool(bool),
    /// Kept in JSON textual form so `3` and `3.0` render as written
    Number(serde_json::Number),
    String(String),
}

impl FlagValue
{
    /// Read a `--set` value: a JSON scalar when it parses as one, else raw text.
    pub fn parse_lenient(text: &str) -> Self
    {
        match serde_json::from_str::<Value>(text)
        {
            Ok(Value::Null) => FlagValue::Null,
            Ok(Value::Bool(b)) => FlagValue::Bool(b),
            Ok(Value::Number(n)) => FlagValue::Number(n),
            Ok(Value::String(s)) => FlagValue::String(s),
            _ => FlagValue::String(text.to_string()),
        }
    }

    /// Token used inside the canonical key.
    pub fn key_token(&self) -> String
    {
        match self
        {
            FlagValue::Null => "null".to_string(),
            FlagValue::Bool(b) => b.to_string(),
            FlagValue::Number(n) => n.to_string(),
            FlagValue::String(s) => s.clone(),
        }
    }

    /// Source text for this value as a script expression.
    ///
    /// Strings shaped like an object (`{...}`) or array (`[...]`) are
    /// emitted unchanged; everything else string-like is quoted. `Null`
    /// has no code, so queries on it stay for runtime resolution.
    pub fn to_code(&self) -> Option<String>
    {
        match self
        {
            FlagValue::Null => None,
            FlagValue::String(s) if is_structured(s) => Some(s.clone()),
            FlagValue::String(s) => Some(quote(s)),
            other => Some(other.key_token()),
        }
    }
}

impl fmt::Display for FlagValue
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        f.write_str(&self.key_token())
    }
}

impl From<bool> for FlagValue
{
    fn from(value: bool) -> Self
    {
        FlagValue::Bool(value)
    }
}

impl From<&str> for FlagValue
{
    fn from(value: &str) -> Self
    {
        FlagValue::String(value.to_string())
    }
}

impl From<String> for FlagValue
{
    fn from(value: String) -> Self
    {
        FlagValue::String(value)
    }
}

impl From<i32> for FlagValue
{
    fn from(value: i32) -> Self
    {
        FlagValue::Number(value.into())
    }
}

impl From<i64> for FlagValue
{
    fn from(value: i64) -> Self
    {
        FlagValue::Number(value.into())
    }
}

impl From<f64> for FlagValue
{
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(value: f64) -> Self
    {
        serde_json::Number::from_f64(value)
            .map(FlagValue::Number)
            .unwrap_or(FlagValue::Null)
    }
}

impl TryFrom<Value> for FlagValue
{
    type Error = SpecializeError;

    fn try_from(value: Value) -> Result<Self>
    {
        match value
        {
            Value::Null => Ok(FlagValue::Null),
            Value::Bool(b) => Ok(FlagValue::Bool(b)),
            Value::Number(n) => Ok(FlagValue::Number(n)),
            Value::String(s) => Ok(FlagValue::String(s)),
            Value::Array(_) => Err(SpecializeError::Configuration(
                "arrays are not valid flag values; pass them as a \"[...]\" string".to_string(),
            )),
            Value::Object(_) => Err(SpecializeError::Configuration(
                "objects are not valid flag values; pass them as a \"{...}\" string".to_string(),
            )),
        }
    }
}

fn is_structured(s: &str) -> bool
{
    (s.starts_with('{') && s.ends_with('}')) || (s.starts_with('[') && s.ends_with(']'))
}

/// Double-quoted script string literal.
fn quote(s: &str) -> String
{
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars()
    {
        match ch
        {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Immutable mapping from flag names to values.
///
/// Keys are kept sorted, so iteration order is the canonical order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Combination
{
    values: BTreeMap<String, FlagValue>,
}

impl Combination
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Builder-style insert, for constructing a combination in one expression.
    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Into<FlagValue>,
    ) -> Self
    {
        self.values
            .insert(key.into(), value.into());
        self
    }

    /// Parse a JSON object of scalars.
    pub fn from_json(value: Value) -> Result<Self>
    {
        let Value::Object(map) = value
        else
        {
            return Err(SpecializeError::Configuration(format!(
                "expected an object of flag values, found {}",
                json_kind(&value)
            )));
        };

        let mut values = BTreeMap::new();
        for (key, raw) in map
        {
            let flag = FlagValue::try_from(raw).map_err(|e| match e
            {
                SpecializeError::Configuration(msg) =>
                {
                    SpecializeError::Configuration(format!("flag `{key}`: {msg}"))
                }
                other => other,
            })?;
            values.insert(key, flag);
        }

        Ok(Self { values })
    }

    pub fn from_json_str(text: &str) -> Result<Self>
    {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| SpecializeError::Configuration(format!("invalid JSON: {e}")))?;
        Self::from_json(value)
    }

    /// Parse a document holding one combination or an array of them.
    pub fn list_from_json_str(text: &str) -> Result<Vec<Self>>
    {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| SpecializeError::Configuration(format!("invalid JSON: {e}")))?;

        match value
        {
            Value::Array(items) => items
                .into_iter()
                .map(Self::from_json)
                .collect(),
            other => Ok(vec![Self::from_json(other)?]),
        }
    }

    /// Parse `key=value` assignments; later ones override earlier ones.
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new().merge_assignments(assignments)
    }

    /// Copy of `self` with `key=value` assignments applied on top.
    pub fn merge_assignments<I, S>(
        &self,
        assignments: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values = self
            .values
            .clone();

        for assignment in assignments
        {
            let assignment = assignment.as_ref();
            let Some((key, value)) = assignment.split_once('=')
            else
            {
                return Err(SpecializeError::Configuration(format!(
                    "expected KEY=VALUE, got `{assignment}`"
                )));
            };

            let key = key.trim();
            if key.is_empty()
            {
                return Err(SpecializeError::Configuration(format!(
                    "empty flag name in `{assignment}`"
                )));
            }

            values.insert(key.to_string(), FlagValue::parse_lenient(value));
        }

        Ok(Self { values })
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&FlagValue>
    {
        self.values
            .get(key)
    }

    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool
    {
        self.values
            .contains_key(key)
    }

    /// Entries in canonical (sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlagValue)>
    {
        self.values
            .iter()
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str>
    {
        self.values
            .keys()
            .map(String::as_str)
    }

    pub fn len(&self) -> usize
    {
        self.values
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.values
            .is_empty()
    }

    /// Canonical encoding: sorted `key:value` pairs joined by `;`.
    pub fn canonical_key(&self) -> String
    {
        let mut key = String::new();
        for (i, (name, value)) in self
            .values
            .iter()
            .enumerate()
        {
            if i > 0
            {
                key.push(';');
            }
            key.push_str(name);
            key.push(':');
            key.push_str(&value.key_token());
        }
        key
    }

    /// Entries whose name satisfies `keep`.
    pub fn retain(
        &self,
        mut keep: impl FnMut(&str) -> bool,
    ) -> Self
    {
        let values = self
            .values
            .iter()
            .filter(|(k, _)| keep(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self { values }
    }
}

impl<K, V> FromIterator<(K, V)> for Combination
where
    K: Into<String>,
    V: Into<FlagValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self
    {
        let values = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        Self { values }
    }
}

impl TryFrom<Value> for Combination
{
    type Error = SpecializeError;

    fn try_from(value: Value) -> Result<Self>
    {
        Self::from_json(value)
    }
}

fn json_kind(value: &Value) -> &'static str
{
    match value
    {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
