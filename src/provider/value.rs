//! Terraform values as carried by the protocol's `DynamicValue`.
//!
//! Terraform encodes values with MessagePack: objects and maps are both
//! MessagePack maps keyed by attribute or element name, and unknown values are
//! MessagePack extension values. JSON is accepted on input as well.

use std::collections::BTreeMap;

/// A decoded Terraform value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    /// Not yet known during planning.
    Unknown,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    /// Objects and maps, in encoding order.
    Map(Vec<(String, Value)>),
}

#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error("invalid msgpack value: {0}")]
    Decode(#[from] rmpv::decode::Error),
    #[error("failed to encode msgpack value: {0}")]
    Encode(#[from] rmpv::encode::Error),
    #[error("invalid json value: {0}")]
    Json(#[from] serde_json::Error),
    #[error("map keys must be strings")]
    NonStringKey,
    #[error("unsupported msgpack type {0}")]
    Unsupported(&'static str),
}

impl Value {
    /// Build an object value from attribute name/value pairs.
    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Map(
            attributes
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    pub fn string_map<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_owned(), Self::String(value.to_owned())))
                .collect(),
        )
    }

    /// Attribute or element `key` of a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Flatten a map of strings. Returns `None` for any other shape.
    pub fn to_string_map(&self) -> Option<BTreeMap<String, String>> {
        let Self::Map(entries) = self else {
            return None;
        };
        entries
            .iter()
            .map(|(key, value)| Some((key.clone(), value.as_str()?.to_owned())))
            .collect()
    }

    pub fn from_msgpack(mut bytes: &[u8]) -> Result<Self, ValueError> {
        let raw = rmpv::decode::read_value(&mut bytes)?;
        Self::try_from_msgpack(raw)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ValueError> {
        let raw: serde_json::Value = serde_json::from_slice(bytes)?;
        Ok(Self::from(raw))
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, ValueError> {
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &self.to_rmpv())?;
        Ok(buf)
    }

    fn try_from_msgpack(raw: rmpv::Value) -> Result<Self, ValueError> {
        Ok(match raw {
            rmpv::Value::Nil => Self::Null,
            rmpv::Value::Boolean(value) => Self::Bool(value),
            rmpv::Value::Integer(value) => {
                Self::Number(value.as_f64().ok_or(ValueError::Unsupported("integer"))?)
            }
            rmpv::Value::F32(value) => Self::Number(f64::from(value)),
            rmpv::Value::F64(value) => Self::Number(value),
            rmpv::Value::String(value) => Self::String(
                value
                    .into_str()
                    .ok_or(ValueError::Unsupported("non-UTF-8 string"))?,
            ),
            rmpv::Value::Binary(_) => return Err(ValueError::Unsupported("binary")),
            rmpv::Value::Array(items) => Self::List(
                items
                    .into_iter()
                    .map(Self::try_from_msgpack)
                    .collect::<Result<_, _>>()?,
            ),
            rmpv::Value::Map(pairs) => Self::Map(
                pairs
                    .into_iter()
                    .map(|(key, value)| {
                        let rmpv::Value::String(key) = key else {
                            return Err(ValueError::NonStringKey);
                        };
                        let key = key.into_str().ok_or(ValueError::NonStringKey)?;
                        Ok((key, Self::try_from_msgpack(value)?))
                    })
                    .collect::<Result<_, _>>()?,
            ),
            // Plain and refined unknowns both travel as extension values.
            rmpv::Value::Ext(_, _) => Self::Unknown,
        })
    }

    fn to_rmpv(&self) -> rmpv::Value {
        match self {
            Self::Null => rmpv::Value::Nil,
            Self::Unknown => rmpv::Value::Ext(0, vec![0]),
            Self::Bool(value) => rmpv::Value::Boolean(*value),
            Self::Number(value) if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => {
                rmpv::Value::from(*value as i64)
            }
            Self::Number(value) => rmpv::Value::F64(*value),
            Self::String(value) => rmpv::Value::from(value.as_str()),
            Self::List(items) => rmpv::Value::Array(items.iter().map(Self::to_rmpv).collect()),
            Self::Map(entries) => rmpv::Value::Map(
                entries
                    .iter()
                    .map(|(key, value)| (rmpv::Value::from(key.as_str()), value.to_rmpv()))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(raw: serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(value) => Self::Bool(value),
            serde_json::Value::Number(value) => Self::Number(value.as_f64().unwrap_or_default()),
            serde_json::Value::String(value) => Self::String(value),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
