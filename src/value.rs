//! Values bound in a loaded configuration namespace.

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Serialize;
use std::fmt;

/// Ordered mapping of top-level binding names to their values.
pub type Namespace = IndexMap<String, ConfigValue>;

/// A configuration value: the literal subset a Sphinx `conf.py` is made of
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Str(String),
    Bool(bool),
    Int(i64),
    None,
    List(Vec<ConfigValue>),
    Tuple(Vec<ConfigValue>),
    Dict(IndexMap<String, ConfigValue>),
}

/// Shape of a value, used for type checks and messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Str,
    Bool,
    Int,
    None,
    List,
    Tuple,
    Dict,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Str => write!(f, "a string"),
            ValueKind::Bool => write!(f, "a boolean"),
            ValueKind::Int => write!(f, "an integer"),
            ValueKind::None => write!(f, "None"),
            ValueKind::List => write!(f, "a list"),
            ValueKind::Tuple => write!(f, "a tuple"),
            ValueKind::Dict => write!(f, "a dict"),
        }
    }
}

impl ConfigValue {
    pub fn str(value: impl Into<String>) -> Self {
        ConfigValue::Str(value.into())
    }

    /// List of strings
    pub fn str_list<S: AsRef<str>>(items: &[S]) -> Self {
        ConfigValue::List(items.iter().map(|s| ConfigValue::str(s.as_ref())).collect())
    }

    /// Tuple of strings
    pub fn str_tuple<S: AsRef<str>>(items: &[S]) -> Self {
        ConfigValue::Tuple(items.iter().map(|s| ConfigValue::str(s.as_ref())).collect())
    }

    /// Dict of strings
    pub fn str_dict(map: &IndexMap<String, String>) -> Self {
        ConfigValue::Dict(
            map.iter()
                .map(|(k, v)| (k.clone(), ConfigValue::str(v)))
                .collect(),
        )
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            ConfigValue::Str(_) => ValueKind::Str,
            ConfigValue::Bool(_) => ValueKind::Bool,
            ConfigValue::Int(_) => ValueKind::Int,
            ConfigValue::None => ValueKind::None,
            ConfigValue::List(_) => ValueKind::List,
            ConfigValue::Tuple(_) => ValueKind::Tuple,
            ConfigValue::Dict(_) => ValueKind::Dict,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Items of a list or a tuple
    pub fn as_seq(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::List(items) | ConfigValue::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&IndexMap<String, ConfigValue>> {
        match self {
            ConfigValue::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Visits every string reachable from this value, dict keys included.
    pub fn for_each_str<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            ConfigValue::Str(s) => f(s),
            ConfigValue::List(items) | ConfigValue::Tuple(items) => {
                for item in items {
                    item.for_each_str(&mut *f);
                }
            }
            ConfigValue::Dict(map) => {
                for (key, value) in map {
                    f(key);
                    value.for_each_str(&mut *f);
                }
            }
            ConfigValue::Bool(_) | ConfigValue::Int(_) | ConfigValue::None => {}
        }
    }
}

struct ConfigValueVisitor;

impl<'de> Visitor<'de> for ConfigValueVisitor {
    type Value = ConfigValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a string, boolean, integer, None, sequence or dict")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<ConfigValue, E> {
        Ok(ConfigValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ConfigValue, E> {
        Ok(ConfigValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ConfigValue, E> {
        i64::try_from(v)
            .map(ConfigValue::Int)
            .map_err(|_| E::custom(format!("integer {} is out of range", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ConfigValue, E> {
        Ok(ConfigValue::str(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<ConfigValue, E> {
        Ok(ConfigValue::Str(v))
    }

    fn visit_none<E: de::Error>(self) -> Result<ConfigValue, E> {
        Ok(ConfigValue::None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<ConfigValue, E> {
        Ok(ConfigValue::None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<ConfigValue, D::Error> {
        ConfigValue::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ConfigValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(ConfigValue::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ConfigValue, A::Error> {
        let mut entries = IndexMap::new();
        while let Some((key, value)) = map.next_entry::<String, ConfigValue>()? {
            entries.insert(key, value);
        }
        Ok(ConfigValue::Dict(entries))
    }
}

/// Sequences come back as lists; tuples are told apart by the loader.
impl<'de> Deserialize<'de> for ConfigValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ConfigValueVisitor)
    }
}
