//! Typed property bags, the way a decoded mailbox exposes message,
//! attachment and recipient metadata.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A 16-bit MAPI property identifier (e.g. `0x0037` for the subject).
///
/// Serialized as a `"0x0037"` string so snapshot files stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyId(pub u16);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

impl From<PropertyId> for String {
    fn from(id: PropertyId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for PropertyId {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| format!("property id '{raw}' must start with 0x"))?;
        u16::from_str_radix(digits, 16)
            .map(PropertyId)
            .map_err(|e| format!("invalid property id '{raw}': {e}"))
    }
}

/// A single typed property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Null,
    Short(i16),
    Long(i32),
    LongLong(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
    Time(DateTime<Utc>),
    /// Raw bytes, base64 in snapshot files.
    Binary(#[serde(with = "crate::model::base64_bytes")] Vec<u8>),
    MultiString(Vec<String>),
}

impl PropertyValue {
    /// Short name of the declared kind, as printed by the inspector.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Short(_) => "short",
            Self::Long(_) => "long",
            Self::LongLong(_) => "longlong",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Boolean(_) => "boolean",
            Self::String(_) => "string",
            Self::Time(_) => "systime",
            Self::Binary(_) => "binary",
            Self::MultiString(_) => "multistring",
        }
    }

    /// Widen any integer kind to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Short(v) => Some(i64::from(*v)),
            Self::Long(v) => Some(i64::from(*v)),
            Self::LongLong(v) => Some(*v),
            _ => None,
        }
    }

    /// Borrow the value as text when it is a string kind.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// An ordered mapping of property id to typed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(BTreeMap<PropertyId, PropertyValue>);

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, id: u16, value: PropertyValue) -> Self {
        self.insert(id, value);
        self
    }

    pub fn insert(&mut self, id: u16, value: PropertyValue) {
        self.0.insert(PropertyId(id), value);
    }

    pub fn get(&self, id: u16) -> Option<&PropertyValue> {
        self.0.get(&PropertyId(id))
    }

    /// A string property, if present and of string kind.
    pub fn string(&self, id: u16) -> Option<&str> {
        self.get(id).and_then(PropertyValue::as_str)
    }

    /// An integer property of any width, if present.
    pub fn integer(&self, id: u16) -> Option<i64> {
        self.get(id).and_then(PropertyValue::as_i64)
    }

    /// Iterate in ascending property-id order.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &PropertyValue)> {
        self.0.iter().map(|(id, v)| (*id, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_id_parse_and_display() {
        let id = PropertyId::try_from("0x0E07".to_string()).unwrap();
        assert_eq!(id, PropertyId(0x0e07));
        assert_eq!(id.to_string(), "0x0e07");
        assert!(PropertyId::try_from("37".to_string()).is_err());
        assert!(PropertyId::try_from("0xzz".to_string()).is_err());
    }

    #[test]
    fn test_bag_from_json() {
        let json = r#"{
            "0x0037": {"type": "string", "value": "Hello"},
            "0x0e07": {"type": "long", "value": 1},
            "0x0039": {"type": "time", "value": "2010-03-04T05:06:07Z"},
            "0x0ff9": {"type": "binary", "value": "AAEC"},
            "0x0001": {"type": "null"}
        }"#;
        let bag: PropertyBag = serde_json::from_str(json).unwrap();
        assert_eq!(bag.len(), 5);
        assert_eq!(bag.string(0x0037), Some("Hello"));
        assert_eq!(bag.integer(0x0e07), Some(1));
        assert!(matches!(bag.get(0x0039), Some(PropertyValue::Time(_))));
        assert_eq!(
            bag.get(0x0ff9),
            Some(&PropertyValue::Binary(vec![0, 1, 2]))
        );
        assert_eq!(bag.get(0x0001), Some(&PropertyValue::Null));
    }

    #[test]
    fn test_bag_iterates_in_id_order() {
        let bag = PropertyBag::new()
            .with(0x3001, PropertyValue::String("b".into()))
            .with(0x0037, PropertyValue::String("a".into()));
        let ids: Vec<u16> = bag.iter().map(|(id, _)| id.0).collect();
        assert_eq!(ids, vec![0x0037, 0x3001]);
    }

    #[test]
    fn test_integer_widening() {
        assert_eq!(PropertyValue::Short(-2).as_i64(), Some(-2));
        assert_eq!(PropertyValue::LongLong(1 << 40).as_i64(), Some(1 << 40));
        assert_eq!(PropertyValue::Boolean(true).as_i64(), None);
    }
}
