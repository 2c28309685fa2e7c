use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Ordered property map. Ordered so that serialization and attribute
/// emission are stable for stable input.
pub type Props = BTreeMap<String, PropValue>;

/// A single editor property value.
///
/// Mirrors the JSON values the visual editor stores: scalars, lists of
/// records (feature cards, pricing plans, ...) and nested records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<PropValue>),
    Map(Props),
}

impl PropValue {
    /// Borrow the value as a string slice, only for `Text` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Coerce scalars to their attribute text form.
    ///
    /// Integral numbers render without a fractional part (`3.0` -> `"3"`),
    /// booleans render as `true`/`false`. Lists, maps and null yield `None`.
    pub fn to_text(&self) -> Option<String> {
        match self {
            PropValue::Text(s) => Some(s.clone()),
            PropValue::Number(n) => Some(format_number(*n)),
            PropValue::Bool(b) => Some(b.to_string()),
            PropValue::Null | PropValue::List(_) | PropValue::Map(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropValue::Number(n) => Some(*n),
            PropValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Truthiness as the editor's toggles express it.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            PropValue::Number(n) => Some(*n != 0.0),
            PropValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => Some(true),
                "false" | "off" | "no" | "0" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PropValue]> {
        match self {
            PropValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Props> {
        match self {
            PropValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Whether the value carries nothing worth rendering.
    pub fn is_blank(&self) -> bool {
        match self {
            PropValue::Null => true,
            PropValue::Text(s) => s.trim().is_empty(),
            PropValue::List(items) => items.is_empty(),
            PropValue::Map(map) => map.is_empty(),
            PropValue::Bool(_) | PropValue::Number(_) => false,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Look up the first non-blank value among `keys`, as text.
///
/// Editor schemas drift (`title` vs `text`, `href` vs `url`), so callers pass
/// every accepted spelling in priority order.
pub fn text_of(props: &Props, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| props.get(*key))
        .filter(|value| !value.is_blank())
        .find_map(PropValue::to_text)
}

/// Look up the first non-blank value among `keys`, unconverted.
pub fn value_of<'a>(props: &'a Props, keys: &[&str]) -> Option<&'a PropValue> {
    keys.iter()
        .filter_map(|key| props.get(*key))
        .find(|value| !value.is_blank())
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Text(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Number(value as f64)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<Vec<PropValue>> for PropValue {
    fn from(value: Vec<PropValue>) -> Self {
        PropValue::List(value)
    }
}

impl From<Props> for PropValue {
    fn from(value: Props) -> Self {
        PropValue::Map(value)
    }
}
