//! Semantic scalar types shared by tool arguments and upstream requests.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::{Error, Result};

/// Identifier accepted either as a numeric GitLab ID or as a path such as
/// `group/project`.
///
/// `Int(0)` and `Path("")` are both the zero value, meaning "not given".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Id {
    Int(i64),
    Path(String),
}

impl Default for Id {
    fn default() -> Self {
        Id::Path(String::new())
    }
}

impl Id {
    /// Build an identifier from text: integers take the numeric branch,
    /// anything else is kept as a path.
    pub fn parse(input: &str) -> Self {
        match input.parse::<i64>() {
            Ok(n) => Id::Int(n),
            Err(_) => Id::Path(input.to_string()),
        }
    }

    /// Decode an inbound tool argument. Only strings are accepted.
    pub fn from_arg(raw: &Value) -> Result<Self> {
        match raw {
            Value::String(s) => Ok(Self::parse(s)),
            other => Err(Error::InvalidType(format!(
                "identifier must be a string, got {}",
                json_kind(other)
            ))),
        }
    }

    /// Whether neither branch carries a value.
    pub fn is_zero(&self) -> bool {
        match self {
            Id::Int(n) => *n == 0,
            Id::Path(p) => p.is_empty(),
        }
    }

    /// The numeric branch if non-zero, otherwise the path.
    pub fn value(&self) -> Value {
        match self {
            Id::Int(n) if *n != 0 => Value::from(*n),
            Id::Int(_) => Value::String(String::new()),
            Id::Path(p) => Value::String(p.clone()),
        }
    }

    /// The numeric branch, if that is what this identifier holds.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Id::Int(n) if *n != 0 => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Int(n) => write!(f, "{}", n),
            Id::Path(p) => f.write_str(p),
        }
    }
}

impl FromStr for Id {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Id::parse(s))
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Int(n)
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

/// Boolean that remembers whether it was supplied at all.
///
/// Upstream update endpoints treat an absent flag as "leave unchanged", so
/// `false` and "not given" must stay distinguishable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionalBool {
    value: bool,
    set: bool,
}

impl OptionalBool {
    /// A flag explicitly set to `value`.
    pub fn new(value: bool) -> Self {
        Self { value, set: true }
    }

    /// Decode an inbound tool argument. Anything that is not a JSON boolean
    /// leaves the flag unset.
    pub fn from_arg(raw: &Value) -> Self {
        match raw {
            Value::Bool(b) => Self::new(*b),
            _ => Self::default(),
        }
    }

    pub fn is_set(&self) -> bool {
        self.set
    }

    /// `Some(value)` when set, `None` otherwise.
    pub fn get(&self) -> Option<bool> {
        self.set.then_some(self.value)
    }

    /// Whether the flag was set to `true`.
    pub fn is_true(&self) -> bool {
        self.set && self.value
    }
}

impl From<OptionalBool> for Option<bool> {
    fn from(b: OptionalBool) -> Self {
        b.get()
    }
}

/// JSON type name of a value, as used in argument error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_integer_branch() {
        let id = Id::from_arg(&json!("1234")).unwrap();
        assert_eq!(id, Id::Int(1234));
        assert_eq!(id.value(), json!(1234));
        assert_eq!(id.as_int(), Some(1234));
    }

    #[test]
    fn test_id_path_branch() {
        let id = Id::from_arg(&json!("owner/ns")).unwrap();
        assert_eq!(id, Id::Path("owner/ns".to_string()));
        assert_eq!(id.value(), json!("owner/ns"));
        assert_eq!(id.as_int(), None);
        assert_eq!(id.to_string(), "owner/ns");
    }

    #[test]
    fn test_id_rejects_non_string() {
        for raw in [json!(12), json!(true), json!(null), json!(["a"]), json!({})] {
            let err = Id::from_arg(&raw).unwrap_err();
            assert!(matches!(err, Error::InvalidType(_)), "{:?}", raw);
        }
    }

    #[test]
    fn test_id_zero() {
        assert!(Id::default().is_zero());
        assert!(Id::Int(0).is_zero());
        assert!(Id::parse("").is_zero());
        assert!(!Id::parse("7").is_zero());
        assert!(!Id::parse("a/b").is_zero());
        assert_eq!(Id::Int(0).value(), json!(""));
    }

    #[test]
    fn test_id_serialize() {
        assert_eq!(serde_json::to_value(Id::Int(5)).unwrap(), json!(5));
        assert_eq!(
            serde_json::to_value(Id::parse("g/p")).unwrap(),
            json!("g/p")
        );
    }

    #[test]
    fn test_optional_bool_decode() {
        assert_eq!(OptionalBool::from_arg(&json!(true)).get(), Some(true));
        assert_eq!(OptionalBool::from_arg(&json!(false)).get(), Some(false));
        assert_eq!(OptionalBool::default().get(), None);
        assert_eq!(OptionalBool::from_arg(&json!(1)).get(), None);
        assert_eq!(OptionalBool::from_arg(&json!(0)).get(), None);
        assert_eq!(OptionalBool::from_arg(&json!("true")).get(), None);
        assert_eq!(OptionalBool::from_arg(&json!(null)).get(), None);
    }

    #[test]
    fn test_optional_bool_is_true() {
        assert!(OptionalBool::new(true).is_true());
        assert!(!OptionalBool::new(false).is_true());
        assert!(!OptionalBool::default().is_true());
        let projected: Option<bool> = OptionalBool::new(false).into();
        assert_eq!(projected, Some(false));
    }
}
