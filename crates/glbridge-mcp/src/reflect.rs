//! Tool argument descriptors.
//!
//! An argument struct declared with [`tool_args!`](crate::tool_args) carries
//! a static [`ArgDescriptor`] listing its fields, their value kinds,
//! descriptions and constraints. The same descriptor drives both the MCP
//! input schema ([`build_schema`]) and the decoding of inbound argument maps
//! ([`Decoder`]), so the two can never disagree.

use glbridge_core::scalar::json_kind;
use glbridge_core::{Error, Id, OptionalBool, Result};
use serde_json::{json, Map, Value};

// =============================================================================
// Value kinds
// =============================================================================

/// Parameter type as advertised in the tool schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Boolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
        }
    }
}

/// Built-in value representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Str,
    Int { signed: bool },
    Float,
    Bool,
}

impl Primitive {
    fn param_type(&self) -> ParamType {
        match self {
            Primitive::Str => ParamType::String,
            Primitive::Int { .. } | Primitive::Float => ParamType::Number,
            Primitive::Bool => ParamType::Boolean,
        }
    }
}

/// How a field's value type presents itself to the schema builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Inferred from the primitive representation.
    Primitive(Primitive),
    /// Semantic scalar that declares its own external kind.
    Scalar(ParamType),
    /// Nested value (sequence, mapping), never valid as a tool argument.
    Structured(&'static str),
}

/// A type usable as a tool argument field.
pub trait ArgValue: Default + Sized {
    const KIND: ValueKind;

    /// Decode a present, non-null argument value.
    fn decode(raw: &Value) -> Result<Self>;
}

fn expected(what: &str, raw: &Value) -> Error {
    Error::InvalidArgument(format!("expected {}, got {}", what, json_kind(raw)))
}

impl ArgValue for String {
    const KIND: ValueKind = ValueKind::Primitive(Primitive::Str);

    fn decode(raw: &Value) -> Result<Self> {
        raw.as_str()
            .map(str::to_string)
            .ok_or_else(|| expected("string", raw))
    }
}

impl ArgValue for bool {
    const KIND: ValueKind = ValueKind::Primitive(Primitive::Bool);

    fn decode(raw: &Value) -> Result<Self> {
        raw.as_bool().ok_or_else(|| expected("boolean", raw))
    }
}

impl ArgValue for f64 {
    const KIND: ValueKind = ValueKind::Primitive(Primitive::Float);

    fn decode(raw: &Value) -> Result<Self> {
        raw.as_f64().ok_or_else(|| expected("number", raw))
    }
}

impl ArgValue for i64 {
    const KIND: ValueKind = ValueKind::Primitive(Primitive::Int { signed: true });

    fn decode(raw: &Value) -> Result<Self> {
        let Value::Number(n) = raw else {
            return Err(expected("integer", raw));
        };
        if let Some(i) = n.as_i64() {
            return Ok(i);
        }
        if n.is_u64() {
            return Err(Error::InvalidArgument(format!("{} is out of range", n)));
        }
        truncate(n.as_f64().unwrap_or(f64::NAN), i64::MIN as f64, i64::MAX as f64)
            .map(|f| f as i64)
    }
}

impl ArgValue for u64 {
    const KIND: ValueKind = ValueKind::Primitive(Primitive::Int { signed: false });

    fn decode(raw: &Value) -> Result<Self> {
        let Value::Number(n) = raw else {
            return Err(expected("integer", raw));
        };
        if let Some(u) = n.as_u64() {
            return Ok(u);
        }
        if n.is_i64() {
            return Err(Error::InvalidArgument(format!(
                "negative value {} for unsigned field",
                n
            )));
        }
        let f = n.as_f64().unwrap_or(f64::NAN);
        if f < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "negative value {} for unsigned field",
                n
            )));
        }
        truncate(f, 0.0, u64::MAX as f64).map(|f| f as u64)
    }
}

impl ArgValue for u32 {
    const KIND: ValueKind = ValueKind::Primitive(Primitive::Int { signed: false });

    fn decode(raw: &Value) -> Result<Self> {
        let n = u64::decode(raw)?;
        u32::try_from(n).map_err(|_| Error::InvalidArgument(format!("{} is out of range", n)))
    }
}

/// Float to integer conversion: truncates toward zero.
fn truncate(f: f64, min: f64, max: f64) -> Result<f64> {
    if !f.is_finite() || f.trunc() < min || f.trunc() > max {
        return Err(Error::InvalidArgument(format!("{} is out of range", f)));
    }
    Ok(f.trunc())
}

impl ArgValue for Id {
    const KIND: ValueKind = ValueKind::Scalar(ParamType::String);

    fn decode(raw: &Value) -> Result<Self> {
        Id::from_arg(raw)
    }
}

impl ArgValue for OptionalBool {
    const KIND: ValueKind = ValueKind::Scalar(ParamType::Boolean);

    fn decode(raw: &Value) -> Result<Self> {
        Ok(OptionalBool::from_arg(raw))
    }
}

impl<T: ArgValue> ArgValue for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn decode(raw: &Value) -> Result<Self> {
        T::decode(raw).map(Some)
    }
}

impl<T> ArgValue for Vec<T> {
    const KIND: ValueKind = ValueKind::Structured("sequence");

    fn decode(raw: &Value) -> Result<Self> {
        Err(expected("scalar", raw))
    }
}

impl ArgValue for Map<String, Value> {
    const KIND: ValueKind = ValueKind::Structured("mapping");

    fn decode(raw: &Value) -> Result<Self> {
        Err(expected("scalar", raw))
    }
}

// =============================================================================
// Descriptors
// =============================================================================

/// One field of an argument struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgField {
    /// Rust field name
    pub name: &'static str,
    pub kind: ValueKind,
    pub description: &'static str,
    pub required: bool,
    /// Allowed values; empty means unconstrained
    pub one_of: &'static [&'static str],
    /// Parameter name overriding the snake_case form of `name`
    pub rename: Option<&'static str>,
}

impl ArgField {
    pub const fn new(name: &'static str, kind: ValueKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
            one_of: &[],
            rename: None,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.one_of = values;
        self
    }

    pub const fn rename(mut self, name: &'static str) -> Self {
        self.rename = Some(name);
        self
    }

    /// Name of the parameter on the wire.
    pub fn param_name(&self) -> String {
        match self.rename {
            Some(name) => name.to_string(),
            None => to_snake_case(self.name),
        }
    }
}

/// Static description of an argument struct.
#[derive(Debug)]
pub struct ArgDescriptor {
    pub type_name: &'static str,
    pub fields: &'static [ArgField],
}

impl ArgDescriptor {
    pub fn field(&self, name: &str) -> Option<&ArgField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Argument struct with a descriptor-driven decoder.
pub trait ToolArgs: Sized {
    fn descriptor() -> &'static ArgDescriptor;

    fn decode(raw: &Map<String, Value>) -> Result<Self>;
}

// =============================================================================
// Schema
// =============================================================================

/// Build the MCP input schema of a descriptor.
///
/// Every problem found is reported, not only the first one.
pub fn build_schema(desc: &ArgDescriptor) -> Result<Value> {
    let mut errors = Vec::new();
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in desc.fields {
        let name = field.param_name();
        let location = format!("{}.{}", desc.type_name, field.name);

        let param_type = match field.kind {
            ValueKind::Primitive(p) => Some(p.param_type()),
            ValueKind::Scalar(t) => Some(t),
            ValueKind::Structured(what) => {
                errors.push(format!("{}: unsupported {} type", location, what));
                None
            }
        };

        let description = field.description.trim();
        if description.is_empty() {
            errors.push(format!("{}: missing description", location));
        }

        if !field.one_of.is_empty() && param_type.is_some_and(|t| t != ParamType::String) {
            errors.push(format!("{}: enum is only allowed on string fields", location));
        }

        let Some(param_type) = param_type else {
            continue;
        };

        let mut property = json!({
            "type": param_type.as_str(),
            "description": description,
        });
        if !field.one_of.is_empty() {
            property["enum"] = json!(field.one_of);
        }
        if field.required {
            required.push(Value::String(name.clone()));
        }
        properties.insert(name, property);
    }

    if !errors.is_empty() {
        return Err(Error::Descriptor(errors));
    }

    Ok(json!({
        "type": "object",
        "properties": properties,
        "required": required,
    }))
}

/// Convert a CamelCase identifier to snake_case.
///
/// An underscore goes before an uppercase letter that follows a lowercase
/// letter or that starts a new word after an acronym. A trailing `IDs`
/// becomes `_ids`, and a bare `IDs` becomes `ids`.
pub fn to_snake_case(name: &str) -> String {
    let (stem, suffix) = match name.strip_suffix("IDs") {
        Some("") => return "ids".to_string(),
        Some(stem) => (stem, "_ids"),
        None => (name, ""),
    };

    let chars: Vec<char> = stem.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && chars[i - 1].is_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if i > 0 && (prev_lower || next_lower) && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out.push_str(suffix);
    out
}

// =============================================================================
// Decoding
// =============================================================================

/// Decodes the fields of one argument struct, in declaration order.
pub struct Decoder<'a> {
    descriptor: &'static ArgDescriptor,
    raw: &'a Map<String, Value>,
}

impl<'a> Decoder<'a> {
    pub fn new(descriptor: &'static ArgDescriptor, raw: &'a Map<String, Value>) -> Self {
        Self { descriptor, raw }
    }

    /// Decode the field named `name` (Rust field name).
    pub fn field<T: ArgValue>(&self, name: &str) -> Result<T> {
        let field = self.descriptor.field(name).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "{} has no field {}",
                self.descriptor.type_name, name
            ))
        })?;
        decode_field(field, self.raw)
    }
}

/// Decode one field out of an argument map.
///
/// Absent and `null` values leave the field at its default unless it is
/// required.
pub fn decode_field<T: ArgValue>(field: &ArgField, raw: &Map<String, Value>) -> Result<T> {
    let key = field.param_name();

    let value = match raw.get(&key) {
        None | Some(Value::Null) => {
            if field.required {
                return Err(Error::MissingRequired(key));
            }
            return Ok(T::default());
        }
        Some(value) => value,
    };

    if !field.one_of.is_empty() {
        let allowed = value.as_str().is_some_and(|s| field.one_of.contains(&s));
        if !allowed {
            return Err(Error::InvalidArgument(format!(
                "{} must be one of [{}], got {}",
                key,
                field.one_of.join(", "),
                value
            )));
        }
    }

    T::decode(value).map_err(|e| e.context(format!("argument {}", key)))
}

/// Turn the raw `arguments` of a tool call into a map.
pub fn argument_map(arguments: Option<Value>) -> Result<Map<String, Value>> {
    match arguments {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(Error::InvalidType(format!(
            "tool arguments must be an object, got {}",
            json_kind(&other)
        ))),
    }
}

// =============================================================================
// Declaration macro
// =============================================================================

/// Declare a tool argument struct.
///
/// Each field carries a doc comment (its description) and optionally a
/// bracketed option list after the type:
///
/// ```ignore
/// tool_args! {
///     pub struct GetJobArgs {
///         /// Project ID or URL-encoded path
///         project_id: Id [required],
///         /// Job state
///         state: Option<String> [one_of = ["running", "failed"]],
///         /// Git reference
///         git_ref: Option<String> [rename = "ref"],
///     }
/// }
/// ```
#[macro_export]
macro_rules! tool_args {
    (@opts $f:expr ;) => { $f };
    (@opts $f:expr ; required $(, $($rest:tt)*)?) => {
        $crate::tool_args!(@opts $f.required() ; $($($rest)*)?)
    };
    (@opts $f:expr ; one_of = [$($v:literal),* $(,)?] $(, $($rest:tt)*)?) => {
        $crate::tool_args!(@opts $f.one_of(&[$($v),*]) ; $($($rest)*)?)
    };
    (@opts $f:expr ; rename = $n:literal $(, $($rest:tt)*)?) => {
        $crate::tool_args!(@opts $f.rename($n) ; $($($rest)*)?)
    };
    (@field $field:ident, $ty:ty, $doc:expr $(, $($opt:tt)*)?) => {
        $crate::tool_args!(
            @opts $crate::reflect::ArgField::new(
                stringify!($field),
                <$ty as $crate::reflect::ArgValue>::KIND,
                $doc,
            ) ; $($($opt)*)?
        )
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[doc = $doc:literal])*
                $field:ident : $ty:ty $([ $($opt:tt)* ])?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, PartialEq)]
        $vis struct $name {
            $(
                $(#[doc = $doc])*
                pub $field: $ty,
            )*
        }

        impl $crate::reflect::ToolArgs for $name {
            fn descriptor() -> &'static $crate::reflect::ArgDescriptor {
                static DESCRIPTOR: $crate::reflect::ArgDescriptor = $crate::reflect::ArgDescriptor {
                    type_name: stringify!($name),
                    fields: &[
                        $(
                            $crate::tool_args!(
                                @field $field, $ty, concat!($($doc),*) $(, $($opt)*)?
                            ),
                        )*
                    ],
                };
                &DESCRIPTOR
            }

            #[allow(unused_variables)]
            fn decode(
                raw: &::serde_json::Map<::std::string::String, ::serde_json::Value>,
            ) -> ::glbridge_core::Result<Self> {
                let decoder = $crate::reflect::Decoder::new(
                    <Self as $crate::reflect::ToolArgs>::descriptor(),
                    raw,
                );
                Ok(Self {
                    $( $field: decoder.field(stringify!($field))?, )*
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    crate::tool_args! {
        /// Fixture covering every supported field kind.
        struct SampleArgs {
            /// Project ID or path
            project_id: Id [required],
            /// Issue IID
            issue_iid: u64 [required],
            /// Title
            title: Option<String>,
            /// Free text
            search: String,
            /// Result limit
            limit: i64,
            /// Ratio
            ratio: f64,
            /// Whether to include internal notes
            confidential: bool,
            /// Lock discussions
            discussion_locked: OptionalBool,
            /// Issue state
            state: Option<String> [one_of = ["opened", "closed"]],
            /// Git reference
            git_ref: Option<String> [rename = "ref"],
            /// Role of the user
            role: String [required, one_of = ["author", "reviewer"]],
        }
    }

    crate::tool_args! {
        struct BrokenArgs {
            labels: Vec<String>,
            /// Count
            count: u64 [one_of = ["1", "2"]],
            /// Fine
            ok: String,
        }
    }

    crate::tool_args! {
        struct NoArgs {}
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn minimal() -> Map<String, Value> {
        args(json!({"project_id": "g/p", "issue_iid": 3, "role": "author"}))
    }

    #[test]
    fn test_non_object_arguments_name_their_kind() {
        let err = argument_map(Some(json!([1, 2]))).unwrap_err();
        assert!(err.to_string().contains("got array"), "{}", err);
        let err = String::decode(&json!(7)).unwrap_err();
        assert!(err.to_string().contains("expected string, got number"), "{}", err);
        assert!(argument_map(None).unwrap().is_empty());
    }

    #[test]
    fn test_snake_case_mapping() {
        assert_eq!(to_snake_case("Field"), "field");
        assert_eq!(to_snake_case("FieldName"), "field_name");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("ExportDNS"), "export_dns");
        assert_eq!(to_snake_case("AssigneeIDs"), "assignee_ids");
        assert_eq!(to_snake_case("IDs"), "ids");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("ProjectID"), "project_id");
    }

    #[test]
    fn test_schema_of_sample() {
        let schema = build_schema(SampleArgs::descriptor()).unwrap();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["project_id"]["type"], "string");
        assert_eq!(schema["properties"]["issue_iid"]["type"], "number");
        assert_eq!(schema["properties"]["ratio"]["type"], "number");
        assert_eq!(schema["properties"]["confidential"]["type"], "boolean");
        assert_eq!(schema["properties"]["discussion_locked"]["type"], "boolean");
        assert_eq!(
            schema["properties"]["state"]["enum"],
            json!(["opened", "closed"])
        );
        assert_eq!(schema["properties"]["ref"]["description"], "Git reference");
        assert!(schema["properties"].get("git_ref").is_none());
        assert_eq!(
            schema["required"],
            json!(["project_id", "issue_iid", "role"])
        );
    }

    #[test]
    fn test_descriptor_errors_collected() {
        let err = build_schema(BrokenArgs::descriptor()).unwrap_err();
        let Error::Descriptor(problems) = err else {
            panic!("expected descriptor error");
        };

        assert_eq!(problems.len(), 3);
        assert!(problems.iter().any(|p| p.contains("labels: unsupported sequence")));
        assert!(problems.iter().any(|p| p.contains("labels: missing description")));
        assert!(problems.iter().any(|p| p.contains("count: enum")));
    }

    #[test]
    fn test_empty_descriptor() {
        let schema = build_schema(NoArgs::descriptor()).unwrap();
        assert_eq!(schema["properties"], json!({}));
        assert_eq!(NoArgs::decode(&Map::new()).unwrap(), NoArgs {});
    }

    #[test]
    fn test_absent_optional_fields_stay_default() {
        let decoded = SampleArgs::decode(&minimal()).unwrap();

        assert_eq!(decoded.project_id, Id::parse("g/p"));
        assert_eq!(decoded.issue_iid, 3);
        assert_eq!(decoded.title, None);
        assert_eq!(decoded.search, "");
        assert_eq!(decoded.limit, 0);
        assert!(!decoded.confidential);
        assert!(!decoded.discussion_locked.is_set());
        assert_eq!(decoded.git_ref, None);
    }

    #[test]
    fn test_null_treated_as_absent() {
        let mut raw = minimal();
        raw.insert("title".into(), Value::Null);
        assert_eq!(SampleArgs::decode(&raw).unwrap().title, None);

        raw.insert("project_id".into(), Value::Null);
        assert!(matches!(
            SampleArgs::decode(&raw),
            Err(Error::MissingRequired(key)) if key == "project_id"
        ));
    }

    #[test]
    fn test_missing_required() {
        let raw = args(json!({"project_id": "1", "role": "author"}));
        let err = SampleArgs::decode(&raw).unwrap_err();
        assert!(matches!(err, Error::MissingRequired(ref key) if key == "issue_iid"));
        assert!(err.is_invalid_params());
    }

    #[test]
    fn test_renamed_field_decoded() {
        let mut raw = minimal();
        raw.insert("ref".into(), json!("main"));
        assert_eq!(
            SampleArgs::decode(&raw).unwrap().git_ref.as_deref(),
            Some("main")
        );
    }

    #[test]
    fn test_enum_membership() {
        let mut raw = minimal();
        raw.insert("state".into(), json!("merged"));
        let err = SampleArgs::decode(&raw).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(err.to_string().contains("opened, closed"));

        raw.insert("state".into(), json!("closed"));
        assert_eq!(
            SampleArgs::decode(&raw).unwrap().state.as_deref(),
            Some("closed")
        );
    }

    #[test]
    fn test_numeric_coercions() {
        let mut raw = minimal();
        raw.insert("issue_iid".into(), json!(7.9));
        raw.insert("limit".into(), json!(-3.5));
        raw.insert("ratio".into(), json!(2));
        let decoded = SampleArgs::decode(&raw).unwrap();
        assert_eq!(decoded.issue_iid, 7);
        assert_eq!(decoded.limit, -3);
        assert_eq!(decoded.ratio, 2.0);
    }

    #[test]
    fn test_negative_into_unsigned_rejected() {
        let mut raw = minimal();
        raw.insert("issue_iid".into(), json!(-1));
        let err = SampleArgs::decode(&raw).unwrap_err();
        assert!(err.is_invalid_params());
        assert!(err.to_string().contains("negative"));

        raw.insert("issue_iid".into(), json!(-0.5));
        assert!(SampleArgs::decode(&raw).is_err());
    }

    #[test]
    fn test_string_number_not_coerced() {
        let mut raw = minimal();
        raw.insert("issue_iid".into(), json!("42"));
        assert!(SampleArgs::decode(&raw).unwrap_err().is_invalid_params());

        let mut raw = minimal();
        raw.insert("search".into(), json!(42));
        assert!(SampleArgs::decode(&raw).is_err());
    }

    #[test]
    fn test_structured_values_rejected() {
        let mut raw = minimal();
        raw.insert("title".into(), json!({"nested": true}));
        assert!(SampleArgs::decode(&raw).is_err());

        let mut raw = minimal();
        raw.insert("limit".into(), json!([1, 2]));
        assert!(SampleArgs::decode(&raw).is_err());
    }

    #[test]
    fn test_scalar_hooks() {
        let mut raw = minimal();
        raw.insert("project_id".into(), json!(12));
        let err = SampleArgs::decode(&raw).unwrap_err();
        assert!(err.to_string().contains("argument project_id"));
        assert!(err.is_invalid_params());

        let mut raw = minimal();
        raw.insert("discussion_locked".into(), json!(false));
        let decoded = SampleArgs::decode(&raw).unwrap();
        assert_eq!(decoded.discussion_locked.get(), Some(false));

        raw.insert("discussion_locked".into(), json!(1));
        let decoded = SampleArgs::decode(&raw).unwrap();
        assert_eq!(decoded.discussion_locked.get(), None);
    }

    #[test]
    fn test_argument_map() {
        assert!(argument_map(None).unwrap().is_empty());
        assert!(argument_map(Some(Value::Null)).unwrap().is_empty());
        assert_eq!(argument_map(Some(json!({"a": 1}))).unwrap().len(), 1);
        assert!(matches!(
            argument_map(Some(json!([1]))),
            Err(Error::InvalidType(_))
        ));
    }
}
