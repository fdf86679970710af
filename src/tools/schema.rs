use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::ToolError;

// ── Parameter schema ──────────────────────────────────────────────────────────

/// JSON types a tool parameter can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Array => write!(f, "array"),
            Self::Object => write!(f, "object"),
        }
    }
}

/// A single parameter in a tool's input schema
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    pub description: String,
    pub required: bool,
    /// Applied when the caller omits the argument
    pub default: Option<Value>,
    /// Allowed values; empty means unrestricted
    pub allowed: Vec<Value>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, ty: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            description: description.into(),
            required: false,
            default: None,
            allowed: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::String, description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::Integer, description)
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::Number, description)
    }

    pub fn array(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::Array, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    fn check(&self, value: &Value) -> Result<(), ToolError> {
        if !self.ty.matches(value) {
            return Err(ToolError::invalid(format!(
                "argument '{}' must be of type {}",
                self.name, self.ty
            )));
        }

        if !self.allowed.is_empty() && !self.allowed.contains(value) {
            let allowed: Vec<String> = self.allowed.iter().map(Value::to_string).collect();
            return Err(ToolError::invalid(format!(
                "argument '{}' must be one of [{}], got {}",
                self.name,
                allowed.join(", "),
                value
            )));
        }

        Ok(())
    }

    fn to_json(&self) -> Value {
        let mut schema = json!({
            "type": self.ty,
            "description": self.description,
        });
        if !self.allowed.is_empty() {
            schema["enum"] = Value::Array(self.allowed.clone());
        }
        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        schema
    }
}

// ── Input schema ──────────────────────────────────────────────────────────────

/// The accepted arguments of a tool, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchema {
    pub params: Vec<ParamSpec>,
}

impl InputSchema {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self { params }
    }

    /// Render as a JSON Schema object, the shape tool-listing callers expect
    pub fn to_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.to_json()))
            .collect();

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check `args` against the schema and fill in defaults.
    ///
    /// Keys the schema does not mention are passed through untouched.
    pub fn validate(&self, args: &Value) -> Result<Arguments, ToolError> {
        let mut values = match args {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            other => {
                return Err(ToolError::invalid(format!(
                    "arguments must be a JSON object, got {}",
                    kind_of(other)
                )));
            }
        };

        for param in &self.params {
            match values.get(&param.name) {
                Some(value) if !value.is_null() => param.check(value)?,
                _ => {
                    if let Some(default) = &param.default {
                        values.insert(param.name.clone(), default.clone());
                    } else if param.required {
                        return Err(ToolError::invalid(format!(
                            "missing required argument '{}'",
                            param.name
                        )));
                    } else {
                        values.remove(&param.name);
                    }
                }
            }
        }

        for key in values.keys() {
            if !self.params.iter().any(|p| &p.name == key) {
                debug!(argument = %key, "passing through undeclared argument");
            }
        }

        Ok(Arguments(values))
    }
}

impl Serialize for InputSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Validated arguments ───────────────────────────────────────────────────────

/// Arguments that passed schema validation, with defaults applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn str(&self, key: &str) -> Result<&str, ToolError> {
        self.opt_str(key)
            .ok_or_else(|| ToolError::invalid(format!("missing string argument '{}'", key)))
    }

    pub fn opt_str(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.as_str()
    }

    pub fn i64(&self, key: &str) -> Result<i64, ToolError> {
        self.opt_i64(key)
            .ok_or_else(|| ToolError::invalid(format!("missing integer argument '{}'", key)))
    }

    pub fn opt_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key)?.as_i64()
    }

    pub fn f64(&self, key: &str) -> Result<f64, ToolError> {
        self.0
            .get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| ToolError::invalid(format!("missing number argument '{}'", key)))
    }

    /// An array argument whose items must all be strings
    pub fn string_list(&self, key: &str) -> Result<Vec<String>, ToolError> {
        let items = self
            .0
            .get(key)
            .and_then(Value::as_array)
            .ok_or_else(|| ToolError::invalid(format!("missing array argument '{}'", key)))?;

        items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    ToolError::invalid(format!("argument '{}' must contain only strings", key))
                })
            })
            .collect()
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forecast_schema() -> InputSchema {
        InputSchema::new(vec![
            ParamSpec::string("location", "Where").required(),
            ParamSpec::integer("days", "How many days").with_default(7),
            ParamSpec::string("season", "Season")
                .one_of(["rainy", "dry"])
                .with_default("rainy"),
            ParamSpec::string("note", "Optional note"),
        ])
    }

    #[test]
    fn renders_json_schema() {
        let schema = forecast_schema().to_json();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["location"]));
        assert_eq!(schema["properties"]["days"]["type"], "integer");
        assert_eq!(schema["properties"]["days"]["default"], 7);
        assert_eq!(schema["properties"]["season"]["enum"], json!(["rainy", "dry"]));
        assert!(schema["properties"]["note"].get("default").is_none());
    }

    #[test]
    fn applies_defaults_and_keeps_given_values() {
        let args = forecast_schema()
            .validate(&json!({"location": "Gbarnga", "days": 3}))
            .unwrap();
        assert_eq!(args.str("location").unwrap(), "Gbarnga");
        assert_eq!(args.i64("days").unwrap(), 3);
        assert_eq!(args.str("season").unwrap(), "rainy");
        assert!(args.get("note").is_none());
    }

    #[test]
    fn rejects_missing_required() {
        let err = forecast_schema().validate(&json!({})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: missing required argument 'location'"
        );
    }

    #[test]
    fn null_arguments_behave_like_empty_object() {
        let err = forecast_schema().validate(&Value::Null).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));

        let empty = InputSchema::default().validate(&Value::Null).unwrap();
        assert_eq!(empty, Arguments::default());
    }

    #[test]
    fn explicit_null_falls_back_to_default() {
        let args = forecast_schema()
            .validate(&json!({"location": "Kakata", "days": null}))
            .unwrap();
        assert_eq!(args.i64("days").unwrap(), 7);
    }

    #[test]
    fn rejects_wrong_type() {
        let err = forecast_schema()
            .validate(&json!({"location": 42}))
            .unwrap_err();
        assert!(err.to_string().contains("'location' must be of type string"));

        let err = forecast_schema()
            .validate(&json!({"location": "x", "days": 2.5}))
            .unwrap_err();
        assert!(err.to_string().contains("'days' must be of type integer"));
    }

    #[test]
    fn rejects_value_outside_enum() {
        let err = forecast_schema()
            .validate(&json!({"location": "x", "season": "winter"}))
            .unwrap_err();
        assert!(err.to_string().contains("must be one of"));
        assert!(err.to_string().contains("\"winter\""));
    }

    #[test]
    fn rejects_non_object_arguments() {
        let err = forecast_schema().validate(&json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("must be a JSON object, got array"));
    }

    #[test]
    fn passes_through_undeclared_keys() {
        let args = forecast_schema()
            .validate(&json!({"location": "x", "extra": true}))
            .unwrap();
        assert_eq!(args.get("extra"), Some(&json!(true)));
    }

    #[test]
    fn string_list_rejects_mixed_items() {
        let args = Arguments::from(json!({"codes": ["LRD", 3]}).as_object().cloned().unwrap());
        assert!(args.string_list("codes").is_err());
    }
}
