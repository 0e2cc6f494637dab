//! Declarative settings schema
//!
//! A schema maps every setting key to a [`FieldRule`]. Rules are written in
//! JSON the same way validator schemas usually are:
//!
//! ```json
//! {
//!   "size": { "type": "number", "default": 25, "min": 10, "max": 40 },
//!   "theme": { "type": "string", "default": "light", "enum": ["light", "dark"] }
//! }
//! ```
//!
//! Every rule must carry a default. Validation messages use the wording
//! "The 'size' field must be less than or equal to 40.".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SettingsError};

/// Value type accepted by a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    /// One of the rule's `values`
    Enum,
    #[default]
    Any,
}

/// Constraints for one setting
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldRule {
    #[serde(rename = "type")]
    pub kind: FieldType,
    pub default: Value,
    /// Lower bound: the value for numbers, the length for strings and arrays
    #[serde(alias = "minLength", skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound: the value for numbers, the length for strings and arrays
    #[serde(alias = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub integer: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub positive: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub negative: bool,
    /// Allowed values for `enum` rules and string rules
    #[serde(alias = "enum", skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

impl FieldRule {
    pub fn new(kind: FieldType, default: impl Into<Value>) -> Self {
        Self {
            kind,
            default: default.into(),
            ..Self::default()
        }
    }

    pub fn string(default: impl Into<String>) -> Self {
        Self::new(FieldType::String, default.into())
    }

    pub fn number(default: impl Into<serde_json::Number>) -> Self {
        Self::new(FieldType::Number, Value::Number(default.into()))
    }

    pub fn boolean(default: bool) -> Self {
        Self::new(FieldType::Boolean, default)
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn integer(mut self) -> Self {
        self.integer = true;
        self
    }

    pub fn positive(mut self) -> Self {
        self.positive = true;
        self
    }

    pub fn negative(mut self) -> Self {
        self.negative = true;
        self
    }

    pub fn with_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Messages for every constraint `value` breaks
    pub fn check(&self, field: &str, value: &Value) -> Vec<String> {
        let mut errors = Vec::new();
        let mut fail = |message: String| errors.push(message);

        match self.kind {
            FieldType::Any => {}
            FieldType::String => match value.as_str() {
                None => fail(format!("The '{}' field must be a string.", field)),
                Some(text) => {
                    let length = text.chars().count() as f64;
                    if let Some(min) = self.min.filter(|min| length < *min) {
                        fail(format!(
                            "The '{}' field length must be greater than or equal to {} characters long.",
                            field,
                            format_number(min)
                        ));
                    }
                    if let Some(max) = self.max.filter(|max| length > *max) {
                        fail(format!(
                            "The '{}' field length must be less than or equal to {} characters long.",
                            field,
                            format_number(max)
                        ));
                    }
                    if let Some(values) = &self.values {
                        if !values.contains(value) {
                            fail(format!("The '{}' field does not match any of the allowed values.", field));
                        }
                    }
                }
            },
            FieldType::Number => match value.as_f64() {
                None => fail(format!("The '{}' field must be a number.", field)),
                Some(number) => {
                    if let Some(min) = self.min.filter(|min| number < *min) {
                        fail(format!(
                            "The '{}' field must be greater than or equal to {}.",
                            field,
                            format_number(min)
                        ));
                    }
                    if let Some(max) = self.max.filter(|max| number > *max) {
                        fail(format!(
                            "The '{}' field must be less than or equal to {}.",
                            field,
                            format_number(max)
                        ));
                    }
                    if self.integer && number.fract() != 0.0 {
                        fail(format!("The '{}' field must be an integer.", field));
                    }
                    if self.positive && number <= 0.0 {
                        fail(format!("The '{}' field must be a positive number.", field));
                    }
                    if self.negative && number >= 0.0 {
                        fail(format!("The '{}' field must be a negative number.", field));
                    }
                }
            },
            FieldType::Boolean => {
                if !value.is_boolean() {
                    fail(format!("The '{}' field must be a boolean.", field));
                }
            }
            FieldType::Array => match value.as_array() {
                None => fail(format!("The '{}' field must be an array.", field)),
                Some(items) => {
                    let count = items.len() as f64;
                    if let Some(min) = self.min.filter(|min| count < *min) {
                        fail(format!(
                            "The '{}' field must contain at least {} items.",
                            field,
                            format_number(min)
                        ));
                    }
                    if let Some(max) = self.max.filter(|max| count > *max) {
                        fail(format!(
                            "The '{}' field must contain less than or equal to {} items.",
                            field,
                            format_number(max)
                        ));
                    }
                }
            },
            FieldType::Object => {
                if !value.is_object() {
                    fail(format!("The '{}' field must be an Object.", field));
                }
            }
            FieldType::Enum => {
                let values = self.values.as_deref().unwrap_or_default();
                if !values.contains(value) {
                    let allowed: Vec<String> = values.iter().map(display_value).collect();
                    fail(format!(
                        "The '{}' field value '{}' does not match any of the allowed values.",
                        field,
                        allowed.join(",")
                    ));
                }
            }
        }
        errors
    }
}

/// A broken constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Rules for every known setting
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    rules: BTreeMap<String, FieldRule>,
}

impl Schema {
    /// Build a schema; it must define at least one setting and every
    /// required rule needs a non-null default
    pub fn new(rules: impl IntoIterator<Item = (impl Into<String>, FieldRule)>) -> Result<Self> {
        let rules: BTreeMap<String, FieldRule> = rules.into_iter().map(|(k, v)| (k.into(), v)).collect();
        if rules.is_empty() {
            return Err(SettingsError::InvalidSchema("The schema cannot be empty.".to_string()));
        }
        if let Some((key, _)) = rules.iter().find(|(_, rule)| rule.default.is_null() && !rule.optional) {
            return Err(SettingsError::InvalidSchema(format!(
                "The key '{}' does not have a default value",
                key
            )));
        }
        Ok(Self { rules })
    }

    /// Parse a JSON schema; every rule needs a `default`
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Map<String, Value> = serde_json::from_str(json)?;
        let mut rules = BTreeMap::new();
        for (key, rule) in raw {
            if rule.get("default").is_none() {
                return Err(SettingsError::InvalidSchema(format!(
                    "The key '{}' does not have a default value",
                    key
                )));
            }
            rules.insert(key, serde_json::from_value(rule)?);
        }
        Self::new(rules)
    }

    pub fn rule(&self, key: &str) -> Option<&FieldRule> {
        self.rules.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.rules.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Default value of every setting
    pub fn defaults(&self) -> Map<String, Value> {
        self.rules
            .iter()
            .map(|(key, rule)| (key.clone(), rule.default.clone()))
            .collect()
    }

    /// Errors for a single value; unknown keys are accepted
    pub fn validate_value(&self, key: &str, value: &Value) -> Vec<String> {
        match self.rules.get(key) {
            Some(rule) if value.is_null() => missing(key, rule).into_iter().collect(),
            Some(rule) => rule.check(key, value),
            None => Vec::new(),
        }
    }

    /// Validate a whole settings object
    ///
    /// Missing and `null` values are filled in with their defaults before
    /// checking. Keys the schema does not know are left alone.
    pub fn check(&self, settings: &mut Map<String, Value>) -> Vec<FieldError> {
        let mut errors = Vec::new();
        for (key, rule) in &self.rules {
            let present = settings.get(key).is_some_and(|v| !v.is_null());
            if !present && !rule.default.is_null() {
                settings.insert(key.clone(), rule.default.clone());
                continue;
            }
            let messages = match settings.get(key) {
                Some(value) if !value.is_null() => rule.check(key, value),
                _ => missing(key, rule).into_iter().collect(),
            };
            errors.extend(messages.into_iter().map(|message| FieldError {
                field: key.clone(),
                message,
            }));
        }
        errors
    }
}

fn missing(key: &str, rule: &FieldRule) -> Option<String> {
    if rule.optional || !rule.default.is_null() {
        None
    } else {
        Some(format!("The '{}' field is required.", key))
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::from_json(
            r#"{
                "size": { "type": "number", "default": 25, "min": 10, "max": 40 },
                "theme": { "type": "string", "default": "light", "enum": ["light", "dark"] },
                "name": { "type": "string", "default": "docxmill", "minLength": 2 },
                "dark": { "type": "boolean", "default": false },
                "mode": { "type": "enum", "default": "a", "values": ["a", "b"] }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_number_bounds() {
        let schema = schema();
        assert_eq!(
            schema.validate_value("size", &json!(41)),
            vec!["The 'size' field must be less than or equal to 40."]
        );
        assert_eq!(
            schema.validate_value("size", &json!(9.5)),
            vec!["The 'size' field must be greater than or equal to 10."]
        );
        assert!(schema.validate_value("size", &json!(40)).is_empty());
        assert_eq!(
            schema.validate_value("size", &json!("big")),
            vec!["The 'size' field must be a number."]
        );
    }

    #[test]
    fn test_string_rules() {
        let schema = schema();
        assert_eq!(
            schema.validate_value("theme", &json!("blue")),
            vec!["The 'theme' field does not match any of the allowed values."]
        );
        assert_eq!(
            schema.validate_value("name", &json!("x")),
            vec!["The 'name' field length must be greater than or equal to 2 characters long."]
        );
        assert_eq!(
            schema.validate_value("dark", &json!(1)),
            vec!["The 'dark' field must be a boolean."]
        );
        assert_eq!(
            schema.validate_value("mode", &json!("c")),
            vec!["The 'mode' field value 'a,b' does not match any of the allowed values."]
        );
    }

    #[test]
    fn test_unknown_keys_are_accepted() {
        assert!(schema().validate_value("other", &json!(1)).is_empty());
    }

    #[test]
    fn test_check_fills_missing_values() {
        let schema = schema();
        let mut settings = json!({"size": 50, "extra": true}).as_object().unwrap().clone();
        let errors = schema.check(&mut settings);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "size");
        assert_eq!(settings["theme"], json!("light"));
        assert_eq!(settings["extra"], json!(true));
    }

    #[test]
    fn test_integer_and_sign() {
        let rule = FieldRule::number(1).integer().positive();
        assert_eq!(
            rule.check("n", &json!(-1.5)),
            vec![
                "The 'n' field must be an integer.".to_string(),
                "The 'n' field must be a positive number.".to_string()
            ]
        );
        let rule = FieldRule::number(-1).negative();
        assert_eq!(rule.check("n", &json!(0)), vec!["The 'n' field must be a negative number."]);
    }

    #[test]
    fn test_array_length() {
        let rule = FieldRule::new(FieldType::Array, json!([])).with_max(1.0);
        assert_eq!(
            rule.check("list", &json!([1, 2])),
            vec!["The 'list' field must contain less than or equal to 1 items."]
        );
    }

    #[test]
    fn test_invalid_schemas() {
        let err = Schema::from_json("{}").unwrap_err();
        assert_eq!(err.to_string(), "Invalid schema: The schema cannot be empty.");

        let err = Schema::from_json(r#"{"size": {"type": "number"}}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid schema: The key 'size' does not have a default value"
        );

        let err = Schema::from_json(r#"{"size": {"type": "number", "default": null}}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid schema: The key 'size' does not have a default value"
        );
        let err = Schema::new([("theme", FieldRule::new(FieldType::String, Value::Null))]).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidSchema(_)));
    }

    #[test]
    fn test_optional_rule_may_default_to_null() {
        let schema = Schema::new([("proxy", FieldRule::new(FieldType::String, Value::Null).optional())]).unwrap();
        assert_eq!(schema.defaults()["proxy"], Value::Null);
        let schema = Schema::from_json(r#"{"proxy": {"type": "string", "default": null, "optional": true}}"#).unwrap();
        assert!(schema.contains("proxy"));
    }

    #[test]
    fn test_defaults() {
        let defaults = schema().defaults();
        assert_eq!(defaults["size"], json!(25));
        assert_eq!(defaults.len(), 5);
    }
}
