//! Attribute schemas
//!
//! Each resource kind declares its attributes up front: the value type, who
//! may set it (the operator, the remote system, or both), whether a change
//! forces replacement, and whether a prior value should be carried forward
//! when the operator leaves it unset.
//!
//! Attribute values are handled as `serde_json::Value`s so that validation,
//! planning and comparison work the same way for every kind.

use serde_json::{Map, Value};
use std::fmt;

/// Who may set an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    /// The operator must supply a value.
    Required,
    /// The operator may supply a value; nobody else does.
    Optional,
    /// The operator may supply a value; otherwise the remote system does.
    OptionalComputed,
    /// Only the remote system supplies a value.
    Computed,
}

impl Mutability {
    /// Whether the remote system may supply the value.
    pub fn is_computed(&self) -> bool {
        matches!(self, Self::OptionalComputed | Self::Computed)
    }

    /// Whether the operator may supply the value.
    pub fn is_settable(&self) -> bool {
        !matches!(self, Self::Computed)
    }
}

/// Value type of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Bool,
    /// Ordered collection; order is significant.
    List(Box<AttributeType>),
    /// Unordered collection; membership is significant, order is not.
    Set(Box<AttributeType>),
    /// Nested object with its own attributes.
    Object(Schema),
}

impl AttributeType {
    /// Short type name used in diagnostics.
    pub fn name(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Bool => "bool".to_string(),
            Self::List(inner) => format!("list({})", inner.name()),
            Self::Set(inner) => format!("set({})", inner.name()),
            Self::Object(_) => "object".to_string(),
        }
    }

    fn check(&self, path: &str, value: &Value, diagnostics: &mut Vec<Diagnostic>) {
        match (self, value) {
            (Self::String, Value::String(_)) | (Self::Bool, Value::Bool(_)) => {}
            (Self::List(inner) | Self::Set(inner), Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.check(&format!("{path}[{i}]"), item, diagnostics);
                }
            }
            (Self::Object(schema), Value::Object(_)) => {
                schema.validate_at(path, value, diagnostics);
            }
            _ => diagnostics.push(Diagnostic::new(
                path,
                format!("expected {}, found {}", self.name(), kind_of(value)),
            )),
        }
    }

    /// Canonical form used for comparison.
    ///
    /// Sets are sorted and deduplicated and null object members are dropped,
    /// so equivalent values compare equal however they were written.
    fn normalize(&self, value: &Value) -> Value {
        match (self, value) {
            (Self::List(inner), Value::Array(items)) => {
                Value::Array(items.iter().map(|v| inner.normalize(v)).collect())
            }
            (Self::Set(inner), Value::Array(items)) => {
                let mut normalized: Vec<Value> = items.iter().map(|v| inner.normalize(v)).collect();
                normalized.sort_by_key(Value::to_string);
                normalized.dedup();
                Value::Array(normalized)
            }
            (Self::Object(schema), Value::Object(map)) => {
                let mut out = Map::new();
                for (name, v) in map {
                    if v.is_null() {
                        continue;
                    }
                    let v = match schema.get(name) {
                        Some(attr) => attr.ty.normalize(v),
                        None => v.clone(),
                    };
                    out.insert(name.clone(), v);
                }
                Value::Object(out)
            }
            _ => value.clone(),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}

/// A single declared attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub ty: AttributeType,
    pub mutability: Mutability,
    /// A changed value forces delete-then-create instead of update.
    pub requires_replace: bool,
    /// Carry the prior value forward when the operator leaves it unset.
    pub use_state_for_unknown: bool,
    /// What the attribute holds; quoted in validation messages.
    pub description: Option<&'static str>,
}

impl Attribute {
    pub fn new(ty: AttributeType, mutability: Mutability) -> Self {
        Self {
            ty,
            mutability,
            requires_replace: false,
            use_state_for_unknown: false,
            description: None,
        }
    }

    pub fn required_string() -> Self {
        Self::new(AttributeType::String, Mutability::Required)
    }

    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, Mutability::Optional)
    }

    pub fn optional_computed_string() -> Self {
        Self::new(AttributeType::String, Mutability::OptionalComputed)
    }

    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, Mutability::Computed)
    }

    pub fn optional_computed_bool() -> Self {
        Self::new(AttributeType::Bool, Mutability::OptionalComputed)
    }

    pub fn computed_bool() -> Self {
        Self::new(AttributeType::Bool, Mutability::Computed)
    }

    /// Mark the attribute as a replace-trigger.
    pub fn requires_replace(mut self) -> Self {
        self.requires_replace = true;
        self
    }

    /// Keep the prior value when the operator supplies none.
    pub fn use_state_for_unknown(mut self) -> Self {
        self.use_state_for_unknown = true;
        self
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }
}

/// A validation problem with one attribute of a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Attribute path, e.g. `roles[0].role`.
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// The attribute set of a resource kind, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    attributes: Vec<(String, Attribute)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute, replacing any earlier one of the same name.
    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        let name = name.into();
        self.attributes.retain(|(n, _)| *n != name);
        self.attributes.push((name, attribute));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Validate a declared configuration.
    ///
    /// Reports, per attribute: missing required values, values set on
    /// computed-only attributes, values of the wrong type, and attributes the
    /// schema does not know. Nested objects are checked recursively.
    pub fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        self.validate_at("", config, &mut diagnostics);
        diagnostics
    }

    fn validate_at(&self, prefix: &str, config: &Value, diagnostics: &mut Vec<Diagnostic>) {
        let path = |name: &str| {
            if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}.{name}")
            }
        };

        let Some(map) = config.as_object() else {
            diagnostics.push(Diagnostic::new(
                prefix,
                format!("expected a table of attributes, found {}", kind_of(config)),
            ));
            return;
        };

        for name in map.keys() {
            if self.get(name).is_none() {
                diagnostics.push(Diagnostic::new(path(name), "unsupported attribute"));
            }
        }

        for (name, attr) in self.iter() {
            match map.get(name).filter(|v| !v.is_null()) {
                None if attr.mutability == Mutability::Required => {
                    let message = match attr.description {
                        Some(description) => {
                            format!("required attribute is missing ({description})")
                        }
                        None => "required attribute is missing".to_string(),
                    };
                    diagnostics.push(Diagnostic::new(path(name), message));
                }
                None => {}
                Some(_) if !attr.mutability.is_settable() => {
                    diagnostics.push(Diagnostic::new(
                        path(name),
                        "attribute is computed by the remote system and cannot be set",
                    ));
                }
                Some(value) => attr.ty.check(&path(name), value, diagnostics),
            }
        }
    }

    /// Compare two values of the named attribute.
    ///
    /// Null and absent are equal; sets compare by membership.
    pub fn values_equal(&self, name: &str, a: Option<&Value>, b: Option<&Value>) -> bool {
        let a = a.unwrap_or(&Value::Null);
        let b = b.unwrap_or(&Value::Null);
        match self.get(name) {
            Some(attr) => attr.ty.normalize(a) == attr.ty.normalize(b),
            None => a == b,
        }
    }

    /// Replace-trigger attributes whose planned value is known and differs
    /// from the prior value.
    pub fn replace_triggers(&self, prior: &Value, planned: &Value) -> Vec<String> {
        self.iter()
            .filter(|(_, attr)| attr.requires_replace)
            .filter_map(|(name, _)| {
                let after = planned.get(name).filter(|v| !v.is_null())?;
                (!self.values_equal(name, prior.get(name), Some(after))).then(|| name.to_string())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn role_schema() -> Schema {
        Schema::new()
            .with_attribute("role", Attribute::required_string())
            .with_attribute("organization", Attribute::optional_string())
    }

    fn user_schema() -> Schema {
        Schema::new()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("email", Attribute::required_string().requires_replace())
            .with_attribute(
                "roles",
                Attribute::new(
                    AttributeType::Set(Box::new(AttributeType::Object(role_schema()))),
                    Mutability::Required,
                ),
            )
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        let config = json!({ "email": "a@example.com", "roles": [{ "role": "r1" }] });
        assert!(user_schema().validate(&config).is_empty());
    }

    #[test]
    fn test_validate_reports_missing_required() {
        let diagnostics = user_schema().validate(&json!({ "roles": [] }));
        assert_eq!(diagnostics, vec![Diagnostic::new("email", "required attribute is missing")]);
    }

    #[test]
    fn test_missing_required_quotes_description() {
        let schema = Schema::new().with_attribute(
            "tenant_id",
            Attribute::required_string().with_description("AAD tenant ID"),
        );
        let diagnostics = schema.validate(&json!({}));
        assert_eq!(
            diagnostics[0].to_string(),
            "tenant_id: required attribute is missing (AAD tenant ID)"
        );
    }

    #[test]
    fn test_validate_rejects_computed_only() {
        let config = json!({ "id": "x", "email": "a@example.com", "roles": [] });
        let diagnostics = user_schema().validate(&config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].path, "id");
    }

    #[test]
    fn test_validate_nested_role_requires_role() {
        let config = json!({ "email": "a@example.com", "roles": [{ "organization": "o1" }] });
        let diagnostics = user_schema().validate(&config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].path, "roles[0].role");
    }

    #[test]
    fn test_validate_type_mismatch_and_unknown_attribute() {
        let config = json!({ "email": true, "roles": [], "colour": "blue" });
        let diagnostics = user_schema().validate(&config);
        let paths: Vec<&str> = diagnostics.iter().map(|d| d.path.as_str()).collect();
        assert!(paths.contains(&"colour"));
        assert!(paths.contains(&"email"));
        assert!(diagnostics.iter().any(|d| d.message.contains("expected string")));
    }

    #[test]
    fn test_sets_compare_by_membership() {
        let schema = user_schema();
        let a = json!([{ "role": "r1" }, { "role": "r2", "organization": "o1" }]);
        let b = json!([
            { "role": "r2", "organization": "o1" },
            { "role": "r1", "organization": null }
        ]);
        assert!(schema.values_equal("roles", Some(&a), Some(&b)));

        let c = json!([{ "role": "r2" }, { "role": "r1" }]);
        assert!(!schema.values_equal("roles", Some(&a), Some(&c)));
    }

    #[test]
    fn test_lists_compare_by_order() {
        let schema = Schema::new().with_attribute(
            "organizations",
            Attribute::new(
                AttributeType::List(Box::new(AttributeType::String)),
                Mutability::OptionalComputed,
            ),
        );
        let a = json!(["o1", "o2"]);
        let b = json!(["o2", "o1"]);
        assert!(!schema.values_equal("organizations", Some(&a), Some(&b)));
    }

    #[test]
    fn test_null_equals_absent() {
        let schema = user_schema();
        assert!(schema.values_equal("id", None, Some(&Value::Null)));
    }

    #[test]
    fn test_replace_triggers_ignore_unknown_values() {
        let schema = user_schema();
        let prior = json!({ "id": "u1", "email": "a@example.com" });
        assert!(schema
            .replace_triggers(&prior, &json!({ "id": null, "email": "a@example.com" }))
            .is_empty());
        assert_eq!(
            schema.replace_triggers(&prior, &json!({ "email": "b@example.com" })),
            vec!["email".to_string()]
        );
    }

    #[test]
    fn test_with_attribute_replaces_duplicate() {
        let schema = Schema::new()
            .with_attribute("a", Attribute::optional_string())
            .with_attribute("a", Attribute::required_string());
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.get("a").unwrap().mutability, Mutability::Required);
    }
}
