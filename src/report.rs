use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Nested validation failure mirroring the payload's nesting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub property: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub constraints: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ValidationError>,
}

/// Constraint names used in `ValidationError::constraints`.
pub mod rule {
    pub const IS_STRING: &str = "isString";
    pub const IS_NUMBER: &str = "isNumber";
    pub const IS_BOOLEAN: &str = "isBoolean";
    pub const IS_STRING_ARRAY: &str = "isStringArray";
    pub const IS_ARRAY: &str = "isArray";
    pub const IS_OBJECT: &str = "isObject";
    pub const IS_IN: &str = "isIn";
    pub const EQUALS: &str = "equals";
    pub const REQUIRED: &str = "required";
    pub const DISCRIMINATOR: &str = "discriminator";
    pub const UNKNOWN_TYPE: &str = "unknownType";
    pub const SCHEMA_NOT_FOUND: &str = "schemaNotFound";
}

pub const MISSING_REQUIRED: &str = "missing required field";

impl ValidationError {
    pub fn leaf(property: impl Into<String>, rule: &str, message: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            constraints: IndexMap::from([(rule.to_string(), message.into())]),
            children: Vec::new(),
        }
    }

    pub fn nested(property: impl Into<String>, children: Vec<ValidationError>) -> Self {
        Self { property: property.into(), constraints: IndexMap::new(), children }
    }

    pub fn missing(property: impl Into<String>) -> Self {
        Self::leaf(property, rule::REQUIRED, MISSING_REQUIRED)
    }

    pub fn child(&self, property: &str) -> Option<&ValidationError> {
        self.children.iter().find(|c| c.property == property)
    }

    /// Follows a dotted path of child properties, e.g. `config.model`.
    pub fn find(&self, path: &str) -> Option<&ValidationError> {
        path.split('.').try_fold(self, |node, segment| node.child(segment))
    }

    /// Leaf messages with their dotted paths, depth first.
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.collect_leaves(&self.property, &mut out);
        out
    }

    fn collect_leaves(&self, path: &str, out: &mut Vec<(String, String)>) {
        for message in self.constraints.values() {
            out.push((path.to_string(), message.clone()));
        }
        for child in &self.children {
            let child_path = if path.is_empty() {
                child.property.clone()
            } else {
                format!("{path}.{}", child.property)
            };
            child.collect_leaves(&child_path, out);
        }
    }
}

/// Finds a top-level error by dotted path across a list of errors.
pub fn find<'a>(errors: &'a [ValidationError], path: &str) -> Option<&'a ValidationError> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let top = errors.iter().find(|e| e.property == head)?;
    match rest {
        Some(rest) => top.find(rest),
        None => Some(top),
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let leaves = self.flatten();
        for (i, (path, message)) in leaves.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{path}: {message}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ValidationError {
        ValidationError::nested("config", vec![
            ValidationError::missing("model"),
            ValidationError::nested("limits", vec![
                ValidationError::leaf("max", rule::IS_NUMBER, "must be a number"),
            ]),
        ])
    }

    #[test]
    fn find_follows_dotted_paths() {
        let err = sample();
        assert_eq!(err.find("model").unwrap().constraints[rule::REQUIRED], MISSING_REQUIRED);
        assert!(err.find("limits.max").is_some());
        assert!(err.find("limits.min").is_none());
        let all = vec![err];
        assert!(find(&all, "config.limits.max").is_some());
    }

    #[test]
    fn flatten_and_display() {
        let err = sample();
        assert_eq!(err.flatten(), vec![
            ("config.model".to_string(), MISSING_REQUIRED.to_string()),
            ("config.limits.max".to_string(), "must be a number".to_string()),
        ]);
        assert_eq!(err.to_string(), "config.model: missing required field; config.limits.max: must be a number");
    }

    #[test]
    fn serializes_without_empty_parts() {
        let v = serde_json::to_value(ValidationError::missing("name")).unwrap();
        assert_eq!(v, serde_json::json!({ "property": "name", "constraints": { "required": "missing required field" } }));
    }
}
