//! Validator synthesis: `ir::Node` in, pure validator out.
//!
//! A `Validator` pairs a pass/fail rule with a message shape. Scalar nodes
//! carry a text message; objects and discriminated unions carry a per-field
//! map so failures can be reported as a tree that mirrors the payload.
use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::ir::{Literal, Node, ObjectSchema, Primitive, VariantUnion};
use crate::norm::object_to_array;
use crate::report::{rule, ValidationError};

pub const DEFAULT_DISCRIMINATOR: &str = "provider";
pub const UNKNOWN_MESSAGE: &str = "type is unknown or not validated";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SynthOptions {
    /// Tag field used when a union has no configured key and none can be inferred.
    pub default_discriminator: String,
    /// Explicit tag field per union alias name.
    pub discriminators: HashMap<String, String>,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self { default_discriminator: DEFAULT_DISCRIMINATOR.to_string(), discriminators: HashMap::new() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Text(String),
    Fields(IndexMap<String, Message>),
    Items(Box<Message>), // shape of every array element
}

#[derive(Debug, Clone)]
pub struct Validator {
    rule: Rule,
    message: Message,
}

#[derive(Debug, Clone)]
enum Rule {
    Primitive(Primitive),
    StringArray,
    OneOf(Vec<Literal>),
    Exact(Literal),
    Items(Box<Validator>),
    Nullable(Box<Validator>),
    Object(Vec<FieldRule>),
    Variants(VariantRule),
    Unknown,
}

#[derive(Debug, Clone)]
struct FieldRule {
    name: String,
    required: bool,
    validator: Validator,
}

#[derive(Debug, Clone)]
struct VariantRule {
    key: String,
    arms: Vec<(Literal, Vec<FieldRule>)>,
}

// ------------------------------- Synthesis -------------------------------- //

pub fn infer_validator(node: &Node) -> Validator {
    infer_validator_with(node, &SynthOptions::default())
}

pub fn infer_validator_with(node: &Node, options: &SynthOptions) -> Validator {
    match node {
        Node::Primitive { of } => Validator { rule: Rule::Primitive(*of), message: text(primitive_message(*of)) },
        Node::StringArray => Validator { rule: Rule::StringArray, message: text("must be an array of strings") },
        Node::LiteralEnum { allowed } => {
            let lits: Vec<Literal> = allowed.iter().cloned().map(Literal::String).collect();
            one_of(lits)
        }
        Node::Literal { value } => Validator {
            message: text(format!("must be \"{value}\"")),
            rule: Rule::Exact(value.clone()),
        },
        Node::Array { item } => {
            let item = infer_validator_with(item, options);
            let message = match &item.message {
                Message::Text(t) => text(format!("must be an array; each item {t}")),
                structured => Message::Items(Box::new(structured.clone())),
            };
            Validator { rule: Rule::Items(Box::new(item)), message }
        }
        Node::Nullable { inner } => {
            let inner = infer_validator_with(inner, options);
            Validator { message: inner.message.clone(), rule: Rule::Nullable(Box::new(inner)) }
        }
        Node::Object(obj) => {
            let fields = field_rules(obj, options);
            Validator { message: fields_message(&fields), rule: Rule::Object(fields) }
        }
        Node::Variants(union) => variants(union, options),
        Node::Opaque { .. } | Node::Unknown => unknown(),
    }
}

fn variants(union: &VariantUnion, options: &SynthOptions) -> Validator {
    let members = flatten_variants(&union.variants);

    let mut literals: Vec<Literal> = Vec::new();
    let all_literal = members.iter().all(|m| match m {
        Node::Literal { value } => {
            literals.push(value.clone());
            true
        }
        Node::LiteralEnum { allowed } => {
            literals.extend(allowed.iter().cloned().map(Literal::String));
            true
        }
        _ => false,
    });
    if all_literal {
        let mut deduped: Vec<Literal> = Vec::with_capacity(literals.len());
        for lit in literals {
            if !deduped.contains(&lit) {
                deduped.push(lit);
            }
        }
        return one_of(deduped);
    }

    let objects: Option<Vec<&ObjectSchema>> = members.iter().map(|m| m.as_object()).collect();
    let Some(objects) = objects else {
        tracing::debug!(name = ?union.name, "union mixes object and scalar variants, left unvalidated");
        return unknown();
    };

    let key = union
        .name
        .as_ref()
        .and_then(|name| options.discriminators.get(name).cloned())
        .or_else(|| infer_discriminator(&objects))
        .unwrap_or_else(|| options.default_discriminator.clone());

    let mut arms = Vec::with_capacity(objects.len());
    for obj in &objects {
        let tag = obj.get(&key).and_then(|f| match f.node.unwrap_nullable() {
            Node::Literal { value } => Some(value.clone()),
            _ => None,
        });
        match tag {
            Some(tag) => arms.push((tag, field_rules(obj, options))),
            None => tracing::debug!(%key, "variant without a literal tag is unreachable"),
        }
    }

    // shape of the first variant stands for the whole union
    let message = match objects.first() {
        Some(first) => fields_message(&field_rules(first, options)),
        None => text(UNKNOWN_MESSAGE),
    };
    Validator { rule: Rule::Variants(VariantRule { key, arms }), message }
}

/// First field of the first variant whose value is a string literal.
fn infer_discriminator(objects: &[&ObjectSchema]) -> Option<String> {
    let first = objects.first()?;
    first
        .fields
        .iter()
        .find(|(_, f)| f.node.as_string_literal().is_some())
        .map(|(name, _)| name.clone())
}

fn flatten_variants(nodes: &[Node]) -> Vec<&Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Variants(inner) => out.extend(flatten_variants(&inner.variants)),
            other => out.push(other),
        }
    }
    out
}

fn field_rules(obj: &ObjectSchema, options: &SynthOptions) -> Vec<FieldRule> {
    obj.fields
        .iter()
        .map(|(name, field)| FieldRule {
            name: name.clone(),
            required: field.required,
            validator: infer_validator_with(&field.node, options),
        })
        .collect()
}

fn fields_message(fields: &[FieldRule]) -> Message {
    Message::Fields(fields.iter().map(|f| (f.name.clone(), f.validator.message.clone())).collect())
}

fn one_of(lits: Vec<Literal>) -> Validator {
    Validator { message: text(one_of_message(&lits)), rule: Rule::OneOf(lits) }
}

fn one_of_message(lits: &[Literal]) -> String {
    format!("must be one of: {}", join(lits))
}

fn join(lits: &[Literal]) -> String {
    lits.iter().map(Literal::to_string).collect::<Vec<_>>().join(", ")
}

fn unknown() -> Validator {
    Validator { rule: Rule::Unknown, message: text(UNKNOWN_MESSAGE) }
}

fn primitive_message(p: Primitive) -> &'static str {
    match p {
        Primitive::String => "must be a string",
        Primitive::Number => "must be a number",
        Primitive::Boolean => "must be a boolean",
    }
}

fn text(s: impl Into<String>) -> Message {
    Message::Text(s.into())
}

// ------------------------------- Checking --------------------------------- //

impl Validator {
    pub fn validate(&self, value: &Value) -> bool {
        self.check("", value).is_none()
    }

    pub fn message(&self) -> &Message { &self.message }

    /// Absent and `null` values are acceptable even when the field is required.
    pub fn tolerates_absence(&self) -> bool { matches!(self.rule, Rule::Nullable(_)) }

    /// Tag field of a discriminated union, if this validates one.
    pub fn discriminator(&self) -> Option<&str> {
        match &self.rule {
            Rule::Variants(v) => Some(&v.key),
            Rule::Nullable(inner) => inner.discriminator(),
            _ => None,
        }
    }

    /// Checks `value` and returns the failure tree rooted at `property`.
    pub fn check(&self, property: &str, value: &Value) -> Option<ValidationError> {
        match &self.rule {
            Rule::Primitive(p) => {
                let ok = match p {
                    Primitive::String => value.is_string(),
                    Primitive::Number => value.is_number(),
                    Primitive::Boolean => value.is_boolean(),
                };
                let rule_name = match p {
                    Primitive::String => rule::IS_STRING,
                    Primitive::Number => rule::IS_NUMBER,
                    Primitive::Boolean => rule::IS_BOOLEAN,
                };
                self.fail_unless(ok, property, rule_name)
            }
            Rule::StringArray => {
                let ok = value.as_array().is_some_and(|xs| xs.iter().all(Value::is_string));
                self.fail_unless(ok, property, rule::IS_STRING_ARRAY)
            }
            Rule::OneOf(lits) => self.fail_unless(lits.iter().any(|l| l.matches(value)), property, rule::IS_IN),
            Rule::Exact(lit) => self.fail_unless(lit.matches(value), property, rule::EQUALS),
            Rule::Items(item) => {
                let Some(xs) = value.as_array() else {
                    return Some(ValidationError::leaf(property, rule::IS_ARRAY, "must be an array"));
                };
                let children: Vec<_> = xs
                    .iter()
                    .enumerate()
                    .filter_map(|(i, x)| item.check(&i.to_string(), x))
                    .collect();
                nested(property, children)
            }
            Rule::Nullable(inner) => {
                if value.is_null() { None } else { inner.check(property, value) }
            }
            Rule::Object(fields) => {
                let Some(map) = value.as_object() else {
                    return Some(not_an_object(property));
                };
                nested(property, check_fields(fields, map))
            }
            Rule::Variants(variants) => {
                let Some(map) = value.as_object() else {
                    return Some(not_an_object(property));
                };
                let tag = map.get(&variants.key).unwrap_or(&Value::Null);
                match variants.arms.iter().find(|(lit, _)| lit.matches(tag)) {
                    Some((_, fields)) => nested(property, check_fields(fields, map)),
                    None => Some(ValidationError::leaf(property, rule::DISCRIMINATOR, variants.mismatch_message())),
                }
            }
            Rule::Unknown => Some(ValidationError::leaf(property, rule::UNKNOWN_TYPE, UNKNOWN_MESSAGE)),
        }
    }

    fn fail_unless(&self, ok: bool, property: &str, rule_name: &str) -> Option<ValidationError> {
        if ok {
            None
        } else {
            Some(ValidationError::leaf(property, rule_name, self.message.summary()))
        }
    }
}

impl VariantRule {
    fn mismatch_message(&self) -> String {
        let tags: Vec<Literal> = self.arms.iter().map(|(lit, _)| lit.clone()).collect();
        format!("{} must be one of: {}", self.key, join(&tags))
    }
}

fn check_fields(fields: &[FieldRule], map: &Map<String, Value>) -> Vec<ValidationError> {
    let mut out = Vec::new();
    for field in fields {
        match map.get(&field.name).filter(|v| !v.is_null()) {
            None => {
                if field.required && !field.validator.tolerates_absence() {
                    out.push(ValidationError::missing(&field.name));
                }
            }
            Some(v) => {
                if let Some(error) = field.validator.check(&field.name, v) {
                    out.push(error);
                }
            }
        }
    }
    out
}

fn nested(property: &str, children: Vec<ValidationError>) -> Option<ValidationError> {
    if children.is_empty() { None } else { Some(ValidationError::nested(property, children)) }
}

fn not_an_object(property: &str) -> ValidationError {
    ValidationError::leaf(property, rule::IS_OBJECT, "must be an object")
}

// -------------------------------- Message --------------------------------- //

impl Message {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(t) => Some(t),
            _ => None,
        }
    }

    /// One-line description used as a constraint message.
    pub fn summary(&self) -> String {
        match self {
            Message::Text(t) => t.clone(),
            Message::Fields(_) => "must be an object".to_string(),
            Message::Items(_) => "must be an array".to_string(),
        }
    }

    /// Shape with array elements addressed by index key.
    pub fn raw_value(&self) -> Value {
        match self {
            Message::Text(t) => Value::String(t.clone()),
            Message::Fields(fields) => {
                Value::Object(fields.iter().map(|(k, m)| (k.clone(), m.raw_value())).collect())
            }
            Message::Items(item) => {
                let mut map = Map::new();
                map.insert("0".to_string(), item.raw_value());
                Value::Object(map)
            }
        }
    }

    /// Presentation form: index-keyed objects rendered as sequences.
    pub fn render(&self) -> Value {
        object_to_array(self.raw_value())
    }
}
