// Language-agnostic schema tree produced by extraction. No syntax here.

use std::fmt;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Primitive { of: Primitive },
    StringArray,
    Array { item: Box<Node> },       // element schema for non-string items
    Literal { value: Literal },
    LiteralEnum { allowed: Vec<String> },
    Variants(VariantUnion),
    Object(ObjectSchema),
    Nullable { inner: Box<Node> },   // X ∪ null ∪ undefined
    Opaque { raw_name: String },     // unresolved reference, never valid
    Unknown,                         // unsupported construct, never valid
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    String,
    Number,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Literal {
    String(String),
    Number(OrderedFloat<f64>),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantUnion {
    /// Alias name when the union was declared as `type Name = A | B`.
    pub name: Option<String>,
    pub variants: Vec<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObjectSchema {
    pub fields: IndexMap<String, FieldSchema>, // declaration order
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSchema {
    pub node: Node,
    pub required: bool,
}

// ------------------------------- Helpers ---------------------------------- //

impl Node {
    pub fn string() -> Self { Node::Primitive { of: Primitive::String } }
    pub fn number() -> Self { Node::Primitive { of: Primitive::Number } }
    pub fn boolean() -> Self { Node::Primitive { of: Primitive::Boolean } }

    pub fn literal(value: impl Into<Literal>) -> Self {
        Node::Literal { value: value.into() }
    }

    pub fn opaque(raw_name: impl Into<String>) -> Self {
        Node::Opaque { raw_name: raw_name.into() }
    }

    pub fn nullable(inner: Node) -> Self {
        match inner {
            n @ Node::Nullable { .. } => n,
            n => Node::Nullable { inner: Box::new(n) },
        }
    }

    /// Strips `Nullable` wrappers.
    pub fn unwrap_nullable(&self) -> &Node {
        match self {
            Node::Nullable { inner } => inner.unwrap_nullable(),
            n => n,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            Node::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_string_literal(&self) -> Option<&str> {
        match self.unwrap_nullable() {
            Node::Literal { value: Literal::String(s) } => Some(s),
            _ => None,
        }
    }
}

impl ObjectSchema {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, name: impl Into<String>, node: Node, required: bool) {
        self.fields.insert(name.into(), FieldSchema { node, required });
    }

    pub fn with(mut self, name: impl Into<String>, node: Node, required: bool) -> Self {
        self.insert(name, node, required);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> { self.fields.get(name) }
    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    /// Later fields override earlier ones but keep the earlier position.
    /// A field required on either side stays required.
    pub fn merge(&mut self, other: ObjectSchema) {
        for (name, mut field) in other.fields {
            if let Some(prev) = self.fields.get(&name) {
                field.required |= prev.required;
            }
            self.fields.insert(name, field);
        }
    }
}

impl FieldSchema {
    pub fn required(node: Node) -> Self { Self { node, required: true } }
}

impl Literal {
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        use serde_json::Value;
        match (self, value) {
            (Literal::String(a), Value::String(b)) => a == b,
            (Literal::Bool(a), Value::Bool(b)) => a == b,
            (Literal::Number(a), Value::Number(b)) => b.as_f64() == Some(a.0),
            _ => false,
        }
    }
}

const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0; // 2^53

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => f.write_str(s),
            // integers print without a decimal part while they are exact in f64
            Literal::Number(n) if n.0.fract() == 0.0 && n.0.abs() < MAX_EXACT_INT => write!(f, "{}", n.0 as i64),
            Literal::Number(n) => write!(f, "{}", n.0),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self { Literal::String(s.to_string()) }
}

impl From<String> for Literal {
    fn from(s: String) -> Self { Literal::String(s) }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self { Literal::Number(OrderedFloat(n)) }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self { Literal::Bool(b) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn literal_matches_json_values() {
        assert!(Literal::from("sms").matches(&json!("sms")));
        assert!(!Literal::from("sms").matches(&json!("email")));
        assert!(Literal::from(2.0).matches(&json!(2)));
        assert!(Literal::from(true).matches(&json!(true)));
        assert!(!Literal::from(true).matches(&json!("true")));
    }

    #[test]
    fn nullable_does_not_stack() {
        let n = Node::nullable(Node::nullable(Node::string()));
        assert_eq!(n, Node::Nullable { inner: Box::new(Node::string()) });
        assert_eq!(n.unwrap_nullable(), &Node::string());
    }

    #[test]
    fn number_literals_display() {
        assert_eq!(Literal::from(2.0).to_string(), "2");
        assert_eq!(Literal::from(-0.5).to_string(), "-0.5");
        assert_eq!(Literal::from(1e20).to_string(), "100000000000000000000");
        assert_eq!(Literal::from(f64::INFINITY).to_string(), "inf");
    }

    #[test]
    fn merge_keeps_fields_required() {
        let mut base = ObjectSchema::new().with("a", Node::string(), true).with("b", Node::number(), false);
        base.merge(ObjectSchema::new().with("a", Node::literal("x"), false).with("b", Node::number(), true));
        assert_eq!(base.get("a").unwrap(), &FieldSchema::required(Node::literal("x")));
        assert!(base.get("b").unwrap().required);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let obj = ObjectSchema::new().with("name", Node::string(), true);
        let v = serde_json::to_value(Node::Object(obj)).unwrap();
        assert_eq!(v["kind"], "object");
        assert_eq!(v["fields"]["name"]["node"]["of"], "string");
        assert_eq!(v["fields"]["name"]["required"], true);
    }
}
