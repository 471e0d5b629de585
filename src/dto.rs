//! Runtime payload check for one root type.
//!
//! The validator list is built once from an extraction and then only read,
//! so a single `PayloadValidator` can check many payloads concurrently.
use serde_json::Value;

use crate::extract::{Extraction, Extractor};
use crate::report::{rule, ValidationError};
use crate::validate::{infer_validator_with, SynthOptions, Validator};

/// Property name used for errors about the payload as a whole.
pub const ROOT_PROPERTY: &str = "$";

#[derive(Debug, Clone)]
pub struct PayloadValidator {
    type_name: String,
    shape: Shape,
}

#[derive(Debug, Clone)]
enum Shape {
    Fields(Vec<FieldCheck>),
    Whole(Validator),
    Reject,
}

#[derive(Debug, Clone)]
pub struct FieldCheck {
    pub name: String,
    pub required: bool,
    pub validator: Validator,
}

impl PayloadValidator {
    pub fn build(extractor: &mut Extractor, type_name: &str, options: &SynthOptions) -> Self {
        let extraction = extractor.extract_or_empty(type_name);
        Self::from_extraction(&extraction, options)
    }

    pub fn from_extraction(extraction: &Extraction, options: &SynthOptions) -> Self {
        let shape = if extraction.is_empty() {
            Shape::Reject
        } else if let Some(obj) = extraction.node.as_object() {
            Shape::Fields(
                obj.fields
                    .iter()
                    .map(|(name, field)| FieldCheck {
                        name: name.clone(),
                        required: field.required,
                        validator: infer_validator_with(&field.node, options),
                    })
                    .collect(),
            )
        } else {
            Shape::Whole(infer_validator_with(&extraction.node, options))
        };
        Self { type_name: extraction.name.clone(), shape }
    }

    pub fn type_name(&self) -> &str { &self.type_name }

    pub fn fields(&self) -> &[FieldCheck] {
        match &self.shape {
            Shape::Fields(fields) => fields,
            _ => &[],
        }
    }

    pub fn validate(&self, payload: &Value) -> Result<(), Vec<ValidationError>> {
        let errors = match &self.shape {
            Shape::Reject => vec![ValidationError::leaf(
                ROOT_PROPERTY,
                rule::SCHEMA_NOT_FOUND,
                format!("no schema available for `{}`", self.type_name),
            )],
            Shape::Whole(validator) => validator.check(ROOT_PROPERTY, payload).into_iter().collect(),
            Shape::Fields(fields) => match payload.as_object() {
                None => vec![ValidationError::leaf(ROOT_PROPERTY, rule::IS_OBJECT, "must be an object")],
                Some(map) => fields
                    .iter()
                    .filter_map(|field| field.check(map.get(&field.name)))
                    .collect(),
            },
        };
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Field -> message map, with array shapes rendered as sequences.
    pub fn message_shape(&self) -> Value {
        match &self.shape {
            Shape::Fields(fields) => {
                let map = fields.iter().map(|f| (f.name.clone(), f.validator.message().raw_value())).collect();
                crate::norm::object_to_array(Value::Object(map))
            }
            Shape::Whole(validator) => validator.message().render(),
            Shape::Reject => Value::Null,
        }
    }
}

impl FieldCheck {
    fn check(&self, value: Option<&Value>) -> Option<ValidationError> {
        let value = value.filter(|v| !v.is_null());
        let Some(value) = value else {
            if self.required && !self.validator.tolerates_absence() {
                return Some(ValidationError::missing(&self.name));
            }
            return None;
        };
        // structured validators answer with a child per failing sub-field,
        // scalar ones with a single constraint
        self.validator.check(&self.name, value)
    }
}
