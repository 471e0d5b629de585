//! jq pre-processing of input documents, compiled once per run.
use jaq_core::{compile::Undefined, load, Compiler, Ctx, Native, RcIter};
use jaq_json::Val;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JqError {
    #[error("invalid jq expression:\n{0}")]
    Compile(String),
    #[error("jq expression `{filter}` failed: {message}")]
    Run { filter: String, message: String },
    #[error("jq expression produced invalid JSON: {0}")]
    Output(#[from] serde_json::Error),
}

pub struct JqFilter {
    src: String,
    filter: jaq_core::Filter<Native<Val>>,
}

impl JqFilter {
    pub fn compile(filter_src: &str) -> Result<Self, JqError> {
        let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
        let arena = load::Arena::default();
        let program = load::File { code: filter_src, path: () };

        let modules = loader
            .load(&arena, program)
            .map_err(format_parse_errors)?;

        let filter = Compiler::default()
            .with_funs(jaq_std::funs().chain(jaq_json::funs()))
            .compile(modules)
            .map_err(format_undefined_errors)?;

        Ok(Self { src: filter_src.to_string(), filter })
    }

    /// Every output of the filter for one input document.
    pub fn run(&self, input: &Value) -> Result<Vec<Value>, JqError> {
        let inputs = RcIter::new(core::iter::empty());
        let outputs = self.filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

        let mut out = Vec::new();
        for item in outputs {
            let val = item.map_err(|e| JqError::Run { filter: self.src.clone(), message: format!("{e:?}") })?;
            // Val: Display -> JSON text
            out.push(serde_json::from_str::<Value>(&format!("{val}"))?);
        }
        Ok(out)
    }
}

fn format_parse_errors(
    errs: Vec<(load::File<&str, ()>, load::Error<&str>)>,
) -> JqError {
    let mut s = String::new();
    for (file, err) in errs {
        s.push_str(&format!("parse error: {err:?} in `{}`\n", file.code));
    }
    JqError::Compile(s)
}

fn format_undefined_errors(
    errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>,
) -> JqError {
    let mut s = String::new();
    for (file, list) in errs {
        for (name, undef) in list {
            s.push_str(&format!("undefined `{name}`: {undef:?} in `{}`\n", file.code));
        }
    }
    JqError::Compile(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selects_and_splits_documents() {
        let filter = JqFilter::compile(".items[]").unwrap();
        let out = filter.run(&json!({ "items": [{ "a": 1 }, { "a": 2 }] })).unwrap();
        assert_eq!(out, vec![json!({ "a": 1 }), json!({ "a": 2 })]);
    }

    #[test]
    fn bad_expressions_fail_to_compile() {
        assert!(matches!(JqFilter::compile(".[[["), Err(JqError::Compile(_))));
        assert!(matches!(JqFilter::compile("no_such_fn(1)"), Err(JqError::Compile(_))));
    }
}
