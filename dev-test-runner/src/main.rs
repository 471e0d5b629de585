//! Runs `fixtures/cases.json` against the declarations in `fixtures/types/`.
//!
//! Each case names a type, a payload, and the dotted error paths the payload
//! is expected to produce (none for a valid payload).
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use colored::Colorize;
use serde::Deserialize;
use serde_json::Value;

use dts_guard::dto::PayloadValidator;
use dts_guard::extract::Extractor;
use dts_guard::report::find;
use dts_guard::validate::SynthOptions;

#[derive(Debug, Deserialize)]
struct Case {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    payload: Value,
    errors: Vec<String>,
}

fn fixtures_dir() -> PathBuf {
    match std::env::args().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../fixtures"),
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let fixtures = fixtures_dir();
    let cases_path = fixtures.join("cases.json");
    let source = std::fs::read_to_string(&cases_path)
        .with_context(|| format!("failed to read {}", cases_path.display()))?;
    let de = &mut serde_json::Deserializer::from_str(&source);
    let cases: Vec<Case> = serde_path_to_error::deserialize(de)
        .with_context(|| format!("invalid cases file {}", cases_path.display()))?;

    let mut extractor = Extractor::new(fixtures.join("types"));
    let options = SynthOptions::default();
    let mut validators: HashMap<String, PayloadValidator> = HashMap::new();

    let mut failed = 0usize;
    for case in &cases {
        let validator = validators
            .entry(case.type_name.clone())
            .or_insert_with(|| PayloadValidator::build(&mut extractor, &case.type_name, &options));
        let errors = validator.validate(&case.payload).err().unwrap_or_default();

        let mut problems = Vec::new();
        if case.errors.is_empty() && !errors.is_empty() {
            problems.push(format!("expected valid, got: {}", summarize(&errors)));
        }
        for path in &case.errors {
            if find(&errors, path).is_none() {
                problems.push(format!("no error at `{path}`, got: {}", summarize(&errors)));
            }
        }

        if problems.is_empty() {
            println!("{} {}", "PASS".green(), case.name);
        } else {
            failed += 1;
            println!("{} {}", "FAIL".red().bold(), case.name);
            for problem in problems {
                println!("    {problem}");
            }
        }
    }

    println!("\n{} cases, {} failed", cases.len(), failed);
    Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn summarize(errors: &[dts_guard::report::ValidationError]) -> String {
    if errors.is_empty() {
        return "no errors".to_string();
    }
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}
