//! Minimal CLI: extract → (schema | check)
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::dto::PayloadValidator;
use crate::extract::Extractor;
use crate::jq_exec::JqFilter;
use crate::report::ValidationError;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate JSON payloads against types declared in TypeScript `.d.ts` files
#[derive(Parser, Debug)]
#[command(name = "dts-guard", version, about)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print the message shape (or raw schema tree) extracted for a type
    Schema(SchemaOut),
    /// validate JSON documents against a type
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// type to extract, e.g. `ProviderConfig` or `Sdk.ProviderConfig`
    #[arg(long = "type", short = 't')]
    type_name: String,

    /// directory holding one `<Name>.d.ts` file per type
    #[arg(long)]
    types_root: Option<PathBuf>,

    /// JSON config file (types_root, discriminators)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// tag field used for unions whose tag cannot be inferred
    #[arg(long)]
    default_discriminator: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    schema: SchemaSettings,

    /// print the extracted schema tree instead of the message shape
    #[arg(long)]
    raw: bool,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    schema: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// report format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// output report file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Clone)]
struct Document {
    source: String,
    value: Value,
}

#[derive(Debug, Serialize)]
struct DocumentReport<'a> {
    source: &'a str,
    valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<ValidationError>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn resolve(&self) -> Result<(Extractor, Config)> {
        let mut config = Config::load_or_default(self.config.as_deref())?;
        if let Some(root) = &self.types_root {
            config.types_root = Some(root.clone());
        }
        if let Some(key) = &self.default_discriminator {
            config.default_discriminator = key.clone();
        }
        let Some(root) = config.types_root.clone() else {
            bail!("no types root: pass --types-root or set `types_root` in the config file");
        };
        if !root.is_dir() {
            bail!("types root {} is not a directory", root.display());
        }
        Ok((Extractor::new(root), config))
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let jq = self.jq_expr.as_deref().map(JqFilter::compile).transpose()?;
        let source_paths = resolve_file_path_patterns(&self.input)?;

        let mut out = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;

            let mut values = Vec::new();
            if self.ndjson {
                for (line_no, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let value = serde_json::from_str::<Value>(line).with_context(|| {
                        format!("failed to parse NDJSON line {} of {source_path_str}", line_no + 1)
                    })?;
                    values.push((format!("{source_path_str}:{}", line_no + 1), value));
                }
            } else {
                let value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                values.push((source_path_str.clone(), value));
            }

            for (label, value) in values {
                let value = match self.json_pointer.as_deref() {
                    None => value,
                    Some(ptr) => match value.pointer(ptr) {
                        Some(v) => v.clone(),
                        None => {
                            tracing::warn!(source = %label, pointer = ptr, "JSON pointer matched nothing, skipped");
                            continue;
                        }
                    },
                };
                match jq.as_ref() {
                    None => out.push(Document { source: label, value }),
                    Some(filter) => {
                        let results = filter
                            .run(&value)
                            .with_context(|| format!("failed to apply jq expression to {label}"))?;
                        let single = results.len() == 1;
                        for (i, value) in results.into_iter().enumerate() {
                            let source = if single { label.clone() } else { format!("{label}#{i}") };
                            out.push(Document { source, value });
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Returns `false` when any checked document was invalid.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Schema(target) => {
                let (mut extractor, config) = target.schema.resolve()?;
                let type_name = &target.schema.type_name;
                let extraction = extractor
                    .extract(type_name)
                    .with_context(|| format!("failed to extract `{type_name}`"))?;
                let rendered = if target.raw {
                    serde_json::to_value(&extraction.node)?
                } else {
                    if extraction.is_empty() {
                        bail!("`{}` declares no fields, there is no message shape to print", extraction.name);
                    }
                    PayloadValidator::from_extraction(&extraction, &config.synth()).message_shape()
                };
                write_output(target.out.as_deref(), &serde_json::to_string_pretty(&rendered)?)?;
                Ok(true)
            }
            Command::Check(target) => {
                let (mut extractor, config) = target.schema.resolve()?;
                let validator = PayloadValidator::build(&mut extractor, &target.schema.type_name, &config.synth());
                let documents = target.input_settings.load_documents()?;
                tracing::info!(
                    type_name = validator.type_name(),
                    fields = validator.fields().len(),
                    documents = documents.len(),
                    "checking"
                );

                let results: Vec<(&Document, Vec<ValidationError>)> = documents
                    .par_iter()
                    .map(|doc| (doc, validator.validate(&doc.value).err().unwrap_or_default()))
                    .collect();
                let all_valid = results.iter().all(|(_, errors)| errors.is_empty());

                let report = match target.format {
                    Format::Json => {
                        let reports: Vec<DocumentReport> = results
                            .iter()
                            .map(|(doc, errors)| DocumentReport {
                                source: &doc.source,
                                valid: errors.is_empty(),
                                errors: errors.clone(),
                            })
                            .collect();
                        serde_json::to_string_pretty(&reports)?
                    }
                    Format::Text => render_text(&results),
                };
                write_output(target.out.as_deref(), &report)?;
                Ok(all_valid)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn render_text(results: &[(&Document, Vec<ValidationError>)]) -> String {
    let mut out = String::new();
    let mut failed = 0usize;
    for (doc, errors) in results {
        if errors.is_empty() {
            out.push_str(&format!("{} {}\n", "✔".green(), doc.source));
            continue;
        }
        failed += 1;
        out.push_str(&format!("{} {}\n", "✘".red(), doc.source.bold()));
        for error in errors {
            for (path, message) in error.flatten() {
                out.push_str(&format!("    {}: {}\n", path.yellow(), message));
            }
        }
    }
    let summary = format!("{} checked, {} invalid", results.len(), failed);
    if failed == 0 {
        out.push_str(&format!("{}\n", summary.green()));
    } else {
        out.push_str(&format!("{}\n", summary.red()));
    }
    out
}

fn write_output(out: Option<&Path>, contents: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))?;
        }
        None => println!("{contents}"),
    }
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
