//! Type schema extraction: declaration files in, `ir::Node` out.
//!
//! One file per type (`<root>/<Name>.d.ts`). References to other named types
//! are extracted recursively on every occurrence; only parsed files are
//! cached. A stack of in-flight names guards against cyclic declarations.
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::dts::{parse_declarations, Decl, DeclFile};
use crate::ir::{FieldSchema, Literal, Node, ObjectSchema};
use crate::lower::{lower_members, lower_type, ResolveRef};

/// Field name under which union and enum bodies are recorded.
pub const VARIANTS_KEY: &str = "variants";
/// Field name under which any other non-object body is recorded.
pub const VALUE_KEY: &str = "value";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no declaration file for `{name}` at {}", path.display())]
    NotFound { name: String, path: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("{} does not declare `{name}`", path.display())]
    DeclarationMissing { name: String, path: PathBuf },
    #[error("cyclic reference to `{name}`")]
    Cycle { name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub name: String,
    pub node: Node,
}

pub struct Extractor {
    root: PathBuf,
    files: HashMap<String, Arc<DeclFile>>,
    in_flight: Vec<String>,
}

// ------------------------------- Front API -------------------------------- //

impl Extractor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), files: HashMap::new(), in_flight: Vec::new() }
    }

    pub fn extract(&mut self, type_name: &str) -> Result<Extraction, ExtractError> {
        let key = lookup_key(type_name).to_string();
        if self.in_flight.contains(&key) {
            return Err(ExtractError::Cycle { name: key });
        }
        let file = self.load(&key)?;
        let Some(decl) = file.find(&key) else {
            return Err(ExtractError::DeclarationMissing { name: key.clone(), path: self.path_for(&key) });
        };

        self.in_flight.push(key.clone());
        let node = self.lower_decl(decl);
        self.in_flight.pop();

        Ok(Extraction { node: name_unions(node, &key), name: key })
    }

    /// Like `extract`, but a failure yields an empty schema that rejects
    /// every payload.
    pub fn extract_or_empty(&mut self, type_name: &str) -> Extraction {
        match self.extract(type_name) {
            Ok(extraction) => extraction,
            Err(error) => {
                tracing::warn!(type_name, %error, "schema unavailable, payloads will be rejected");
                Extraction::empty(lookup_key(type_name))
            }
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.d.ts"))
    }

    fn load(&mut self, key: &str) -> Result<Arc<DeclFile>, ExtractError> {
        if let Some(file) = self.files.get(key) {
            return Ok(file.clone());
        }
        let path = self.path_for(key);
        if !path.is_file() {
            return Err(ExtractError::NotFound { name: key.to_string(), path });
        }
        let source = std::fs::read_to_string(&path)
            .map_err(|source| ExtractError::Io { path: path.clone(), source })?;
        let file = parse_declarations(&source);
        for diag in &file.diagnostics {
            tracing::debug!(path = %path.display(), line = diag.line, column = diag.column, "{}", diag.message);
        }
        let file = Arc::new(file);
        self.files.insert(key.to_string(), file.clone());
        Ok(file)
    }

    fn lower_decl(&mut self, decl: &Decl) -> Node {
        match decl {
            Decl::Alias { ty, .. } => lower_type(ty, self),
            Decl::Interface { extends, members, .. } => {
                let mut obj = ObjectSchema::new();
                for base in extends {
                    match lower_type(base, self) {
                        Node::Object(base_obj) => obj.merge(base_obj),
                        other => tracing::warn!(?other, "interface base is not an object shape, ignored"),
                    }
                }
                obj.merge(lower_members(members, self));
                Node::Object(obj)
            }
            Decl::Enum { members, .. } => {
                let allowed: Option<Vec<String>> = members
                    .iter()
                    .map(|(_, init)| match init {
                        Some(Literal::String(s)) => Some(s.clone()),
                        _ => None,
                    })
                    .collect();
                match allowed {
                    Some(allowed) if !allowed.is_empty() => Node::LiteralEnum { allowed },
                    _ => Node::Unknown,
                }
            }
        }
    }
}

impl ResolveRef for Extractor {
    fn resolve_ref(&mut self, name: &str) -> Option<Node> {
        match self.extract(name) {
            Ok(extraction) => Some(extraction.node),
            Err(ExtractError::Cycle { name }) => {
                tracing::warn!(%name, "cyclic type reference left unresolved");
                None
            }
            Err(error) => {
                tracing::warn!(%name, %error, "type reference left unresolved");
                None
            }
        }
    }
}

// ------------------------------ Extraction -------------------------------- //

impl Extraction {
    pub fn empty(name: impl Into<String>) -> Self {
        Self { name: name.into(), node: Node::Object(ObjectSchema::new()) }
    }

    pub fn is_empty(&self) -> bool {
        self.key_object().is_empty()
    }

    /// Field view of the body: object fields as declared, anything else
    /// under a synthetic key.
    pub fn key_object(&self) -> ObjectSchema {
        match &self.node {
            Node::Object(obj) => obj.clone(),
            node @ (Node::Variants(_) | Node::LiteralEnum { .. }) => synthetic(VARIANTS_KEY, node),
            node => synthetic(VALUE_KEY, node),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.key_object().fields.keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<Node> {
        self.key_object().fields.into_values().map(|f| f.node).collect()
    }
}

/// Gives anonymous unions a name that discriminator configuration can refer
/// to: the body itself takes the type name, a union declared inline on a
/// field takes `Type.field`. Unions that already carry an alias name keep it.
fn name_unions(node: Node, key: &str) -> Node {
    match node {
        Node::Object(mut obj) => {
            for (field, schema) in obj.fields.iter_mut() {
                let inner = std::mem::replace(&mut schema.node, Node::Unknown);
                schema.node = name_union(inner, &format!("{key}.{field}"));
            }
            Node::Object(obj)
        }
        other => name_union(other, key),
    }
}

fn name_union(node: Node, name: &str) -> Node {
    match node {
        Node::Variants(mut union) => {
            union.name.get_or_insert_with(|| name.to_string());
            Node::Variants(union)
        }
        Node::Nullable { inner } => Node::Nullable { inner: Box::new(name_union(*inner, name)) },
        other => other,
    }
}

fn synthetic(key: &str, node: &Node) -> ObjectSchema {
    ObjectSchema { fields: IndexMap::from([(key.to_string(), FieldSchema::required(node.clone()))]) }
}

/// `Sdk.Name[]` -> `Name`.
pub fn lookup_key(type_name: &str) -> &str {
    let name = type_name.trim();
    let name = match name.split_once('.') {
        Some((_, rest)) => rest,
        None => name,
    };
    name.strip_suffix("[]").unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use crate::ir::VariantUnion;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(format!("{name}.d.ts")), body).unwrap();
    }

    #[test]
    fn lookup_key_strips_module_prefix_and_array_suffix() {
        assert_eq!(lookup_key("Sdk.ProviderConfig"), "ProviderConfig");
        assert_eq!(lookup_key("Item[]"), "Item");
        assert_eq!(lookup_key("Sdk.Item[]"), "Item");
        assert_eq!(lookup_key("Plain"), "Plain");
    }

    #[test]
    fn extracts_interface_fields_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Notify", "export interface Notify { name: string; type: 'sms' | 'email'; note?: string }");
        let ext = Extractor::new(dir.path()).extract("Notify").unwrap();
        assert_eq!(ext.keys(), ["name", "type", "note"]);
        let obj = ext.key_object();
        assert!(obj.get("name").unwrap().required);
        assert!(!obj.get("note").unwrap().required);
        assert_eq!(ext.values()[1], Node::LiteralEnum { allowed: vec!["sms".into(), "email".into()] });
    }

    #[test]
    fn union_alias_is_recorded_under_variants_key() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Provider", "export type Provider = OpenAI | Anthropic;");
        write(dir.path(), "OpenAI", "export interface OpenAI { provider: 'openai'; model: string }");
        write(dir.path(), "Anthropic", "export interface Anthropic { provider: 'anthropic'; model: 'claude' | 'haiku' }");

        let ext = Extractor::new(dir.path()).extract("Sdk.Provider").unwrap();
        assert_eq!(ext.keys(), [VARIANTS_KEY]);
        let Node::Variants(VariantUnion { name, variants }) = &ext.node else { panic!("{:?}", ext.node) };
        assert_eq!(name.as_deref(), Some("Provider"));
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].as_object().unwrap().get("provider").unwrap().node, Node::literal("openai"));
    }

    #[test]
    fn missing_file_is_not_found_and_empty_fallback_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let mut ex = Extractor::new(dir.path());
        assert!(matches!(ex.extract("Nope"), Err(ExtractError::NotFound { .. })));
        let ext = ex.extract_or_empty("Nope");
        assert!(ext.is_empty());
        assert!(ext.keys().is_empty());
    }

    #[test]
    fn unresolvable_reference_falls_back_to_opaque() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Holder", "interface Holder { inner: Sdk.Ghost; ok: number }");
        let ext = Extractor::new(dir.path()).extract("Holder").unwrap();
        let obj = ext.key_object();
        assert_eq!(obj.get("inner").unwrap().node, Node::opaque("Sdk.Ghost"));
        assert_eq!(obj.get("ok").unwrap().node, Node::number());
    }

    #[test]
    fn cyclic_references_terminate() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Tree", "interface Tree { label: string; children?: Tree[] }");
        write(dir.path(), "Ping", "interface Ping { pong: Pong }");
        write(dir.path(), "Pong", "interface Pong { ping?: Ping }");

        let mut ex = Extractor::new(dir.path());
        let tree = ex.extract("Tree").unwrap();
        let children = tree.key_object().get("children").unwrap().node.clone();
        assert_eq!(children, Node::Array { item: Box::new(Node::opaque("Tree")) });

        let ping = ex.extract("Ping").unwrap();
        let pong = ping.key_object().get("pong").unwrap().node.clone();
        assert_eq!(pong.as_object().unwrap().get("ping").unwrap().node, Node::opaque("Ping"));
    }

    #[test]
    fn interfaces_inherit_base_fields() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Base", "export interface Base { id: string; kind: string }");
        write(dir.path(), "Child", "import { Base } from './Base';\nexport interface Child extends Base { kind: 'child'; extra?: boolean }");
        let ext = Extractor::new(dir.path()).extract("Child").unwrap();
        assert_eq!(ext.keys(), ["id", "kind", "extra"]);
        assert_eq!(ext.key_object().get("kind").unwrap().node, Node::literal("child"));
    }

    #[test]
    fn redeclared_optional_field_stays_required() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Base", "export interface Base { id: string }");
        write(dir.path(), "Loose", "export interface Loose extends Base { id?: string }");
        let ext = Extractor::new(dir.path()).extract("Loose").unwrap();
        assert!(ext.key_object().get("id").unwrap().required);
    }

    #[test]
    fn nullable_and_inline_unions_are_named() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Shape", "export type Shape = Circle | Square | null;");
        write(dir.path(), "Circle", "export interface Circle { kind: 'circle' }");
        write(dir.path(), "Square", "export interface Square { kind: 'square' }");
        write(dir.path(), "Canvas", "export interface Canvas { main: Shape; extra?: Circle | Square; other: Circle | Square | undefined }");

        let mut ex = Extractor::new(dir.path());
        let shape = ex.extract("Shape").unwrap();
        let Node::Variants(union) = shape.node.unwrap_nullable() else { panic!("{:?}", shape.node) };
        assert_eq!(union.name.as_deref(), Some("Shape"));

        let canvas = ex.extract("Canvas").unwrap().key_object();
        let name_of = |field: &str| match canvas.get(field).unwrap().node.unwrap_nullable() {
            Node::Variants(union) => union.name.clone(),
            other => panic!("{other:?}"),
        };
        assert_eq!(name_of("main").as_deref(), Some("Shape"));
        assert_eq!(name_of("extra").as_deref(), Some("Canvas.extra"));
        assert_eq!(name_of("other").as_deref(), Some("Canvas.other"));
    }

    #[test]
    fn string_enums_become_literal_enums() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Channel", "export declare enum Channel { Sms = \"sms\", Email = \"email\" }");
        write(dir.path(), "Level", "export declare enum Level { Low, High }");
        let mut ex = Extractor::new(dir.path());
        assert_eq!(ex.extract("Channel").unwrap().node, Node::LiteralEnum { allowed: vec!["sms".into(), "email".into()] });
        assert_eq!(ex.extract("Level").unwrap().node, Node::Unknown);
    }

    #[test]
    fn file_without_matching_declaration() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Lonely", "export interface SomethingElse { a: string }");
        let err = Extractor::new(dir.path()).extract("Lonely").unwrap_err();
        assert!(matches!(err, ExtractError::DeclarationMissing { .. }));
    }
}
