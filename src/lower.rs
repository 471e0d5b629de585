use crate::dts::{PropertySig, TypeExpr};
use crate::ir::{Literal, Node, ObjectSchema, Primitive, VariantUnion};

/// Resolves a named type reference to its schema. Returning `None` makes the
/// reference opaque (always invalid) instead of failing the caller.
pub trait ResolveRef {
    fn resolve_ref(&mut self, name: &str) -> Option<Node>;
}

pub fn lower_members<R: ResolveRef + ?Sized>(members: &[PropertySig], resolver: &mut R) -> ObjectSchema {
    let mut obj = ObjectSchema::new();
    for sig in members {
        let node = lower_type(&sig.ty, resolver);
        obj.insert(sig.name.clone(), node, !sig.optional);
    }
    obj
}

pub fn lower_type<R: ResolveRef + ?Sized>(ty: &TypeExpr, resolver: &mut R) -> Node {
    match ty {
        TypeExpr::Keyword(kw) => match kw.as_str() {
            "string" => Node::string(),
            "number" => Node::number(),
            "boolean" => Node::boolean(),
            _ => Node::Unknown,
        },
        TypeExpr::Literal(lit) => Node::Literal { value: lit.clone() },
        TypeExpr::Array(item) => lower_array(item, resolver),
        TypeExpr::Reference { name, args } => match (name.as_str(), args.as_slice()) {
            ("Array" | "ReadonlyArray", [item]) => lower_array(item, resolver),
            (_, []) => resolver.resolve_ref(name).unwrap_or_else(|| Node::opaque(name.clone())),
            // generic instantiation
            _ => Node::Unknown,
        },
        TypeExpr::Union(members) => lower_union(members, resolver),
        TypeExpr::Intersection(members) => lower_intersection(members, resolver),
        TypeExpr::Object(members) => Node::Object(lower_members(members, resolver)),
        TypeExpr::Tuple(_) | TypeExpr::Function | TypeExpr::Unsupported(_) => Node::Unknown,
    }
}

fn lower_array<R: ResolveRef + ?Sized>(item: &TypeExpr, resolver: &mut R) -> Node {
    match lower_type(item, resolver) {
        Node::Primitive { of: Primitive::String } => Node::StringArray,
        item => Node::Array { item: Box::new(item) },
    }
}

fn lower_union<R: ResolveRef + ?Sized>(members: &[TypeExpr], resolver: &mut R) -> Node {
    let mut nullable = false;
    let mut nodes = Vec::with_capacity(members.len());
    for member in members {
        if matches!(member, TypeExpr::Keyword(kw) if kw == "null" || kw == "undefined") {
            nullable = true;
            continue;
        }
        nodes.push(lower_type(member, resolver));
    }

    let core = match nodes.len() {
        0 => Node::Unknown,
        1 => nodes.remove(0),
        _ => match string_members(&nodes) {
            Some(allowed) => Node::LiteralEnum { allowed },
            None => Node::Variants(VariantUnion { name: None, variants: nodes }),
        },
    };

    if nullable { Node::nullable(core) } else { core }
}

/// All members resolve to strings: flatten to the allowed set, keeping the
/// first occurrence of each value.
fn string_members(nodes: &[Node]) -> Option<Vec<String>> {
    let mut allowed: Vec<String> = Vec::new();
    for node in nodes {
        let strings: Vec<&str> = match node {
            Node::Literal { value: Literal::String(s) } => vec![s.as_str()],
            Node::LiteralEnum { allowed } => allowed.iter().map(String::as_str).collect(),
            _ => return None,
        };
        for s in strings {
            if !allowed.iter().any(|a| a == s) {
                allowed.push(s.to_string());
            }
        }
    }
    Some(allowed)
}

fn lower_intersection<R: ResolveRef + ?Sized>(members: &[TypeExpr], resolver: &mut R) -> Node {
    let mut merged = ObjectSchema::new();
    for member in members {
        match lower_type(member, resolver) {
            Node::Object(obj) => merged.merge(obj),
            _ => return Node::Unknown,
        }
    }
    Node::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dts::{parse_declarations, Decl};
    use std::collections::HashMap;

    struct NoRefs;

    impl ResolveRef for NoRefs {
        fn resolve_ref(&mut self, _name: &str) -> Option<Node> { None }
    }

    struct MapRefs(HashMap<&'static str, Node>);

    impl ResolveRef for MapRefs {
        fn resolve_ref(&mut self, name: &str) -> Option<Node> {
            self.0.get(name).cloned()
        }
    }

    fn lower_alias(src: &str, resolver: &mut dyn ResolveRef) -> Node {
        let file = parse_declarations(src);
        match &file.decls[0] {
            Decl::Alias { ty, .. } => lower_type(ty, resolver),
            Decl::Interface { members, .. } => Node::Object(lower_members(members, resolver)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn primitives_and_string_arrays() {
        let node = lower_alias("interface A { s: string; n?: number; b: boolean; tags: string[]; ids: Array<number> }", &mut NoRefs);
        let obj = node.as_object().unwrap();
        assert_eq!(obj.get("s").unwrap().node, Node::string());
        assert!(!obj.get("n").unwrap().required);
        assert_eq!(obj.get("b").unwrap().node, Node::boolean());
        assert_eq!(obj.get("tags").unwrap().node, Node::StringArray);
        assert_eq!(obj.get("ids").unwrap().node, Node::Array { item: Box::new(Node::number()) });
    }

    #[test]
    fn string_literal_union_becomes_enum() {
        let node = lower_alias("type T = 'sms' | 'email';", &mut NoRefs);
        assert_eq!(node, Node::LiteralEnum { allowed: vec!["sms".into(), "email".into()] });
    }

    #[test]
    fn enum_references_flatten_into_literal_enum() {
        let mut refs = MapRefs(HashMap::from([
            ("Base", Node::LiteralEnum { allowed: vec!["a".into(), "b".into()] }),
        ]));
        let node = lower_alias("type T = Base | 'c' | 'a';", &mut refs);
        assert_eq!(node, Node::LiteralEnum { allowed: vec!["a".into(), "b".into(), "c".into()] });
    }

    #[test]
    fn null_members_make_nullable() {
        let node = lower_alias("type T = string | null | undefined;", &mut NoRefs);
        assert_eq!(node, Node::nullable(Node::string()));
    }

    #[test]
    fn unresolved_references_are_opaque() {
        let node = lower_alias("type T = Missing;", &mut NoRefs);
        assert_eq!(node, Node::opaque("Missing"));
    }

    #[test]
    fn generics_and_functions_are_unknown() {
        assert_eq!(lower_alias("type T = Record<string, number>;", &mut NoRefs), Node::Unknown);
        assert_eq!(lower_alias("type T = () => void;", &mut NoRefs), Node::Unknown);
        assert_eq!(lower_alias("type T = any;", &mut NoRefs), Node::Unknown);
    }

    #[test]
    fn object_references_form_variants() {
        let a = Node::Object(ObjectSchema::new().with("provider", Node::literal("a"), true));
        let b = Node::Object(ObjectSchema::new().with("provider", Node::literal("b"), true));
        let mut refs = MapRefs(HashMap::from([("A", a.clone()), ("B", b.clone())]));
        let node = lower_alias("type T = A | B;", &mut refs);
        assert_eq!(node, Node::Variants(VariantUnion { name: None, variants: vec![a, b] }));
    }

    #[test]
    fn intersections_merge_objects() {
        let node = lower_alias("type T = { a: string } & { b?: number };", &mut NoRefs);
        let obj = node.as_object().unwrap();
        assert_eq!(obj.fields.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(lower_alias("type T = { a: string } & string;", &mut NoRefs), Node::Unknown);
    }

    #[test]
    fn intersection_keeps_a_field_required_if_any_side_requires_it() {
        let node = lower_alias("type I = { a: string } & { a?: string };", &mut NoRefs);
        assert!(node.as_object().unwrap().get("a").unwrap().required);

        let validator = crate::validate::infer_validator(&node);
        assert!(!validator.validate(&serde_json::json!({})));
        assert!(validator.validate(&serde_json::json!({ "a": "x" })));
    }
}
