//! Recursive-descent parser for the declaration subset we care about.
//!
//! Only `type` aliases, `interface`s and `enum`s are kept; every other
//! top-level statement is skipped by bracket balancing. The parser never
//! fails as a whole: a member whose type cannot be parsed is kept with an
//! `Unsupported` type so sibling members still extract.
use super::lexer::{tokenize, Token, TokenKind};
use crate::ir::Literal;

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Keyword(String),
    Literal(Literal),
    Reference { name: String, args: Vec<TypeExpr> },
    Array(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    Intersection(Vec<TypeExpr>),
    Object(Vec<PropertySig>),
    Tuple(Vec<TypeExpr>),
    Function,
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySig {
    pub name: String,
    pub optional: bool,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Alias { name: String, ty: TypeExpr },
    Interface { name: String, extends: Vec<TypeExpr>, members: Vec<PropertySig> },
    Enum { name: String, members: Vec<(String, Option<Literal>)> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclFile {
    pub decls: Vec<Decl>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

const KEYWORDS: &[&str] = &[
    "string", "number", "boolean", "any", "unknown", "never", "void", "object",
    "null", "undefined", "bigint", "symbol",
];

type PResult<T> = Result<T, Diagnostic>;

pub fn parse_declarations(text: &str) -> DeclFile {
    let mut parser = Parser { tokens: tokenize(text), pos: 0, diagnostics: Vec::new() };
    let decls = parser.file();
    DeclFile { decls, diagnostics: parser.diagnostics }
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Alias { name, .. } | Decl::Interface { name, .. } | Decl::Enum { name, .. } => name,
        }
    }
}

impl DeclFile {
    pub fn find(&self, name: &str) -> Option<&Decl> {
        self.decls.iter().find(|d| d.name() == name)
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

// ------------------------------ Statements -------------------------------- //

impl Parser {
    fn file(&mut self) -> Vec<Decl> {
        let mut decls = Vec::new();
        while !self.at_eof() {
            let start = self.pos;
            match self.statement() {
                Ok(Some(decl)) => decls.push(decl),
                Ok(None) => {}
                Err(diag) => {
                    self.diagnostics.push(diag);
                    self.pos = start;
                    self.skip_statement();
                }
            }
            if self.pos == start {
                self.bump();
            }
        }
        decls
    }

    fn statement(&mut self) -> PResult<Option<Decl>> {
        while self.eat_ident("export") || self.eat_ident("declare") || self.eat_ident("default") {}
        if self.peek().is_ident("type") && self.peek_at(1).is_ident_like() {
            self.bump();
            return self.alias().map(Some);
        }
        if self.eat_ident("interface") {
            return self.interface().map(Some);
        }
        if self.peek().is_ident("const") && self.peek_at(1).is_ident("enum") {
            self.bump();
        }
        if self.eat_ident("enum") {
            return self.enumeration().map(Some);
        }
        self.skip_statement();
        Ok(None)
    }

    fn alias(&mut self) -> PResult<Decl> {
        let name = self.ident()?;
        self.skip_type_params();
        self.expect("=")?;
        let ty = self.ty()?;
        self.eat(";");
        Ok(Decl::Alias { name, ty })
    }

    fn interface(&mut self) -> PResult<Decl> {
        let name = self.ident()?;
        self.skip_type_params();
        let mut extends = Vec::new();
        if self.eat_ident("extends") {
            loop {
                extends.push(self.postfix()?);
                if !self.eat(",") { break; }
            }
        }
        let members = self.members()?;
        Ok(Decl::Interface { name, extends, members })
    }

    fn enumeration(&mut self) -> PResult<Decl> {
        let name = self.ident()?;
        self.expect("{")?;
        let mut members = Vec::new();
        while !self.eat("}") {
            if self.at_eof() {
                return Err(self.error("unterminated enum"));
            }
            let member = self.property_name()?;
            let init = if self.eat("=") {
                let mut lit = self.literal();
                if !(self.peek().is_punct(",") || self.peek().is_punct("}")) {
                    // computed initialiser
                    lit = None;
                    self.skip_until_any(&[",", "}"]);
                }
                lit
            } else {
                None
            };
            members.push((member, init));
            self.eat(",");
        }
        Ok(Decl::Enum { name, members })
    }

    /// `{ member; member, member }` with per-member recovery.
    fn members(&mut self) -> PResult<Vec<PropertySig>> {
        self.expect("{")?;
        let mut out = Vec::new();
        loop {
            while self.eat(";") || self.eat(",") {}
            if self.eat("}") { break; }
            if self.at_eof() {
                return Err(self.error("unterminated member list"));
            }
            let start = self.pos;
            match self.member() {
                Ok(Some(sig)) => out.push(sig),
                Ok(None) => {}
                Err(diag) => {
                    tracing::debug!(line = diag.line, column = diag.column, "{}", diag.message);
                    self.diagnostics.push(diag);
                    self.pos = start;
                    let name = self.property_name().ok();
                    let optional = self.eat("?");
                    self.skip_until_any(&[";", ",", "}"]);
                    if let Some(name) = name {
                        out.push(PropertySig { name, optional, ty: TypeExpr::Unsupported("unparsed".into()) });
                    }
                }
            }
            if self.pos == start {
                self.bump();
            }
        }
        Ok(out)
    }

    fn member(&mut self) -> PResult<Option<PropertySig>> {
        // call / construct / index signatures carry no data fields
        if self.peek().is_punct("(") || self.peek().is_punct("<") || self.peek().is_punct("[")
            || (self.peek().is_ident("new") && self.peek_at(1).is_punct("("))
        {
            self.skip_until_any(&[";", ",", "}"]);
            return Ok(None);
        }
        if self.peek().is_ident("readonly") && self.peek_at(1).is_property_name() {
            self.bump();
        }
        if (self.peek().is_ident("get") || self.peek().is_ident("set")) && self.peek_at(1).is_property_name() {
            self.skip_until_any(&[";", ",", "}"]);
            return Ok(None);
        }
        let name = self.property_name()?;
        let optional = self.eat("?");
        if self.peek().is_punct("(") || self.peek().is_punct("<") {
            self.skip_until_any(&[";", ",", "}"]);
            return Ok(None);
        }
        if !self.eat(":") {
            // `name;` is an implicit any
            return Ok(Some(PropertySig { name, optional, ty: TypeExpr::Keyword("any".into()) }));
        }
        let ty = self.ty()?;
        let next = self.peek();
        let at_member_end = next.is_punct(";") || next.is_punct(",") || next.is_punct("}")
            || next.is_property_name() || next.is_punct("[") || next.is_punct("(");
        if !at_member_end {
            // trailing garbage after the type: keep the member, drop its type
            self.skip_until_any(&[";", ",", "}"]);
            return Ok(Some(PropertySig { name, optional, ty: TypeExpr::Unsupported("trailing tokens".into()) }));
        }
        Ok(Some(PropertySig { name, optional, ty }))
    }
}

// -------------------------------- Types ----------------------------------- //

impl Parser {
    fn ty(&mut self) -> PResult<TypeExpr> {
        let head = self.union()?;
        if self.peek().is_ident("extends") {
            // conditional type: `A extends B ? C : D`
            self.bump();
            self.postfix()?;
            self.expect("?")?;
            self.ty()?;
            self.expect(":")?;
            self.ty()?;
            return Ok(TypeExpr::Unsupported("conditional".into()));
        }
        Ok(head)
    }

    fn union(&mut self) -> PResult<TypeExpr> {
        self.eat("|");
        let mut members = vec![self.intersection()?];
        while self.eat("|") {
            members.push(self.intersection()?);
        }
        Ok(if members.len() == 1 { members.remove(0) } else { TypeExpr::Union(members) })
    }

    fn intersection(&mut self) -> PResult<TypeExpr> {
        self.eat("&");
        let mut members = vec![self.postfix()?];
        while self.eat("&") {
            members.push(self.postfix()?);
        }
        Ok(if members.len() == 1 { members.remove(0) } else { TypeExpr::Intersection(members) })
    }

    fn postfix(&mut self) -> PResult<TypeExpr> {
        let mut ty = self.primary()?;
        while self.peek().is_punct("[") {
            self.bump();
            if self.eat("]") {
                ty = TypeExpr::Array(Box::new(ty));
            } else {
                // indexed access `T["key"]`
                self.ty()?;
                self.expect("]")?;
                ty = TypeExpr::Unsupported("indexed access".into());
            }
        }
        Ok(ty)
    }

    fn primary(&mut self) -> PResult<TypeExpr> {
        let token = self.peek().clone();
        match &token {
            TokenKind::Str(s) => {
                self.bump();
                Ok(TypeExpr::Literal(Literal::String(s.clone())))
            }
            TokenKind::Num(n) => {
                self.bump();
                Ok(TypeExpr::Literal(Literal::from(*n)))
            }
            TokenKind::Template(raw) => {
                self.bump();
                Ok(TypeExpr::Unsupported(format!("template literal {raw}")))
            }
            TokenKind::Punct("(") => {
                if self.arrow_follows_parens() {
                    return self.function();
                }
                self.bump();
                let inner = self.ty()?;
                self.expect(")")?;
                Ok(inner)
            }
            TokenKind::Punct("{") => {
                if self.mapped_type_ahead() {
                    self.skip_balanced()?;
                    return Ok(TypeExpr::Unsupported("mapped type".into()));
                }
                Ok(TypeExpr::Object(self.members()?))
            }
            TokenKind::Punct("[") => self.tuple(),
            TokenKind::Punct("<") => {
                // generic function type `<T>(x: T) => T`
                self.skip_type_params();
                self.function()
            }
            TokenKind::Ident(word) => match word.as_str() {
                "true" | "false" => {
                    self.bump();
                    Ok(TypeExpr::Literal(Literal::Bool(word == "true")))
                }
                "new" | "abstract" if self.peek_at(1).is_punct("(") || self.peek_at(1).is_ident("new") => {
                    self.bump();
                    self.eat_ident("new");
                    self.function()
                }
                "readonly" => {
                    self.bump();
                    self.postfix()
                }
                "keyof" | "typeof" | "unique" | "infer" | "asserts" => {
                    self.bump();
                    self.postfix()?;
                    Ok(TypeExpr::Unsupported(word.clone()))
                }
                kw if KEYWORDS.contains(&kw) => {
                    self.bump();
                    Ok(TypeExpr::Keyword(word.clone()))
                }
                _ => self.reference(),
            },
            _ => Err(self.error(format!("unexpected token {:?}", token))),
        }
    }

    fn reference(&mut self) -> PResult<TypeExpr> {
        let mut name = self.ident()?;
        while self.peek().is_punct(".") && self.peek_at(1).is_ident_like() {
            self.bump();
            name.push('.');
            name.push_str(&self.ident()?);
        }
        let mut args = Vec::new();
        if self.eat("<") {
            loop {
                args.push(self.ty()?);
                if !self.eat(",") { break; }
            }
            self.expect(">")?;
        }
        Ok(TypeExpr::Reference { name, args })
    }

    fn tuple(&mut self) -> PResult<TypeExpr> {
        self.expect("[")?;
        let mut elems = Vec::new();
        while !self.eat("]") {
            if self.at_eof() {
                return Err(self.error("unterminated tuple"));
            }
            self.eat("...");
            if self.peek().is_ident_like() && (self.peek_at(1).is_punct(":") || self.peek_at(1).is_punct("?")) {
                // labelled element `name?: T`
                self.bump();
                self.eat("?");
                self.expect(":")?;
            }
            elems.push(self.ty()?);
            self.eat("?");
            self.eat(",");
        }
        Ok(TypeExpr::Tuple(elems))
    }

    fn function(&mut self) -> PResult<TypeExpr> {
        self.skip_balanced()?;
        self.expect("=>")?;
        self.ty()?;
        Ok(TypeExpr::Function)
    }
}

// ------------------------------- Helpers ---------------------------------- //

impl Parser {
    fn peek(&self) -> &TokenKind { self.peek_at(0) }

    fn peek_at(&self, n: usize) -> &TokenKind {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn bump(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn at_eof(&self) -> bool { matches!(self.peek(), TokenKind::Eof) }

    fn eat(&mut self, p: &str) -> bool {
        if self.peek().is_punct(p) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_ident(&mut self, name: &str) -> bool {
        if self.peek().is_ident(name) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, p: &str) -> PResult<()> {
        if self.eat(p) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{p}`, found {:?}", self.peek())))
        }
    }

    fn ident(&mut self) -> PResult<String> {
        match self.peek().clone() {
            TokenKind::Ident(s) => {
                self.bump();
                Ok(s)
            }
            other => Err(self.error(format!("expected identifier, found {other:?}"))),
        }
    }

    fn property_name(&mut self) -> PResult<String> {
        match self.peek().clone() {
            TokenKind::Ident(s) | TokenKind::Str(s) => {
                self.bump();
                Ok(s)
            }
            TokenKind::Num(n) => {
                self.bump();
                Ok(Literal::from(n).to_string())
            }
            other => Err(self.error(format!("expected property name, found {other:?}"))),
        }
    }

    fn literal(&mut self) -> Option<Literal> {
        let lit = match self.peek() {
            TokenKind::Str(s) => Literal::String(s.clone()),
            TokenKind::Num(n) => Literal::from(*n),
            TokenKind::Ident(s) if s == "true" || s == "false" => Literal::Bool(s == "true"),
            _ => return None,
        };
        self.bump();
        Some(lit)
    }

    fn error(&self, message: impl Into<String>) -> Diagnostic {
        let token = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        Diagnostic { line: token.line, column: token.column, message: message.into() }
    }

    fn skip_type_params(&mut self) {
        if !self.peek().is_punct("<") {
            return;
        }
        let mut depth = 0usize;
        loop {
            match self.peek() {
                TokenKind::Eof => return,
                k if k.is_punct("<") => depth += 1,
                k if k.is_punct(">") => {
                    depth -= 1;
                    if depth == 0 {
                        self.bump();
                        return;
                    }
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// Skips one bracketed group starting at the current opener.
    fn skip_balanced(&mut self) -> PResult<()> {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                TokenKind::Eof => return Err(self.error("unbalanced brackets")),
                k if k.opens() => depth += 1,
                k if k.closes() => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.bump();
                        return Ok(());
                    }
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// Stops before the first stop token found at bracket depth zero.
    fn skip_until_any(&mut self, stops: &[&str]) {
        let mut depth = 0usize;
        loop {
            let kind = self.peek();
            if matches!(kind, TokenKind::Eof) {
                return;
            }
            if depth == 0 && stops.iter().any(|s| kind.is_punct(s)) {
                return;
            }
            if kind.opens() {
                depth += 1;
            } else if kind.closes() {
                if depth == 0 {
                    return;
                }
                depth -= 1;
            }
            self.bump();
        }
    }

    /// Skips a statement we do not model: up to `;` at depth zero, or through
    /// the block that closes it.
    fn skip_statement(&mut self) {
        let mut depth = 0usize;
        loop {
            let kind = self.peek().clone();
            match kind {
                TokenKind::Eof => return,
                ref k if k.is_punct(";") && depth == 0 => {
                    self.bump();
                    return;
                }
                ref k if k.opens() => depth += 1,
                ref k if k.closes() => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 && k.is_punct("}") {
                        self.bump();
                        self.eat(";");
                        return;
                    }
                }
                _ => {}
            }
            self.bump();
        }
    }

    fn arrow_follows_parens(&self) -> bool {
        let mut depth = 0usize;
        let mut i = self.pos;
        while i < self.tokens.len() {
            let kind = &self.tokens[i].kind;
            if kind.opens() {
                depth += 1;
            } else if kind.closes() {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return self.tokens.get(i + 1).is_some_and(|t| t.kind.is_punct("=>"));
                }
            } else if matches!(kind, TokenKind::Eof) {
                return false;
            }
            i += 1;
        }
        false
    }

    fn mapped_type_ahead(&self) -> bool {
        let mut n = 1;
        if self.peek_at(n).is_ident("readonly") || self.peek_at(n).is_punct("+") || self.peek_at(n).is_punct("-") {
            n += 1;
            if self.peek_at(n).is_ident("readonly") { n += 1; }
        }
        self.peek_at(n).is_punct("[") && self.peek_at(n + 1).is_ident_like() && self.peek_at(n + 2).is_ident("in")
    }
}

impl TokenKind {
    fn opens(&self) -> bool {
        self.is_punct("{") || self.is_punct("(") || self.is_punct("[")
    }

    fn closes(&self) -> bool {
        self.is_punct("}") || self.is_punct(")") || self.is_punct("]")
    }

    fn is_ident_like(&self) -> bool {
        matches!(self, TokenKind::Ident(_))
    }

    fn is_property_name(&self) -> bool {
        matches!(self, TokenKind::Ident(_) | TokenKind::Str(_) | TokenKind::Num(_))
    }
}
