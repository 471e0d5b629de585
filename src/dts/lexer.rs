use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"(?s)"#,
        r#"(?P<skip>//[^\n]*|/\*.*?\*/|\s+)"#,
        r#"|(?P<str>"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*')"#,
        r#"|(?P<tpl>`(?:[^`\\]|\\.)*`)"#,
        r#"|(?P<num>-?(?:\d+(?:\.\d+)?|\.\d+)(?:[eE][+-]?\d+)?)"#,
        r#"|(?P<ident>[A-Za-z_$][A-Za-z0-9_$]*)"#,
        r#"|(?P<punct>=>|\.\.\.|[{}()\[\]<>;:,?|&=.*+\-])"#,
    ))
    .expect("token regex")
});

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),      // unquoted contents
    Num(f64),
    Template(String), // raw, including backticks
    Punct(&'static str),
    Unknown(char),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

const PUNCTS: &[&str] = &[
    "=>", "...", "{", "}", "(", ")", "[", "]", "<", ">", ";", ":", ",", "?", "|", "&", "=", ".", "*", "+", "-",
];

/// Splits declaration source into tokens. Never fails: characters outside
/// the grammar become `TokenKind::Unknown` and the parser degrades around
/// them. Always ends with `Eof`.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut cursor = Cursor { line: 1, column: 1 };
    let mut last_end = 0;

    for caps in TOKEN_REGEX.captures_iter(text) {
        let Some(mat) = caps.get(0) else { continue };
        if mat.start() > last_end {
            for ch in text[last_end..mat.start()].chars() {
                tokens.push(Token { kind: TokenKind::Unknown(ch), line: cursor.line, column: cursor.column });
                cursor.advance(&ch.to_string());
            }
        }

        let part = mat.as_str();
        let kind = if caps.name("skip").is_some() {
            None
        } else if caps.name("str").is_some() {
            Some(TokenKind::Str(unescape(&part[1..part.len() - 1])))
        } else if caps.name("tpl").is_some() {
            Some(TokenKind::Template(part.to_string()))
        } else if caps.name("num").is_some() {
            match part.parse::<f64>() {
                Ok(n) => Some(TokenKind::Num(n)),
                Err(_) => Some(TokenKind::Unknown(part.chars().next().unwrap_or('?'))),
            }
        } else if caps.name("ident").is_some() {
            Some(TokenKind::Ident(part.to_string()))
        } else {
            let punct = PUNCTS.iter().find(|p| **p == part).copied();
            Some(punct.map(TokenKind::Punct).unwrap_or_else(|| {
                TokenKind::Unknown(part.chars().next().unwrap_or('?'))
            }))
        };

        if let Some(kind) = kind {
            tokens.push(Token { kind, line: cursor.line, column: cursor.column });
        }
        cursor.advance(part);
        last_end = mat.end();
    }

    for ch in text[last_end..].chars() {
        tokens.push(Token { kind: TokenKind::Unknown(ch), line: cursor.line, column: cursor.column });
        cursor.advance(&ch.to_string());
    }

    tokens.push(Token { kind: TokenKind::Eof, line: cursor.line, column: cursor.column });
    tokens
}

struct Cursor {
    line: usize,
    column: usize,
}

impl Cursor {
    fn advance(&mut self, part: &str) {
        let newlines = part.matches('\n').count();
        if newlines > 0 {
            self.line += newlines;
            if let Some(tail) = part.rsplit('\n').next() {
                self.column = tail.chars().count() + 1;
            }
        } else {
            self.column += part.chars().count();
        }
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

impl TokenKind {
    pub fn is_punct(&self, p: &str) -> bool {
        matches!(self, TokenKind::Punct(q) if *q == p)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        matches!(self, TokenKind::Ident(s) if s == name)
    }
}
