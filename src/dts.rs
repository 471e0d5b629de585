//! Reader for TypeScript declaration files (`.d.ts`).
//!
//! Covers the subset SDKs emit for data shapes: `type` aliases, `interface`s
//! (with `extends`), string `enum`s, unions, intersections, arrays, literals
//! and inline object types. Everything else parses into an opaque marker so
//! one odd member never sinks the whole file.
pub mod lexer;
pub mod parser;

pub use parser::{parse_declarations, Decl, DeclFile, Diagnostic, PropertySig, TypeExpr};
