//! Structural payload validation driven by TypeScript declaration files.
//!
//! `dts` reads `.d.ts` text, `lower` + `extract` turn declarations into the
//! [`ir::Node`] tree, `validate` synthesizes validators from it and `dto`
//! applies them to JSON payloads.
pub mod cli;
pub mod config;
pub mod dto;
pub mod dts;
pub mod extract;
pub mod ir;
pub mod jq_exec;
pub mod lower;
pub mod norm;
pub mod path_de;
pub mod report;
pub mod validate;
