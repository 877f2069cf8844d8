//! Language features built on the Umple syntax tree
//!
//! - `query`: rule tables for definitions, references and completion scopes
//! - `symbols`: definition extraction, container rules and document outline
//! - `goto_definition`: reference resolution against the symbol index
//! - `completion`: completion context and items

pub mod completion;
pub mod goto_definition;
pub mod query;
pub mod symbols;
