//! Declarative structural queries over the Umple syntax tree
//!
//! - `query_types`: rule and capture types
//! - `query_engine`: rule tables and their evaluation

pub mod query_engine;
pub mod query_types;

pub use query_engine::{QueryEngine, UMPLE_QUERIES};
pub use query_types::{
    Anchor, Context, DefinitionCapture, QueryType, ReferenceCapture, ScopeCapture, ScopeSymbols,
};
