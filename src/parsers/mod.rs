//! Umple parsing: lexer, syntax tree, parse cache and position conversions

pub mod parse_cache;
pub mod position_utils;
pub mod umple;

pub use parse_cache::ParseCache;
