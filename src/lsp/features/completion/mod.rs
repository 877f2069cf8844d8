//! Code completion for Umple
//!
//! - `context`: what may follow the cursor (grammar lookahead + scope rules)
//! - `items`: LSP items from that context and the symbol index

pub mod context;
pub mod items;

pub use context::{DEFINITION_KEYWORDS, completion_info, extract_partial_identifier};
pub use items::{completion_items, scoped_symbols, use_path_candidates};
