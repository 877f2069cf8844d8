pub mod config;
pub mod logging;
pub mod lsp;
pub mod parsers;
pub mod serde_helpers;
