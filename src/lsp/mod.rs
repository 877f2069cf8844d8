pub mod backend;
pub mod diagnostic_provider;
pub mod diagnostic_remapper;
pub mod document;
pub mod features;
pub mod imports;
pub mod models;
pub mod shadow_workspace;
pub mod symbol_index;
pub mod umple_validator;
pub mod workspace;
