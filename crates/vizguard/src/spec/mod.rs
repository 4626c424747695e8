//! Chart-spec sanitization and grammar validation.

mod config;
mod sanitize;
mod validate;
mod walk;

pub use config::GrammarConfig;
pub use sanitize::{SanitizationReport, find_forbidden_matches, sanitize};
pub use validate::{SpecValidator, ValidationResult};
pub use walk::rewrite_strings;
