mod content;
mod schema;

pub use content::{ContentRepo, DatasetError};
pub use schema::{SchemaEnsurer, SchemaReport, SchemaState, apply_statements};
