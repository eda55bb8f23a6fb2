//! Domain definitions.

pub mod cascade;
pub mod document;
pub mod schema;

pub use self::{document::Document, schema::Schema};
