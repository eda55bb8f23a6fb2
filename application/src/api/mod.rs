//! GraphQL API definitions.

pub mod document;
mod mutation;
mod query;
pub mod scalar;

use crate::Context;

pub use self::{document::Document, mutation::Mutation, query::Query};

/// GraphQL schema.
pub type Schema = juniper::RootNode<
    'static,
    Query,
    Mutation,
    juniper::EmptySubscription<Context>,
>;
