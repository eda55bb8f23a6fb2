//! [`Command`] definition.

pub mod delete_with_references;
pub mod unpublish_document;
pub mod unpublish_with_references;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    delete_with_references::DeleteWithReferences,
    unpublish_document::UnpublishDocument,
    unpublish_with_references::UnpublishWithReferences,
};

/// Outcome of a reference cascade run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CascadeSummary {
    /// Number of [`Document`]s retired into the draft slot by the cascade.
    ///
    /// The cascade target itself is never counted.
    ///
    /// [`Document`]: crate::domain::Document
    pub unpublished: usize,
}
