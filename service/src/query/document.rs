//! [`Query`] collection related to [`Document`]s.

use common::operations::By;

use crate::{
    domain::{document, Document},
    read,
};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Document`] version by its [`document::VersionId`].
pub type ById = DatabaseQuery<By<Option<Document>, document::VersionId>>;

/// Queries the [`read::document::PublishState`] of a logical
/// [`document::Id`].
pub type PublishState =
    DatabaseQuery<By<read::document::PublishState, document::Id>>;

/// Queries [`Document`] versions of a single content type.
pub type OfType = DatabaseQuery<By<Vec<Document>, read::document::OfType>>;

/// Queries [`Document`] versions carrying a reference to a target.
pub type Referencing =
    DatabaseQuery<By<Vec<Document>, read::document::Referencing>>;
