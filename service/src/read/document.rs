//! [`Document`]-related read definitions.

use std::iter;

use crate::domain::document::{Id, Lifecycle, TypeName};
#[cfg(doc)]
use crate::domain::Document;

/// Selection of [`Document`] versions carrying a reference to a target.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Referencing {
    /// Logical [`Id`] the selected [`Document`]s refer to.
    pub target: Id,

    /// [`Lifecycle`] slot the selected versions occupy.
    pub lifecycle: Lifecycle,

    /// [`TypeName`] to narrow the selection down to, if any.
    pub type_name: Option<TypeName>,
}

/// Selection of [`Document`] versions of a single content type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OfType {
    /// [`TypeName`] of the selected [`Document`]s.
    pub type_name: TypeName,

    /// [`Lifecycle`] slot the selected versions occupy.
    pub lifecycle: Lifecycle,
}

/// Publish state of a logical [`Document`] id.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct PublishState {
    /// Indicator whether a published version exists.
    pub published: bool,

    /// Indicator whether a draft version exists.
    pub draft: bool,
}

/// Published [`Document`]s connected to a reference cascade target.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Connected {
    /// [`Id`]s of the published [`Document`]s of the related content types
    /// referencing the target.
    pub related: Vec<Id>,

    /// [`Id`]s of the published communities referencing the target.
    ///
    /// Empty unless the target is a city.
    pub communities: Vec<Id>,
}

impl Connected {
    /// Builds the ordered affected list of a cascade over the provided
    /// `target`: related [`Document`]s first, then communities, then the
    /// target itself.
    #[must_use]
    pub fn into_affected(self, target: Id) -> Vec<Id> {
        let Self {
            related,
            communities,
        } = self;
        related
            .into_iter()
            .chain(communities)
            .chain(iter::once(target))
            .collect()
    }
}
