//! Reference cascade [`Lock`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};

use super::document;

/// Advisory lock held while a reference cascade runs over its target.
///
/// Only one cascade at a time may operate on the same target.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Lock {
    /// [`document::Id`] of the cascade target this [`Lock`] guards.
    pub target: document::Id,

    /// [`DateTime`] of this [`Lock`] acquisition.
    pub acquired_at: AcquisitionDateTime,
}

/// [`DateTime`] of a [`Lock`] acquisition.
pub type AcquisitionDateTime = DateTimeOf<(Lock, unit::Acquisition)>;
