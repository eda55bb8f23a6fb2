//! Marker types.

/// Marker type describing an entity acquisition.
#[derive(Clone, Copy, Debug)]
pub struct Acquisition;

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;
