//! Read entities definitions.

pub mod document;
