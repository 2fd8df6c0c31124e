//! Pattern-to-paper compilation.
//!
//! Everything here is synchronous and free of I/O. Callers load chapters and
//! question pools, hold a [`selection::SelectionState`] per authoring session
//! and run the resolvers on demand.

pub(crate) mod bank;
pub(crate) mod chapters;
pub(crate) mod compiler;
pub(crate) mod effective;
pub(crate) mod model;
pub(crate) mod selection;
pub(crate) mod type_matcher;
