pub(crate) mod chapters;
pub(crate) mod health;
pub(crate) mod papers;
pub(crate) mod patterns;
pub(crate) mod questions;
