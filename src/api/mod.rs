pub(crate) mod cache;
pub(crate) mod chapters;
pub(crate) mod errors;
pub(crate) mod handlers;
pub(crate) mod papers;
pub(crate) mod patterns;
pub(crate) mod router;
pub(crate) mod sessions;
