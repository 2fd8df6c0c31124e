use serde::{Deserialize, Serialize};

use crate::services::bank_cache::CacheScope;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CacheClearQuery {
    #[serde(default)]
    pub(crate) scope: CacheScope,
}

#[derive(Debug, Serialize)]
pub(crate) struct CacheClearResponse {
    pub(crate) scope: CacheScope,
    pub(crate) cleared: bool,
}
