use serde::{Deserialize, Serialize};
use sqlx::Type;

/// Language mode a paper is rendered in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "papermedium", rename_all = "lowercase")]
pub(crate) enum Medium {
    #[default]
    English,
    Urdu,
    Both,
}

impl Medium {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Medium::English => "english",
            Medium::Urdu => "urdu",
            Medium::Both => "both",
        }
    }
}
