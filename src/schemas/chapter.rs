use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ChapterListQuery {
    #[validate(length(min = 1, message = "subject must not be empty"))]
    pub(crate) subject: String,
    #[serde(alias = "classLevel")]
    #[validate(length(min = 1, message = "class_level must not be empty"))]
    pub(crate) class_level: String,
    #[serde(default, alias = "hideInvisible")]
    pub(crate) hide_invisible: Option<bool>,
}
