pub use crate::route::model::TagList;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// The about page. Exactly one exists.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct About {
	pub title: String,
	pub description: String,
	pub image: Option<String>,
	pub skills: TagList,
	pub experience: String,
	pub education: String,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateAbout {
	#[validate(length(max = 200))]
	pub title: Option<String>,
	pub description: Option<String>,
	#[validate(url)]
	pub image: Option<String>,
	pub skills: Option<TagList>,
	pub experience: Option<String>,
	pub education: Option<String>,
}
