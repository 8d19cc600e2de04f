pub use crate::route::model::{Deleted, IdInput, TagList};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A blog post.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Content {
	pub id: Uuid,
	pub title: String,
	/// The body of the post.
	pub content: String,
	pub author: String,
	/// The publication date shown on the site.
	pub date: DateTime<Utc>,
	pub tags: TagList,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateContent {
	#[validate(length(min = 1, max = 200))]
	pub title: String,
	#[validate(length(min = 1))]
	pub content: String,
	#[validate(length(min = 1, max = 100))]
	pub author: String,
	/// Defaults to the time of creation.
	pub date: Option<DateTime<Utc>>,
	#[serde(default)]
	pub tags: TagList,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateContent {
	#[validate(length(min = 1, max = 200))]
	pub title: Option<String>,
	#[validate(length(min = 1))]
	pub content: Option<String>,
	#[validate(length(min = 1, max = 100))]
	pub author: Option<String>,
	pub date: Option<DateTime<Utc>>,
	pub tags: Option<TagList>,
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_create_date_is_optional() {
		let input = serde_json::from_value::<CreateContent>(serde_json::json!({
			"title": "Hello",
			"content": "World",
			"author": "Team",
			"tags": "[\"rust\", \"web\"]",
		}))
		.unwrap();

		assert!(input.validate().is_ok());
		assert!(input.date.is_none());
		assert_eq!(input.tags.0, vec!["rust", "web"]);
	}

	#[test]
	fn test_update_rejects_unknown_field() {
		let result = serde_json::from_value::<UpdateContent>(serde_json::json!({
			"title": "Hello",
			"published": true,
		}));

		assert!(result.is_err());
	}
}
