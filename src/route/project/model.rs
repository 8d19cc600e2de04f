pub use crate::route::model::{Deleted, IdInput, TagList};

use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::route::model::validate_not_empty;

/// A portfolio project.
#[model]
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
	/// The unique identifier of the project.
	#[model(skip)]
	pub id: Uuid,
	#[validate(length(min = 1, max = 200))]
	pub title: String,
	#[validate(length(min = 1))]
	pub description: String,
	/// The technologies used, as a list or a comma-delimited string.
	#[validate(custom(function = "validate_not_empty"))]
	pub technologies: TagList,
	/// The URL of the cover image.
	#[validate(url)]
	pub image: String,
	#[validate(url)]
	pub github_link: String,
	#[validate(url)]
	pub demo_link: Option<String>,
	#[model(skip)]
	pub created_at: chrono::DateTime<chrono::Utc>,
	#[model(skip)]
	pub updated_at: chrono::DateTime<chrono::Utc>,
}
