pub use crate::route::model::{IdInput, TagList};

use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_slug(slug: &str) -> Result<(), ValidationError> {
	let valid = slug
		.split('-')
		.all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));

	if !valid {
		return Err(ValidationError::new(
			"slug must be lowercase letters and digits separated by single hyphens",
		));
	}

	Ok(())
}

/// A service offered on the website.
#[model]
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Service {
	/// The unique identifier of the service.
	#[model(skip)]
	pub id: Uuid,
	#[validate(length(min = 1, max = 100))]
	pub title: String,
	/// The URL-friendly name, unique across services.
	#[validate(length(min = 1, max = 100), custom(function = "validate_slug"))]
	pub slug: String,
	#[validate(length(min = 1))]
	pub description: String,
	pub icon: Option<String>,
	#[validate(url)]
	pub cover_image: Option<String>,
	#[model(skip)]
	pub created_at: chrono::DateTime<chrono::Utc>,
	#[model(skip)]
	pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A part of a service, shown on the service's detail page.
#[model]
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SubService {
	#[model(skip)]
	pub id: Uuid,
	/// The service this belongs to.
	#[model(skip)]
	pub service_id: Uuid,
	#[validate(length(min = 1, max = 100))]
	pub title: String,
	#[validate(length(min = 1))]
	pub description: String,
	#[serde(default)]
	pub features: TagList,
	/// Sub-services are listed by this key, ascending.
	#[serde(default, rename = "order")]
	pub position: i32,
	#[model(skip)]
	pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct SearchQuery {
	/// Full-text search over title and description.
	#[validate(length(min = 1, max = 200))]
	pub search: Option<String>,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct SlugInput {
	pub slug: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct SubServiceInput {
	/// The service id.
	pub id: Uuid,
	/// The sub-service id.
	pub sub_id: Uuid,
}

/// Returned when a service is deleted together with its sub-services.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDeleted {
	pub message: String,
	pub sub_services_deleted: u64,
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_slug_validation() {
		assert!(validate_slug("web-development").is_ok());
		assert!(validate_slug("ai2").is_ok());

		for slug in ["Web", "web--dev", "-web", "web-", "web dev", ""] {
			assert!(validate_slug(slug).is_err(), "{slug:?} should be invalid");
		}
	}

	#[test]
	fn test_sub_service_order_is_renamed() {
		let input = serde_json::from_value::<CreateSubService>(serde_json::json!({
			"title": "Audits",
			"description": "Security audits",
			"features": "Static analysis, Fuzzing",
			"order": 2,
		}))
		.unwrap();

		assert_eq!(input.position, 2);
		assert_eq!(input.features.0.len(), 2);
	}

	#[test]
	fn test_sub_service_defaults() {
		let input = serde_json::from_value::<CreateSubService>(serde_json::json!({
			"title": "Audits",
			"description": "Security audits",
		}))
		.unwrap();

		assert_eq!(input.position, 0);
		assert!(input.features.is_empty());
	}
}
