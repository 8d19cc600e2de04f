use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_username(username: &str) -> Result<(), ValidationError> {
	if username
		.chars()
		.any(|c| !(c.is_alphanumeric() || c == '_' || c == '-'))
	{
		return Err(ValidationError::new(
			"username may only contain letters, digits, '_' and '-'",
		));
	}

	Ok(())
}

/// What a user is allowed to do. Admins can additionally delete content
/// and grant the admin role.
#[derive(
	Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
	Admin,
	#[default]
	Editor,
}

/// A single user.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
	/// The unique identifier of the user.
	pub id: Uuid,
	/// The name shown in the admin dashboard.
	pub username: String,
	/// The email address used for logging in.
	pub email: String,
	/// The argon2 hash of the password, salted with the user id.
	#[serde(skip)]
	pub password: Vec<u8>,
	pub role: Role,
	pub created_at: chrono::DateTime<chrono::Utc>,
	pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl User {
	pub fn is_admin(&self) -> bool {
		self.role == Role::Admin
	}
}

/// Returned by login and registration.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AuthResponse {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<Cow<'static, str>>,
	pub user: User,
	/// The bearer token to send in the `Authorization` header.
	pub token: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct LoginInput {
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 1, max = 128))]
	pub password: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct RegisterInput {
	#[validate(length(min = 1, max = 32), custom(function = "validate_username"))]
	pub username: String,
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 1, max = 128))]
	pub password: String,
	/// Only honoured for `admin` when the request is made by an admin.
	pub role: Option<Role>,
}

/// The fields a user may change on their own account.
#[derive(Deserialize, Validate, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateMeInput {
	#[validate(length(min = 1, max = 32), custom(function = "validate_username"))]
	pub username: Option<String>,
	#[validate(email)]
	pub email: Option<String>,
	#[validate(length(min = 1, max = 128))]
	pub password: Option<String>,
}
