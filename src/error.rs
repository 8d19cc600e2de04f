use std::borrow::Cow;

use aide::OperationOutput;
use axum::{
	body::Body,
	extract::rejection::{JsonRejection, PathRejection, QueryRejection},
	http::{Response, StatusCode},
	response::IntoResponse,
};
use schemars::JsonSchema;
use serde::Serialize;
use tower_governor::GovernorError;

use crate::{config, extract::Json, token};

pub type Map = serde_json::Map<String, serde_json::Value>;

/// Error type for failures that are not specific to a route.
///
/// The Display trait is not sent to the client, so it can show
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("json error: {0}")]
	Json(#[from] JsonRejection),
	#[error("query error: {0}")]
	Query(#[from] QueryRejection),
	#[error("path error: {0}")]
	Path(#[from] PathRejection),
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("rate limit error: {0}")]
	RateLimit(#[from] GovernorError),
	#[error("token error: {0}")]
	Token(#[from] token::Error),
	#[error("password hashing error: {0}")]
	Hash(#[from] argon2::Error),
}

/// A single client-facing error message.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message<'a> {
	/// A human-readable description of the error.
	pub content: Cow<'a, str>,
	/// The request field the error relates to, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<Cow<'a, str>>,
	/// Additional structured information.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Map>,
}

impl<'a> Message<'a> {
	pub fn new(content: impl Into<Cow<'a, str>>) -> Self {
		Self {
			content: content.into(),
			field: None,
			details: None,
		}
	}

	#[must_use]
	pub fn field(mut self, field: impl Into<Cow<'a, str>>) -> Self {
		self.field = Some(field.into());
		self
	}

	#[must_use]
	pub fn detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
		self.details
			.get_or_insert_with(Map::new)
			.insert(key.to_owned(), value.into());
		self
	}

	pub fn into_vec(self) -> Vec<Self> {
		vec![self]
	}
}

/// The body of every error response.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorResponse<'a> {
	pub success: bool,
	/// The first error message, shown to users as-is.
	pub message: Cow<'a, str>,
	pub errors: Vec<Message<'a>>,
}

impl<'a> ErrorResponse<'a> {
	pub fn new(errors: Vec<Message<'a>>) -> Self {
		let message = errors
			.first()
			.map_or(Cow::Borrowed("something went wrong"), |m| m.content.clone());

		Self {
			success: false,
			message,
			errors,
		}
	}
}

/// Describes how a route-specific error is presented to the client.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;

	fn errors(&self) -> Vec<Message<'_>> {
		Message::new(self.to_string()).into_vec()
	}
}

/// The error type returned by route handlers: either a failure shared by all
/// routes, or one described by the route module's own `T`.
#[derive(Debug, thiserror::Error)]
pub enum RouteError<T> {
	#[error(transparent)]
	App(#[from] AppError),
	#[error(transparent)]
	Route(T),
}

impl<T> From<sqlx::Error> for RouteError<T> {
	fn from(error: sqlx::Error) -> Self {
		Self::App(AppError::Database(error))
	}
}

impl<T> From<argon2::Error> for RouteError<T> {
	fn from(error: argon2::Error) -> Self {
		Self::App(AppError::Hash(error))
	}
}

impl<T> From<validator::ValidationErrors> for RouteError<T> {
	fn from(error: validator::ValidationErrors) -> Self {
		Self::App(AppError::Validation(error))
	}
}

impl<T> From<token::Error> for RouteError<T> {
	fn from(error: token::Error) -> Self {
		Self::App(AppError::Token(error))
	}
}

impl<T> OperationOutput for RouteError<T> {
	type Inner = Self;
}

fn respond(status: StatusCode, errors: Vec<Message<'_>>) -> Response<Body> {
	(status, Json(ErrorResponse::new(errors))).into_response()
}

/// Builds the response for a failure the client cannot act on.
///
/// The raw error is logged, and echoed back only in development.
fn internal(error: &dyn std::error::Error) -> Response<Body> {
	tracing::error!(%error, "internal error");

	let mut message = Message::new("internal server error");

	if config::environment().is_development() {
		message = message.detail("error", error.to_string());
	}

	respond(StatusCode::INTERNAL_SERVER_ERROR, message.into_vec())
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		match self {
			Self::Validation(errors) => {
				let mut messages = errors
					.field_errors()
					.into_iter()
					.flat_map(|(field, errors)| {
						let field = field.to_string();

						errors.iter().map(move |error| {
							let content = error
								.message
								.as_ref()
								.map_or_else(|| format!("{field}: {}", error.code), ToString::to_string);

							Message::new(content).field(field.clone())
						})
					})
					.collect::<Vec<_>>();

				// Keep the first message stable regardless of hash ordering
				messages.sort_by(|a, b| a.field.cmp(&b.field));
				respond(StatusCode::BAD_REQUEST, messages)
			}
			Self::Json(rejection) => {
				let status = match rejection {
					JsonRejection::MissingJsonContentType(..) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
					_ => StatusCode::BAD_REQUEST,
				};

				respond(status, Message::new(rejection.body_text()).into_vec())
			}
			Self::Query(rejection) => respond(
				StatusCode::BAD_REQUEST,
				Message::new(rejection.body_text()).into_vec(),
			),
			Self::Path(rejection) => respond(
				StatusCode::BAD_REQUEST,
				Message::new(rejection.body_text()).into_vec(),
			),
			Self::RateLimit(GovernorError::TooManyRequests { wait_time, .. }) => respond(
				StatusCode::TOO_MANY_REQUESTS,
				Message::new("too many requests, slow down")
					.detail("wait_time", wait_time)
					.into_vec(),
			),
			Self::RateLimit(ref error) => internal(error),
			Self::Database(ref error) => internal(error),
			Self::Token(ref error) => internal(error),
			Self::Hash(ref error) => internal(error),
		}
	}
}

impl<T> IntoResponse for RouteError<T>
where
	T: ErrorShape,
{
	fn into_response(self) -> Response<Body> {
		match self {
			Self::App(error) => error.into_response(),
			Self::Route(error) => respond(error.status(), error.errors()),
		}
	}
}

#[cfg(test)]
mod test {
	use axum::body::to_bytes;
	use validator::Validate;

	use super::*;

	#[derive(Debug, thiserror::Error)]
	enum Sample {
		#[error("sample not found")]
		Missing,
	}

	impl ErrorShape for Sample {
		fn status(&self) -> StatusCode {
			StatusCode::NOT_FOUND
		}
	}

	#[derive(Validate)]
	struct Input {
		#[validate(length(min = 3))]
		title: String,
	}

	async fn body(response: Response<Body>) -> serde_json::Value {
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		serde_json::from_slice(&bytes).unwrap()
	}

	#[tokio::test]
	async fn test_route_error_shape() {
		let response = RouteError::Route(Sample::Missing).into_response();

		assert_eq!(response.status(), StatusCode::NOT_FOUND);

		let body = body(response).await;

		assert_eq!(body["success"], false);
		assert_eq!(body["message"], "sample not found");
		assert_eq!(body["errors"][0]["content"], "sample not found");
	}

	#[tokio::test]
	async fn test_validation_error_names_field() {
		let errors = Input { title: "ab".into() }.validate().unwrap_err();
		let response = RouteError::<Sample>::from(errors).into_response();

		assert_eq!(response.status(), StatusCode::BAD_REQUEST);

		let body = body(response).await;

		assert_eq!(body["errors"][0]["field"], "title");
		assert!(body["message"].as_str().unwrap().starts_with("title"));
	}

	#[tokio::test]
	async fn test_database_error_hides_detail_outside_development() {
		let response = AppError::Database(sqlx::Error::RowNotFound).into_response();

		assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

		let body = body(response).await;

		assert_eq!(body["message"], "internal server error");
		assert!(body["errors"][0].get("details").is_none());
	}

	#[test]
	fn test_message_builder() {
		let message = Message::new("bad").field("slug").detail("slug", "Not A Slug");

		assert_eq!(message.field.as_deref(), Some("slug"));
		assert_eq!(message.details.unwrap()["slug"], "Not A Slug");
	}
}
