use aide::OperationInput;
use axum::{
	extract::{FromRef, FromRequestParts},
	http::{header, request, HeaderValue},
};

use crate::{
	error::RouteError,
	openapi::SECURITY_SCHEME_BEARER,
	route::auth::{self, model::User},
	token::{self, Keys},
	Database,
};

pub const AUTHORIZATION_PREFIX: &str = "Bearer ";

/// Pulls the raw token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(value: &HeaderValue) -> Result<&str, auth::Error> {
	let token = value
		.to_str()
		.ok()
		.and_then(|value| value.strip_prefix(AUTHORIZATION_PREFIX))
		.map(str::trim)
		.ok_or(auth::Error::MalformedToken)?;

	if token.is_empty() {
		return Err(auth::Error::MalformedToken);
	}

	Ok(token)
}

/// Extracts the bearer token and the user it belongs to from the request.
///
/// If there is no `Authorization` header, a [`auth::Error::MissingToken`] is returned.
/// If the header is not a bearer token, a [`auth::Error::MalformedToken`] is returned.
/// Expired and otherwise invalid tokens are told apart, and a token whose user no
/// longer exists is rejected with [`auth::Error::UserNotFound`].
///
/// ```rust,ignore
/// async fn route(session: Session) {
///   println!("{:?}", session.user);
/// }
/// ```
#[derive(Debug)]
pub struct Session {
	pub user: User,
	pub token: String,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
	Database: FromRef<S>,
	Keys: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<auth::Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let header = parts
			.headers
			.get(header::AUTHORIZATION)
			.ok_or(auth::Error::MissingToken)?;

		let token = bearer_token(header)?;

		let claims = Keys::from_ref(state).verify(token).map_err(|error| {
			tracing::debug!(%error, "rejected bearer token");

			match error {
				token::Error::Expired => auth::Error::TokenExpired,
				_ => auth::Error::TokenInvalid,
			}
		})?;

		let database = Database::from_ref(state);
		let user = sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE id = $1"#)
			.bind(claims.sub)
			.fetch_optional(&database)
			.await?
			.ok_or(auth::Error::UserNotFound)?;

		Ok(Self {
			user,
			token: token.to_owned(),
		})
	}
}

impl OperationInput for Session {
	/// Operation input for the session extractor.
	///
	/// This adds a bearer token requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		operation.security.push(
			[(SECURITY_SCHEME_BEARER.to_string(), Vec::new())]
				.into_iter()
				.collect(),
		);
	}
}

/// A [`Session`] whose user is an admin.
///
/// Runs the same checks as [`Session`] first, so an unauthenticated request is
/// still rejected with 401; a non-admin gets [`auth::Error::Forbidden`].
#[derive(Debug)]
pub struct Admin(pub Session);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Admin
where
	Database: FromRef<S>,
	Keys: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<auth::Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let session = Session::from_request_parts(parts, state).await?;

		auth::require_admin(&session.user).map_err(|error| {
			tracing::debug!(user = %session.user.id, "non-admin hit an admin route");
			error
		})?;

		Ok(Self(session))
	}
}

impl OperationInput for Admin {
	fn operation_input(ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		Session::operation_input(ctx, operation);
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_bearer_token() {
		let value = HeaderValue::from_static("Bearer abc.def.ghi");

		assert_eq!(bearer_token(&value).unwrap(), "abc.def.ghi");
	}

	#[test]
	fn test_bearer_token_malformed() {
		for raw in ["abc.def.ghi", "Basic dXNlcjpwYXNz", "Bearer ", "bearer abc"] {
			let value = HeaderValue::from_static(raw);

			assert!(
				matches!(bearer_token(&value), Err(auth::Error::MalformedToken)),
				"{raw} should be malformed"
			);
		}
	}
}
