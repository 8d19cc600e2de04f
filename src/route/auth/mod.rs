use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;
use tower_governor::GovernorLayer;

use crate::{error, ratelimit, AppState};

pub mod model;
pub mod route;

pub use model::{Role, User};

/// An error that can occur during authentication.
///
/// Note that the messages are presented to the client, so they should not contain
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("invalid credentials")]
	InvalidCredentials,
	#[error("no authentication token provided")]
	MissingToken,
	#[error("invalid token format")]
	MalformedToken,
	#[error("token has expired")]
	TokenExpired,
	#[error("invalid token")]
	TokenInvalid,
	#[error("user not found")]
	UserNotFound,
	#[error("access denied, admin only")]
	Forbidden,
	#[error("only an admin can grant the admin role")]
	ElevationDenied,
	#[error("username already taken")]
	UsernameTaken,
	#[error("email already taken")]
	EmailTaken,
}

pub type RouteError = error::RouteError<Error>;

impl From<Error> for RouteError {
	fn from(error: Error) -> Self {
		Self::Route(error)
	}
}

/// Login and registration sit behind `secure` when it is given. `/me` does not.
pub fn routes(secure: Option<ratelimit::Config>) -> ApiRouter<AppState> {
	use route::*;

	let credentials = ApiRouter::new()
		.api_route("/login", post_with(login, login_docs))
		.api_route("/register", post_with(register, register_docs));

	let credentials = match secure {
		Some(config) => credentials.layer(GovernorLayer { config }),
		None => credentials,
	};

	ApiRouter::new()
		.api_route(
			"/me",
			get_with(get_me, get_me_docs).patch_with(update_me, update_me_docs),
		)
		.merge(credentials)
}

/// The role gate: only admins pass.
pub fn require_admin(user: &User) -> Result<(), Error> {
	if user.is_admin() {
		Ok(())
	} else {
		Err(Error::Forbidden)
	}
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::InvalidCredentials
			| Self::MissingToken
			| Self::MalformedToken
			| Self::TokenExpired
			| Self::TokenInvalid
			| Self::UserNotFound => StatusCode::UNAUTHORIZED,
			Self::Forbidden | Self::ElevationDenied => StatusCode::FORBIDDEN,
			Self::UsernameTaken | Self::EmailTaken => StatusCode::CONFLICT,
		}
	}

	fn errors(&self) -> Vec<error::Message<'_>> {
		let message = error::Message::new(self.to_string());

		match self {
			Self::UsernameTaken => message.field("username").into_vec(),
			Self::EmailTaken => message.field("email").into_vec(),
			_ => message.into_vec(),
		}
	}
}
