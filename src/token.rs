use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How long an issued token stays valid, in seconds.
pub const TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// The claims carried by every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
	/// The user the token was issued to.
	pub sub: Uuid,
	pub iat: i64,
	pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("signing secret must not be empty")]
	EmptySecret,
	#[error("token has expired")]
	Expired,
	#[error("invalid token")]
	Invalid(#[source] jsonwebtoken::errors::Error),
	#[error("failed to sign token: {0}")]
	Sign(#[source] jsonwebtoken::errors::Error),
}

struct Inner {
	encoding: EncodingKey,
	decoding: DecodingKey,
	validation: Validation,
}

/// Signs and verifies bearer tokens with a shared HS256 secret.
#[derive(Clone)]
pub struct Keys(Arc<Inner>);

impl std::fmt::Debug for Keys {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Keys").finish_non_exhaustive()
	}
}

impl Keys {
	/// Builds the keys from `secret`. An empty secret is refused so the
	/// server never signs with a guessable key.
	pub fn new(secret: &str) -> Result<Self, Error> {
		if secret.trim().is_empty() {
			return Err(Error::EmptySecret);
		}

		let mut validation = Validation::new(Algorithm::HS256);
		validation.leeway = 0;
		validation.set_required_spec_claims(&["exp", "sub"]);

		Ok(Self(Arc::new(Inner {
			encoding: EncodingKey::from_secret(secret.as_bytes()),
			decoding: DecodingKey::from_secret(secret.as_bytes()),
			validation,
		})))
	}

	/// Issues a token for `user_id`, valid for [`TOKEN_LIFETIME_SECS`].
	pub fn issue(&self, user_id: Uuid) -> Result<String, Error> {
		let now = Utc::now().timestamp();

		self.sign(&Claims {
			sub: user_id,
			iat: now,
			exp: now + TOKEN_LIFETIME_SECS,
		})
	}

	pub fn sign(&self, claims: &Claims) -> Result<String, Error> {
		jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.0.encoding)
			.map_err(Error::Sign)
	}

	/// Verifies the signature and expiry of `token`.
	pub fn verify(&self, token: &str) -> Result<Claims, Error> {
		jsonwebtoken::decode::<Claims>(token, &self.0.decoding, &self.0.validation)
			.map(|data| data.claims)
			.map_err(|error| match error.kind() {
				ErrorKind::ExpiredSignature => Error::Expired,
				_ => Error::Invalid(error),
			})
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_issue_and_verify() {
		let keys = Keys::new("test-secret").unwrap();
		let user_id = Uuid::new_v4();

		let token = keys.issue(user_id).unwrap();
		let claims = keys.verify(&token).unwrap();

		assert_eq!(claims.sub, user_id);
		assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
	}

	#[test]
	fn test_empty_secret_is_refused() {
		assert!(matches!(Keys::new(""), Err(Error::EmptySecret)));
		assert!(matches!(Keys::new("  "), Err(Error::EmptySecret)));
	}

	#[test]
	fn test_expired_token() {
		let keys = Keys::new("test-secret").unwrap();
		let now = Utc::now().timestamp();

		let token = keys
			.sign(&Claims {
				sub: Uuid::new_v4(),
				iat: now - 7200,
				exp: now - 3600,
			})
			.unwrap();

		assert!(matches!(keys.verify(&token), Err(Error::Expired)));
	}

	#[test]
	fn test_wrong_secret_is_invalid() {
		let token = Keys::new("secret-1").unwrap().issue(Uuid::new_v4()).unwrap();
		let result = Keys::new("secret-2").unwrap().verify(&token);

		assert!(matches!(result, Err(Error::Invalid(..))));
	}

	#[test]
	fn test_garbage_is_invalid() {
		let keys = Keys::new("test-secret").unwrap();

		assert!(matches!(keys.verify("not.a.token"), Err(Error::Invalid(..))));
	}
}
