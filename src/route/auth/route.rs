use argon2::Argon2;
use axum::{extract::State, http::StatusCode};
use macros::route;
use uuid::Uuid;

use crate::{
	extract::{Json, Session},
	openapi::tag,
	AppState,
};

use super::{model, Error, Role, RouteError};

pub const KEY_LENGTH: usize = 32;

/// Hashes a password with Argon2, using the user's id as a salt.
/// Since this is only used for logging in and setting a password,
/// the scope of this function can remain in here with no issues.
fn hash_password(
	hasher: &Argon2,
	password: &str,
	id: &Uuid,
) -> Result<[u8; KEY_LENGTH], argon2::Error> {
	let mut hash = [0; KEY_LENGTH];

	hasher.hash_password_into(password.as_bytes(), id.as_bytes(), &mut hash)?;
	Ok(hash)
}

/// Maps unique-constraint violations on the user table to their domain error.
fn map_unique(error: sqlx::Error) -> RouteError {
	match error {
		sqlx::Error::Database(ref d) => match d.constraint() {
			Some("user_email_key") => Error::EmailTaken.into(),
			Some("user_username_key") => Error::UsernameTaken.into(),
			_ => RouteError::from(error),
		},
		error => RouteError::from(error),
	}
}

/// Log in
/// Exchanges an email and password for a bearer token valid for 24 hours.
#[route(tag = tag::AUTH, response(status = 200, description = "Logged in successfully.", shape = "Json<model::AuthResponse>"))]
pub async fn login(
	State(state): State<AppState>,
	Json(auth): Json<model::LoginInput>,
) -> Result<Json<model::AuthResponse>, RouteError> {
	let user = sqlx::query_as::<_, model::User>(r#"SELECT * FROM "user" WHERE email = $1"#)
		.bind(auth.email.to_lowercase())
		.fetch_optional(&state.database)
		.await?;

	let Some(user) = user else {
		// Costs one hash, the same as a wrong password
		hash_password(&state.hasher, &auth.password, &Uuid::nil())?;

		tracing::debug!(email = %auth.email, "login for unknown email");
		return Err(Error::InvalidCredentials.into());
	};

	let hashed = hash_password(&state.hasher, &auth.password, &user.id)?;

	if user.password != hashed {
		tracing::debug!(user = %user.id, "login with wrong password");
		return Err(Error::InvalidCredentials.into());
	}

	let token = state.keys.issue(user.id)?;

	tracing::info!(user = %user.id, "user logged in");

	Ok(Json(model::AuthResponse {
		message: None,
		user,
		token,
	}))
}

/// Register account
/// Registers a new account and returns a bearer token for it. The first account
/// ever registered becomes an admin, later ones are editors unless an admin
/// registers them with `role: "admin"`.
#[route(tag = tag::AUTH, response(status = 201, description = "Registered successfully.", shape = "Json<model::AuthResponse>"))]
pub async fn register(
	State(state): State<AppState>,
	session: Option<Session>,
	Json(auth): Json<model::RegisterInput>,
) -> Result<(StatusCode, Json<model::AuthResponse>), RouteError> {
	let user_id = Uuid::new_v4();
	let hashed = hash_password(&state.hasher, &auth.password, &user_id)?;

	let mut tx = state.database.begin().await?;

	// Serializes registrations so only one of them can see an empty table
	sqlx::query(r#"LOCK TABLE "user" IN SHARE ROW EXCLUSIVE MODE"#)
		.execute(&mut *tx)
		.await?;

	let first = sqlx::query_scalar::<_, bool>(r#"SELECT NOT EXISTS (SELECT 1 FROM "user")"#)
		.fetch_one(&mut *tx)
		.await?;

	let role = match (first, auth.role) {
		(true, _) => Role::Admin,
		(false, Some(Role::Admin)) => {
			if !session.as_ref().is_some_and(|s| s.user.is_admin()) {
				return Err(Error::ElevationDenied.into());
			}

			Role::Admin
		}
		(false, _) => Role::Editor,
	};

	let user = sqlx::query_as::<_, model::User>(
		r#"
			INSERT INTO "user" (id, username, email, password, role)
			VALUES ($1, $2, $3, $4, $5)
			RETURNING *
		"#,
	)
	.bind(user_id)
	.bind(&auth.username)
	.bind(auth.email.to_lowercase())
	.bind(&hashed[..])
	.bind(role)
	.fetch_one(&mut *tx)
	.await
	.map_err(map_unique)?;

	tx.commit().await?;

	let token = state.keys.issue(user.id)?;

	tracing::info!(user = %user.id, role = ?user.role, "registered user");

	Ok((
		StatusCode::CREATED,
		Json(model::AuthResponse {
			message: Some(
				if first {
					"admin user created successfully"
				} else {
					"user created successfully"
				}
				.into(),
			),
			user,
			token,
		}),
	))
}

/// Get user
/// Returns the authenticated user.
#[route(tag = tag::AUTH, auth)]
pub async fn get_me(session: Session) -> Json<model::User> {
	Json(session.user)
}

/// Update user
/// Updates the username, email or password of the authenticated user. Any other
/// field, including `role`, rejects the whole request.
#[route(tag = tag::AUTH, auth)]
pub async fn update_me(
	State(state): State<AppState>,
	session: Session,
	Json(auth): Json<model::UpdateMeInput>,
) -> Result<Json<model::User>, RouteError> {
	let hashed = auth
		.password
		.as_deref()
		.map(|password| hash_password(&state.hasher, password, &session.user.id))
		.transpose()?;

	let user = sqlx::query_as::<_, model::User>(
		r#"
			UPDATE "user"
			SET username = COALESCE($1, username),
				email = COALESCE($2, email),
				password = COALESCE($3, password),
				updated_at = NOW()
			WHERE id = $4
			RETURNING *
		"#,
	)
	.bind(auth.username)
	.bind(auth.email.map(|email| email.to_lowercase()))
	.bind(hashed.as_ref().map(|hash| &hash[..]))
	.bind(session.user.id)
	.fetch_one(&state.database)
	.await
	.map_err(map_unique)?;

	Ok(Json(user))
}
