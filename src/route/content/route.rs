use axum::{extract::State, http::StatusCode};
use macros::route;

use crate::{
	extract::{Admin, Json, Path, Session},
	openapi::tag,
	Database,
};

use super::{model, Error, RouteError};

/// Get all content
/// Returns every post, most recent publication date first.
#[route(tag = tag::CONTENT)]
pub async fn get_contents(
	State(database): State<Database>,
) -> Result<Json<Vec<model::Content>>, RouteError> {
	let contents = sqlx::query_as::<_, model::Content>(
		r#"
			SELECT * FROM content
			ORDER BY date DESC, created_at DESC
		"#,
	)
	.fetch_all(&database)
	.await?;

	Ok(Json(contents))
}

/// Get single content
#[route(tag = tag::CONTENT)]
pub async fn get_content(
	State(database): State<Database>,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::Content>, RouteError> {
	let content = sqlx::query_as::<_, model::Content>("SELECT * FROM content WHERE id = $1")
		.bind(path.id)
		.fetch_optional(&database)
		.await?;

	Ok(Json(content.ok_or(Error::UnknownContent(path.id))?))
}

/// Create content
/// Creates a post. `date` defaults to now.
#[route(tag = tag::CONTENT, auth, response(status = 201, description = "The created post.", shape = "Json<model::Content>"))]
pub async fn create_content(
	State(database): State<Database>,
	session: Session,
	Json(input): Json<model::CreateContent>,
) -> Result<(StatusCode, Json<model::Content>), RouteError> {
	let content = sqlx::query_as::<_, model::Content>(
		r#"
			INSERT INTO content (title, content, author, date, tags)
			VALUES ($1, $2, $3, $4, $5)
			RETURNING *
		"#,
	)
	.bind(input.title)
	.bind(input.content)
	.bind(input.author)
	.bind(input.date.unwrap_or_else(chrono::Utc::now))
	.bind(input.tags.into_inner())
	.fetch_one(&database)
	.await?;

	tracing::info!(content = %content.id, user = %session.user.id, "created content");

	Ok((StatusCode::CREATED, Json(content)))
}

/// Update content
/// Overwrites the submitted fields of a post. A field outside the allow-list
/// rejects the whole request.
#[route(tag = tag::CONTENT, auth)]
pub async fn update_content(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<model::IdInput>,
	Json(input): Json<model::UpdateContent>,
) -> Result<Json<model::Content>, RouteError> {
	let content = sqlx::query_as::<_, model::Content>(
		r#"
			UPDATE content
			SET title = COALESCE($1, title),
				content = COALESCE($2, content),
				author = COALESCE($3, author),
				date = COALESCE($4, date),
				tags = COALESCE($5, tags),
				updated_at = NOW()
			WHERE id = $6
			RETURNING *
		"#,
	)
	.bind(input.title)
	.bind(input.content)
	.bind(input.author)
	.bind(input.date)
	.bind(input.tags.map(model::TagList::into_inner))
	.bind(path.id)
	.fetch_optional(&database)
	.await?;

	let content = content.ok_or(Error::UnknownContent(path.id))?;

	tracing::info!(content = %content.id, user = %session.user.id, "updated content");

	Ok(Json(content))
}

/// Delete content
/// Only admins may delete.
#[route(tag = tag::CONTENT, admin)]
pub async fn delete_content(
	State(database): State<Database>,
	Admin(session): Admin,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::Deleted>, RouteError> {
	let status = sqlx::query("DELETE FROM content WHERE id = $1")
		.bind(path.id)
		.execute(&database)
		.await?;

	if status.rows_affected() == 0 {
		return Err(Error::UnknownContent(path.id).into());
	}

	tracing::info!(content = %path.id, user = %session.user.id, "deleted content");

	Ok(Json(model::Deleted::new("content deleted successfully")))
}
