use axum::extract::State;
use macros::route;

use crate::{
	extract::{Json, Session},
	openapi::tag,
	Database,
};

use super::{model, Error, RouteError};

/// Get about page
#[route(tag = tag::ABOUT)]
pub async fn get_about(State(database): State<Database>) -> Result<Json<model::About>, RouteError> {
	let about = sqlx::query_as::<_, model::About>("SELECT * FROM about")
		.fetch_optional(&database)
		.await?;

	Ok(Json(about.ok_or(Error::Missing)?))
}

/// Update about page
/// Overwrites the submitted fields. A field outside the allow-list rejects the
/// whole request.
#[route(tag = tag::ABOUT, auth)]
pub async fn update_about(
	State(database): State<Database>,
	session: Session,
	Json(input): Json<model::UpdateAbout>,
) -> Result<Json<model::About>, RouteError> {
	let about = sqlx::query_as::<_, model::About>(
		r#"
			UPDATE about
			SET title = COALESCE($1, title),
				description = COALESCE($2, description),
				image = COALESCE($3, image),
				skills = COALESCE($4, skills),
				experience = COALESCE($5, experience),
				education = COALESCE($6, education),
				updated_at = NOW()
			RETURNING *
		"#,
	)
	.bind(input.title)
	.bind(input.description)
	.bind(input.image)
	.bind(input.skills.map(model::TagList::into_inner))
	.bind(input.experience)
	.bind(input.education)
	.fetch_optional(&database)
	.await?;

	let about = about.ok_or(Error::Missing)?;

	tracing::info!(user = %session.user.id, "updated about page");

	Ok(Json(about))
}
