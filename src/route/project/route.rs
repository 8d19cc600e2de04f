use axum::{extract::State, http::StatusCode};
use macros::route;

use crate::{
	extract::{Admin, Json, Path, Session},
	openapi::tag,
	Database,
};

use super::{model, Error, RouteError};

/// Get all projects
/// Returns every project, newest first.
#[route(tag = tag::PROJECT)]
pub async fn get_projects(
	State(database): State<Database>,
) -> Result<Json<Vec<model::Project>>, RouteError> {
	let projects = sqlx::query_as::<_, model::Project>(
		r#"
			SELECT * FROM project
			ORDER BY created_at DESC
		"#,
	)
	.fetch_all(&database)
	.await?;

	Ok(Json(projects))
}

/// Get single project
/// Returns a single project by its unique id.
#[route(tag = tag::PROJECT)]
pub async fn get_project(
	State(database): State<Database>,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::Project>, RouteError> {
	let project = sqlx::query_as::<_, model::Project>(
		r#"
			SELECT * FROM project
			WHERE id = $1
		"#,
	)
	.bind(path.id)
	.fetch_optional(&database)
	.await?;

	Ok(Json(project.ok_or(Error::UnknownProject(path.id))?))
}

/// Create project
/// Creates a new project. `technologies` may be a list or a comma-delimited string.
#[route(tag = tag::PROJECT, auth, response(status = 201, description = "The created project.", shape = "Json<model::Project>"))]
pub async fn create_project(
	State(database): State<Database>,
	session: Session,
	Json(input): Json<model::CreateProject>,
) -> Result<(StatusCode, Json<model::Project>), RouteError> {
	let project = sqlx::query_as::<_, model::Project>(
		r#"
			INSERT INTO project (title, description, technologies, image, github_link, demo_link)
			VALUES ($1, $2, $3, $4, $5, $6)
			RETURNING *
		"#,
	)
	.bind(input.title)
	.bind(input.description)
	.bind(input.technologies.into_inner())
	.bind(input.image)
	.bind(input.github_link)
	.bind(input.demo_link)
	.fetch_one(&database)
	.await?;

	tracing::info!(project = %project.id, user = %session.user.id, "created project");

	Ok((StatusCode::CREATED, Json(project)))
}

/// Update project
/// Overwrites the submitted fields of a project. A field outside the allow-list
/// rejects the whole request.
#[route(tag = tag::PROJECT, auth)]
pub async fn update_project(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<model::IdInput>,
	Json(input): Json<model::UpdateProject>,
) -> Result<Json<model::Project>, RouteError> {
	let project = sqlx::query_as::<_, model::Project>(
		r#"
			UPDATE project
			SET title = COALESCE($1, title),
				description = COALESCE($2, description),
				technologies = COALESCE($3, technologies),
				image = COALESCE($4, image),
				github_link = COALESCE($5, github_link),
				demo_link = COALESCE($6, demo_link),
				updated_at = NOW()
			WHERE id = $7
			RETURNING *
		"#,
	)
	.bind(input.title)
	.bind(input.description)
	.bind(input.technologies.map(model::TagList::into_inner))
	.bind(input.image)
	.bind(input.github_link)
	.bind(input.demo_link.flatten())
	.bind(path.id)
	.fetch_optional(&database)
	.await?;

	let project = project.ok_or(Error::UnknownProject(path.id))?;

	tracing::info!(project = %project.id, user = %session.user.id, "updated project");

	Ok(Json(project))
}

/// Delete project
/// Deletes a project by its unique id. Only admins may delete.
#[route(tag = tag::PROJECT, admin)]
pub async fn delete_project(
	State(database): State<Database>,
	Admin(session): Admin,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::Deleted>, RouteError> {
	let status = sqlx::query(
		r#"
			DELETE FROM project
			WHERE id = $1
		"#,
	)
	.bind(path.id)
	.execute(&database)
	.await?;

	if status.rows_affected() == 0 {
		return Err(Error::UnknownProject(path.id).into());
	}

	tracing::info!(project = %path.id, user = %session.user.id, "deleted project");

	Ok(Json(model::Deleted::new("project deleted successfully")))
}
