use axum::{extract::State, http::StatusCode};
use macros::route;

use crate::{
	extract::{Admin, Json, Path, Query, Session},
	openapi::tag,
	route::model::Deleted,
	Database,
};

use super::{model, Error, RouteError};

/// Maps constraint violations on the service tables to their domain error.
fn map_constraint(error: sqlx::Error, slug: Option<&str>, service: uuid::Uuid) -> RouteError {
	match error {
		sqlx::Error::Database(ref d) => match d.constraint() {
			Some("service_slug_key") => {
				Error::SlugTaken(slug.unwrap_or_default().to_owned()).into()
			}
			Some("sub_service_service_id_fkey") => Error::UnknownService(service).into(),
			_ => RouteError::from(error),
		},
		error => RouteError::from(error),
	}
}

/// Get all services
/// Returns every service, newest first. With `search`, only services whose title or
/// description match are returned, best match first.
#[route(tag = tag::SERVICE)]
pub async fn get_services(
	State(database): State<Database>,
	Query(query): Query<model::SearchQuery>,
) -> Result<Json<Vec<model::Service>>, RouteError> {
	let services = sqlx::query_as::<_, model::Service>(
		r#"
			SELECT * FROM service
			WHERE $1::TEXT IS NULL OR search @@ plainto_tsquery('english', $1)
			ORDER BY
				CASE WHEN $1::TEXT IS NULL THEN 0
					ELSE ts_rank(search, plainto_tsquery('english', $1))
				END DESC,
				created_at DESC
		"#,
	)
	.bind(query.search)
	.fetch_all(&database)
	.await?;

	Ok(Json(services))
}

/// Get single service
#[route(tag = tag::SERVICE)]
pub async fn get_service(
	State(database): State<Database>,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::Service>, RouteError> {
	let service = sqlx::query_as::<_, model::Service>("SELECT * FROM service WHERE id = $1")
		.bind(path.id)
		.fetch_optional(&database)
		.await?;

	Ok(Json(service.ok_or(Error::UnknownService(path.id))?))
}

/// Get service by slug
/// Returns a single service by its URL-friendly name.
#[route(tag = tag::SERVICE)]
pub async fn get_service_by_slug(
	State(database): State<Database>,
	Path(path): Path<model::SlugInput>,
) -> Result<Json<model::Service>, RouteError> {
	let service = sqlx::query_as::<_, model::Service>("SELECT * FROM service WHERE slug = $1")
		.bind(&path.slug)
		.fetch_optional(&database)
		.await?;

	Ok(Json(service.ok_or(Error::UnknownSlug(path.slug))?))
}

/// Create service
#[route(tag = tag::SERVICE, auth, response(status = 201, description = "The created service.", shape = "Json<model::Service>"))]
pub async fn create_service(
	State(database): State<Database>,
	session: Session,
	Json(input): Json<model::CreateService>,
) -> Result<(StatusCode, Json<model::Service>), RouteError> {
	let service = sqlx::query_as::<_, model::Service>(
		r#"
			INSERT INTO service (title, slug, description, icon, cover_image)
			VALUES ($1, $2, $3, $4, $5)
			RETURNING *
		"#,
	)
	.bind(input.title)
	.bind(&input.slug)
	.bind(input.description)
	.bind(input.icon)
	.bind(input.cover_image)
	.fetch_one(&database)
	.await
	.map_err(|error| map_constraint(error, Some(input.slug.as_str()), uuid::Uuid::nil()))?;

	tracing::info!(service = %service.id, slug = %service.slug, user = %session.user.id, "created service");

	Ok((StatusCode::CREATED, Json(service)))
}

/// Update service
/// Overwrites the submitted fields of a service. A field outside the allow-list
/// rejects the whole request.
#[route(tag = tag::SERVICE, auth)]
pub async fn update_service(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<model::IdInput>,
	Json(input): Json<model::UpdateService>,
) -> Result<Json<model::Service>, RouteError> {
	let service = sqlx::query_as::<_, model::Service>(
		r#"
			UPDATE service
			SET title = COALESCE($1, title),
				slug = COALESCE($2, slug),
				description = COALESCE($3, description),
				icon = COALESCE($4, icon),
				cover_image = COALESCE($5, cover_image),
				updated_at = NOW()
			WHERE id = $6
			RETURNING *
		"#,
	)
	.bind(input.title)
	.bind(input.slug.as_deref())
	.bind(input.description)
	.bind(input.icon.flatten())
	.bind(input.cover_image.flatten())
	.bind(path.id)
	.fetch_optional(&database)
	.await
	.map_err(|error| map_constraint(error, input.slug.as_deref(), path.id))?;

	let service = service.ok_or(Error::UnknownService(path.id))?;

	tracing::info!(service = %service.id, user = %session.user.id, "updated service");

	Ok(Json(service))
}

/// Delete service
/// Deletes a service and all of its sub-services in one transaction. Only admins
/// may delete.
#[route(tag = tag::SERVICE, admin)]
pub async fn delete_service(
	State(database): State<Database>,
	Admin(session): Admin,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::ServiceDeleted>, RouteError> {
	let mut tx = database.begin().await?;

	let sub_services = sqlx::query("DELETE FROM sub_service WHERE service_id = $1")
		.bind(path.id)
		.execute(&mut *tx)
		.await?
		.rows_affected();

	let status = sqlx::query("DELETE FROM service WHERE id = $1")
		.bind(path.id)
		.execute(&mut *tx)
		.await?;

	if status.rows_affected() == 0 {
		// dropping the transaction rolls it back
		return Err(Error::UnknownService(path.id).into());
	}

	tx.commit().await?;

	tracing::info!(service = %path.id, sub_services, user = %session.user.id, "deleted service");

	Ok(Json(model::ServiceDeleted {
		message: "service and related sub-services deleted successfully".into(),
		sub_services_deleted: sub_services,
	}))
}

/// Get sub-services
/// Returns the sub-services of a service, ordered by their `order`.
#[route(tag = tag::SERVICE)]
pub async fn get_sub_services(
	State(database): State<Database>,
	Path(path): Path<model::IdInput>,
) -> Result<Json<Vec<model::SubService>>, RouteError> {
	let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM service WHERE id = $1)")
		.bind(path.id)
		.fetch_one(&database)
		.await?;

	if !exists {
		return Err(Error::UnknownService(path.id).into());
	}

	let sub_services = sqlx::query_as::<_, model::SubService>(
		r#"
			SELECT * FROM sub_service
			WHERE service_id = $1
			ORDER BY position ASC, created_at ASC
		"#,
	)
	.bind(path.id)
	.fetch_all(&database)
	.await?;

	Ok(Json(sub_services))
}

/// Create sub-service
#[route(tag = tag::SERVICE, auth, response(status = 201, description = "The created sub-service.", shape = "Json<model::SubService>"))]
pub async fn create_sub_service(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<model::IdInput>,
	Json(input): Json<model::CreateSubService>,
) -> Result<(StatusCode, Json<model::SubService>), RouteError> {
	let sub_service = sqlx::query_as::<_, model::SubService>(
		r#"
			INSERT INTO sub_service (service_id, title, description, features, position)
			VALUES ($1, $2, $3, $4, $5)
			RETURNING *
		"#,
	)
	.bind(path.id)
	.bind(input.title)
	.bind(input.description)
	.bind(input.features.into_inner())
	.bind(input.position)
	.fetch_one(&database)
	.await
	.map_err(|error| map_constraint(error, None, path.id))?;

	tracing::info!(service = %path.id, sub_service = %sub_service.id, user = %session.user.id, "created sub-service");

	Ok((StatusCode::CREATED, Json(sub_service)))
}

/// Update sub-service
/// Overwrites the submitted fields of a sub-service.
#[route(tag = tag::SERVICE, auth)]
pub async fn update_sub_service(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<model::SubServiceInput>,
	Json(input): Json<model::UpdateSubService>,
) -> Result<Json<model::SubService>, RouteError> {
	let sub_service = sqlx::query_as::<_, model::SubService>(
		r#"
			UPDATE sub_service
			SET title = COALESCE($1, title),
				description = COALESCE($2, description),
				features = COALESCE($3, features),
				position = COALESCE($4, position)
			WHERE id = $5 AND service_id = $6
			RETURNING *
		"#,
	)
	.bind(input.title)
	.bind(input.description)
	.bind(input.features.map(model::TagList::into_inner))
	.bind(input.position)
	.bind(path.sub_id)
	.bind(path.id)
	.fetch_optional(&database)
	.await?;

	let sub_service = sub_service.ok_or(Error::UnknownSubService(path.sub_id))?;

	tracing::info!(service = %path.id, sub_service = %sub_service.id, user = %session.user.id, "updated sub-service");

	Ok(Json(sub_service))
}

/// Delete sub-service
#[route(tag = tag::SERVICE, admin)]
pub async fn delete_sub_service(
	State(database): State<Database>,
	Admin(session): Admin,
	Path(path): Path<model::SubServiceInput>,
) -> Result<Json<Deleted>, RouteError> {
	let status = sqlx::query("DELETE FROM sub_service WHERE id = $1 AND service_id = $2")
		.bind(path.sub_id)
		.bind(path.id)
		.execute(&database)
		.await?;

	if status.rows_affected() == 0 {
		return Err(Error::UnknownSubService(path.sub_id).into());
	}

	tracing::info!(service = %path.id, sub_service = %path.sub_id, user = %session.user.id, "deleted sub-service");

	Ok(Json(Deleted::new("sub-service deleted successfully")))
}
