use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::{error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("project not found")]
	UnknownProject(Uuid),
}

pub type RouteError = error::RouteError<Error>;

impl From<Error> for RouteError {
	fn from(error: Error) -> Self {
		Self::Route(error)
	}
}

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			get_with(get_projects, get_projects_docs).post_with(create_project, create_project_docs),
		)
		.api_route(
			"/:id",
			get_with(get_project, get_project_docs)
				.put_with(update_project, update_project_docs)
				.patch_with(update_project, update_project_docs)
				.delete_with(delete_project, delete_project_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownProject(..) => StatusCode::NOT_FOUND,
		}
	}

	fn errors(&self) -> Vec<error::Message<'_>> {
		let Self::UnknownProject(project) = self;

		error::Message::new(self.to_string())
			.detail("project", project.to_string())
			.into_vec()
	}
}
