use aide::axum::{
	routing::{get_with, put_with},
	ApiRouter,
};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::{error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("service not found")]
	UnknownService(Uuid),
	#[error("service not found")]
	UnknownSlug(String),
	#[error("sub-service not found")]
	UnknownSubService(Uuid),
	#[error("slug already taken")]
	SlugTaken(String),
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
			get_with(get_services, get_services_docs).post_with(create_service, create_service_docs),
		)
		.api_route(
			"/slug/:slug",
			get_with(get_service_by_slug, get_service_by_slug_docs),
		)
		.api_route(
			"/:id",
			get_with(get_service, get_service_docs)
				.put_with(update_service, update_service_docs)
				.patch_with(update_service, update_service_docs)
				.delete_with(delete_service, delete_service_docs),
		)
		.api_route(
			"/:id/subservices",
			get_with(get_sub_services, get_sub_services_docs)
				.post_with(create_sub_service, create_sub_service_docs),
		)
		.api_route(
			"/:id/subservices/:sub_id",
			put_with(update_sub_service, update_sub_service_docs)
				.patch_with(update_sub_service, update_sub_service_docs)
				.delete_with(delete_sub_service, delete_sub_service_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownService(..) | Self::UnknownSlug(..) | Self::UnknownSubService(..) => {
				StatusCode::NOT_FOUND
			}
			Self::SlugTaken(..) => StatusCode::CONFLICT,
		}
	}

	fn errors(&self) -> Vec<error::Message<'_>> {
		let message = error::Message::new(self.to_string());

		match self {
			Self::UnknownService(id) => message.detail("service", id.to_string()),
			Self::UnknownSlug(slug) => message.detail("slug", slug.as_str()),
			Self::UnknownSubService(id) => message.detail("subService", id.to_string()),
			Self::SlugTaken(slug) => message.field("slug").detail("slug", slug.as_str()),
		}
		.into_vec()
	}
}
