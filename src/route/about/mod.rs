use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The seeded row was removed by hand.
	#[error("about page not found")]
	Missing,
}

pub type RouteError = error::RouteError<Error>;

impl From<Error> for RouteError {
	fn from(error: Error) -> Self {
		Self::Route(error)
	}
}

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new().api_route(
		"/",
		get_with(get_about, get_about_docs).patch_with(update_about, update_about_docs),
	)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		StatusCode::NOT_FOUND
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[sqlx::test]
	async fn test_seeded(pool: Database) {
		let app = app(pool);

		let response = app.get("/api/about").await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<Value>()["skills"], json!([]));
	}

	#[sqlx::test]
	async fn test_update(pool: Database) {
		let app = app(pool);

		let response = app
			.patch("/api/about")
			.json(&json!({ "title": "About us" }))
			.await;

		assert_eq!(response.status_code(), 401);

		let token = register(&app, "a", "a@x.com").await;

		let response = app
			.patch("/api/about")
			.add_header(AUTHORIZATION, bearer(&token))
			.json(&json!({ "title": "About us", "skills": "Rust, Go" }))
			.await;

		assert_eq!(response.status_code(), 200);

		let response = app
			.patch("/api/about")
			.add_header(AUTHORIZATION, bearer(&token))
			.json(&json!({ "description": "We build things", "team": [] }))
			.await;

		assert_eq!(response.status_code(), 400);

		let about = app.get("/api/about").await.json::<Value>();

		assert_eq!(about["title"], "About us");
		assert_eq!(about["description"], "");
		assert_eq!(about["skills"], json!(["Rust", "Go"]));
	}
}
