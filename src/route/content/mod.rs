use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::{error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("content not found")]
	UnknownContent(Uuid),
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
			get_with(get_contents, get_contents_docs).post_with(create_content, create_content_docs),
		)
		.api_route(
			"/:id",
			get_with(get_content, get_content_docs)
				.patch_with(update_content, update_content_docs)
				.delete_with(delete_content, delete_content_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		StatusCode::NOT_FOUND
	}

	fn errors(&self) -> Vec<error::Message<'_>> {
		let Self::UnknownContent(id) = self;

		error::Message::new(self.to_string())
			.detail("content", id.to_string())
			.into_vec()
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[sqlx::test]
	async fn test_list_empty(pool: Database) {
		let app = app(pool);

		let response = app.get("/api/content").await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<Value>(), json!([]));
	}

	#[sqlx::test]
	async fn test_create_defaults_date(pool: Database) {
		let app = app(pool);
		let token = register(&app, "a", "a@x.com").await;

		let before = chrono::Utc::now();

		let response = app
			.post("/api/content")
			.add_header(AUTHORIZATION, bearer(&token))
			.json(&json!({
				"title": "Hello",
				"content": "World",
				"author": "Team",
				"tags": "rust, web",
			}))
			.await;

		assert_eq!(response.status_code(), 201);

		let created = response.json::<Value>();
		let date = created["date"]
			.as_str()
			.unwrap()
			.parse::<chrono::DateTime<chrono::Utc>>()
			.unwrap();

		assert!(date >= before - chrono::Duration::seconds(5));
		assert_eq!(created["tags"], json!(["rust", "web"]));
	}

	#[sqlx::test]
	async fn test_missing_author(pool: Database) {
		let app = app(pool);
		let token = register(&app, "a", "a@x.com").await;

		let response = app
			.post("/api/content")
			.add_header(AUTHORIZATION, bearer(&token))
			.json(&json!({ "title": "Hello", "content": "World" }))
			.await;

		assert_eq!(response.status_code(), 400);
		assert!(response.json::<Value>()["message"].is_string());
	}

	#[sqlx::test]
	async fn test_list_newest_first(pool: Database) {
		let app = app(pool);
		let token = register(&app, "a", "a@x.com").await;

		for (title, date) in [
			("Old", "2020-01-01T00:00:00Z"),
			("New", "2024-01-01T00:00:00Z"),
		] {
			app.post("/api/content")
				.add_header(AUTHORIZATION, bearer(&token))
				.json(&json!({
					"title": title,
					"content": "C",
					"author": "A",
					"date": date,
				}))
				.await;
		}

		let listed = app.get("/api/content").await.json::<Value>();
		let listed = listed.as_array().unwrap();

		assert_eq!(listed.len(), 2);
		assert_eq!(listed[0]["title"], "New");
	}

	#[sqlx::test]
	async fn test_update_and_delete(pool: Database) {
		let app = app(pool);
		let admin = register(&app, "admin", "admin@x.com").await;
		let editor = register(&app, "editor", "editor@x.com").await;

		let created = app
			.post("/api/content")
			.add_header(AUTHORIZATION, bearer(&editor))
			.json(&json!({ "title": "Hello", "content": "World", "author": "Team" }))
			.await
			.json::<Value>();
		let url = format!("/api/content/{}", created["id"].as_str().unwrap());

		let response = app
			.patch(&url)
			.add_header(AUTHORIZATION, bearer(&editor))
			.json(&json!({ "title": "Hi", "views": 10 }))
			.await;

		assert_eq!(response.status_code(), 400);

		let response = app
			.patch(&url)
			.add_header(AUTHORIZATION, bearer(&editor))
			.json(&json!({ "title": "Hi", "tags": ["news"] }))
			.await;

		assert_eq!(response.status_code(), 200);

		let updated = response.json::<Value>();

		assert_eq!(updated["title"], "Hi");
		assert_eq!(updated["content"], "World");
		assert_eq!(updated["tags"], json!(["news"]));

		let response = app
			.delete(&url)
			.add_header(AUTHORIZATION, bearer(&editor))
			.await;

		assert_eq!(response.status_code(), 403);

		let response = app
			.delete(&url)
			.add_header(AUTHORIZATION, bearer(&admin))
			.await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(app.get(&url).await.status_code(), 404);
	}
}
