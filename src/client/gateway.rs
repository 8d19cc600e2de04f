use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use super::{api_error, Error, SessionManager};
use crate::route::{
	about::model::{About, UpdateAbout},
	auth::User,
	content::model::{Content, CreateContent, UpdateContent},
	model::Deleted,
	project::model::{CreateProject, Project, UpdateProject},
	service::model::{
		CreateService, CreateSubService, Service, ServiceDeleted, SubService, UpdateService,
		UpdateSubService,
	},
};

/// Sends API requests on behalf of the current session.
///
/// Every request carries the session's bearer token and counts as activity.
/// Every response passes through [`ApiClient::intercept`], so a 401 from any
/// endpoint ends the session.
#[derive(Clone)]
pub struct ApiClient {
	session: SessionManager,
}

impl ApiClient {
	pub fn new(session: SessionManager) -> Self {
		Self { session }
	}

	pub fn session(&self) -> &SessionManager {
		&self.session
	}

	async fn request(&self, method: Method, path: &str) -> RequestBuilder {
		self.session.touch().await;

		let builder = self
			.session
			.http()
			.request(method.clone(), self.session.url(path));

		match self.session.token().await {
			Some(token) => builder.bearer_auth(token),
			None => {
				tracing::debug!(%method, path, "no session token, sending request without one");
				builder
			}
		}
	}

	async fn intercept(&self, response: Response) -> Result<Response, Error> {
		let status = response.status();

		if status == StatusCode::UNAUTHORIZED {
			tracing::info!(url = %response.url(), "session rejected, login required");
			self.session.require_login().await;

			return Err(Error::LoginRequired);
		}

		if !status.is_success() {
			return Err(api_error(response).await);
		}

		Ok(response)
	}

	async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, Error> {
		let response = self.intercept(builder.send().await?).await?;

		Ok(response.json().await?)
	}

	pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
		self.send(self.request(Method::GET, path).await).await
	}

	pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
		&self,
		path: &str,
		body: &B,
	) -> Result<T, Error> {
		self.send(self.request(Method::POST, path).await.json(body))
			.await
	}

	pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
		&self,
		path: &str,
		body: &B,
	) -> Result<T, Error> {
		self.send(self.request(Method::PATCH, path).await.json(body))
			.await
	}

	pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
		self.send(self.request(Method::DELETE, path).await).await
	}

	pub async fn me(&self) -> Result<User, Error> {
		self.get("/api/auth/me").await
	}

	pub async fn projects(&self) -> Result<Vec<Project>, Error> {
		self.get("/api/projects").await
	}

	pub async fn project(&self, id: Uuid) -> Result<Project, Error> {
		self.get(&format!("/api/projects/{id}")).await
	}

	pub async fn create_project(&self, project: &CreateProject) -> Result<Project, Error> {
		self.post("/api/projects", project).await
	}

	pub async fn update_project(&self, id: Uuid, project: &UpdateProject) -> Result<Project, Error> {
		self.patch(&format!("/api/projects/{id}"), project).await
	}

	pub async fn delete_project(&self, id: Uuid) -> Result<Deleted, Error> {
		self.delete(&format!("/api/projects/{id}")).await
	}

	/// Lists services, or only those matching `search` when given.
	pub async fn services(&self, search: Option<&str>) -> Result<Vec<Service>, Error> {
		let mut builder = self.request(Method::GET, "/api/services").await;

		if let Some(search) = search {
			builder = builder.query(&[("search", search)]);
		}

		self.send(builder).await
	}

	pub async fn service(&self, id: Uuid) -> Result<Service, Error> {
		self.get(&format!("/api/services/{id}")).await
	}

	pub async fn service_by_slug(&self, slug: &str) -> Result<Service, Error> {
		self.get(&format!("/api/services/slug/{slug}")).await
	}

	pub async fn create_service(&self, service: &CreateService) -> Result<Service, Error> {
		self.post("/api/services", service).await
	}

	pub async fn update_service(&self, id: Uuid, service: &UpdateService) -> Result<Service, Error> {
		self.patch(&format!("/api/services/{id}"), service).await
	}

	pub async fn delete_service(&self, id: Uuid) -> Result<ServiceDeleted, Error> {
		self.delete(&format!("/api/services/{id}")).await
	}

	pub async fn sub_services(&self, service: Uuid) -> Result<Vec<SubService>, Error> {
		self.get(&format!("/api/services/{service}/subservices"))
			.await
	}

	pub async fn create_sub_service(
		&self,
		service: Uuid,
		sub_service: &CreateSubService,
	) -> Result<SubService, Error> {
		self.post(&format!("/api/services/{service}/subservices"), sub_service)
			.await
	}

	pub async fn update_sub_service(
		&self,
		service: Uuid,
		id: Uuid,
		sub_service: &UpdateSubService,
	) -> Result<SubService, Error> {
		self.patch(&format!("/api/services/{service}/subservices/{id}"), sub_service)
			.await
	}

	pub async fn delete_sub_service(&self, service: Uuid, id: Uuid) -> Result<Deleted, Error> {
		self.delete(&format!("/api/services/{service}/subservices/{id}"))
			.await
	}

	pub async fn contents(&self) -> Result<Vec<Content>, Error> {
		self.get("/api/content").await
	}

	pub async fn content(&self, id: Uuid) -> Result<Content, Error> {
		self.get(&format!("/api/content/{id}")).await
	}

	pub async fn create_content(&self, content: &CreateContent) -> Result<Content, Error> {
		self.post("/api/content", content).await
	}

	pub async fn update_content(&self, id: Uuid, content: &UpdateContent) -> Result<Content, Error> {
		self.patch(&format!("/api/content/{id}"), content).await
	}

	pub async fn delete_content(&self, id: Uuid) -> Result<Deleted, Error> {
		self.delete(&format!("/api/content/{id}")).await
	}

	pub async fn about(&self) -> Result<About, Error> {
		self.get("/api/about").await
	}

	pub async fn update_about(&self, about: &UpdateAbout) -> Result<About, Error> {
		self.patch("/api/about", about).await
	}
}

#[cfg(test)]
mod test {
	use serde_json::json;
	use wiremock::{
		matchers::{body_partial_json, header, method, path, query_param},
		Mock, MockServer, ResponseTemplate,
	};

	use super::*;
	use crate::client::{
		test::{mount_login, wait_for, TOKEN},
		Event, MemoryStorage, SessionState,
	};

	async fn logged_in(server: &MockServer) -> ApiClient {
		mount_login(server).await;

		let session = SessionManager::new(server.uri(), MemoryStorage::default());

		session.login("admin@x.com", "p", false).await.unwrap();
		ApiClient::new(session)
	}

	#[tokio::test]
	async fn test_bearer_is_injected() {
		let server = MockServer::start().await;
		let client = logged_in(&server).await;

		Mock::given(method("GET"))
			.and(path("/api/projects"))
			.and(header("authorization", format!("Bearer {TOKEN}").as_str()))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
			.expect(1)
			.mount(&server)
			.await;

		assert!(client.projects().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_request_without_session_proceeds() {
		let server = MockServer::start().await;

		Mock::given(method("GET"))
			.and(path("/api/about"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"title": "About",
				"description": "",
				"image": null,
				"skills": ["Rust"],
				"experience": "",
				"education": "",
				"updatedAt": "2024-01-01T00:00:00Z",
			})))
			.mount(&server)
			.await;

		let client = ApiClient::new(SessionManager::new(server.uri(), MemoryStorage::default()));
		let about = client.about().await.unwrap();

		assert_eq!(about.title, "About");
		assert_eq!(about.skills.0, vec!["Rust"]);

		let requests = server.received_requests().await.unwrap();

		assert!(requests[0].headers.get("authorization").is_none());
	}

	#[tokio::test]
	async fn test_unauthorized_requires_login() {
		let server = MockServer::start().await;
		let client = logged_in(&server).await;
		let mut events = client.session().subscribe();

		Mock::given(method("DELETE"))
			.respond_with(ResponseTemplate::new(401).set_body_json(json!({
				"success": false,
				"message": "token has expired",
				"errors": [{ "content": "token has expired" }],
			})))
			.mount(&server)
			.await;

		let error = client.delete_project(Uuid::new_v4()).await.unwrap_err();

		assert!(matches!(error, Error::LoginRequired));
		wait_for(&mut events, Event::LoginRequired).await;
		assert_eq!(client.session().state().await, SessionState::LoggedOut);
		assert!(client.session().token().await.is_none());
	}

	#[tokio::test]
	async fn test_error_carries_server_message() {
		let server = MockServer::start().await;
		let client = logged_in(&server).await;

		Mock::given(method("GET"))
			.and(path("/api/services/slug/missing"))
			.respond_with(ResponseTemplate::new(404).set_body_json(json!({
				"success": false,
				"message": "service not found",
				"errors": [{ "content": "service not found" }],
			})))
			.mount(&server)
			.await;

		let error = client.service_by_slug("missing").await.unwrap_err();

		assert!(matches!(
			error,
			Error::Api { status, ref message } if status == 404 && message == "service not found"
		));
		assert_eq!(client.session().state().await, SessionState::Active);
	}

	#[tokio::test]
	async fn test_update_sub_service() {
		let server = MockServer::start().await;
		let client = logged_in(&server).await;
		let (service, id) = (Uuid::new_v4(), Uuid::new_v4());

		Mock::given(method("PATCH"))
			.and(path(format!("/api/services/{service}/subservices/{id}")))
			.and(body_partial_json(json!({ "order": 2 })))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"id": id,
				"serviceId": service,
				"title": "Audits",
				"description": "D",
				"features": [],
				"order": 2,
				"createdAt": "2024-01-01T00:00:00Z",
			})))
			.expect(1)
			.mount(&server)
			.await;

		let updated = client
			.update_sub_service(
				service,
				id,
				&UpdateSubService {
					title: None,
					description: None,
					features: None,
					position: Some(2),
				},
			)
			.await
			.unwrap();

		assert_eq!(updated.position, 2);
		assert_eq!(updated.service_id, service);
	}

	#[tokio::test]
	async fn test_search_is_sent_as_query() {
		let server = MockServer::start().await;

		Mock::given(method("GET"))
			.and(path("/api/services"))
			.and(query_param("search", "cloud hosting"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
			.expect(1)
			.mount(&server)
			.await;

		let client = ApiClient::new(SessionManager::new(server.uri(), MemoryStorage::default()));

		assert!(client.services(Some("cloud hosting")).await.unwrap().is_empty());
	}
}
