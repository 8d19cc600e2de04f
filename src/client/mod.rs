//! A client for the admin dashboard: keeps the login session alive and talks
//! to the API on its behalf.
//!
//! ```rust,ignore
//! let session = SessionManager::new("http://127.0.0.1:5000", FileStorage::new("session.json"));
//!
//! if !session.restore().await? {
//!   session.login("admin@techveda.dev", "password", true).await?;
//! }
//!
//! let api = ApiClient::new(session);
//! let projects = api.projects().await?;
//! ```

pub mod gateway;
pub mod session;
pub mod storage;

pub use gateway::ApiClient;
pub use session::{Event, SessionManager, SessionState, Timing};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StoredSession};

use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("request failed: {0}")]
	Http(#[from] reqwest::Error),
	/// The server answered with a non-success status other than 401.
	#[error("{message}")]
	Api { status: StatusCode, message: String },
	/// The server rejected the session; the user has to log in again.
	#[error("login required")]
	LoginRequired,
	#[error("session storage failed: {0}")]
	Storage(#[from] std::io::Error),
	#[error("stored session is unreadable: {0}")]
	Corrupt(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct ErrorBody {
	message: String,
}

/// Turns an error response into [`Error::Api`], keeping the server's `message`.
pub(crate) async fn api_error(response: reqwest::Response) -> Error {
	let status = response.status();
	let message = match response.json::<ErrorBody>().await {
		Ok(body) => body.message,
		Err(_) => status
			.canonical_reason()
			.unwrap_or("request failed")
			.to_owned(),
	};

	Error::Api { status, message }
}

#[cfg(test)]
pub(crate) mod test {
	use std::time::Duration;

	use serde_json::{json, Value};
	use tokio::sync::broadcast;
	use wiremock::{
		matchers::{method, path},
		Mock, MockServer, ResponseTemplate,
	};

	use super::Event;

	pub const TOKEN: &str = "t0k3n";

	pub fn user() -> Value {
		json!({
			"id": "5f0c7c2e-6c1f-4d3a-9a57-2f1b7f0f4e11",
			"username": "admin",
			"email": "admin@x.com",
			"role": "admin",
			"createdAt": "2024-01-01T00:00:00Z",
			"updatedAt": "2024-01-01T00:00:00Z",
		})
	}

	pub async fn mount_login(server: &MockServer) {
		Mock::given(method("POST"))
			.and(path("/api/auth/login"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"user": user(),
				"token": TOKEN,
			})))
			.mount(server)
			.await;
	}

	/// Waits until `wanted` is broadcast, skipping other events.
	pub async fn wait_for(events: &mut broadcast::Receiver<Event>, wanted: Event) {
		tokio::time::timeout(Duration::from_secs(5), async {
			loop {
				if events.recv().await.unwrap() == wanted {
					break;
				}
			}
		})
		.await
		.unwrap_or_else(|_| panic!("timed out waiting for {wanted:?}"));
	}
}
