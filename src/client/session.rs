use std::{
	sync::{Arc, Weak},
	time::Duration,
};

use chrono::Utc;
use tokio::{
	sync::{broadcast, Mutex},
	time::Instant,
};
use tokio_util::sync::CancellationToken;

use super::{api_error, Error, SessionStorage, StoredSession};
use crate::route::auth::{model::AuthResponse, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Unauthenticated,
	Active,
	/// A refresh request is in flight.
	Refreshing,
	LoggedOut,
}

/// Broadcast to every subscriber when the session changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
	LoggedIn,
	Refreshed,
	LoggedOut,
	/// The session ran out, either through inactivity or its expiry date.
	Expired,
	/// The user has to log in again. The dashboard navigates to its login page.
	LoginRequired,
}

/// How often the session is refreshed and how long it lives.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
	pub refresh_interval: Duration,
	/// The session expires when nothing touched it for this long.
	pub inactivity_timeout: Duration,
	/// Lifetime of a remembered session.
	pub remember_for: chrono::Duration,
	/// Lifetime of a session that is kept in memory only. Matches the token.
	pub session_for: chrono::Duration,
	/// How long the server accepts a token after issuing it.
	pub token_for: chrono::Duration,
}

impl Default for Timing {
	fn default() -> Self {
		Self {
			refresh_interval: Duration::from_secs(15 * 60),
			inactivity_timeout: Duration::from_secs(30 * 60),
			remember_for: chrono::Duration::days(7),
			session_for: chrono::Duration::seconds(crate::token::TOKEN_LIFETIME_SECS),
			token_for: chrono::Duration::seconds(crate::token::TOKEN_LIFETIME_SECS),
		}
	}
}

struct Current {
	state: SessionState,
	session: Option<StoredSession>,
	last_activity: Instant,
	/// Cancels the armed refresh loop. At most one loop runs at a time.
	refresh: Option<CancellationToken>,
}

struct Inner {
	http: reqwest::Client,
	base_url: String,
	storage: Box<dyn SessionStorage>,
	timing: Timing,
	current: Mutex<Current>,
	events: broadcast::Sender<Event>,
}

impl Drop for Inner {
	fn drop(&mut self) {
		if let Some(refresh) = self.current.get_mut().refresh.take() {
			refresh.cancel();
		}
	}
}

/// Owns the login session of the dashboard.
///
/// Cloning is cheap and every clone shares the same session.
#[derive(Clone)]
pub struct SessionManager {
	inner: Arc<Inner>,
}

impl SessionManager {
	pub fn new(base_url: impl Into<String>, storage: impl SessionStorage + 'static) -> Self {
		Self::with_timing(base_url, storage, Timing::default())
	}

	pub fn with_timing(
		base_url: impl Into<String>,
		storage: impl SessionStorage + 'static,
		timing: Timing,
	) -> Self {
		let (events, _) = broadcast::channel(16);

		Self {
			inner: Arc::new(Inner {
				http: reqwest::Client::new(),
				base_url: base_url.into().trim_end_matches('/').to_owned(),
				storage: Box::new(storage),
				timing,
				current: Mutex::new(Current {
					state: SessionState::Unauthenticated,
					session: None,
					last_activity: Instant::now(),
					refresh: None,
				}),
				events,
			}),
		}
	}

	pub(crate) fn http(&self) -> &reqwest::Client {
		&self.inner.http
	}

	pub(crate) fn url(&self, path: &str) -> String {
		format!("{}{path}", self.inner.base_url)
	}

	pub fn subscribe(&self) -> broadcast::Receiver<Event> {
		self.inner.events.subscribe()
	}

	pub async fn state(&self) -> SessionState {
		self.inner.current.lock().await.state
	}

	pub async fn user(&self) -> Option<User> {
		let current = self.inner.current.lock().await;

		current.session.as_ref().map(|session| session.user.clone())
	}

	pub async fn token(&self) -> Option<String> {
		let current = self.inner.current.lock().await;

		current.session.as_ref().map(|session| session.token.clone())
	}

	/// Records user activity, pushing back the inactivity expiry.
	pub async fn touch(&self) {
		self.inner.current.lock().await.last_activity = Instant::now();
	}

	/// Picks up a remembered session from storage.
	///
	/// Returns `false` when there is none. Expired and unreadable sessions are
	/// removed from storage.
	pub async fn restore(&self) -> Result<bool, Error> {
		let stored = match self.inner.storage.load() {
			Ok(stored) => stored,
			Err(Error::Corrupt(error)) => {
				tracing::warn!(%error, "discarding unreadable stored session");
				self.inner.storage.clear()?;
				None
			}
			Err(error) => return Err(error),
		};

		let Some(session) = stored else {
			return Ok(false);
		};

		if session.is_expired() {
			tracing::info!(expires_at = %session.valid_until(), "stored session expired");
			self.inner.storage.clear()?;
			return Ok(false);
		}

		tracing::info!(user = %session.user.id, "restored session");

		let mut current = self.inner.current.lock().await;

		current.session = Some(session);
		current.state = SessionState::Active;
		current.last_activity = Instant::now();
		self.arm(&mut current);
		drop(current);

		self.emit(Event::LoggedIn);
		Ok(true)
	}

	/// Logs in and arms the refresh loop.
	///
	/// With `remember_me` the session is written to storage and lasts 7 days,
	/// otherwise it lives in memory until the token expires.
	pub async fn login(&self, email: &str, password: &str, remember_me: bool) -> Result<User, Error> {
		let response = self
			.inner
			.http
			.post(self.url("/api/auth/login"))
			.json(&serde_json::json!({
				"email": email,
				"password": password,
			}))
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(api_error(response).await);
		}

		let reply = response.json::<AuthResponse>().await?;
		let now = Utc::now();
		let session = StoredSession {
			token: reply.token,
			user: reply.user.clone(),
			expires_at: now + self.lifetime(remember_me),
			token_expires_at: now + self.inner.timing.token_for,
			remember: remember_me,
		};

		if remember_me {
			self.inner.storage.save(&session)?;
		} else {
			self.inner.storage.clear()?;
		}

		let mut current = self.inner.current.lock().await;

		current.session = Some(session);
		current.state = SessionState::Active;
		current.last_activity = Instant::now();
		self.arm(&mut current);
		drop(current);

		tracing::info!(user = %reply.user.id, remember_me, "logged in");

		self.emit(Event::LoggedIn);
		Ok(reply.user)
	}

	/// Ends the session, clears storage and stops the refresh loop.
	pub async fn logout(&self) {
		let mut current = self.inner.current.lock().await;

		self.end(&mut current, &[Event::LoggedOut]);
		tracing::info!("logged out");
	}

	/// Ends the session after the server rejected its token.
	pub(crate) async fn require_login(&self) {
		let mut current = self.inner.current.lock().await;

		self.end(&mut current, &[Event::LoginRequired]);
	}

	fn lifetime(&self, remember: bool) -> chrono::Duration {
		if remember {
			self.inner.timing.remember_for
		} else {
			self.inner.timing.session_for
		}
	}

	fn emit(&self, event: Event) {
		// no subscribers is fine
		self.inner.events.send(event).ok();
	}

	fn end(&self, current: &mut Current, events: &[Event]) {
		if let Some(refresh) = current.refresh.take() {
			refresh.cancel();
		}

		current.session = None;
		current.state = SessionState::LoggedOut;

		if let Err(error) = self.inner.storage.clear() {
			tracing::warn!(%error, "failed to clear stored session");
		}

		for event in events {
			self.emit(*event);
		}
	}

	/// Starts a refresh loop, cancelling the one armed before it.
	fn arm(&self, current: &mut Current) {
		let cancel = CancellationToken::new();

		if let Some(previous) = current.refresh.replace(cancel.clone()) {
			previous.cancel();
		}

		tokio::spawn(refresh_loop(Arc::downgrade(&self.inner), cancel));
	}

	async fn fetch_me(&self, token: &str) -> Result<User, Error> {
		let response = self
			.inner
			.http
			.get(self.url("/api/auth/me"))
			.bearer_auth(token)
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(api_error(response).await);
		}

		Ok(response.json().await?)
	}

	/// Runs one refresh. Returns `false` once the loop should stop.
	async fn refresh(&self, cancel: &CancellationToken) -> bool {
		let token = {
			let mut current = self.inner.current.lock().await;

			if cancel.is_cancelled() {
				return false;
			}

			let Some(session) = current.session.as_ref() else {
				return false;
			};

			if current.last_activity.elapsed() >= self.inner.timing.inactivity_timeout
				|| session.is_expired()
			{
				tracing::info!("session expired");
				self.end(&mut current, &[Event::Expired, Event::LoginRequired]);
				return false;
			}

			let token = session.token.clone();

			current.state = SessionState::Refreshing;
			token
		};

		let result = self.fetch_me(&token).await;
		let mut current = self.inner.current.lock().await;

		// Logged out or re-armed while the request was in flight
		if cancel.is_cancelled() {
			return false;
		}

		match result {
			Ok(user) => {
				let lifetime = self.lifetime(current.session.as_ref().is_some_and(|s| s.remember));

				if let Some(session) = current.session.as_mut() {
					session.user = user;
					session.expires_at = (Utc::now() + lifetime).min(session.token_expires_at);

					if session.remember {
						if let Err(error) = self.inner.storage.save(session) {
							tracing::warn!(%error, "failed to store refreshed session");
						}
					}
				}

				current.state = SessionState::Active;
				tracing::debug!("session refreshed");

				self.emit(Event::Refreshed);
				true
			}
			Err(error) => {
				tracing::warn!(%error, "session refresh failed");
				self.end(&mut current, &[Event::LoginRequired]);
				false
			}
		}
	}
}

async fn refresh_loop(weak: Weak<Inner>, cancel: CancellationToken) {
	let Some(interval) = weak.upgrade().map(|inner| inner.timing.refresh_interval) else {
		return;
	};

	loop {
		tokio::select! {
			() = tokio::time::sleep(interval) => {}
			() = cancel.cancelled() => return,
		}

		// The manager may have been dropped since the last tick
		let Some(inner) = weak.upgrade() else {
			return;
		};
		let manager = SessionManager { inner };

		if !manager.refresh(&cancel).await {
			return;
		}
	}
}

#[cfg(test)]
mod test {
	use serde_json::json;
	use wiremock::{
		matchers::{header, method, path},
		Mock, MockServer, ResponseTemplate,
	};

	use super::*;
	use crate::client::{
		test::{mount_login, user, wait_for, TOKEN},
		FileStorage, MemoryStorage,
	};

	fn fast() -> Timing {
		Timing {
			refresh_interval: Duration::from_millis(50),
			..Timing::default()
		}
	}

	#[tokio::test]
	async fn test_login_is_remembered() {
		let server = MockServer::start().await;
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("session.json");

		mount_login(&server).await;

		let session = SessionManager::new(server.uri(), FileStorage::new(&file));
		let user = session.login("admin@x.com", "p", true).await.unwrap();

		assert_eq!(user.username, "admin");
		assert_eq!(session.state().await, SessionState::Active);
		assert!(file.exists());

		let restored = SessionManager::new(server.uri(), FileStorage::new(&file));

		assert!(restored.restore().await.unwrap());
		assert_eq!(restored.token().await.as_deref(), Some(TOKEN));
	}

	#[tokio::test]
	async fn test_login_without_remember_is_not_stored() {
		let server = MockServer::start().await;
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("session.json");

		mount_login(&server).await;

		let session = SessionManager::new(server.uri(), FileStorage::new(&file));

		session.login("admin@x.com", "p", false).await.unwrap();

		assert!(!file.exists());
		assert_eq!(session.token().await.as_deref(), Some(TOKEN));
	}

	#[tokio::test]
	async fn test_login_failure() {
		let server = MockServer::start().await;

		Mock::given(method("POST"))
			.and(path("/api/auth/login"))
			.respond_with(ResponseTemplate::new(401).set_body_json(json!({
				"success": false,
				"message": "invalid credentials",
				"errors": [{ "content": "invalid credentials" }],
			})))
			.mount(&server)
			.await;

		let session = SessionManager::new(server.uri(), MemoryStorage::default());
		let error = session.login("admin@x.com", "wrong", false).await.unwrap_err();

		assert!(matches!(
			error,
			Error::Api { status, ref message } if status == 401 && message == "invalid credentials"
		));
		assert_eq!(session.state().await, SessionState::Unauthenticated);
	}

	#[tokio::test]
	async fn test_restore_clears_expired() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("session.json");
		let storage = FileStorage::new(&file);

		storage
			.save(&StoredSession {
				token: TOKEN.into(),
				user: serde_json::from_value(user()).unwrap(),
				expires_at: Utc::now() - chrono::Duration::minutes(1),
				token_expires_at: Utc::now() + chrono::Duration::hours(1),
				remember: true,
			})
			.unwrap();

		let session = SessionManager::new("http://127.0.0.1:9", storage);

		assert!(!session.restore().await.unwrap());
		assert!(!file.exists());
		assert_eq!(session.state().await, SessionState::Unauthenticated);
	}

	#[tokio::test]
	async fn test_restore_rejects_dead_token() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("session.json");
		let storage = FileStorage::new(&file);
		let logged_in = Utc::now() - chrono::Duration::days(2);
		let keys = crate::token::Keys::new("secret").unwrap();
		let token = keys
			.sign(&crate::token::Claims {
				sub: uuid::Uuid::new_v4(),
				iat: logged_in.timestamp(),
				exp: logged_in.timestamp() + crate::token::TOKEN_LIFETIME_SECS,
			})
			.unwrap();

		storage
			.save(&StoredSession {
				token: token.clone(),
				user: serde_json::from_value(user()).unwrap(),
				expires_at: logged_in + chrono::Duration::days(7),
				token_expires_at: logged_in + chrono::Duration::seconds(crate::token::TOKEN_LIFETIME_SECS),
				remember: true,
			})
			.unwrap();

		assert!(matches!(
			keys.verify(&token),
			Err(crate::token::Error::Expired)
		));

		let session = SessionManager::new("http://127.0.0.1:9", storage);
		let mut events = session.subscribe();

		assert!(!session.restore().await.unwrap());
		assert!(!file.exists());
		assert_eq!(session.state().await, SessionState::Unauthenticated);
		assert!(events.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_refresh_does_not_outlive_token() {
		let server = MockServer::start().await;

		mount_login(&server).await;

		Mock::given(method("GET"))
			.and(path("/api/auth/me"))
			.respond_with(ResponseTemplate::new(200).set_body_json(user()))
			.mount(&server)
			.await;

		let session = SessionManager::with_timing(server.uri(), MemoryStorage::default(), fast());
		let mut events = session.subscribe();

		session.login("admin@x.com", "p", true).await.unwrap();
		wait_for(&mut events, Event::Refreshed).await;

		let current = session.inner.current.lock().await;
		let stored = current.session.as_ref().unwrap();

		assert!(stored.expires_at <= stored.token_expires_at);
		assert_eq!(stored.valid_until(), stored.token_expires_at);
	}

	#[tokio::test]
	async fn test_refresh_updates_user() {
		let server = MockServer::start().await;

		mount_login(&server).await;

		let mut renamed = user();
		renamed["username"] = json!("renamed");

		Mock::given(method("GET"))
			.and(path("/api/auth/me"))
			.and(header("authorization", format!("Bearer {TOKEN}").as_str()))
			.respond_with(ResponseTemplate::new(200).set_body_json(renamed))
			.mount(&server)
			.await;

		let session = SessionManager::with_timing(server.uri(), MemoryStorage::default(), fast());
		let mut events = session.subscribe();

		session.login("admin@x.com", "p", false).await.unwrap();
		wait_for(&mut events, Event::Refreshed).await;

		assert_eq!(session.user().await.unwrap().username, "renamed");
		assert_ne!(session.state().await, SessionState::LoggedOut);
	}

	#[tokio::test]
	async fn test_refresh_failure_requires_login() {
		let server = MockServer::start().await;

		mount_login(&server).await;

		Mock::given(method("GET"))
			.and(path("/api/auth/me"))
			.respond_with(ResponseTemplate::new(401).set_body_json(json!({
				"success": false,
				"message": "token has expired",
				"errors": [],
			})))
			.mount(&server)
			.await;

		let session = SessionManager::with_timing(server.uri(), MemoryStorage::default(), fast());
		let mut events = session.subscribe();

		session.login("admin@x.com", "p", true).await.unwrap();
		wait_for(&mut events, Event::LoginRequired).await;

		assert_eq!(session.state().await, SessionState::LoggedOut);
		assert!(session.token().await.is_none());
	}

	#[tokio::test]
	async fn test_inactivity_expires_session() {
		let server = MockServer::start().await;

		mount_login(&server).await;

		let session = SessionManager::with_timing(
			server.uri(),
			MemoryStorage::default(),
			Timing {
				inactivity_timeout: Duration::from_millis(1),
				..fast()
			},
		);
		let mut events = session.subscribe();

		session.login("admin@x.com", "p", false).await.unwrap();
		wait_for(&mut events, Event::Expired).await;

		assert_eq!(session.state().await, SessionState::LoggedOut);
		assert!(session.user().await.is_none());
	}

	#[tokio::test]
	async fn test_arming_cancels_previous_loop() {
		let server = MockServer::start().await;

		mount_login(&server).await;

		let session = SessionManager::new(server.uri(), MemoryStorage::default());

		session.login("admin@x.com", "p", false).await.unwrap();

		let first = session.inner.current.lock().await.refresh.clone().unwrap();

		session.login("admin@x.com", "p", false).await.unwrap();

		let second = session.inner.current.lock().await.refresh.clone().unwrap();

		assert!(first.is_cancelled());
		assert!(!second.is_cancelled());

		session.logout().await;

		assert!(second.is_cancelled());
		assert_eq!(session.state().await, SessionState::LoggedOut);
	}
}
