use std::{
	io::ErrorKind,
	path::PathBuf,
	sync::{Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Error;
use crate::route::auth::User;

/// A logged-in session as it is kept between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
	pub token: String,
	/// The user as of the last login or refresh.
	pub user: User,
	pub expires_at: DateTime<Utc>,
	/// When the server stops accepting `token`. Refreshing never moves this.
	pub token_expires_at: DateTime<Utc>,
	/// Whether the user asked to stay logged in.
	pub remember: bool,
}

impl StoredSession {
	/// The session ends at its own expiry or its token's, whichever is first.
	pub fn valid_until(&self) -> DateTime<Utc> {
		self.expires_at.min(self.token_expires_at)
	}

	pub fn is_expired(&self) -> bool {
		self.valid_until() <= Utc::now()
	}
}

/// Where remembered sessions are kept.
pub trait SessionStorage: Send + Sync {
	fn load(&self) -> Result<Option<StoredSession>, Error>;
	fn save(&self, session: &StoredSession) -> Result<(), Error>;
	fn clear(&self) -> Result<(), Error>;
}

/// Keeps the session in a JSON file, so it survives restarts.
#[derive(Debug, Clone)]
pub struct FileStorage {
	path: PathBuf,
}

impl FileStorage {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl SessionStorage for FileStorage {
	fn load(&self) -> Result<Option<StoredSession>, Error> {
		match std::fs::read(&self.path) {
			Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
			Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
			Err(error) => Err(error.into()),
		}
	}

	fn save(&self, session: &StoredSession) -> Result<(), Error> {
		if let Some(parent) = self.path.parent() {
			std::fs::create_dir_all(parent)?;
		}

		std::fs::write(&self.path, serde_json::to_vec(session)?)?;
		Ok(())
	}

	fn clear(&self) -> Result<(), Error> {
		match std::fs::remove_file(&self.path) {
			Err(error) if error.kind() != ErrorKind::NotFound => Err(error.into()),
			_ => Ok(()),
		}
	}
}

/// Keeps the session for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryStorage {
	session: Mutex<Option<StoredSession>>,
}

impl SessionStorage for MemoryStorage {
	fn load(&self) -> Result<Option<StoredSession>, Error> {
		Ok(self
			.session
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone())
	}

	fn save(&self, session: &StoredSession) -> Result<(), Error> {
		*self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
		Ok(())
	}

	fn clear(&self) -> Result<(), Error> {
		self.session
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take();
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn session(expires_at: DateTime<Utc>) -> StoredSession {
		StoredSession {
			token: "t".into(),
			user: serde_json::from_value(crate::client::test::user()).unwrap(),
			expires_at,
			token_expires_at: Utc::now() + chrono::Duration::days(1),
			remember: true,
		}
	}

	#[test]
	fn test_file_storage() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileStorage::new(dir.path().join("nested").join("session.json"));

		assert!(storage.load().unwrap().is_none());

		storage
			.save(&session(Utc::now() + chrono::Duration::days(1)))
			.unwrap();

		let loaded = storage.load().unwrap().unwrap();

		assert_eq!(loaded.token, "t");
		assert_eq!(loaded.user.username, "admin");
		assert!(!loaded.is_expired());

		storage.clear().unwrap();
		storage.clear().unwrap();

		assert!(storage.load().unwrap().is_none());
	}

	#[test]
	fn test_file_storage_corrupt() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("session.json");

		std::fs::write(&path, b"not json").unwrap();

		assert!(matches!(
			FileStorage::new(path).load(),
			Err(Error::Corrupt(..))
		));
	}

	#[test]
	fn test_expiry() {
		assert!(session(Utc::now() - chrono::Duration::seconds(1)).is_expired());
	}

	#[test]
	fn test_expiry_follows_token() {
		let mut remembered = session(Utc::now() + chrono::Duration::days(5));

		assert!(!remembered.is_expired());

		remembered.token_expires_at = Utc::now() - chrono::Duration::days(1);

		assert!(remembered.is_expired());
		assert_eq!(remembered.valid_until(), remembered.token_expires_at);
	}
}
