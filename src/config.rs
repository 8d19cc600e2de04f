use std::{net::IpAddr, path::PathBuf, str::FromStr, sync::OnceLock};

static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

/// The deployment environment, read from `APP_ENV`.
///
/// Development relaxes CORS and adds raw error detail to error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
	Development,
	#[default]
	Production,
}

impl Environment {
	pub fn is_development(self) -> bool {
		self == Self::Development
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Development => "development",
			Self::Production => "production",
		}
	}
}

impl FromStr for Environment {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"development" | "dev" => Ok(Self::Development),
			"production" | "prod" => Ok(Self::Production),
			_ => Err(()),
		}
	}
}

/// Returns the process-wide environment, [`Environment::Production`] until
/// [`Config::install`] has run.
pub fn environment() -> Environment {
	ENVIRONMENT.get().copied().unwrap_or_default()
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0} must be set")]
	Missing(&'static str),
	#[error("{name} has an invalid value: {value:?}")]
	Invalid { name: &'static str, value: String },
}

/// Server configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
	pub database_url: String,
	pub jwt_secret: String,
	pub host: IpAddr,
	pub port: u16,
	pub environment: Environment,
	/// Origins allowed by CORS in production.
	pub cors_origins: Vec<String>,
	pub upload_dir: PathBuf,
	pub otlp_endpoint: Option<String>,
}

impl Config {
	/// Reads the configuration from the process environment.
	pub fn from_env() -> Result<Self, Error> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Reads the configuration through `lookup`, treating empty values as unset.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
		let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
		let required = |name: &'static str| get(name).ok_or(Error::Missing(name));

		fn parse<T: FromStr>(name: &'static str, value: Option<String>, default: T) -> Result<T, Error> {
			match value {
				Some(value) => value.trim().parse().map_err(|_| Error::Invalid { name, value }),
				None => Ok(default),
			}
		}

		Ok(Self {
			database_url: required("DATABASE_URL")?,
			jwt_secret: required("JWT_SECRET")?,
			host: parse("HOST", get("HOST"), IpAddr::from([127, 0, 0, 1]))?,
			port: parse("PORT", get("PORT"), 5000)?,
			environment: parse("APP_ENV", get("APP_ENV"), Environment::Production)?,
			cors_origins: get("CORS_ORIGINS")
				.map(|origins| {
					origins
						.split(',')
						.map(str::trim)
						.filter(|origin| !origin.is_empty())
						.map(str::to_owned)
						.collect()
				})
				.unwrap_or_default(),
			upload_dir: get("UPLOAD_DIR").map_or_else(|| PathBuf::from("uploads"), PathBuf::from),
			otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
		})
	}

	/// Makes this configuration's environment visible to [`environment`].
	pub fn install(&self) {
		if ENVIRONMENT.set(self.environment).is_err() {
			tracing::warn!("environment already installed, keeping the first one");
		}
	}
}
