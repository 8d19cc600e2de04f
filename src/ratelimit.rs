use std::{sync::Arc, time::Duration};

use axum::{
	body::Body,
	response::{IntoResponse, Response},
};
use governor::{
	clock::QuantaInstant,
	middleware::{RateLimitingMiddleware, StateInformationMiddleware},
};
use tower_governor::{
	governor::{GovernorConfig, GovernorConfigBuilder},
	key_extractor::{KeyExtractor, PeerIpKeyExtractor},
	GovernorError,
};

use crate::error::AppError;

pub type Config = Arc<GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>>;

/// The limiters applied by the server, keyed by peer IP.
///
/// Both read the peer address from `ConnectInfo`, so the router must be served
/// with `into_make_service_with_connect_info`.
#[derive(Clone)]
pub struct Limits {
	/// Every route: 10 requests per second with bursts of 50.
	pub default: Config,
	/// Login and registration: one request every 6 seconds with bursts of 5.
	pub secure: Config,
}

impl Limits {
	pub fn new() -> Self {
		Self {
			default: default(),
			secure: secure(),
		}
	}

	/// Spawns a thread that drops stale limiter state every minute.
	pub fn spawn_cleanup(&self) {
		cleanup_old_limits(&[&self.default, &self.secure]);
	}
}

impl Default for Limits {
	fn default() -> Self {
		Self::new()
	}
}

#[allow(clippy::missing_panics_doc)]
pub fn default() -> Config {
	Arc::new(
		GovernorConfigBuilder::default()
			.per_millisecond(100)
			.burst_size(50)
			.use_headers()
			.error_handler(error_handler)
			.finish()
			.expect("quota is non-zero"),
	)
}

#[allow(clippy::missing_panics_doc)]
pub fn secure() -> Config {
	Arc::new(
		GovernorConfigBuilder::default()
			.per_second(6)
			.burst_size(5)
			.use_headers()
			.error_handler(error_handler)
			.finish()
			.expect("quota is non-zero"),
	)
}

fn error_handler(error: GovernorError) -> Response<Body> {
	if let GovernorError::TooManyRequests { wait_time, .. } = &error {
		tracing::debug!(wait_time, "rate limited");
	}

	AppError::from(error).into_response()
}

pub fn cleanup_old_limits<T, M>(configs: &[&Arc<GovernorConfig<T, M>>])
where
	T: KeyExtractor,
	<T as KeyExtractor>::Key: Send + Sync + 'static,
	M: RateLimitingMiddleware<QuantaInstant> + Send + Sync + 'static,
{
	let limiters = configs
		.iter()
		.map(|config| config.limiter().clone())
		.collect::<Vec<_>>();
	let interval = Duration::from_secs(60);

	std::thread::spawn(move || loop {
		std::thread::sleep(interval);

		for limiter in &limiters {
			tracing::debug!("rate limiting storage size: {}", limiter.len());

			limiter.retain_recent();
		}
	});
}
