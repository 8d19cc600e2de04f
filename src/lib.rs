#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod openapi;
pub mod ratelimit;
pub mod route;
pub mod token;
pub mod trace;

use std::sync::Arc;

use aide::{axum::ApiRouter, openapi::OpenApi};
use argon2::Argon2;
use axum::{
	http::{header, HeaderValue, Method},
	Extension, Router,
};
use tower_governor::GovernorLayer;
use tower_http::{
	catch_panic::CatchPanicLayer,
	compression::CompressionLayer,
	cors::{AllowOrigin, CorsLayer},
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	services::ServeDir,
	trace::TraceLayer,
};

pub use config::Config;

pub type Database = sqlx::Pool<sqlx::Postgres>;
pub type AppState = State;

/// The shared application state.
///
/// This should contain all shared dependencies that handlers need to access,
/// such as a database connection pool, a hash configuration (if it's expensive
/// to create) or the token keys.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub database: Database,
	pub hasher: Argon2<'static>,
	pub keys: token::Keys,
}

impl State {
	pub fn new(database: Database, keys: token::Keys) -> Self {
		Self {
			database,
			hasher: Argon2::default(),
			keys,
		}
	}
}

fn cors(config: &Config) -> CorsLayer {
	if config.environment.is_development() {
		return CorsLayer::very_permissive();
	}

	let origins = config
		.cors_origins
		.iter()
		.filter_map(|origin| match HeaderValue::from_str(origin) {
			Ok(origin) => Some(origin),
			Err(error) => {
				tracing::warn!(%origin, %error, "ignoring invalid CORS origin");
				None
			}
		})
		.collect::<Vec<_>>();

	CorsLayer::new()
		.allow_origin(AllowOrigin::list(origins))
		.allow_methods([
			Method::GET,
			Method::POST,
			Method::PUT,
			Method::PATCH,
			Method::DELETE,
		])
		.allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Builds the HTTP application.
///
/// `limits` is left out in tests, since the limiters key on the peer address
/// which only exists when served with connect info.
pub fn app(state: State, config: &Config, limits: Option<&ratelimit::Limits>) -> Router {
	aide::gen::extract_schemas(true);

	let mut api = OpenApi::default();
	let auth = route::auth::routes(limits.map(|limits| limits.secure.clone()));

	let router = ApiRouter::new()
		.nest("/api/auth", auth)
		.nest("/api/projects", route::project::routes())
		.nest("/api/services", route::service::routes())
		.nest("/api/content", route::content::routes())
		.nest("/api/about", route::about::routes())
		.nest("/docs", route::docs::routes())
		.finish_api_with(&mut api, openapi::docs)
		.nest_service("/uploads", ServeDir::new(&config.upload_dir))
		.layer(Extension(Arc::new(api)))
		.layer(cors(config))
		.layer(CompressionLayer::new())
		.layer(TraceLayer::new_for_http())
		.layer(PropagateRequestIdLayer::x_request_id())
		.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
		.layer(CatchPanicLayer::new());

	let router = match limits {
		Some(limits) => router.layer(GovernorLayer {
			config: limits.default.clone(),
		}),
		None => router,
	};

	router.with_state(state)
}
