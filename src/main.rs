use std::net::SocketAddr;

use axum::{extract::Request, ServiceExt};
use sqlx::postgres::PgPoolOptions;
use techveda::{ratelimit::Limits, token::Keys, trace, Config, State};
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	dotenvy::dotenv().ok();

	let config = Config::from_env()?;
	config.install();

	let _guard = trace::init_tracing_subscriber(&config)?;

	let keys = Keys::new(&config.jwt_secret)?;

	let database = PgPoolOptions::new()
		.max_connections(10)
		.connect(&config.database_url)
		.await?;

	sqlx::migrate!().run(&database).await?;
	tracing::info!("database migrated");

	let limits = Limits::new();
	limits.spawn_cleanup();

	let app = techveda::app(State::new(database, keys), &config, Some(&limits));
	let app = NormalizePathLayer::trim_trailing_slash().layer(app);

	let listener = tokio::net::TcpListener::bind((config.host, config.port)).await?;

	tracing::info!(
		address = %listener.local_addr()?,
		environment = config.environment.as_str(),
		"listening"
	);

	axum::serve(
		listener,
		ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
	)
	.await?;

	Ok(())
}
