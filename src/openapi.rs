use aide::{
	openapi::{SecurityScheme, Tag},
	transform::TransformOpenApi,
};

use crate::{error, extract::Json};

/// The name the bearer token scheme is registered under.
pub const SECURITY_SCHEME_BEARER: &str = "Bearer";

pub mod tag {
	pub const AUTH: &str = "Auth";
	pub const PROJECT: &str = "Project";
	pub const SERVICE: &str = "Service";
	pub const CONTENT: &str = "Content";
	pub const ABOUT: &str = "About";
}

fn tag(name: &str, description: &str) -> Tag {
	Tag {
		name: name.into(),
		description: Some(description.into()),
		..Default::default()
	}
}

pub fn docs(api: TransformOpenApi) -> TransformOpenApi {
	api.title("Techveda API")
		.summary("Content backend of the Techveda website")
		.description(include_str!("../README.md"))
		.tag(tag(tag::AUTH, "Accounts and bearer tokens"))
		.tag(tag(tag::PROJECT, "Portfolio projects"))
		.tag(tag(tag::SERVICE, "Services and their sub-services"))
		.tag(tag(tag::CONTENT, "Blog posts"))
		.tag(tag(tag::ABOUT, "The about page"))
		.security_scheme(
			SECURITY_SCHEME_BEARER,
			SecurityScheme::Http {
				scheme: "bearer".into(),
				bearer_format: Some("JWT".into()),
				description: Some("A token from the login or register route".into()),
				extensions: Default::default(),
			},
		)
		.default_response_with::<Json<error::ErrorResponse>, _>(|res| {
			res.example(error::ErrorResponse::new(
				error::Message::new("error message")
					.field("optional field")
					.detail("key", "value")
					.into_vec(),
			))
		})
}
