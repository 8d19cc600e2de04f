mod model;
mod route;

use proc_macro::TokenStream;

/// Creates a new documentation function for the route, named after the original function with the suffix `_docs`.
///
/// The first line of the doc comment is the summary, the rest is the description.
/// `auth` documents the 401 response of bearer-protected routes, `admin` additionally documents 403.
#[proc_macro_attribute]
pub fn route(args: TokenStream, input: TokenStream) -> TokenStream {
	route::from_input(args, input)
}

/// Creates two new structs for the model: `CreateX` and `UpdateX`.
///
/// Fields marked `#[model(skip)]`, `#[serde(skip)]` or `#[serde(skip_deserializing)]`
/// are server-owned and left out of both. `UpdateX` wraps every field in an `Option` and denies
/// unknown fields, so it doubles as the update allow-list. `sqlx` attributes and
/// the `FromRow` derive stay on the model.
#[proc_macro_attribute]
pub fn model(_args: TokenStream, input: TokenStream) -> TokenStream {
	model::from_input(input)
}
