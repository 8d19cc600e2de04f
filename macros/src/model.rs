use darling::{ast, FromDeriveInput, FromField};
use proc_macro2::TokenTree;
use quote::{format_ident, quote, ToTokens};
use syn::{punctuated::Punctuated, Meta, Token};

#[derive(Debug, FromDeriveInput)]
#[darling(supports(struct_named), forward_attrs)]
struct ModelInputReceiver {
	ident: syn::Ident,

	generics: syn::Generics,

	data: ast::Data<(), ModelFieldReceiver>,

	attrs: Vec<syn::Attribute>,
}

#[derive(Debug, FromField)]
#[darling(forward_attrs)]
struct ModelFieldReceiver {
	ident: Option<syn::Ident>,

	ty: syn::Type,
	vis: syn::Visibility,

	attrs: Vec<syn::Attribute>,
}

/// Returns `true` if the attribute is `#[serde(...)]` and contains one of `words`.
fn serde_has_any(attr: &syn::Attribute, words: &[&str]) -> bool {
	let Meta::List(ref list) = attr.meta else {
		return false;
	};

	if !list.path.is_ident("serde") {
		return false;
	}

	list.tokens.to_token_stream().into_iter().any(
		|token| matches!(token, TokenTree::Ident(ref ident) if words.iter().any(|w| ident == w)),
	)
}

/// Returns `true` if the attribute is `#[model(skip)]`.
fn model_skip(attr: &syn::Attribute) -> bool {
	let Meta::List(ref list) = attr.meta else {
		return false;
	};

	list.path.is_ident("model")
		&& list
			.tokens
			.clone()
			.into_iter()
			.any(|token| matches!(token, TokenTree::Ident(ref ident) if ident == "skip"))
}

/// Removes the `#[model(...)]` helper attributes, which only this macro understands.
fn strip_model_attrs(input: &mut syn::DeriveInput) {
	if let syn::Data::Struct(ref mut data) = input.data {
		for field in &mut data.fields {
			field.attrs.retain(|attr| !attr.path().is_ident("model"));
		}
	}
}

/// Rewrites a struct-level attribute for the generated input structs.
///
/// Row mapping belongs to the model only, so `sqlx::FromRow` is dropped from
/// derive lists and `#[sqlx(...)]` attributes are removed entirely.
fn input_attr(attr: &syn::Attribute) -> Option<syn::Attribute> {
	if attr.path().is_ident("sqlx") {
		return None;
	}

	if !attr.path().is_ident("derive") {
		return Some(attr.clone());
	}

	let paths = attr
		.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)
		.ok()?;

	let kept = paths
		.into_iter()
		.filter(|path| {
			path.segments
				.last()
				.map_or(true, |segment| segment.ident != "FromRow")
		})
		.collect::<Vec<_>>();

	if kept.is_empty() {
		return None;
	}

	Some(syn::parse_quote!(#[derive(#(#kept),*)]))
}

pub fn from_input(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
	let mut input = syn::parse_macro_input!(input as syn::DeriveInput);
	let receiver = match ModelInputReceiver::from_derive_input(&input) {
		Ok(x) => x,
		Err(e) => return e.write_errors().into(),
	};

	strip_model_attrs(&mut input);

	let ident = &receiver.ident;
	let vis = &input.vis;
	let generics = &receiver.generics;
	let create_ident = format_ident!("Create{}", ident);
	let update_ident = format_ident!("Update{}", ident);

	let attrs = receiver
		.attrs
		.iter()
		.filter_map(input_attr)
		.collect::<Vec<_>>();

	let fields = receiver.data.take_struct().expect("expected struct");
	let fields = fields
		.iter()
		.filter_map(|field| {
			let ident = field.ident.as_ref()?;

			// Server-owned fields are never accepted from the client
			if field.attrs.iter().any(|attr| {
				model_skip(attr) || serde_has_any(attr, &["skip_deserializing", "skip"])
			}) {
				return None;
			}

			let attrs = field
				.attrs
				.iter()
				.filter(|attr| !attr.path().is_ident("sqlx") && !attr.path().is_ident("model"))
				.collect::<Vec<_>>();

			Some((attrs, ident, &field.ty, &field.vis))
		})
		.collect::<Vec<_>>();

	let create_fields = fields.iter().map(|(attrs, ident, ty, vis)| {
		quote! {
			#(#attrs)*
			#vis #ident: #ty,
		}
	});

	let update_fields = fields.iter().map(|(attrs, ident, ty, vis)| {
		quote! {
			#(#attrs)*
			#vis #ident: Option<#ty>,
		}
	});

	quote! {
		#input

		#(#attrs)*
		#vis struct #create_ident #generics {
			#(
				#create_fields
			)*
		}

		#(#attrs)*
		#[serde(deny_unknown_fields)]
		#vis struct #update_ident #generics {
			#(
				#update_fields
			)*
		}
	}
	.into()
}
