use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Deserialize, Validate, JsonSchema)]
pub struct IdInput {
	pub id: Uuid,
}

/// Confirmation returned by delete routes.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct Deleted {
	pub message: String,
}

impl Deleted {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

/// A list of short strings such as tags or technologies.
///
/// Accepts a JSON array of strings, a comma-delimited string, or a string
/// holding a JSON array. Entries are trimmed and empty entries dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent, no_pg_array)]
pub struct TagList(pub Vec<String>);

impl TagList {
	pub fn parse(text: &str) -> Self {
		let text = text.trim();

		if text.starts_with('[') {
			if let Ok(items) = serde_json::from_str::<Vec<String>>(text) {
				return items.into_iter().collect();
			}
		}

		text.split(',').map(str::to_owned).collect()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn into_inner(self) -> Vec<String> {
		self.0
	}
}

impl FromIterator<String> for TagList {
	fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
		Self(
			iter.into_iter()
				.map(|item| item.trim().to_owned())
				.filter(|item| !item.is_empty())
				.collect(),
		)
	}
}

impl<'de> Deserialize<'de> for TagList {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			List(Vec<String>),
			Text(String),
		}

		Ok(match Raw::deserialize(deserializer)? {
			Raw::List(items) => items.into_iter().collect(),
			Raw::Text(text) => Self::parse(&text),
		})
	}
}

pub fn validate_not_empty(list: &TagList) -> Result<(), ValidationError> {
	if list.is_empty() {
		return Err(ValidationError::new("must contain at least one entry"));
	}

	Ok(())
}
