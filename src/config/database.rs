use std::num::NonZero;

use ban_store::{ConnectOptions, DbKind};
use serde::{Deserialize, Deserializer};
use url::Url;

/// `dbConfig` (§6): dialect, connection string, and pool sizing.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub(crate) struct DatabaseConfig
{
	pub db_type: DbKind,
	pub connection_string: Url,

	#[serde(default, deserialize_with = "deserialize_option_u32")]
	pub min_connections: Option<NonZero<u32>>,

	#[serde(default, deserialize_with = "deserialize_option_u32")]
	pub max_connections: Option<NonZero<u32>>,
}

impl DatabaseConfig
{
	#[must_use]
	pub(crate) fn connect_options(&self) -> ConnectOptions<'_>
	{
		ConnectOptions::builder()
			.kind(self.db_type)
			.url(&self.connection_string)
			.maybe_min_connections(self.min_connections)
			.maybe_max_connections(self.max_connections)
			.build()
	}
}

fn deserialize_option_u32<'de, D>(deserializer: D) -> Result<Option<NonZero<u32>>, D::Error>
where
	D: Deserializer<'de>,
{
	<Option<u32> as Deserialize<'de>>::deserialize(deserializer)
		.map(|maybe_num| maybe_num.and_then(NonZero::new))
}
