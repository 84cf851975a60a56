use std::collections::HashMap;

use serde::Deserialize;
use url::Url;

/// `sources.<name>.<opt>` (§6): adapter-specific credentials and URLs, keyed
/// by the `BanSource` name the adapter declares for that entry.
///
/// Kept as a plain map rather than a fixed struct per adapter since the
/// registry is open-ended (§9's "drop-in a new adapter"); each adapter's
/// constructor looks up the keys it cares about by name and errors with
/// `ConfigurationError` if one is missing.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub(crate) struct SourcesConfig(pub HashMap<String, PaginatedJsonSourceConfig>);

impl SourcesConfig
{
	#[must_use]
	pub(crate) fn get(&self, name: &str) -> Option<&PaginatedJsonSourceConfig>
	{
		self.0.get(name)
	}
}

/// Connection details for one instance of the generic paginated-JSON
/// adapter (§6's `GET /bans/{perPage}/{page}` contract).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub(crate) struct PaginatedJsonSourceConfig
{
	pub base_url: Url,

	#[serde(default = "default_per_page")]
	pub per_page: u32,
}

const fn default_per_page() -> u32
{
	100
}
