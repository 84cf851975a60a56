mod database;
mod overlay;
mod sources;
mod tracing;

use std::{fs, path::Path};

use color_eyre::{Section, eyre::{self, WrapErr}};
use serde::Deserialize;

pub(crate) use self::{
	database::DatabaseConfig,
	overlay::apply_overlay,
	sources::SourcesConfig,
	tracing::TracingConfig,
};

/// The engine's top-level configuration document (§6).
///
/// Loaded from a TOML file and then overlaid with `--set path.to.key=value`
/// flags (see [`apply_overlay`]) before being deserialized here, so that
/// `deny_unknown_fields` catches typos in either source.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub(crate) struct Config
{
	pub db_config: DatabaseConfig,

	#[serde(default)]
	pub tracing: TracingConfig,

	#[serde(default)]
	pub sources: SourcesConfig,
}

impl Config
{
	/// Loads the configuration document at `path`, applies `overrides`
	/// (`--set path.to.key=value` pairs, already split on `=`), and
	/// deserializes the result.
	///
	/// `db-config` is a required table; its absence is reported with the
	/// section name, matching §6 ("missing `dbConfig` ⇒ fatal startup error
	/// with a message naming the missing section").
	pub(crate) fn load(path: impl AsRef<Path>, overrides: &[(String, String)]) -> eyre::Result<Self>
	{
		let raw = fs::read_to_string(path.as_ref())
			.wrap_err_with(|| format!("failed to read configuration file at {:?}", path.as_ref()))
			.suggestion("create the file or run with `--config` to point at an existing one")?;

		let mut document: toml::Value =
			toml::from_str(&raw).wrap_err("failed to parse configuration file")?;

		for (path, value) in overrides {
			apply_overlay(&mut document, path, value)
				.wrap_err_with(|| format!("failed to apply override `--set {path}={value}`"))?;
		}

		if document.get("db-config").is_none() {
			return Err(eyre::eyre!("configuration is missing the `db-config` section"));
		}

		document.try_into::<Self>().wrap_err("configuration failed validation")
	}
}
