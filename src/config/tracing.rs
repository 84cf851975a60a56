use serde::Deserialize;

/// `tracing` stack configuration.
///
/// Pretty, human-readable output is the default; this lets an operator
/// switch to `json` output instead for log aggregation in production.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub(crate) struct TracingConfig
{
	pub json: bool,
}
