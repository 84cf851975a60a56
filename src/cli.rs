use std::path::PathBuf;

pub(crate) fn args() -> Args
{
	<Args as clap::Parser>::parse()
}

/// Command-line overrides for [`crate::config::Config`] (§6).
#[derive(Debug, clap::Parser)]
pub(crate) struct Args
{
	/// Path to the engine's configuration file
	#[arg(long = "config", default_value = "/etc/ban-sync.toml")]
	pub(crate) config_path: PathBuf,

	/// A dotted-path override applied on top of the configuration file, in
	/// the form `path.to.key=value`. May be repeated.
	#[arg(long = "set")]
	pub(crate) overrides: Vec<KeyValue>,
}

/// One `--set path.to.key=value` pair, parsed eagerly so a malformed flag is
/// rejected by `clap` itself rather than surfacing later.
#[derive(Debug, Clone)]
pub(crate) struct KeyValue
{
	pub(crate) path: String,
	pub(crate) value: String,
}

impl std::str::FromStr for KeyValue
{
	type Err = String;

	fn from_str(raw: &str) -> Result<Self, Self::Err>
	{
		let (path, value) = raw
			.split_once('=')
			.ok_or_else(|| format!("expected `path.to.key=value`, got {raw:?}"))?;

		if path.is_empty() {
			return Err("path must not be empty".to_owned());
		}

		Ok(Self { path: path.to_owned(), value: value.to_owned() })
	}
}
