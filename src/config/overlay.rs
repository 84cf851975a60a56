use color_eyre::eyre::{self, eyre};

/// Applies a single `--set path.to.key=value` override onto a parsed TOML
/// document, walking (and creating, where absent) intermediate tables.
///
/// The walk happens against the untyped `toml::Value` tree before
/// deserialization, so an arbitrary dotted path can reach any leaf in the
/// configuration document without a fixed set of named override flags.
pub(crate) fn apply_overlay(document: &mut toml::Value, path: &str, value: &str) -> eyre::Result<()>
{
	let mut segments = path.split('.').peekable();
	let mut current = document;

	loop {
		let segment = segments
			.next()
			.ok_or_else(|| eyre!("`--set` path must not be empty"))?;

		if !current.is_table() {
			*current = toml::Value::Table(toml::map::Map::new());
		}

		let table = current
			.as_table_mut()
			.expect("just normalized this node into a table");

		if segments.peek().is_none() {
			table.insert(segment.to_owned(), parse_scalar(value));
			return Ok(());
		}

		current = table.entry(segment.to_owned()).or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
	}
}

/// Interprets `raw` as a TOML scalar (bool, integer, float), falling back to
/// a plain string. `toml::Value` has no "infer from str" constructor, so
/// this tries the obvious candidates in order of specificity.
fn parse_scalar(raw: &str) -> toml::Value
{
	if let Ok(b) = raw.parse::<bool>() {
		return toml::Value::Boolean(b);
	}

	if let Ok(i) = raw.parse::<i64>() {
		return toml::Value::Integer(i);
	}

	if let Ok(f) = raw.parse::<f64>() {
		return toml::Value::Float(f);
	}

	toml::Value::String(raw.to_owned())
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn creates_missing_intermediate_tables()
	{
		let mut document = toml::Value::Table(toml::map::Map::new());

		apply_overlay(&mut document, "db-config.db-type", "Postgres").unwrap();

		assert_eq!(
			document["db-config"]["db-type"].as_str(),
			Some("Postgres"),
		);
	}

	#[test]
	fn infers_scalar_types()
	{
		let mut document = toml::Value::Table(toml::map::Map::new());

		apply_overlay(&mut document, "db-config.min-connections", "4").unwrap();

		assert_eq!(document["db-config"]["min-connections"].as_integer(), Some(4));
	}
}
