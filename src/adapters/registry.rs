use std::sync::Arc;

use color_eyre::eyre::{self, WrapErr};

use super::{PaginatedJsonAdapter, SourceAdapter};
use crate::config::Config;

/// Builds the set of configured adapters.
///
/// A compile-time list rather than reflection-based discovery (§9's
/// "assembly-scanned polymorphism → explicit adapter registry" note): to add
/// an upstream shape, write a type implementing [`super::SourceAdapter`] and
/// add one line here. This is also where the scheduler's "initial bootstrap
/// job" (§4.4) gets its adapter list from, since it is simply whatever this
/// function returns at process start.
pub(crate) fn registry(config: &Config) -> eyre::Result<Vec<Arc<dyn SourceAdapter>>>
{
	let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

	for (name, source) in &config.sources.0 {
		let adapter = PaginatedJsonAdapter::new(name.clone(), source.base_url.clone(), source.per_page)
			.wrap_err_with(|| format!("failed to build HTTP client for source `{name}`"))?;

		adapters.push(Arc::new(adapter));
	}

	Ok(adapters)
}
