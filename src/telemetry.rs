use tracing_subscriber::{EnvFilter, fmt::time::UtcTime};

use crate::config::TracingConfig;

/// Initializes the global `tracing` subscriber.
///
/// Pretty, human-readable output by default; `tracing.json = true` switches
/// to newline-delimited JSON for log aggregation, since this binary runs
/// unattended rather than in front of a developer's terminal most of the
/// time.
pub(crate) fn init(config: &TracingConfig)
{
	let env_filter = EnvFilter::from_default_env();

	if config.json {
		tracing_subscriber::fmt()
			.json()
			.with_file(true)
			.with_line_number(true)
			.with_timer(UtcTime::rfc_3339())
			.with_env_filter(env_filter)
			.init();
	} else {
		tracing_subscriber::fmt()
			.pretty()
			.with_file(true)
			.with_line_number(true)
			.with_timer(UtcTime::rfc_3339())
			.with_env_filter(env_filter)
			.init();
	}
}
