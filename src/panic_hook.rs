use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic;

/// Routes panics through `tracing` instead of only stderr, so a panic inside
/// a scheduled job shows up in the same log stream as everything else.
pub(crate) fn install()
{
	panic::update_hook(|old_hook, panic_info| {
		let location = panic_info.location();
		let backtrace = Backtrace::capture();

		match (location, backtrace.status() == BacktraceStatus::Captured) {
			(Some(location), true) => {
				tracing::error!(%location, %backtrace, "thread panicked");
			},
			(Some(location), false) => {
				tracing::error!(%location, "thread panicked");
			},
			(None, true) => {
				tracing::error!(%backtrace, "thread panicked");
			},
			(None, false) => {
				tracing::error!("thread panicked");
			},
		}

		old_hook(panic_info)
	});
}
