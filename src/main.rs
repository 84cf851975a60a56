use color_eyre::eyre::{self, WrapErr};
use color_eyre::owo_colors::OwoColorize;

mod adapters;
mod cli;
mod config;
mod panic_hook;
mod reconciler;
mod scheduler;
mod setup;
mod signal;
mod task_manager;
mod telemetry;

use self::config::Config;

fn main() -> eyre::Result<()>
{
	color_eyre::install()?;

	#[allow(clippy::print_stderr, reason = "tracing isn't initialized yet")]
	if dotenvy::dotenv().is_err() {
		eprintln!("{}: no {} file found", "WARNING".yellow().bold(), "`.env`".white());
	}

	let args = cli::args();
	let overrides: Vec<(String, String)> =
		args.overrides.into_iter().map(|kv| (kv.path, kv.value)).collect();

	let config = Config::load(&args.config_path, &overrides)
		.wrap_err("failed to load configuration file")?;

	panic_hook::install();
	telemetry::init(&config.tracing);

	tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.build()
		.wrap_err("failed to build tokio runtime")?
		.block_on(run(config))
}

#[tracing::instrument(skip_all)]
async fn run(config: Config) -> eyre::Result<()>
{
	tracing::info!("starting up");

	let setup::Assembly { scheduler, adapters, pool, task_manager } =
		setup::assemble(&config).await.wrap_err("failed to initialize")?;

	tracing::info!(adapters = adapters.len(), "running scheduler");
	scheduler.run(adapters).await;

	signal::shutdown().await;
	tracing::info!("shutting down");

	tracing::debug!("shutting down tasks");
	task_manager.shutdown().await;

	tracing::debug!("closing database connections");
	pool.shutdown().await;

	Ok(())
}
