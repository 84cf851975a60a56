//! Wires the configured adapters, store gateway, and scheduler together.

pub(crate) mod error;

use std::sync::Arc;

use ban_store::{ConnectionPool, SqlStoreGateway};

use self::error::Error;
use crate::adapters::{self, SourceAdapter};
use crate::config::Config;
use crate::reconciler::Reconciler;
use crate::scheduler::Scheduler;
use crate::task_manager::TaskManager;

/// Everything [`crate::run`] needs to hand off to the scheduler.
pub(crate) struct Assembly
{
	pub scheduler: Scheduler<SqlStoreGateway>,
	pub adapters: Vec<Arc<dyn SourceAdapter>>,
	pub pool: ConnectionPool,
	pub task_manager: TaskManager,
}

/// Connects to the store, builds the adapter registry, and assembles the
/// scheduler. Does not start anything; that's [`Scheduler::run`]'s job.
pub(crate) async fn assemble(config: &Config) -> Result<Assembly, Error>
{
	ConnectionPool::install_drivers();

	let pool = ConnectionPool::connect(config.db_config.connect_options()).await?;
	let store = SqlStoreGateway::new(pool.clone(), config.db_config.db_type);
	let reconciler = Reconciler::new(store);
	let task_manager = TaskManager::default();
	let scheduler = Scheduler::new(reconciler, task_manager.clone());

	let adapters = adapters::registry(config).map_err(Error::Adapters)?;

	Ok(Assembly { scheduler, adapters, pool, task_manager })
}
