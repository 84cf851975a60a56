use std::sync::Arc;

use ban_store::StoreGateway;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::adapters::SourceAdapter;
use crate::reconciler::{ReconcileError, Reconciler};
use crate::task_manager::TaskManager;

/// One of the two fixed trigger schedules from §4.4.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Trigger
{
	minutes: &'static [u8],
	complete_refresh: bool,
}

impl Trigger
{
	pub(crate) const INCREMENTAL: Self =
		Self { minutes: &[5, 10, 15, 20, 25, 35, 40, 45, 50, 55], complete_refresh: false };

	pub(crate) const FULL: Self = Self { minutes: &[0, 30], complete_refresh: true };

	/// The wall-clock instant this trigger next fires at or after `now`.
	///
	/// No cron grammar needed: both schedules are fixed minute-of-hour sets,
	/// so this just walks forward to the nearest matching minute boundary.
	#[must_use]
	pub(crate) fn next_fire_after(&self, now: OffsetDateTime) -> OffsetDateTime
	{
		let start_of_this_minute = now.replace_second(0).expect("0 is a valid second")
			.replace_nanosecond(0)
			.expect("0 is a valid nanosecond");

		for offset in 0..=1440 {
			let candidate = start_of_this_minute + time::Duration::minutes(offset);
			if self.minutes.contains(&candidate.minute()) && candidate > now
			{
				return candidate;
			}
		}

		unreachable!("every hour contains at least one matching minute within 24h")
	}
}

/// Owns one `tokio` task per `(adapter, trigger)` pair and the per-adapter
/// mutex that gives §5's "at-most-one-concurrent-execution" guarantee.
///
/// Per §4.4/§9: a firing trigger that finds its adapter's mutex already held
/// **skips this firing** rather than queueing behind it — `try_lock`, not
/// `lock().await`.
#[derive(Debug)]
pub(crate) struct Scheduler<G>
{
	reconciler: Arc<Reconciler<G>>,
	task_manager: TaskManager,
}

impl<G> Scheduler<G>
where
	G: StoreGateway + 'static,
{
	#[must_use]
	pub(crate) fn new(reconciler: Reconciler<G>, task_manager: TaskManager) -> Self
	{
		Self { reconciler: Arc::new(reconciler), task_manager }
	}

	/// Runs the initial bootstrap job for every adapter (once, synchronously,
	/// outside the per-adapter mutex — §4.4), then spawns the incremental and
	/// full-refresh trigger loops for each.
	pub(crate) async fn run(&self, adapters: Vec<Arc<dyn SourceAdapter>>)
	{
		for adapter in &adapters {
			self.run_job(Arc::clone(adapter), true).await;
		}

		for adapter in adapters {
			let adapter_mutex = Arc::new(Mutex::new(()));

			for trigger in [Trigger::INCREMENTAL, Trigger::FULL] {
				let reconciler = Arc::clone(&self.reconciler);
				let adapter = Arc::clone(&adapter);
				let adapter_mutex = Arc::clone(&adapter_mutex);
				let span = tracing::info_span!(
					"scheduled_trigger",
					adapter = adapter.adapter_name(),
					complete_refresh = trigger.complete_refresh,
				);

				let adapter_name = adapter.adapter_name().to_owned();
				if let Err(error) = self.task_manager.spawn(span, move |cancellation| {
					trigger_loop(reconciler, adapter, adapter_mutex, trigger, cancellation)
				}) {
					tracing::error!(adapter = adapter_name, %error, "failed to spawn trigger loop");
				}
			}
		}
	}

	async fn run_job(&self, adapter: Arc<dyn SourceAdapter>, complete_refresh: bool)
	{
		match self
			.reconciler
			.reconcile(adapter.as_ref(), complete_refresh, &CancellationToken::new())
			.await
		{
			Ok(report) => tracing::info!(
				adapter = adapter.adapter_name(),
				inserted = report.inserted,
				updated = report.updated,
				deleted = report.deleted,
				duplicate_collisions = report.duplicate_collisions,
				"reconciliation complete",
			),
			Err(error) => log_job_failure(adapter.adapter_name(), &error),
		}
	}
}

async fn trigger_loop<G>(
	reconciler: Arc<Reconciler<G>>,
	adapter: Arc<dyn SourceAdapter>,
	adapter_mutex: Arc<Mutex<()>>,
	trigger: Trigger,
	cancellation: CancellationToken,
) where
	G: StoreGateway,
{
	loop {
		let now = OffsetDateTime::now_utc();
		let next = trigger.next_fire_after(now);
		let wait = next - now;

		tokio::select! {
			() = sleep(wait.unsigned_abs()) => {},
			() = cancellation.cancelled() => return,
		}

		let Ok(_permit) = adapter_mutex.try_lock() else {
			tracing::debug!(
				adapter = adapter.adapter_name(),
				"skipping trigger, previous run for this adapter is still in flight",
			);
			continue;
		};

		match reconciler.reconcile(adapter.as_ref(), trigger.complete_refresh, &cancellation).await {
			Ok(report) => tracing::info!(
				adapter = adapter.adapter_name(),
				inserted = report.inserted,
				updated = report.updated,
				deleted = report.deleted,
				duplicate_collisions = report.duplicate_collisions,
				"reconciliation complete",
			),
			Err(error) => log_job_failure(adapter.adapter_name(), &error),
		}
	}
}

/// Logs a job failure at the level §7 prescribes for its variant; the error
/// never propagates past this point (§4.4's "per-job failure isolation").
fn log_job_failure(adapter_name: &str, error: &ReconcileError)
{
	match error {
		ReconcileError::Cancelled => tracing::debug!(adapter = adapter_name, "job cancelled"),
		ReconcileError::SafetyAbort { stored } => tracing::error!(
			adapter = adapter_name,
			stored = *stored,
			"safety gate tripped, refusing to delete",
		),
		ReconcileError::Adapter(source) if matches!(source, crate::adapters::AdapterError::SourceUnavailable(_)) => {
			tracing::warn!(adapter = adapter_name, error = source as &dyn std::error::Error, "source unavailable");
		},
		other => {
			tracing::error!(adapter = adapter_name, error = other as &dyn std::error::Error, "job failed");
		},
	}
}
