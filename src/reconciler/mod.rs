use std::collections::{HashMap, HashSet};

use ban_model::{Ban, BanIdentity, BanType};
use ban_store::{FieldUpdate, JobSetUpdate, StoreGateway};
use tokio_util::sync::CancellationToken;

use crate::adapters::{AdapterError, SourceAdapter};

/// A layer-§7 error from [`Reconciler::reconcile`].
#[derive(Debug, thiserror::Error)]
pub(crate) enum ReconcileError
{
	#[error(transparent)]
	Adapter(#[from] AdapterError),

	#[error(transparent)]
	Store(#[from] ban_store::StoreError),

	#[error("safety gate tripped: source returned 0 bans but {stored} are on record")]
	SafetyAbort
	{
		stored: usize,
	},

	#[error("reconciliation cancelled")]
	Cancelled,
}

/// Counts from one [`Reconciler::reconcile`] run, logged by the scheduler
/// instead of a bare `()` so outcomes show up structured (§4.3's Rust-native
/// addition).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReconcileReport
{
	pub inserted: usize,
	pub updated: usize,
	pub deleted: usize,
	pub duplicate_collisions: usize,
}

/// Diffs fetched bans against stored bans and commits the minimal set of
/// mutations (§4.3).
#[derive(Debug)]
pub(crate) struct Reconciler<G>
{
	store: G,
}

impl<G: StoreGateway> Reconciler<G>
{
	#[must_use]
	pub(crate) const fn new(store: G) -> Self
	{
		Self { store }
	}

	/// Runs one reconciliation pass for `adapter`.
	///
	/// `is_complete_refresh` is forced to `true` when the store holds no
	/// bans for any of the adapter's sources yet, per §4.3's "boundary
	/// behaviors" ("empty `stored` forces `isCompleteRefresh = true`").
	pub(crate) async fn reconcile(
		&self,
		adapter: &dyn SourceAdapter,
		is_complete_refresh: bool,
		cancellation: &CancellationToken,
	) -> Result<ReconcileReport, ReconcileError>
	{
		// Step 1: ensure every BanSource the adapter declares exists.
		let source_names: Vec<String> = adapter.sources().keys().cloned().collect();
		let sources_by_name = self.store.ensure_sources(&source_names).await?;
		let source_ids: Vec<_> = sources_by_name.values().map(|source| source.id).collect();

		let stored = self.store.load_bans(&source_ids).await?;
		let is_complete_refresh = is_complete_refresh || stored.is_empty();

		let mut fetched = if cancellation.is_cancelled() {
			return Err(ReconcileError::Cancelled);
		} else if is_complete_refresh {
			adapter.fetch_all(cancellation).await?
		} else {
			adapter.fetch_new(cancellation).await?
		};

		// Step 2: rehome onto the store's BanSource rows and canonicalize.
		let mut duplicate_collisions = 0;

		for ban in &mut fetched {
			let Some(source) = sources_by_name.get(&ban.source_name) else {
				// An adapter contract violation (the ban names a source it
				// never declared); skip rather than panic the whole job.
				continue;
			};

			ban.source_id = Some(source.id);
			ban.canonicalize_keys();
		}

		fetched.retain(|ban| ban.source_id.is_some());

		// Step 3: identity-match fetched against stored, deduplicating
		// "last one wins" on colliding identities within `fetched` itself.
		let supports_ban_ids = adapter.supports_ban_ids();
		let stored_by_identity: HashMap<BanIdentity, Ban> = stored
			.iter()
			.cloned()
			.map(|ban| (ban.identity(supports_ban_ids), ban))
			.collect();

		let mut deduped_fetched: HashMap<BanIdentity, Ban> = HashMap::with_capacity(fetched.len());
		for ban in fetched {
			let identity = ban.identity(supports_ban_ids);
			if deduped_fetched.insert(identity.clone(), ban).is_some() {
				duplicate_collisions += 1;
				tracing::warn!(?identity, "duplicate ban identity in fetched batch, last one wins");
			}
		}

		let mut inserts = Vec::new();
		let mut field_updates = Vec::new();
		let mut job_updates = Vec::new();

		for (identity, fetched_ban) in &deduped_fetched {
			match stored_by_identity.get(identity) {
				Some(existing) => {
					let ban_id = existing.id.expect("stored ban always has an id");

					if fetched_ban.reason != existing.reason
						|| fetched_ban.expires != existing.expires
						|| fetched_ban.unbanned_by != existing.unbanned_by
					{
						field_updates.push(FieldUpdate {
							ban_id,
							reason: fetched_ban.reason.clone(),
							expires: fetched_ban.expires,
							unbanned_by: fetched_ban.unbanned_by.clone(),
						});
					}

					if fetched_ban.ban_type == BanType::Job && fetched_ban.jobs != existing.jobs {
						job_updates.push(JobSetUpdate { ban_id, jobs: fetched_ban.jobs.clone() });
					}
				},
				None => inserts.push(fetched_ban.clone()),
			}
		}

		let inserted = inserts.len();
		let updated = field_updates.len() + job_updates.len();

		// Step 4: commit.
		self.store.save_changes(&inserts, &field_updates, &job_updates).await?;

		let mut deleted = 0;

		// Step 5: deletion phase, full refresh only.
		if is_complete_refresh {
			let fetched_identities: HashSet<&BanIdentity> = deduped_fetched.keys().collect();
			let missing: Vec<_> = stored_by_identity
				.iter()
				.filter(|(identity, _)| !fetched_identities.contains(identity))
				.map(|(_, ban)| ban.id.expect("stored ban always has an id"))
				.collect();

			if deduped_fetched.is_empty() && missing.len() > 1 {
				return Err(ReconcileError::SafetyAbort { stored: missing.len() });
			}

			if !missing.is_empty() {
				self.store.delete_bans(&missing).await?;
				deleted = missing.len();
			}
		}

		Ok(ReconcileReport { inserted, updated, deleted, duplicate_collisions })
	}
}

#[cfg(test)]
mod tests
{
	use std::collections::{BTreeSet, HashMap};

	use ban_model::{Ckey, JobName, ModeratorKey, NewBanSource, SourceBanId};
	use ban_store::MemoryStoreGateway;
	use time::OffsetDateTime;

	use super::*;

	struct FakeAdapter
	{
		sources: HashMap<String, NewBanSource>,
		supports_ban_ids: bool,
		fetched: Vec<Ban>,
	}

	#[async_trait::async_trait]
	impl SourceAdapter for FakeAdapter
	{
		fn adapter_name(&self) -> &str
		{
			"fake"
		}

		fn sources(&self) -> &HashMap<String, NewBanSource>
		{
			&self.sources
		}

		fn supports_ban_ids(&self) -> bool
		{
			self.supports_ban_ids
		}

		async fn fetch_all(&self, _: &CancellationToken) -> Result<Vec<Ban>, AdapterError>
		{
			Ok(self.fetched.clone())
		}

		async fn fetch_new(&self, _: &CancellationToken) -> Result<Vec<Ban>, AdapterError>
		{
			Ok(self.fetched.clone())
		}
	}

	fn adapter(supports_ban_ids: bool, fetched: Vec<Ban>) -> FakeAdapter
	{
		let mut sources = HashMap::new();
		sources.insert("test-source".to_owned(), NewBanSource { name: "test-source".to_owned() });

		FakeAdapter { sources, supports_ban_ids, fetched }
	}

	fn base_ban(source_ban_id: Option<u32>, reason: &str) -> Ban
	{
		Ban {
			id: None,
			source_id: None,
			source_name: "test-source".to_owned(),
			source_ban_id: source_ban_id.and_then(std::num::NonZero::new).map(SourceBanId::from),
			ckey: Ckey::from_raw("Alice"),
			ban_type: BanType::Server,
			banned_on: OffsetDateTime::UNIX_EPOCH,
			banned_by: ModeratorKey::from_raw("mod1"),
			expires: None,
			reason: reason.to_owned(),
			unbanned_by: None,
			jobs: BTreeSet::new(),
		}
	}

	#[tokio::test]
	async fn cold_start_id_supporting_source_inserts_with_canonical_ckey()
	{
		let store = MemoryStoreGateway::new();
		let reconciler = Reconciler::new(store);
		let adapter = adapter(true, vec![base_ban(Some(7), "x")]);

		let report =
			reconciler.reconcile(&adapter, false, &CancellationToken::new()).await.unwrap();

		assert_eq!(report.inserted, 1);
		assert_eq!(report.updated, 0);

		let sources = reconciler.store.list_sources().await.unwrap();
		let bans = reconciler.store.load_bans(&[sources[0].id]).await.unwrap();
		assert_eq!(bans[0].ckey.as_str(), "alice");
	}

	#[tokio::test]
	async fn reason_change_produces_one_update()
	{
		let store = MemoryStoreGateway::new();
		let reconciler = Reconciler::new(store);

		reconciler
			.reconcile(&adapter(true, vec![base_ban(Some(7), "x")]), false, &CancellationToken::new())
			.await
			.unwrap();

		let report = reconciler
			.reconcile(&adapter(true, vec![base_ban(Some(7), "y")]), false, &CancellationToken::new())
			.await
			.unwrap();

		assert_eq!(report.inserted, 0);
		assert_eq!(report.updated, 1);

		let sources = reconciler.store.list_sources().await.unwrap();
		let bans = reconciler.store.load_bans(&[sources[0].id]).await.unwrap();
		assert_eq!(bans[0].reason, "y");
	}

	#[tokio::test]
	async fn job_set_change_produces_one_update()
	{
		let mut stored = base_ban(None, "x");
		stored.ban_type = BanType::Job;
		stored.jobs = ["Captain", "HoS"].into_iter().map(JobName::new).collect();

		let mut changed = stored.clone();
		changed.jobs = ["Captain"].into_iter().map(JobName::new).collect();

		let store = MemoryStoreGateway::new();
		let reconciler = Reconciler::new(store);

		reconciler.reconcile(&adapter(false, vec![stored]), false, &CancellationToken::new()).await.unwrap();
		let report =
			reconciler.reconcile(&adapter(false, vec![changed]), false, &CancellationToken::new()).await.unwrap();

		assert_eq!(report.updated, 1);

		let sources = reconciler.store.list_sources().await.unwrap();
		let bans = reconciler.store.load_bans(&[sources[0].id]).await.unwrap();
		assert_eq!(bans[0].jobs, BTreeSet::from([JobName::new("Captain")]));
	}

	#[tokio::test]
	async fn unban_detected_canonicalizes_unbanned_by()
	{
		let store = MemoryStoreGateway::new();
		let reconciler = Reconciler::new(store);

		reconciler.reconcile(&adapter(true, vec![base_ban(Some(7), "x")]), false, &CancellationToken::new()).await.unwrap();

		let mut unbanned = base_ban(Some(7), "x");
		unbanned.unbanned_by = Some(ModeratorKey::from_raw("Mod1"));

		let report =
			reconciler.reconcile(&adapter(true, vec![unbanned]), false, &CancellationToken::new()).await.unwrap();

		assert_eq!(report.updated, 1);

		let sources = reconciler.store.list_sources().await.unwrap();
		let bans = reconciler.store.load_bans(&[sources[0].id]).await.unwrap();
		assert_eq!(bans[0].unbanned_by.as_ref().map(ModeratorKey::as_str), Some("mod1"));
	}

	#[tokio::test]
	async fn no_id_source_full_refresh_deletes_missing()
	{
		let mut a = base_ban(None, "a");
		a.banned_by = ModeratorKey::from_raw("modA");
		let mut b = base_ban(None, "b");
		b.banned_by = ModeratorKey::from_raw("modB");
		let mut c = base_ban(None, "c");
		c.banned_by = ModeratorKey::from_raw("modC");

		let store = MemoryStoreGateway::new();
		let reconciler = Reconciler::new(store);

		reconciler
			.reconcile(&adapter(false, vec![a.clone(), b.clone(), c]), true, &CancellationToken::new())
			.await
			.unwrap();

		let report = reconciler
			.reconcile(&adapter(false, vec![a, b]), true, &CancellationToken::new())
			.await
			.unwrap();

		assert_eq!(report.deleted, 1);

		let sources = reconciler.store.list_sources().await.unwrap();
		let bans = reconciler.store.load_bans(&[sources[0].id]).await.unwrap();
		assert_eq!(bans.len(), 2);
	}

	#[tokio::test]
	async fn safety_abort_on_empty_fetch_with_multiple_stored()
	{
		let mut a = base_ban(None, "a");
		a.banned_by = ModeratorKey::from_raw("modA");
		let mut b = base_ban(None, "b");
		b.banned_by = ModeratorKey::from_raw("modB");

		let store = MemoryStoreGateway::new();
		let reconciler = Reconciler::new(store);

		reconciler.reconcile(&adapter(false, vec![a, b]), true, &CancellationToken::new()).await.unwrap();

		let result =
			reconciler.reconcile(&adapter(false, vec![]), true, &CancellationToken::new()).await;

		assert!(matches!(result, Err(ReconcileError::SafetyAbort { stored: 2 })));

		let sources = reconciler.store.list_sources().await.unwrap();
		let bans = reconciler.store.load_bans(&[sources[0].id]).await.unwrap();
		assert_eq!(bans.len(), 2);
	}
}
