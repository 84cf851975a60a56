use std::collections::{BTreeSet, HashMap};
use std::num::NonZero;
use std::sync::Mutex;

use async_trait::async_trait;
use ban_model::{Ban, BanId, BanSource, BanSourceId, BanType, Ckey, SourceBanId};

use crate::error::StoreResult;
use crate::gateway::{FieldUpdate, JobSetUpdate, StoreGateway};

/// An in-memory [`StoreGateway`] double for tests.
///
/// Mirrors the behaviour `SqlStoreGateway` is expected to have without a
/// running database: `save_changes`/`delete_bans` are all-or-nothing in the
/// sense that nothing is `.await`ed mid-mutation, but no attempt is made to
/// reproduce genuine rollback-on-error semantics since nothing here can
/// actually fail.
#[derive(Debug, Default)]
pub struct MemoryStoreGateway
{
	state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State
{
	sources: HashMap<String, BanSource>,
	next_source_id: u32,
	bans: HashMap<BanId, Ban>,
	next_ban_id: u32,
}

impl MemoryStoreGateway
{
	#[must_use]
	pub fn new() -> Self
	{
		Self::default()
	}

	fn next_source_id(state: &mut State) -> BanSourceId
	{
		state.next_source_id += 1;
		BanSourceId::from(NonZero::new(state.next_source_id).expect("counter starts at 1"))
	}

	fn next_ban_id(state: &mut State) -> BanId
	{
		state.next_ban_id += 1;
		BanId::from(NonZero::new(state.next_ban_id).expect("counter starts at 1"))
	}
}

#[async_trait]
impl StoreGateway for MemoryStoreGateway
{
	async fn ensure_sources(&self, names: &[String]) -> StoreResult<HashMap<String, BanSource>>
	{
		let mut state = self.state.lock().expect("lock poisoned");
		let mut out = HashMap::with_capacity(names.len());

		for name in names {
			if let Some(source) = state.sources.get(name) {
				out.insert(name.clone(), source.clone());
				continue;
			}

			let id = Self::next_source_id(&mut state);
			let source = BanSource { id, name: name.clone() };
			state.sources.insert(name.clone(), source.clone());
			out.insert(name.clone(), source);
		}

		Ok(out)
	}

	async fn load_bans(&self, source_ids: &[BanSourceId]) -> StoreResult<Vec<Ban>>
	{
		let state = self.state.lock().expect("lock poisoned");

		Ok(state
			.bans
			.values()
			.filter(|ban| ban.source_id.is_some_and(|id| source_ids.contains(&id)))
			.cloned()
			.collect())
	}

	async fn save_changes(
		&self,
		inserts: &[Ban],
		field_updates: &[FieldUpdate],
		job_updates: &[JobSetUpdate],
	) -> StoreResult<Vec<BanId>>
	{
		let mut state = self.state.lock().expect("lock poisoned");
		let mut inserted_ids = Vec::with_capacity(inserts.len());

		for ban in inserts {
			let id = Self::next_ban_id(&mut state);
			let mut ban = ban.clone();
			ban.id = Some(id);
			state.bans.insert(id, ban);
			inserted_ids.push(id);
		}

		for update in field_updates {
			if let Some(ban) = state.bans.get_mut(&update.ban_id) {
				ban.reason = update.reason.clone();
				ban.expires = update.expires;
				ban.unbanned_by = update.unbanned_by.clone();
			}
		}

		for update in job_updates {
			if let Some(ban) = state.bans.get_mut(&update.ban_id) {
				ban.jobs = update.jobs.clone();
			}
		}

		Ok(inserted_ids)
	}

	async fn delete_bans(&self, ban_ids: &[BanId]) -> StoreResult<()>
	{
		let mut state = self.state.lock().expect("lock poisoned");

		for id in ban_ids {
			state.bans.remove(id);
		}

		Ok(())
	}

	async fn fetch_bans_by_ckey(&self, ckey: &Ckey) -> StoreResult<Vec<Ban>>
	{
		let state = self.state.lock().expect("lock poisoned");

		Ok(state.bans.values().filter(|ban| &ban.ckey == ckey).cloned().collect())
	}

	async fn fetch_ban_by_source(
		&self,
		source_id: BanSourceId,
		source_ban_id: SourceBanId,
	) -> StoreResult<Option<Ban>>
	{
		let state = self.state.lock().expect("lock poisoned");

		Ok(state
			.bans
			.values()
			.find(|ban| ban.source_id == Some(source_id) && ban.source_ban_id == Some(source_ban_id))
			.cloned())
	}

	async fn list_sources(&self) -> StoreResult<Vec<BanSource>>
	{
		let state = self.state.lock().expect("lock poisoned");
		let mut sources: Vec<_> = state.sources.values().cloned().collect();
		sources.sort_by(|a, b| a.name.cmp(&b.name));

		Ok(sources)
	}
}

#[cfg(test)]
mod tests
{
	use time::OffsetDateTime;

	use super::*;

	fn sample_ban(source_id: BanSourceId) -> Ban
	{
		Ban {
			id: None,
			source_id: Some(source_id),
			source_name: "test".to_owned(),
			source_ban_id: None,
			ckey: Ckey::from_raw("alice123"),
			ban_type: BanType::Server,
			banned_on: OffsetDateTime::UNIX_EPOCH,
			banned_by: ban_model::ModeratorKey::from_raw("modbob"),
			expires: None,
			reason: "griefing".to_owned(),
			unbanned_by: None,
			jobs: BTreeSet::new(),
		}
	}

	#[tokio::test]
	async fn ensure_sources_is_idempotent()
	{
		let gateway = MemoryStoreGateway::new();
		let names = vec!["ss13.example".to_owned()];

		let first = gateway.ensure_sources(&names).await.unwrap();
		let second = gateway.ensure_sources(&names).await.unwrap();

		assert_eq!(first["ss13.example"].id, second["ss13.example"].id);
	}

	#[tokio::test]
	async fn save_changes_round_trips_through_load_bans()
	{
		let gateway = MemoryStoreGateway::new();
		let sources = gateway.ensure_sources(&["ss13.example".to_owned()]).await.unwrap();
		let source_id = sources["ss13.example"].id;

		let ids = gateway
			.save_changes(&[sample_ban(source_id)], &[], &[])
			.await
			.unwrap();

		let loaded = gateway.load_bans(&[source_id]).await.unwrap();

		assert_eq!(loaded.len(), 1);
		assert_eq!(loaded[0].id, Some(ids[0]));
	}
}
