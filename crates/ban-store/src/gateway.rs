use std::collections::{BTreeSet, HashMap};
use std::fmt;

use async_trait::async_trait;
use ban_model::{Ban, BanId, BanSource, BanSourceId, BanType, Ckey, JobName, ModeratorKey, SourceBanId};
use sqlx::{Any, Row, Transaction};
use time::OffsetDateTime;

use crate::config::DbKind;
use crate::error::StoreResult;
use crate::pool::ConnectionPool;

/// A `reason`/`expires`/`unbannedBy` overwrite for an existing [`Ban`] (§4.3
/// step 3, first bullet).
#[derive(Debug, Clone)]
pub struct FieldUpdate
{
	pub ban_id: BanId,
	pub reason: String,
	pub expires: Option<OffsetDateTime>,
	pub unbanned_by: Option<ModeratorKey>,
}

/// A `jobBans` replacement for an existing job [`Ban`] (§4.3 step 3, second
/// bullet). Counted as a distinct update from a [`FieldUpdate`] on the same
/// ban, even if both occur on the same reconciliation pass.
#[derive(Debug, Clone)]
pub struct JobSetUpdate
{
	pub ban_id: BanId,
	pub jobs: BTreeSet<JobName>,
}

/// Typed, transactional read/write access to the persistent ban store.
///
/// The reconciler programs against this trait, never against
/// [`SqlStoreGateway`] directly, so its six §8 test scenarios can run
/// against an in-memory double instead of a real database.
#[async_trait]
pub trait StoreGateway: fmt::Debug + Send + Sync
{
	/// Ensures a [`BanSource`] row exists for every name in `names`,
	/// creating any that are missing, and returns all of them keyed by
	/// name (§4.3 step 1).
	async fn ensure_sources(&self, names: &[String]) -> StoreResult<HashMap<String, BanSource>>;

	/// Loads every stored [`Ban`] (with `jobs` hydrated) belonging to any of
	/// `source_ids`.
	async fn load_bans(&self, source_ids: &[BanSourceId]) -> StoreResult<Vec<Ban>>;

	/// Commits the reconciler's accumulated inserts and field/job-set
	/// updates in a single transaction (§4.3 step 4). Returns the
	/// store-assigned IDs of the newly inserted bans, in the same order as
	/// `inserts`.
	async fn save_changes(
		&self,
		inserts: &[Ban],
		field_updates: &[FieldUpdate],
		job_updates: &[JobSetUpdate],
	) -> StoreResult<Vec<BanId>>;

	/// Deletes the given bans in a single transaction (§4.3 step 5, after
	/// the safety gate has already passed).
	async fn delete_bans(&self, ban_ids: &[BanId]) -> StoreResult<()>;

	/// Downstream read query: all bans for a canonical `ckey`.
	async fn fetch_bans_by_ckey(&self, ckey: &Ckey) -> StoreResult<Vec<Ban>>;

	/// Downstream read query: the ban with a given `(source, upstream id)`,
	/// if any.
	async fn fetch_ban_by_source(
		&self,
		source_id: BanSourceId,
		source_ban_id: SourceBanId,
	) -> StoreResult<Option<Ban>>;

	/// Downstream read query: every known [`BanSource`].
	async fn list_sources(&self) -> StoreResult<Vec<BanSource>>;
}

/// The production [`StoreGateway`], backed by [`ConnectionPool`].
#[derive(Debug, Clone)]
pub struct SqlStoreGateway
{
	pool: ConnectionPool,
	kind: DbKind,
}

impl SqlStoreGateway
{
	#[must_use]
	pub const fn new(pool: ConnectionPool, kind: DbKind) -> Self
	{
		Self { pool, kind }
	}

	/// Inserts a single `bans` row and returns its assigned ID.
	///
	/// Postgres supports `RETURNING`; plain MySQL does not, so on that
	/// dialect (and on MariaDB, which supports both) we fall back to
	/// `LAST_INSERT_ID()` read back on the same connection immediately
	/// after the insert. This is the one place the three dialects actually
	/// diverge — everything else in this gateway is portable SQL.
	async fn insert_ban(&self, txn: &mut Transaction<'_, Any>, ban: &Ban) -> StoreResult<BanId>
	{
		let source_id = ban.source_id.expect("ban has been rehomed onto a store BanSource");

		let row_id: i64 = match self.kind {
			DbKind::Postgres => {
				sqlx::query(
					"INSERT INTO bans \
					 (source_id, source_ban_id, ckey, ban_type, banned_on, banned_by, expires, reason, unbanned_by) \
					 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
				)
				.bind(source_id.get())
				.bind(ban.source_ban_id.map(ban_model::SourceBanId::get))
				.bind(ban.ckey.as_str())
				.bind(ban_type_str(ban.ban_type))
				.bind(ban.banned_on)
				.bind(ban.banned_by.as_str())
				.bind(ban.expires)
				.bind(&ban.reason)
				.bind(ban.unbanned_by.as_ref().map(ModeratorKey::as_str))
				.fetch_one(&mut **txn)
				.await?
				.try_get("id")?
			},
			DbKind::MySql | DbKind::MariaDb => {
				sqlx::query(
					"INSERT INTO bans \
					 (source_id, source_ban_id, ckey, ban_type, banned_on, banned_by, expires, reason, unbanned_by) \
					 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
				)
				.bind(source_id.get())
				.bind(ban.source_ban_id.map(ban_model::SourceBanId::get))
				.bind(ban.ckey.as_str())
				.bind(ban_type_str(ban.ban_type))
				.bind(ban.banned_on)
				.bind(ban.banned_by.as_str())
				.bind(ban.expires)
				.bind(&ban.reason)
				.bind(ban.unbanned_by.as_ref().map(ModeratorKey::as_str))
				.execute(&mut **txn)
				.await?;

				sqlx::query("SELECT LAST_INSERT_ID() AS id")
					.fetch_one(&mut **txn)
					.await?
					.try_get("id")?
			},
		};

		let row_id = u32::try_from(row_id).map_err(|error| sqlx::Error::ColumnDecode {
			index: "id".to_owned(),
			source: Box::new(error),
		})?;

		Ok(BanId::from(std::num::NonZero::new(row_id).expect("store-assigned id is nonzero")))
	}
}

const fn ban_type_str(ban_type: BanType) -> &'static str
{
	match ban_type {
		BanType::Server => "server",
		BanType::Job => "job",
	}
}

#[async_trait]
impl StoreGateway for SqlStoreGateway
{
	async fn ensure_sources(&self, names: &[String]) -> StoreResult<HashMap<String, BanSource>>
	{
		self.pool
			.in_transaction(async |txn| {
				let mut sources = HashMap::with_capacity(names.len());

				for name in names {
					sqlx::query(
						"INSERT INTO ban_sources (name) \
						 SELECT ? WHERE NOT EXISTS (SELECT 1 FROM ban_sources WHERE name = ?)",
					)
					.bind(name)
					.bind(name)
					.execute(&mut **txn)
					.await?;

					let row = sqlx::query("SELECT id, name FROM ban_sources WHERE name = ?")
						.bind(name)
						.fetch_one(&mut **txn)
						.await?;

					let id: i64 = row.try_get("id")?;
					let id = u32::try_from(id).map_err(|error| sqlx::Error::ColumnDecode {
						index: "id".into(),
						source: Box::new(error),
					})?;

					sources.insert(
						name.clone(),
						BanSource {
							id: ban_model::BanSourceId::from(
								std::num::NonZero::new(id).expect("store-assigned id is nonzero"),
							),
							name: row.try_get("name")?,
						},
					);
				}

				Ok(sources)
			})
			.await
	}

	async fn load_bans(&self, source_ids: &[BanSourceId]) -> StoreResult<Vec<Ban>>
	{
		if source_ids.is_empty() {
			return Ok(Vec::new());
		}

		let placeholders = source_ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
		let sql = format!(
			"SELECT id, source_id, source_ban_id, ckey, ban_type, banned_on, banned_by, expires, \
			 reason, unbanned_by FROM bans WHERE source_id IN ({placeholders})"
		);

		let mut query = sqlx::query(&sql);
		for id in source_ids {
			query = query.bind(id.get());
		}

		let rows = query.fetch_all(self.pool.raw()).await?;
		let mut bans = Vec::with_capacity(rows.len());

		for row in rows {
			bans.push(row_to_ban(&row)?);
		}

		for ban in &mut bans {
			if ban.ban_type == BanType::Job {
				let ban_id = ban.id.expect("loaded ban always has an id");
				let job_rows = sqlx::query("SELECT job FROM job_bans WHERE ban_id = ?")
					.bind(ban_id.get())
					.fetch_all(self.pool.raw())
					.await?;

				ban.jobs = job_rows
					.into_iter()
					.map(|row| row.try_get::<String, _>("job").map(JobName::new))
					.collect::<Result<_, _>>()?;
			}
		}

		Ok(bans)
	}

	async fn save_changes(
		&self,
		inserts: &[Ban],
		field_updates: &[FieldUpdate],
		job_updates: &[JobSetUpdate],
	) -> StoreResult<Vec<BanId>>
	{
		self.pool
			.in_transaction(async |txn| {
				let mut inserted_ids = Vec::with_capacity(inserts.len());

				for ban in inserts {
					let ban_id = self.insert_ban(txn, ban).await?;

					for job in &ban.jobs {
						sqlx::query("INSERT INTO job_bans (ban_id, job) VALUES (?, ?)")
							.bind(ban_id.get())
							.bind(job.as_str())
							.execute(&mut **txn)
							.await?;
					}

					inserted_ids.push(ban_id);
				}

				for update in field_updates {
					sqlx::query(
						"UPDATE bans SET reason = ?, expires = ?, unbanned_by = ? WHERE id = ?",
					)
					.bind(&update.reason)
					.bind(update.expires)
					.bind(update.unbanned_by.as_ref().map(ModeratorKey::as_str))
					.bind(update.ban_id.get())
					.execute(&mut **txn)
					.await?;
				}

				for update in job_updates {
					sqlx::query("DELETE FROM job_bans WHERE ban_id = ?")
						.bind(update.ban_id.get())
						.execute(&mut **txn)
						.await?;

					for job in &update.jobs {
						sqlx::query("INSERT INTO job_bans (ban_id, job) VALUES (?, ?)")
							.bind(update.ban_id.get())
							.bind(job.as_str())
							.execute(&mut **txn)
							.await?;
					}
				}

				Ok(inserted_ids)
			})
			.await
	}

	async fn delete_bans(&self, ban_ids: &[BanId]) -> StoreResult<()>
	{
		if ban_ids.is_empty() {
			return Ok(());
		}

		self.pool
			.in_transaction(async |txn| {
				let placeholders = ban_ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");

				sqlx::query(&format!("DELETE FROM job_bans WHERE ban_id IN ({placeholders})"))
					.execute(&mut **txn)
					.await?;

				let mut query =
					sqlx::query(&format!("DELETE FROM bans WHERE id IN ({placeholders})"));
				for id in ban_ids {
					query = query.bind(id.get());
				}
				query.execute(&mut **txn).await?;

				Ok(())
			})
			.await
	}

	async fn fetch_bans_by_ckey(&self, ckey: &Ckey) -> StoreResult<Vec<Ban>>
	{
		let rows = sqlx::query(
			"SELECT id, source_id, source_ban_id, ckey, ban_type, banned_on, banned_by, expires, \
			 reason, unbanned_by FROM bans WHERE ckey = ?",
		)
		.bind(ckey.as_str())
		.fetch_all(self.pool.raw())
		.await?;

		rows.iter().map(row_to_ban).collect()
	}

	async fn fetch_ban_by_source(
		&self,
		source_id: BanSourceId,
		source_ban_id: SourceBanId,
	) -> StoreResult<Option<Ban>>
	{
		let row = sqlx::query(
			"SELECT id, source_id, source_ban_id, ckey, ban_type, banned_on, banned_by, expires, \
			 reason, unbanned_by FROM bans WHERE source_id = ? AND source_ban_id = ?",
		)
		.bind(source_id.get())
		.bind(source_ban_id.get())
		.fetch_optional(self.pool.raw())
		.await?;

		row.as_ref().map(row_to_ban).transpose()
	}

	async fn list_sources(&self) -> StoreResult<Vec<BanSource>>
	{
		let rows = sqlx::query("SELECT id, name FROM ban_sources ORDER BY name")
			.fetch_all(self.pool.raw())
			.await?;

		rows.into_iter()
			.map(|row| {
				let id: i64 = row.try_get("id")?;
				let id = u32::try_from(id).map_err(|error| sqlx::Error::ColumnDecode {
					index: "id".into(),
					source: Box::new(error),
				})?;

				Ok(BanSource {
					id: BanSourceId::from(std::num::NonZero::new(id).expect("nonzero id")),
					name: row.try_get("name")?,
				})
			})
			.collect::<Result<_, sqlx::Error>>()
			.map_err(crate::error::StoreError::from)
	}
}

fn row_to_ban(row: &sqlx::any::AnyRow) -> StoreResult<Ban>
{
	let id: i64 = row.try_get("id")?;
	let source_id: i64 = row.try_get("source_id")?;
	let source_ban_id: Option<i64> = row.try_get("source_ban_id")?;
	let ban_type: String = row.try_get("ban_type")?;

	let id = u32::try_from(id)
		.map_err(|error| sqlx::Error::ColumnDecode { index: "id".into(), source: Box::new(error) })?;
	let source_id = u32::try_from(source_id).map_err(|error| sqlx::Error::ColumnDecode {
		index: "source_id".into(),
		source: Box::new(error),
	})?;

	Ok(Ban {
		id: Some(BanId::from(std::num::NonZero::new(id).expect("nonzero id"))),
		source_id: Some(BanSourceId::from(
			std::num::NonZero::new(source_id).expect("nonzero source id"),
		)),
		source_name: String::new(),
		source_ban_id: source_ban_id
			.map(|raw| {
				u32::try_from(raw).map_err(|error| sqlx::Error::ColumnDecode {
					index: "source_ban_id".into(),
					source: Box::new(error),
				})
			})
			.transpose()?
			.and_then(std::num::NonZero::new)
			.map(SourceBanId::from),
		ckey: Ckey::from_raw(row.try_get::<String, _>("ckey")?),
		ban_type: if ban_type == "job" { BanType::Job } else { BanType::Server },
		banned_on: row.try_get("banned_on")?,
		banned_by: ModeratorKey::from_raw(row.try_get::<String, _>("banned_by")?),
		expires: row.try_get("expires")?,
		reason: row.try_get("reason")?,
		unbanned_by: row
			.try_get::<Option<String>, _>("unbanned_by")?
			.map(ModeratorKey::from_raw),
		jobs: BTreeSet::new(),
	})
}
