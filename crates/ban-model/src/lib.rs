#![doc = include_str!("../README.md")]

mod ckey;
mod id;
mod identity;
mod job_ban;
mod source;
mod r#type;

pub use ckey::{Ckey, InvalidKeyError, ModeratorKey};
pub use id::{BanId, BanSourceId, SourceBanId};
pub use identity::BanIdentity;
pub use job_ban::{JobBan, JobName};
pub use source::{BanSource, NewBanSource};
pub use r#type::BanType;

use std::collections::BTreeSet;

use time::OffsetDateTime;

/// The canonical ban record.
///
/// See the module-level documentation of the crate for how a `Ban` relates
/// to its [`BanSource`] and [`JobBan`] rows.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ban
{
	/// Store-assigned primary key. `None` until the reconciler inserts the
	/// row; adapters never populate this themselves.
	pub id: Option<BanId>,

	/// The source this ban was fetched from.
	///
	/// Adapters populate [`Self::source_name`] only; the reconciler resolves
	/// it to a store-resident [`BanSourceId`] and fills this in.
	pub source_id: Option<BanSourceId>,

	/// The name of the [`BanSource`] this ban belongs to, as declared in the
	/// owning adapter's `sources` map. Always set by adapters.
	pub source_name: String,

	/// The upstream's own identifier for this ban, if the source supports
	/// stable IDs.
	pub source_ban_id: Option<SourceBanId>,

	/// The canonical player key.
	pub ckey: Ckey,

	/// Whether this is a server-wide ban or a job (role) ban.
	pub ban_type: BanType,

	/// When the ban was issued, always UTC.
	pub banned_on: OffsetDateTime,

	/// The canonical key of the moderator who issued the ban.
	pub banned_by: ModeratorKey,

	/// When the ban expires, always UTC. `None` means permanent.
	pub expires: Option<OffsetDateTime>,

	/// Free-text reason.
	pub reason: String,

	/// The canonical key of the moderator who lifted the ban, if any.
	pub unbanned_by: Option<ModeratorKey>,

	/// Non-empty iff `ban_type == BanType::Job`.
	pub jobs: BTreeSet<JobName>,
}

impl Ban
{
	/// Computes this ban's identity under the equality relation appropriate
	/// for a source that does (or does not) expose stable ban IDs.
	///
	/// See [`BanIdentity`] for what each variant compares on.
	///
	/// # Panics
	///
	/// Panics if `supports_ban_ids` is `true` but [`Self::source_id`] or
	/// [`Self::source_ban_id`] is `None`, or if `supports_ban_ids` is `false`
	/// but [`Self::source_id`] is `None`. Both are adapter-contract
	/// violations that should never reach the reconciler; see
	/// `SourceAdapter::fetch_all`/`fetch_new` in the `ban-sync` binary crate.
	#[must_use]
	pub fn identity(&self, supports_ban_ids: bool) -> BanIdentity
	{
		let source_id = self.source_id.expect("ban has not been rehomed onto a store BanSource");

		if supports_ban_ids {
			let source_ban_id = self
				.source_ban_id
				.expect("source declares supports_ban_ids but ban has no source_ban_id");

			BanIdentity::ById { source_id, source_ban_id }
		} else {
			BanIdentity::ByTuple {
				source_id,
				banned_on: self.banned_on,
				ban_type: self.ban_type,
				ckey: self.ckey.clone(),
				banned_by: self.banned_by.clone(),
				jobs: if self.ban_type == BanType::Job { self.jobs.clone() } else { BTreeSet::new() },
			}
		}
	}

	/// Replaces [`Self::ckey`], [`Self::banned_by`] and [`Self::unbanned_by`]
	/// with their canonical forms.
	///
	/// Idempotent: canonicalizing an already-canonical `Ban` is a no-op
	/// (invariant 2 in the data model, the canonicalization fixed point in
	/// the testable properties).
	pub fn canonicalize_keys(&mut self)
	{
		self.ckey = self.ckey.clone().into_canonical();
		self.banned_by = self.banned_by.clone().into_canonical();
		self.unbanned_by = self.unbanned_by.take().map(ModeratorKey::into_canonical);
	}
}
