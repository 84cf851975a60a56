use std::collections::BTreeSet;

use time::OffsetDateTime;

use crate::{BanSourceId, BanType, Ckey, JobName, ModeratorKey, SourceBanId};

/// The identity-equality relation used to match a fetched [`crate::Ban`]
/// against a stored one (§4.1).
///
/// Which variant a given ban uses is a property of its *source*, not of the
/// individual ban: [`crate::Ban::identity`] picks the variant based on
/// whether the owning adapter declares `supports_ban_ids`. Two bans from
/// different sources are always distinct regardless of variant, since
/// `source_id` participates in both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BanIdentity
{
	/// Used when the source exposes a stable upstream ban ID.
	ById
	{
		source_id: BanSourceId,
		source_ban_id: SourceBanId,
	},

	/// Used when the source does not expose stable IDs. `jobs` only
	/// participates in the comparison when `ban_type == BanType::Job`;
	/// [`crate::Ban::identity`] is responsible for emptying it out
	/// otherwise, so that a server ban and a job ban can never collide
	/// here.
	ByTuple
	{
		source_id: BanSourceId,
		banned_on: OffsetDateTime,
		ban_type: BanType,
		ckey: Ckey,
		banned_by: ModeratorKey,
		jobs: BTreeSet<JobName>,
	},
}

#[cfg(test)]
mod tests
{
	use std::collections::HashSet;

	use super::*;

	#[test]
	fn by_id_ignores_everything_but_source_and_upstream_id()
	{
		let a = BanIdentity::ById {
			source_id: BanSourceId::from(std::num::NonZero::new(1).expect("nonzero")),
			source_ban_id: SourceBanId::from(std::num::NonZero::new(7).expect("nonzero")),
		};
		let b = a.clone();

		assert_eq!(a, b);

		let mut set = HashSet::new();
		set.insert(a);
		assert!(set.contains(&b));
	}
}
