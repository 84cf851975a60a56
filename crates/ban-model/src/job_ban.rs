use crate::BanId;

/// The name of a job/role a [`BanType::Job`] ban applies to.
///
/// [`BanType::Job`]: crate::BanType::Job
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct JobName(String);

impl JobName
{
	#[must_use]
	pub fn new(value: impl Into<String>) -> Self
	{
		Self(value.into())
	}

	#[must_use]
	pub fn as_str(&self) -> &str
	{
		&self.0
	}
}

/// A single `(banId, job)` row.
///
/// Jobs are a set: order is irrelevant and duplicates are forbidden, which is
/// why [`crate::Ban::jobs`] is a `BTreeSet<JobName>` rather than a `Vec`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JobBan
{
	pub ban_id: BanId,
	pub job: JobName,
}
