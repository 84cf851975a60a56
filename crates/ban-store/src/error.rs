pub type StoreResult<T> = Result<T, StoreError>;

/// An error returned by the store (§7's `StoreError` taxonomy entry).
///
/// Every variant is fatal for the job that triggered it: the caller rolls
/// back whatever transaction was open and retries on the next scheduled
/// trigger. Nothing in this crate decides *that* policy — it belongs to the
/// scheduler — this type only carries enough information to log it.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
#[display("database error: {_0}")]
pub struct StoreError(sqlx::Error);

impl StoreError
{
	/// Returns whether this error is a unique-key violation mentioning
	/// `key`.
	///
	/// Useful when a concurrent insert races on `(sourceId, sourceBanId)`
	/// uniqueness (invariant 1): that case should be treated as "already
	/// there", not as a hard failure.
	#[must_use]
	pub fn is_unique_violation(&self, key: &str) -> bool
	{
		self.0
			.as_database_error()
			.is_some_and(|error| error.is_unique_violation() && error.message().contains(key))
	}
}
