/// Lowercases `value` and strips every character that is not in `[a-z0-9]`.
///
/// Idempotent: `canonicalize(canonicalize(x)) == canonicalize(x)`, since the
/// output only ever contains characters the predicate already accepts.
fn canonicalize(value: &str) -> String
{
	value
		.chars()
		.flat_map(char::to_lowercase)
		.filter(char::is_ascii_alphanumeric)
		.collect()
}

/// A canonical player key (see the GLOSSARY entry for `ckey`).
///
/// Adapters may construct a [`Ckey`] from a raw upstream value via
/// [`Ckey::from_raw`]; nothing about the type itself guarantees the value is
/// canonical until [`Ckey::canonicalize`] has been called on it. The
/// reconciler calls `Ban::canonicalize_keys` before a `Ckey` is compared or
/// persisted, so by the time one reaches the store it always is.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Ckey(String);

impl Ckey
{
	/// Wraps a possibly-non-canonical value as it came from an upstream
	/// source.
	#[must_use]
	pub fn from_raw(value: impl Into<String>) -> Self
	{
		Self(value.into())
	}

	/// Returns the canonical form of this key.
	#[must_use]
	pub fn into_canonical(self) -> Self
	{
		Self(canonicalize(&self.0))
	}

	/// Returns whether this key is already in canonical form.
	#[must_use]
	pub fn is_canonical(&self) -> bool
	{
		canonicalize(&self.0) == self.0
	}

	#[must_use]
	pub fn as_str(&self) -> &str
	{
		&self.0
	}
}

/// A canonical moderator key, constructed and validated identically to
/// [`Ckey`] but kept as a distinct type so the two are never accidentally
/// interchanged (e.g. passing a `bannedBy` where a `ckey` filter was meant).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct ModeratorKey(String);

impl ModeratorKey
{
	#[must_use]
	pub fn from_raw(value: impl Into<String>) -> Self
	{
		Self(value.into())
	}

	#[must_use]
	pub fn into_canonical(self) -> Self
	{
		Self(canonicalize(&self.0))
	}

	#[must_use]
	pub fn is_canonical(&self) -> bool
	{
		canonicalize(&self.0) == self.0
	}

	#[must_use]
	pub fn as_str(&self) -> &str
	{
		&self.0
	}
}

/// Returned when a canonical key fails a structural check (currently unused
/// by [`Ckey`]/[`ModeratorKey`] directly, but kept so call sites that parse
/// keys out of untrusted request input have a typed error to propagate).
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("key is empty after canonicalization")]
pub struct InvalidKeyError;

#[cfg(test)]
mod tests
{
	use proptest::prelude::*;

	use super::*;

	#[test]
	fn strips_non_alphanumeric_and_lowercases()
	{
		let ckey = Ckey::from_raw("Alice-123!").into_canonical();

		assert_eq!(ckey.as_str(), "alice123");
	}

	#[test]
	fn canonicalization_is_a_fixed_point()
	{
		let once = Ckey::from_raw("M1xed_CASE--ckey").into_canonical();
		let twice = once.clone().into_canonical();

		assert_eq!(once, twice);
	}

	#[test]
	fn already_canonical_is_reported_as_such()
	{
		let ckey = Ckey::from_raw("alice123");

		assert!(ckey.is_canonical());
	}

	proptest! {
		#[test]
		fn canonicalization_is_a_fixed_point_for_arbitrary_strings(raw in ".*")
		{
			let once = Ckey::from_raw(raw).into_canonical();
			let twice = once.clone().into_canonical();

			prop_assert_eq!(once, twice);
		}

		#[test]
		fn canonical_output_is_always_reported_as_canonical(raw in ".*")
		{
			prop_assert!(Ckey::from_raw(raw).into_canonical().is_canonical());
		}
	}
}
