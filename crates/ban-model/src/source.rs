use crate::BanSourceId;

/// A logical upstream origin of bans (see the GLOSSARY entry for
/// `BanSource`).
///
/// Created lazily on the first scheduler tick for an adapter that declares
/// it; never mutated and never deleted afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BanSource
{
	pub id: BanSourceId,
	pub name: String,
}

/// A [`BanSource`] skeleton declared by an adapter, before the store has
/// assigned it an ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBanSource
{
	pub name: String,
}
