use std::num::NonZero;

macro_rules! opaque_id {
	($name:ident) => {
		#[derive(
			Debug,
			derive_more::Display,
			Clone,
			Copy,
			PartialEq,
			Eq,
			PartialOrd,
			Ord,
			Hash,
			derive_more::From,
			derive_more::Into,
		)]
		#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
		#[cfg_attr(feature = "serde", serde(transparent))]
		#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
		#[cfg_attr(feature = "sqlx", sqlx(transparent))]
		pub struct $name(NonZero<u32>);

		impl $name
		{
			#[must_use]
			pub const fn get(self) -> u32
			{
				self.0.get()
			}
		}
	};
}

opaque_id!(BanId);
opaque_id!(BanSourceId);
opaque_id!(SourceBanId);
