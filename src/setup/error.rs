//! Errors that can occur while initializing everything.

use thiserror::Error;

/// The different errors that can happen in [`run()`].
///
/// [`run()`]: crate::run
#[derive(Debug, Error)]
pub(crate) enum Error
{
	/// Something went wrong connecting to the database.
	#[error("failed to setup database: {0}")]
	Database(#[from] ban_store::StoreError),

	/// A configured source adapter could not be constructed.
	#[error("failed to setup source adapters: {0}")]
	Adapters(#[source] color_eyre::eyre::Error),
}
