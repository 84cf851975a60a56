use std::fmt;

use futures_util::TryFutureExt;
use sqlx::any::{AnyConnectOptions, AnyPoolOptions};
use sqlx::{Any, Pool, Transaction};

use crate::config::ConnectOptions;
use crate::error::{StoreError, StoreResult};

/// A pool of connections to the ban store, dialect-agnostic via
/// [`sqlx::Any`].
///
/// One binary targets Postgres, MySQL or MariaDB depending on
/// `dbConfig.dbType` (§6); `sqlx::Any` is what lets that be one code path
/// instead of three.
#[must_use]
#[derive(Clone)]
pub struct ConnectionPool
{
	inner: Pool<Any>,
}

impl ConnectionPool
{
	/// Installs the sqlx `Any` drivers and opens a pool.
	///
	/// Must be called once per process before [`Self::connect`]; the binary
	/// crate's bootstrap does this at startup, as the single place a
	/// connection pool gets constructed.
	pub fn install_drivers()
	{
		sqlx::any::install_default_drivers();
	}

	/// Opens a connection pool for the given options.
	pub async fn connect(options: ConnectOptions<'_>) -> StoreResult<Self>
	{
		if options.url.scheme() != options.kind.url_scheme() {
			tracing::warn! {
				configured = ?options.kind,
				url_scheme = options.url.scheme(),
				"dbConfig.dbType does not match the connection string's scheme",
			};
		}

		let connect_options = AnyConnectOptions::from_url(options.url).map_err(StoreError::from)?;

		let pool_options = AnyPoolOptions::new().min_connections(options.min_connections.get());
		let pool_options = match options.max_connections {
			None => pool_options,
			Some(n) => pool_options.max_connections(n.get()),
		};

		pool_options
			.connect_with(connect_options)
			.map_ok(|inner| Self { inner })
			.map_err(StoreError::from)
			.await
	}

	/// Executes the given closure `f` inside the context of a transaction.
	///
	/// If the closure returns `Ok` the transaction is committed; if it
	/// returns `Err` the transaction is rolled back. This is what backs the
	/// reconciler's "commit accumulated inserts + field mutations in one
	/// transaction" step (§4.3 step 4) and the deletion phase's own
	/// transaction (step 5).
	#[tracing::instrument(level = "trace", skip_all)]
	pub async fn in_transaction<F, T>(&self, f: F) -> StoreResult<T>
	where
		F: for<'c> AsyncFnOnce(&mut Transaction<'c, Any>) -> StoreResult<T>,
	{
		let mut txn = self.inner.begin().map_err(StoreError::from).await?;

		match f(&mut txn).await {
			Ok(value) => {
				tracing::trace!("committing transaction");
				txn.commit().map_err(StoreError::from).await?;

				Ok(value)
			},
			Err(error) => {
				tracing::trace!("rolling back transaction");
				txn.rollback().map_err(StoreError::from).await?;

				Err(error)
			},
		}
	}

	pub(crate) fn raw(&self) -> &Pool<Any>
	{
		&self.inner
	}

	/// Closes all open connections.
	#[tracing::instrument(level = "trace")]
	pub async fn shutdown(self)
	{
		self.inner.close().await;
	}
}

impl fmt::Debug for ConnectionPool
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_tuple("ConnectionPool").finish_non_exhaustive()
	}
}
