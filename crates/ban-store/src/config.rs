use std::num::NonZero;

use url::Url;

/// The dialect of the backing store, as selected by `dbConfig.dbType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub enum DbKind
{
	Postgres,
	MySql,
	#[cfg_attr(feature = "serde", serde(rename = "MariaDB"))]
	MariaDb,
}

impl DbKind
{
	/// Returns the URL scheme `sqlx::AnyPool` expects for this dialect.
	///
	/// MariaDB speaks the MySQL wire protocol, so it reuses the `mysql://`
	/// scheme; the distinction only matters to operators choosing a
	/// connection string, not to the driver.
	#[must_use]
	pub const fn url_scheme(self) -> &'static str
	{
		match self {
			Self::Postgres => "postgres",
			Self::MySql | Self::MariaDb => "mysql",
		}
	}
}

/// Parameters for [`crate::ConnectionPool::connect`].
#[derive(Debug, Clone, bon::Builder)]
pub struct ConnectOptions<'a>
{
	/// The dialect to connect as.
	pub kind: DbKind,

	/// The connection URI.
	pub url: &'a Url,

	/// The minimum number of connections to keep in the pool.
	#[builder(default = NonZero::<u32>::MIN)]
	pub min_connections: NonZero<u32>,

	/// The maximum number of connections to keep in the pool.
	pub max_connections: Option<NonZero<u32>>,
}
