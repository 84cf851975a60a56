mod paginated_json;
mod registry;

use std::collections::HashMap;

use async_trait::async_trait;
use ban_model::NewBanSource;
use tokio_util::sync::CancellationToken;

pub(crate) use self::paginated_json::PaginatedJsonAdapter;
pub(crate) use self::registry::registry;

/// A layer-§7 error from a [`SourceAdapter`] (§4.2).
///
/// `SourceUnavailable` is recovered locally by the scheduler (log + skip);
/// `MalformedPayload` is fatal for the job but not for the process.
#[derive(Debug, thiserror::Error)]
pub(crate) enum AdapterError
{
	#[error("source unavailable: {0}")]
	SourceUnavailable(#[from] reqwest::Error),

	#[error("malformed payload from upstream: {0}")]
	MalformedPayload(#[from] serde_json::Error),

	#[error("fetch was cancelled")]
	Cancelled,
}

/// Fetches raw upstream data and yields canonical [`ban_model::Ban`] values
/// (§4.2).
///
/// An adapter may own more than one [`ban_model::BanSource`]; `sources`
/// enumerates all of them by name. `supports_ban_ids` selects which
/// [`ban_model::BanIdentity`] variant the reconciler uses to match fetched
/// bans against stored ones.
#[async_trait]
pub(crate) trait SourceAdapter: Send + Sync
{
	/// A human-readable identifier for logging; not a `BanSource` name.
	fn adapter_name(&self) -> &str;

	/// Every `BanSource` this adapter owns, keyed by name.
	fn sources(&self) -> &HashMap<String, NewBanSource>;

	/// Whether the upstream exposes a stable per-ban identifier.
	fn supports_ban_ids(&self) -> bool;

	/// Returns every currently-active and historical ban the upstream
	/// exposes. May be expensive; used on full refreshes.
	async fn fetch_all(&self, cancellation: &CancellationToken) -> Result<Vec<ban_model::Ban>, AdapterError>;

	/// Returns a superset of recently-changed bans. Overshooting is safe —
	/// the reconciler is idempotent on identical inputs.
	async fn fetch_new(&self, cancellation: &CancellationToken) -> Result<Vec<ban_model::Ban>, AdapterError>;
}
