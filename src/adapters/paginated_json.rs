use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use ban_model::{Ban, BanType, Ckey, JobName, ModeratorKey, NewBanSource};
use futures_util::StreamExt;
use futures_util::stream;
use serde::Deserialize;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{AdapterError, SourceAdapter};

/// Bounded fan-out for paginated fetches (§4.2: "recommended ≤ 6 concurrent
/// requests per adapter").
const MAX_CONCURRENT_PAGE_REQUESTS: usize = 6;

/// Per-request timeout (§5: "recommended 30s").
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The generic paginated-JSON upstream contract from §6:
///
/// ```text
/// GET {base_url}/bans/{perPage}/{page}
/// 200 → { "value": { "bans": [ ... ], "lastPage": <int> } }
/// ```
///
/// The documented payload carries no stable per-ban identifier, so this
/// adapter declares `supports_ban_ids = false` and the reconciler falls back
/// to tuple identity (§4.1).
#[derive(Debug)]
pub(crate) struct PaginatedJsonAdapter
{
	source_name: String,
	sources: HashMap<String, NewBanSource>,
	base_url: Url,
	per_page: u32,
	client: reqwest::Client,
}

impl PaginatedJsonAdapter
{
	/// Builds an adapter instance for a single `sources.<name>` config
	/// entry. The `reqwest::Client` (and its 30s timeout) is constructed
	/// once here rather than per-request.
	pub(crate) fn new(source_name: String, base_url: Url, per_page: u32) -> reqwest::Result<Self>
	{
		let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
		let mut sources = HashMap::with_capacity(1);
		sources.insert(source_name.clone(), NewBanSource { name: source_name.clone() });

		Ok(Self { source_name, sources, base_url, per_page, client })
	}

	fn page_url(&self, page: u32) -> Url
	{
		let mut url = self.base_url.clone();
		url.path_segments_mut()
			.unwrap_or_else(|()| panic!("base url {} cannot be a base", self.base_url))
			.pop_if_empty()
			.extend(["bans", &self.per_page.to_string(), &page.to_string()]);

		url
	}

	async fn fetch_page(&self, page: u32) -> Result<PageEnvelope, AdapterError>
	{
		let response = self.client.get(self.page_url(page)).send().await?.error_for_status()?;
		let bytes = response.bytes().await?;

		Ok(serde_json::from_slice(&bytes)?)
	}

	async fn fetch_pages(
		&self,
		cancellation: &CancellationToken,
		only_first_page: bool,
	) -> Result<Vec<Ban>, AdapterError>
	{
		let first = tokio::select! {
			result = self.fetch_page(0) => result?,
			() = cancellation.cancelled() => return Err(AdapterError::Cancelled),
		};

		let mut bans: Vec<Ban> = first.value.bans.iter().map(|raw| raw.to_ban(&self.source_name)).collect();

		if only_first_page || first.value.last_page == 0 {
			return Ok(bans);
		}

		let remaining_pages = 1..=first.value.last_page;
		let fetches = stream::iter(remaining_pages)
			.map(|page| self.fetch_page(page))
			.buffer_unordered(MAX_CONCURRENT_PAGE_REQUESTS);

		tokio::select! {
			pages = fetches.collect::<Vec<_>>() => {
				for page in pages {
					let page = page?;
					bans.extend(page.value.bans.iter().map(|raw| raw.to_ban(&self.source_name)));
				}
			},
			() = cancellation.cancelled() => return Err(AdapterError::Cancelled),
		}

		Ok(bans)
	}
}

#[async_trait]
impl SourceAdapter for PaginatedJsonAdapter
{
	fn adapter_name(&self) -> &str
	{
		"paginated-json"
	}

	fn sources(&self) -> &HashMap<String, NewBanSource>
	{
		&self.sources
	}

	fn supports_ban_ids(&self) -> bool
	{
		false
	}

	async fn fetch_all(&self, cancellation: &CancellationToken) -> Result<Vec<Ban>, AdapterError>
	{
		self.fetch_pages(cancellation, false).await
	}

	async fn fetch_new(&self, cancellation: &CancellationToken) -> Result<Vec<Ban>, AdapterError>
	{
		// The documented payload has no "changed since" filter; the first
		// page is assumed newest-first, which the reconciler's idempotence
		// tolerates if that assumption is ever wrong (overshoot is safe,
		// undershoot just delays convergence to the next full refresh).
		self.fetch_pages(cancellation, true).await
	}
}

#[derive(Debug, Deserialize)]
struct PageEnvelope
{
	value: PageValue,
}

#[derive(Debug, Deserialize)]
struct PageValue
{
	bans: Vec<RawBan>,
	#[serde(rename = "lastPage")]
	last_page: u32,
}

#[derive(Debug, Deserialize)]
struct RawBan
{
	#[serde(rename = "banApplyTime", with = "time::serde::rfc3339")]
	ban_apply_time: OffsetDateTime,
	#[serde(rename = "banExpireTime", with = "time::serde::rfc3339::option")]
	ban_expire_time: Option<OffsetDateTime>,
	#[serde(rename = "adminCkey")]
	admin_ckey: String,
	#[serde(rename = "bannedCkey")]
	banned_ckey: String,
	role: Vec<String>,
	reason: String,
}

impl RawBan
{
	/// Decodes one upstream record into a canonical (but not yet
	/// rehomed/canonicalized) [`Ban`] — that's the reconciler's job (§4.3
	/// step 2), not the adapter's.
	fn to_ban(&self, source_name: &str) -> Ban
	{
		let is_server_ban = self.role.first().is_some_and(|role| role == "Server");

		Ban {
			id: None,
			source_id: None,
			source_name: source_name.to_owned(),
			source_ban_id: None,
			ckey: Ckey::from_raw(self.banned_ckey.clone()),
			ban_type: if is_server_ban { BanType::Server } else { BanType::Job },
			banned_on: self.ban_apply_time,
			banned_by: ModeratorKey::from_raw(self.admin_ckey.clone()),
			expires: self.ban_expire_time,
			reason: self.reason.clone(),
			unbanned_by: None,
			jobs: if is_server_ban {
				Default::default()
			} else {
				self.role.iter().cloned().map(JobName::new).collect()
			},
		}
	}
}
