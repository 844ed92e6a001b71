//! Bilibili web API client

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace, warn};

use super::response::{Envelope, OnlineTotal, VideoStat, VideoView};
use super::{FetchError, FetchFailure, MetricsFetcher};
use crate::Snapshot;

pub const DEFAULT_BASE_URL: &str = "https://api.bilibili.com";

/// Upper bound for each of the two remote calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const SITE_REFERER: &str = "https://www.bilibili.com";

/// Fetches video statistics from the Bilibili web API
///
/// The HTTP client is built once and reused for every request.
#[derive(Debug, Clone)]
pub struct BilibiliClient {
    client: reqwest::Client,
    base_url: String,
}

impl BilibiliClient {
    /// Client for the public API with the default timeout
    pub fn new() -> reqwest::Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Client for an arbitrary API root (mirrors, test servers)
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(SITE_REFERER));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        trace!("requesting {url}");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status()));
        }

        let body = response.bytes().await.map_err(FetchError::from_reqwest)?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Malformed(e.to_string()))
    }

    /// Core lookup: title, counters and the ids needed for the online lookup
    async fn fetch_view(&self, target_id: &str) -> Result<VideoView, FetchError> {
        self.get_json::<Envelope<VideoView>>(
            "/x/web-interface/view",
            &[("bvid", target_id.to_string())],
        )
        .await?
        .into_data()
    }

    async fn fetch_online(&self, target_id: &str, aid: u64, cid: u64) -> Result<u64, FetchError> {
        let online = self
            .get_json::<Envelope<OnlineTotal>>(
                "/x/player/online/total",
                &[
                    ("aid", aid.to_string()),
                    ("cid", cid.to_string()),
                    ("bvid", target_id.to_string()),
                ],
            )
            .await?
            .into_data()?;
        Ok(online.total.map_or(0, |total| total.value()))
    }
}

#[async_trait]
impl MetricsFetcher for BilibiliClient {
    #[instrument(skip(self))]
    async fn fetch(&self, target_id: &str) -> Result<Snapshot, FetchFailure> {
        let view = self
            .fetch_view(target_id)
            .await
            .map_err(|cause| FetchFailure::new(target_id, cause))?;

        let online_count = match (view.aid, view.cid) {
            (Some(aid), Some(cid)) => match self.fetch_online(target_id, aid, cid).await {
                Ok(count) => count,
                Err(e) => {
                    warn!("online count unavailable, using 0: {e}");
                    0
                }
            },
            _ => {
                debug!("view response has no aid/cid, skipping online lookup");
                0
            }
        };

        let stat = &view.stat;
        let mut snapshot = Snapshot::new(target_id, Utc::now());
        snapshot.title = view.title.clone();
        snapshot.views = VideoStat::count(stat.view);
        snapshot.likes = VideoStat::count(stat.like);
        snapshot.coins = VideoStat::count(stat.coin);
        snapshot.favorites = VideoStat::count(stat.favorite);
        snapshot.shares = VideoStat::count(stat.share);
        snapshot.online_count = online_count;

        trace!("fetched snapshot: {snapshot:?}");
        Ok(snapshot)
    }
}
