//! papers.labml.ai API client
//!
//! Authenticates once, fetches the most-tweeted papers for each requested
//! mode, groups them by category, and keeps the result in a single-file cache.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::transport::{HttpRequester, HttpResponse, ReqwestRequester, TransportError};
use super::{Mode, Paper, PaperFeed};
use crate::cache::{CacheError, CacheManager};

/// Base URL for the papers API
const LABML_BASE_URL: &str = "https://papers.labml.ai";

/// Default cache file name
const DEFAULT_CACHE_NAME: &str = "papers.pkl";

/// Default cache time-to-live in seconds
const DEFAULT_CACHE_TTL_SECS: u64 = 1000;

/// Largest page the API serves per mode
pub const MAX_PAPERS_PER_MODE: usize = 250;

/// Browser-like headers the API expects on every request
const BROWSER_HEADERS: [(&str, &str); 11] = [
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.5"),
    (
        "User-Agent",
        "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/109.0",
    ),
    ("DNT", "1"),
    ("Connection", "keep-alive"),
    ("Upgrade-Insecure-Requests", "1"),
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "none"),
    ("Sec-Fetch-User", "?1"),
    ("TE", "trailers"),
];

/// Why a per-mode request failed before its payload could be inspected
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status
    #[error("HTTP status {0}")]
    Status(u16),

    /// The body was not JSON
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Errors that can occur while building the client or fetching papers
#[derive(Debug, Error)]
pub enum FeedError {
    /// The authentication handshake did not yield a token
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A requested mode is not one of recent, daily, weekly, monthly
    #[error("Invalid mode: '{0}'. Valid modes: recent, daily, weekly, monthly")]
    InvalidMode(String),

    /// The request for one mode failed
    #[error("Failed to fetch {mode} papers: {failure}")]
    Fetch { mode: Mode, failure: FetchFailure },

    /// The response for one mode didn't have the expected shape
    #[error("Unexpected response for {mode} papers: {detail}")]
    Schema { mode: Mode, detail: String },

    /// Reading or writing the cache file failed
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Resolving the cache directory failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeedError {
    /// Whether the server rejected the token.
    ///
    /// Tokens are never refreshed; callers seeing this should build a new client.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            FeedError::Fetch {
                failure: FetchFailure::Status(401),
                ..
            }
        )
    }
}

/// Settings fixed at client construction
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// API base URL, without a trailing slash
    pub base_url: String,
    /// Cache file name inside `cache_dir`
    pub cache_name: String,
    /// Directory holding the cache file; relative paths resolve against the working directory
    pub cache_dir: PathBuf,
    /// How long a written cache stays fresh
    pub cache_ttl: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: LABML_BASE_URL.to_string(),
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            cache_dir: PathBuf::from("."),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl FeedConfig {
    /// Use a different API host (mainly for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a different cache file name
    pub fn with_cache_name(mut self, cache_name: impl Into<String>) -> Self {
        self.cache_name = cache_name.into();
        self
    }

    /// Use a different cache directory
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Use a different cache TTL
    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    /// Absolute path of the cache file
    fn resolve_cache_path(&self) -> std::io::Result<PathBuf> {
        let dir = if self.cache_dir.is_absolute() {
            self.cache_dir.clone()
        } else {
            std::env::current_dir()?.join(&self.cache_dir)
        };
        Ok(dir.join(&self.cache_name))
    }
}

/// Where the papers in a [`FetchOutcome`] came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    /// A fresh cache file
    Cache {
        /// Path the feed was read from
        path: PathBuf,
        /// Modification time of the cache file
        written_at: DateTime<Utc>,
    },
    /// The remote API
    Network,
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::Cache { path, written_at } => write!(
                f,
                "cache ({}, written {})",
                path.display(),
                written_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            FeedSource::Network => f.write_str("network"),
        }
    }
}

/// Result of [`PaperFeedClient::fetch_papers`]
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    /// Papers grouped by category and mode
    pub feed: PaperFeed,
    /// Whether the feed was served from cache or fetched
    pub source: FeedSource,
}

impl FetchOutcome {
    /// Whether the feed was served from the cache file
    pub fn from_cache(&self) -> bool {
        matches!(self.source, FeedSource::Cache { .. })
    }
}

/// Client for the papers.labml.ai popularity API
///
/// The token obtained at construction is reused for every request and never
/// renewed. Calls are sequential; the cache file is not locked, so concurrent
/// fetches against the same path race.
pub struct PaperFeedClient<R: HttpRequester = ReqwestRequester> {
    requester: R,
    config: FeedConfig,
    cache: CacheManager,
    auth_token: String,
}

impl<R: HttpRequester> fmt::Debug for PaperFeedClient<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaperFeedClient")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl PaperFeedClient<ReqwestRequester> {
    /// Authenticates against the API over HTTPS and builds a client
    pub async fn connect(config: FeedConfig) -> Result<Self, FeedError> {
        Self::with_requester(ReqwestRequester::new(), config).await
    }
}

impl<R: HttpRequester> PaperFeedClient<R> {
    /// Authenticates through the given transport and builds a client
    ///
    /// # Returns
    /// * `Ok(PaperFeedClient)` holding the token and the absolute cache path
    /// * `Err(FeedError::Auth)` if the handshake fails or returns no token
    /// * `Err(FeedError::Io)` if the working directory can't be resolved
    pub async fn with_requester(requester: R, config: FeedConfig) -> Result<Self, FeedError> {
        let auth_token = authenticate(&requester, &config.base_url).await?;
        let cache = CacheManager::new(config.resolve_cache_path()?, config.cache_ttl);

        info!(cache = %cache.path().display(), "authenticated with papers API");

        Ok(Self {
            requester,
            config,
            cache,
            auth_token,
        })
    }

    /// Absolute path of the cache file
    pub fn cache_path(&self) -> &Path {
        self.cache.path()
    }

    /// Settings this client was built with
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Fetches every mode with the largest page size and persists the result
    pub async fn fetch_all_modes(&self) -> Result<FetchOutcome, FeedError> {
        let modes: Vec<&str> = Mode::all().iter().map(Mode::as_str).collect();
        self.fetch_papers(&modes, MAX_PAPERS_PER_MODE, true).await
    }

    /// Fetches the most-tweeted papers for each mode, grouped by category
    ///
    /// # Arguments
    /// * `modes` - Mode names, fetched in the given order; duplicates are ignored
    /// * `papers_per_mode` - Page size per mode, capped at 250
    /// * `persist` - Whether to overwrite the cache file with a fetched result
    ///
    /// # Behavior
    /// - Validates every mode before touching the cache or the network
    /// - Returns the cached feed if the cache file is still fresh
    /// - Otherwise fetches each mode in turn; the first failure aborts the call
    /// - Writes the cache only after every mode was fetched
    pub async fn fetch_papers<S: AsRef<str>>(
        &self,
        modes: &[S],
        papers_per_mode: usize,
        persist: bool,
    ) -> Result<FetchOutcome, FeedError> {
        let modes = parse_modes(modes)?;

        if self.cache.is_fresh().map_err(CacheError::from)? {
            match self.read_cached() {
                Ok(outcome) => {
                    debug!(path = %self.cache.path().display(), "serving papers from cache");
                    return Ok(outcome);
                }
                Err(e) => {
                    warn!(
                        path = %self.cache.path().display(),
                        error = %e,
                        "fresh cache unreadable, refetching"
                    );
                }
            }
        }

        let limit = papers_per_mode.min(MAX_PAPERS_PER_MODE);
        let mut feed = PaperFeed::new();

        for mode in modes {
            let papers = self.fetch_mode(mode, limit).await?;
            info!(%mode, count = papers.len(), "fetched papers");
            feed.insert_ranked(mode, papers);
        }

        if persist {
            self.cache.write(&feed)?;
            info!(path = %self.cache.path().display(), "wrote paper cache");
        }

        Ok(FetchOutcome {
            feed,
            source: FeedSource::Network,
        })
    }

    /// Reads the cache file along with its modification time
    fn read_cached(&self) -> Result<FetchOutcome, CacheError> {
        let feed = self.cache.read::<PaperFeed>()?;
        let written_at = self.cache.modified_at_utc()?.ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "cache file disappeared")
        })?;

        Ok(FetchOutcome {
            feed,
            source: FeedSource::Cache {
                path: self.cache.path().to_path_buf(),
                written_at,
            },
        })
    }

    /// Fetches and validates one mode's page of papers, in API order
    async fn fetch_mode(&self, mode: Mode, limit: usize) -> Result<Vec<Paper>, FeedError> {
        let url = format!(
            "{}/api/v1/papers/?sorted_by={}&start=0&end={}",
            self.config.base_url, mode, limit
        );
        debug!(%url, "requesting papers");

        let mut headers: Vec<(&str, String)> = BROWSER_HEADERS
            .iter()
            .map(|(name, value)| (*name, value.to_string()))
            .collect();
        headers.push(("Cookie", format!("Authorization={}", self.auth_token)));

        let fetch_err = |failure: FetchFailure| FeedError::Fetch { mode, failure };

        let response = self
            .requester
            .get(&url, &headers)
            .await
            .map_err(|e| fetch_err(e.into()))?;
        if !response.is_success() {
            return Err(fetch_err(FetchFailure::Status(response.status)));
        }

        let body: Value =
            serde_json::from_str(&response.body).map_err(|e| fetch_err(e.into()))?;

        extract_papers(mode, body)
    }
}

/// Browser header bundle as a JSON object, the payload of the auth handshake
fn header_bundle() -> Value {
    let bundle: Map<String, Value> = BROWSER_HEADERS
        .iter()
        .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
        .collect();
    Value::Object(bundle)
}

/// Performs the auth handshake and returns the token from the `authorization` header
async fn authenticate<R: HttpRequester>(
    requester: &R,
    base_url: &str,
) -> Result<String, FeedError> {
    let url = format!("{}/api/v1/auth/user", base_url);
    debug!(%url, "authenticating");

    let response: HttpResponse = requester
        .post_json(&url, &header_bundle())
        .await
        .map_err(|e| FeedError::Auth(e.to_string()))?;

    if !response.is_success() {
        return Err(FeedError::Auth(format!("HTTP status {}", response.status)));
    }

    match response.header("authorization").map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(FeedError::Auth(
            "response carried no authorization header".to_string(),
        )),
    }
}

/// Parses mode names, dropping repeats and keeping first-seen order
fn parse_modes<S: AsRef<str>>(modes: &[S]) -> Result<Vec<Mode>, FeedError> {
    let mut parsed = Vec::with_capacity(modes.len());
    for name in modes {
        let name = name.as_ref();
        let mode = Mode::from_str(name).ok_or_else(|| FeedError::InvalidMode(name.to_string()))?;
        if !parsed.contains(&mode) {
            parsed.push(mode);
        }
    }
    Ok(parsed)
}

/// Pulls `data.papers` out of a response body and validates each record
fn extract_papers(mode: Mode, body: Value) -> Result<Vec<Paper>, FeedError> {
    let schema_err = |detail: String| FeedError::Schema { mode, detail };

    let papers = match body {
        Value::Object(mut root) => match root.remove("data") {
            Some(Value::Object(mut data)) => data.remove("papers"),
            _ => None,
        },
        _ => None,
    };

    let Some(Value::Array(papers)) = papers else {
        return Err(schema_err("missing `data.papers` array".to_string()));
    };

    papers
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            Paper::from_value(value).map_err(|e| schema_err(format!("paper {}: {}", index, e)))
        })
        .collect()
}
