use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, warn};

use crate::domain::{Accession, QueryMode};
use crate::error::TaxoError;

pub const DEFAULT_BASE_URL: &str = "https://www.ebi.ac.uk/interpro/api";

/// NCBI taxon id of the "cellular organisms" root node, the fixed subtree
/// queried by the cell-organism-filtered mode.
pub const CELLULAR_ORGANISMS_TAXON: &str = "131567";

pub fn query_url(base_url: &str, accession: &Accession, mode: QueryMode) -> String {
    let base = base_url.trim_end_matches('/');
    match mode {
        QueryMode::Taxonomy => {
            format!("{base}/taxonomy/uniprot/entry/interpro/{accession}/")
        }
        QueryMode::TaxonomyByCellOrg => {
            format!("{base}/taxonomy/uniprot/{CELLULAR_ORGANISMS_TAXON}?filter_by_entry={accession}")
        }
    }
}

/// Fixed per-category delays. No exponential backoff: request volume is low
/// and the API documents its own cool-down for 408 responses.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after a transport error or a non-200, non-408 status.
    pub retry_delay: Duration,
    /// Delay after HTTP 408.
    pub timeout_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(10),
            timeout_backoff: Duration::from_secs(61),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// One blocking GET against an absolute URL. Non-2xx statuses come back as
/// `Ok` replies; `Err` is reserved for transport-level failure.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpReply, TaxoError>;
}

/// Seam for the fixed-duration waits so tests can record delays instead of
/// blocking.
pub trait Sleeper: Send + Sync {
    fn pause(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn pause(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(request_timeout: Duration) -> Result<Self, TaxoError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("taxodl/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| TaxoError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()
            .map_err(|err| TaxoError::Http(err.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str) -> Result<HttpReply, TaxoError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| TaxoError::Http(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| TaxoError::Http(err.to_string()))?;
        Ok(HttpReply { status, body })
    }
}

/// Executes one logical "fetch record" operation with bounded retries. After
/// the attempt cap the error is definitive for that item; callers skip the
/// item and continue the batch.
pub struct Fetcher<T: HttpTransport, S: Sleeper> {
    transport: T,
    sleeper: S,
    policy: RetryPolicy,
}

impl<T: HttpTransport, S: Sleeper> Fetcher<T, S> {
    pub fn new(transport: T, sleeper: S, policy: RetryPolicy) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn fetch(&self, url: &str) -> Result<String, TaxoError> {
        let max = self.policy.max_attempts;
        for attempt in 1..=max {
            match self.transport.get(url) {
                Ok(reply) if reply.status == 200 => {
                    debug!(url, attempt, "request succeeded");
                    return Ok(reply.body);
                }
                Ok(reply) if reply.status == 408 => {
                    warn!(
                        url,
                        attempt,
                        max,
                        backoff_secs = self.policy.timeout_backoff.as_secs(),
                        "server timeout (408)"
                    );
                    if attempt < max {
                        self.sleeper.pause(self.policy.timeout_backoff);
                    }
                }
                Ok(reply) => {
                    warn!(
                        url,
                        attempt,
                        max,
                        status = reply.status,
                        retry_secs = self.policy.retry_delay.as_secs(),
                        "http error"
                    );
                    if attempt < max {
                        self.sleeper.pause(self.policy.retry_delay);
                    }
                }
                Err(err) => {
                    warn!(
                        url,
                        attempt,
                        max,
                        cause = %err,
                        retry_secs = self.policy.retry_delay.as_secs(),
                        "request failed"
                    );
                    if attempt < max {
                        self.sleeper.pause(self.policy.retry_delay);
                    }
                }
            }
        }
        Err(TaxoError::RetriesExhausted {
            url: url.to_string(),
            attempts: max,
        })
    }
}
