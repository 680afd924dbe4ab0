//! The client distribution layer for the snowdrift ID service.
//!
//! [`SnowdriftClient`] consumes the server purely through its wire
//! contract (the protobuf batch encoding), and fans a request for N IDs
//! out across multiple endpoints with bounded concurrency.
//!
//! Failure policy, stated explicitly: an endpoint that fails mid-batch is
//! excluded for the remainder of that batch and its share is re-spread
//! over the survivors. A batch fails as a whole only once every endpoint
//! has failed. Single-ID fetches rotate across endpoints and fall through
//! to the next one on failure.

use futures::StreamExt;
use futures::stream;
use prost::Message;
use snowdrift_wire::{APPLICATION_PROTOBUF, IdBatch};
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-flight request bound used by [`SnowdriftClient::new`].
const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Failures surfaced by the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The client was constructed with no endpoints.
    #[error("no endpoints configured")]
    NoEndpoints,

    /// Every configured endpoint failed for the current request.
    #[error("all endpoints failed; last error: {last}")]
    AllEndpointsFailed { last: String },

    /// The transport failed or the endpoint answered with an error status.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with bytes that do not decode as a batch.
    #[error("malformed batch response: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// A client over one or more snowdrift server endpoints.
pub struct SnowdriftClient {
    http: reqwest::Client,
    endpoints: Vec<String>,
    rotation: AtomicUsize,
    max_in_flight: usize,
}

impl SnowdriftClient {
    /// Creates a client with the default in-flight bound.
    ///
    /// Endpoints may be bare `host:port` pairs or full `http(s)://` URLs.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoEndpoints`] for an empty list.
    pub fn new(endpoints: Vec<String>) -> Result<Self, ClientError> {
        Self::with_max_in_flight(endpoints, DEFAULT_MAX_IN_FLIGHT)
    }

    /// Creates a client with an explicit bound on concurrent requests per
    /// batch.
    pub fn with_max_in_flight(
        endpoints: Vec<String>,
        max_in_flight: usize,
    ) -> Result<Self, ClientError> {
        if endpoints.is_empty() {
            return Err(ClientError::NoEndpoints);
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("snowdrift-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoints: endpoints.into_iter().map(normalize).collect(),
            rotation: AtomicUsize::new(0),
            max_in_flight: max_in_flight.max(1),
        })
    }

    /// Fetches a single ID, rotating across endpoints and falling through
    /// to the next on failure.
    pub async fn get_id(&self) -> Result<u64, ClientError> {
        let start = self.rotation.fetch_add(1, Ordering::Relaxed);
        let mut last = String::new();

        for offset in 0..self.endpoints.len() {
            let endpoint = &self.endpoints[(start + offset) % self.endpoints.len()];
            match self.fetch_batch(endpoint, 1).await {
                Ok(ids) if !ids.is_empty() => return Ok(ids[0]),
                Ok(_) => last = format!("{endpoint} returned an empty batch"),
                Err(err) => {
                    tracing::warn!(%endpoint, %err, "endpoint failed");
                    last = err.to_string();
                }
            }
        }
        Err(ClientError::AllEndpointsFailed { last })
    }

    /// Fetches `count` IDs, spread evenly across the configured endpoints.
    ///
    /// Per-endpoint batch requests run concurrently, bounded by
    /// `max_in_flight`. A failing endpoint is dropped for the remainder of
    /// this call and its share re-spread; a server that clamps a share to
    /// its own batch limit simply causes another round for the shortfall.
    pub async fn get_ids(&self, count: usize) -> Result<Vec<u64>, ClientError> {
        let mut ids = Vec::with_capacity(count);
        let mut live: Vec<&str> = self.endpoints.iter().map(String::as_str).collect();
        let mut last = String::new();

        while ids.len() < count {
            if live.is_empty() {
                return Err(ClientError::AllEndpointsFailed { last });
            }

            let shares = split_shares(count - ids.len(), live.len());
            let requests = live
                .iter()
                .copied()
                .zip(shares)
                .filter(|&(_, share)| share > 0)
                .map(|(endpoint, share)| async move {
                    (endpoint, self.fetch_batch(endpoint, share).await)
                });
            let results: Vec<_> = stream::iter(requests)
                .buffer_unordered(self.max_in_flight)
                .collect()
                .await;

            let mut failed = Vec::new();
            for (endpoint, result) in results {
                match result {
                    Ok(batch) => ids.extend(batch),
                    Err(err) => {
                        tracing::warn!(%endpoint, %err, "excluding endpoint for this batch");
                        last = err.to_string();
                        failed.push(endpoint);
                    }
                }
            }
            live.retain(|endpoint| !failed.contains(endpoint));
        }

        ids.truncate(count);
        Ok(ids)
    }

    async fn fetch_batch(&self, endpoint: &str, count: usize) -> Result<Vec<u64>, ClientError> {
        let response = self
            .http
            .get(format!("{endpoint}/?count={count}"))
            .header(reqwest::header::ACCEPT, APPLICATION_PROTOBUF)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(IdBatch::decode(bytes.as_ref())?.ids)
    }
}

fn normalize(endpoint: String) -> String {
    let trimmed = endpoint.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

/// Splits `total` into `buckets` near-even shares, biased toward the front.
fn split_shares(total: usize, buckets: usize) -> Vec<usize> {
    let base = total / buckets;
    let extra = total % buckets;
    (0..buckets)
        .map(|i| base + usize::from(i < extra))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_are_even_and_complete() {
        assert_eq!(split_shares(10, 3), vec![4, 3, 3]);
        assert_eq!(split_shares(3, 3), vec![1, 1, 1]);
        assert_eq!(split_shares(2, 3), vec![1, 1, 0]);
        assert_eq!(split_shares(1000, 4).iter().sum::<usize>(), 1000);
    }

    #[test]
    fn endpoints_are_normalized_to_urls() {
        assert_eq!(normalize(String::from("127.0.0.1:8080")), "http://127.0.0.1:8080");
        assert_eq!(
            normalize(String::from("http://ids.internal/")),
            "http://ids.internal"
        );
        assert_eq!(
            normalize(String::from("https://ids.internal")),
            "https://ids.internal"
        );
    }

    #[test]
    fn empty_endpoint_list_is_rejected() {
        assert!(matches!(
            SnowdriftClient::new(Vec::new()),
            Err(ClientError::NoEndpoints)
        ));
    }
}
