//! HTTP Oracle Bridge
//!
//! The registry hands fetch requests to a [`ChannelOracle`], which only
//! enqueues them. The bridge task drains that queue, fetches each
//! artifact concurrently, and posts the result back onto the service
//! queue as an oracle callback. A fetch that never completes simply never
//! produces a callback.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lib_trust::{DomainOracle, FetchRequest, FetchResponse, OracleFee, TrustError, TrustResult};
use lib_types::{Address, Amount};

use crate::errors::{NodeError, NodeResult};

// =============================================================================
// REGISTRY SIDE
// =============================================================================

/// Oracle that forwards fetch requests to the bridge task
#[derive(Debug, Clone)]
pub struct ChannelOracle {
    callback: Address,
    fee: OracleFee,
    requests: mpsc::UnboundedSender<FetchRequest>,
}

impl ChannelOracle {
    pub fn new(callback: Address, fee: OracleFee, requests: mpsc::UnboundedSender<FetchRequest>) -> Self {
        Self { callback, fee, requests }
    }
}

impl DomainOracle for ChannelOracle {
    fn callback_address(&self) -> Address {
        self.callback
    }

    fn quote(&self, gas_price: Amount) -> Amount {
        self.fee.quote(gas_price)
    }

    fn request_fetch(&mut self, request: FetchRequest) -> TrustResult<()> {
        self.requests
            .send(request)
            .map_err(|_| TrustError::Oracle("oracle bridge is not running".to_string()))
    }
}

// =============================================================================
// FETCHING
// =============================================================================

/// Retrieves a challenge artifact
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Body at `url`, or `None` if it could not be retrieved
    async fn fetch(&self, url: &str) -> Option<String>;
}

/// Plain HTTP(S) GET with a per-request timeout
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> NodeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NodeError::Oracle(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Fetch of {} failed: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("Fetch of {} returned {}", url, response.status());
            return None;
        }

        match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!("Reading body of {} failed: {}", url, e);
                None
            }
        }
    }
}

// =============================================================================
// BRIDGE TASK
// =============================================================================

/// Serve fetch requests until the request channel closes
///
/// Each response is handed to `deliver`, which posts it to the service.
pub fn spawn_oracle_bridge<F, D>(
    fetcher: Arc<F>,
    mut requests: mpsc::UnboundedReceiver<FetchRequest>,
    deliver: D,
) -> JoinHandle<()>
where
    F: Fetcher + ?Sized + 'static,
    D: Fn(FetchResponse) -> bool + Send + Sync + 'static,
{
    let deliver = Arc::new(deliver);
    tokio::spawn(async move {
        info!("Oracle bridge started");
        while let Some(request) = requests.recv().await {
            let fetcher = Arc::clone(&fetcher);
            let deliver = Arc::clone(&deliver);
            tokio::spawn(async move {
                debug!("Fetching {} for challenge {}", request.url, request.challenge_id);
                let body = fetcher.fetch(&request.url).await;
                let response = FetchResponse {
                    challenge_id: request.challenge_id,
                    body,
                };
                if !deliver(response) {
                    warn!("Service gone; dropped callback for {}", request.challenge_id);
                }
            });
        }
        info!("Oracle bridge stopped");
    })
}
