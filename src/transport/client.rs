//! HTTP replica transport.
//!
//! Connection errors are retried a few times with jittered backoff. Once a node has
//! answered, its answer is final: a delivered task is never sent twice.

use super::protocol::*;
use crate::config::NodeConfig;
use crate::replication::ReplicaTransport;
use crate::task::{ReplicaResponse, TaskEnvelope};

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_ATTEMPTS: usize = 3;

pub struct HttpTransport {
    /// Node name -> HTTP address.
    peers: DashMap<String, SocketAddr>,

    http_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            peers: DashMap::new(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        let transport = Self::new();
        for peer in &config.peers {
            transport.add_peer(&peer.name, peer.http_addr);
        }
        transport
    }

    pub fn add_peer(&self, node: &str, http_addr: SocketAddr) {
        self.peers.insert(node.to_string(), http_addr);
    }

    pub fn peer_addr(&self, node: &str) -> Option<SocketAddr> {
        self.peers.get(node).map(|addr| *addr)
    }

    fn url(&self, node: &str, endpoint: &str) -> Result<String> {
        let addr = self
            .peer_addr(node)
            .ok_or_else(|| anyhow::anyhow!("No address known for node {}", node))?;
        Ok(format!("http://{}{}", addr, endpoint))
    }

    /// Asks a peer which task kinds it can build.
    pub async fn fetch_task_kinds(&self, node: &str) -> Result<TaskKindsResponse> {
        let url = self.url(node, ENDPOINT_TASK_KINDS)?;
        let response = self
            .get_with_retry(url, REQUEST_TIMEOUT, CONNECT_ATTEMPTS)
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Node {} answered task kinds with {}",
                node,
                response.status()
            ));
        }

        Ok(response.json::<TaskKindsResponse>().await?)
    }

    // --- HTTP Helpers with Backoff ---

    async fn post_with_retry<T: serde::Serialize>(
        &self,
        url: String,
        payload: &T,
        timeout: Duration,
        attempts: usize,
    ) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = self
                .http_client
                .post(url.clone())
                .json(payload)
                .timeout(timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                // Only retry when the request never reached the node.
                Err(e) if e.is_connect() && attempt + 1 < attempts => {
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
                Err(e) => return Err(anyhow::anyhow!(e)),
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }

    async fn get_with_retry(
        &self,
        url: String,
        timeout: Duration,
        attempts: usize,
    ) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = self
                .http_client
                .get(url.clone())
                .timeout(timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(anyhow::anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplicaTransport for HttpTransport {
    async fn execute(&self, node: &str, envelope: &TaskEnvelope) -> Result<ReplicaResponse> {
        let url = self.url(node, ENDPOINT_EXECUTE_TASK)?;
        let request = ExecuteTaskRequest {
            envelope: envelope.clone(),
        };

        let response = self
            .post_with_retry(url, &request, REQUEST_TIMEOUT, CONNECT_ATTEMPTS)
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Node {} answered task delivery with {}",
                node,
                response.status()
            ));
        }

        let body = response.json::<ExecuteTaskResponse>().await?;
        Ok(body.response)
    }
}
