//! Rate-limited access layer for the shared Solana node.
//!
//! Every remote call in the process goes through one [`RpcGateway`]: calls
//! are appended to a single FIFO queue and a driver task executes exactly one
//! call per tick, so the system-wide request rate is capped at
//! `1000 / request_delay_ms` no matter how many components submit work.
//! Submission never blocks; resolution is delivered over a oneshot channel.

use crate::shared::errors::RemoteError;
use crate::shared::types::PoolSource;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{
    RpcTransactionConfig, RpcTransactionLogsConfig, RpcTransactionLogsFilter,
};
use solana_client::rpc_response::{Response, RpcLogsResponse};
use solana_sdk::account::Account;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_transaction_status::{EncodedConfirmedTransactionWithStatusMeta, UiTransactionEncoding};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Window for the rolling calls-per-second statistic.
const THROUGHPUT_WINDOW: Duration = Duration::from_secs(10);

/// A typed request the gateway knows how to execute.
#[derive(Debug, Clone)]
pub enum GatewayRequest {
    Transaction(Signature),
    Account(Pubkey),
    Slot,
    LatestBlockhash,
    Confirm(Signature),
}

/// The matching response payloads.
#[derive(Debug)]
pub enum GatewayResponse {
    Transaction(Box<EncodedConfirmedTransactionWithStatusMeta>),
    Account(Account),
    Slot(u64),
    Blockhash(Hash),
    Confirmed(bool),
}

/// Low-level executor behind the queue. Seam for tests: the queue discipline
/// is verified against a recording mock instead of a live node.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn execute(&self, request: &GatewayRequest) -> Result<GatewayResponse, RemoteError>;
}

/// Production transport over the nonblocking Solana RPC client.
pub struct SolanaTransport {
    client: RpcClient,
}

impl SolanaTransport {
    pub fn new(http_url: &str) -> Self {
        Self {
            client: RpcClient::new_with_commitment(
                http_url.to_string(),
                CommitmentConfig::confirmed(),
            ),
        }
    }
}

#[async_trait]
impl RpcTransport for SolanaTransport {
    async fn execute(&self, request: &GatewayRequest) -> Result<GatewayResponse, RemoteError> {
        match request {
            GatewayRequest::Transaction(signature) => {
                let config = RpcTransactionConfig {
                    encoding: Some(UiTransactionEncoding::JsonParsed),
                    commitment: Some(CommitmentConfig::confirmed()),
                    max_supported_transaction_version: Some(0),
                };
                let tx = self
                    .client
                    .get_transaction_with_config(signature, config)
                    .await
                    .map_err(|e| RemoteError::Rpc(e.to_string()))?;
                Ok(GatewayResponse::Transaction(Box::new(tx)))
            }
            GatewayRequest::Account(address) => {
                let account = self
                    .client
                    .get_account(address)
                    .await
                    .map_err(|e| RemoteError::Rpc(e.to_string()))?;
                Ok(GatewayResponse::Account(account))
            }
            GatewayRequest::Slot => {
                let slot = self
                    .client
                    .get_slot()
                    .await
                    .map_err(|e| RemoteError::Rpc(e.to_string()))?;
                Ok(GatewayResponse::Slot(slot))
            }
            GatewayRequest::LatestBlockhash => {
                let hash = self
                    .client
                    .get_latest_blockhash()
                    .await
                    .map_err(|e| RemoteError::Rpc(e.to_string()))?;
                Ok(GatewayResponse::Blockhash(hash))
            }
            GatewayRequest::Confirm(signature) => {
                let confirmed = self
                    .client
                    .confirm_transaction(signature)
                    .await
                    .map_err(|e| RemoteError::Rpc(e.to_string()))?;
                Ok(GatewayResponse::Confirmed(confirmed))
            }
        }
    }
}

struct QueuedCall {
    source: PoolSource,
    request: GatewayRequest,
    responder: oneshot::Sender<Result<GatewayResponse, RemoteError>>,
}

/// Point-in-time view of gateway load, for operational visibility only.
#[derive(Debug, Clone)]
pub struct GatewayStats {
    pub calls_per_second: f64,
    pub queue_len: usize,
    pub queued_by_source: HashMap<PoolSource, usize>,
}

/// The shared access layer. One explicitly constructed instance is owned by
/// the entry point and handed by `Arc` to every component.
pub struct RpcGateway {
    transport: Arc<dyn RpcTransport>,
    pubsub: Option<PubsubClient>,
    request_delay: Duration,
    queue: Mutex<VecDeque<QueuedCall>>,
    executions: Mutex<VecDeque<Instant>>,
}

impl RpcGateway {
    /// Connect both channels to the shared node: HTTP for request/response
    /// and the persistent WebSocket for log subscriptions.
    pub async fn connect(
        http_url: &str,
        ws_url: &str,
        request_delay_ms: u64,
    ) -> Result<Self, RemoteError> {
        let pubsub = PubsubClient::new(ws_url)
            .await
            .map_err(|e| RemoteError::Subscribe(e.to_string()))?;
        info!("Connected RPC gateway: http={} ws={}", http_url, ws_url);
        Ok(Self {
            transport: Arc::new(SolanaTransport::new(http_url)),
            pubsub: Some(pubsub),
            request_delay: Duration::from_millis(request_delay_ms),
            queue: Mutex::new(VecDeque::new()),
            executions: Mutex::new(VecDeque::new()),
        })
    }

    /// Build a gateway over a custom transport, without a subscription
    /// channel. Used by tests.
    pub fn with_transport(transport: Arc<dyn RpcTransport>, request_delay_ms: u64) -> Self {
        Self {
            transport,
            pubsub: None,
            request_delay: Duration::from_millis(request_delay_ms),
            queue: Mutex::new(VecDeque::new()),
            executions: Mutex::new(VecDeque::new()),
        }
    }

    /// Spawn the queue driver: one call per tick, strictly in submission
    /// order. A failing call rejects only its own responder.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let gateway = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(gateway.request_delay);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let call = gateway.queue.lock().expect("gateway queue lock").pop_front();
                let Some(call) = call else { continue };

                gateway.record_execution();
                let result = gateway.transport.execute(&call.request).await;
                if let Err(e) = &result {
                    debug!("[{}] rpc call failed: {}", call.source, e);
                }
                // The submitter may have given up; that is not our problem.
                let _ = call.responder.send(result);
            }
        })
    }

    fn record_execution(&self) {
        let mut executions = self.executions.lock().expect("gateway stats lock");
        let now = Instant::now();
        executions.push_back(now);
        while let Some(oldest) = executions.front() {
            if now.duration_since(*oldest) > THROUGHPUT_WINDOW {
                executions.pop_front();
            } else {
                break;
            }
        }
    }

    async fn submit(
        &self,
        source: PoolSource,
        request: GatewayRequest,
    ) -> Result<GatewayResponse, RemoteError> {
        let (responder, receiver) = oneshot::channel();
        self.queue
            .lock()
            .expect("gateway queue lock")
            .push_back(QueuedCall {
                source,
                request,
                responder,
            });
        receiver.await.map_err(|_| RemoteError::Dropped)?
    }

    pub async fn fetch_transaction(
        &self,
        signature: &Signature,
        source: PoolSource,
    ) -> Result<EncodedConfirmedTransactionWithStatusMeta, RemoteError> {
        match self
            .submit(source, GatewayRequest::Transaction(*signature))
            .await?
        {
            GatewayResponse::Transaction(tx) => Ok(*tx),
            other => Err(RemoteError::Rpc(format!("unexpected response: {:?}", other))),
        }
    }

    pub async fn fetch_account(
        &self,
        address: &Pubkey,
        source: PoolSource,
    ) -> Result<Account, RemoteError> {
        match self.submit(source, GatewayRequest::Account(*address)).await? {
            GatewayResponse::Account(account) => Ok(account),
            other => Err(RemoteError::Rpc(format!("unexpected response: {:?}", other))),
        }
    }

    pub async fn fetch_slot(&self, source: PoolSource) -> Result<u64, RemoteError> {
        match self.submit(source, GatewayRequest::Slot).await? {
            GatewayResponse::Slot(slot) => Ok(slot),
            other => Err(RemoteError::Rpc(format!("unexpected response: {:?}", other))),
        }
    }

    pub async fn fetch_latest_blockhash(&self, source: PoolSource) -> Result<Hash, RemoteError> {
        match self.submit(source, GatewayRequest::LatestBlockhash).await? {
            GatewayResponse::Blockhash(hash) => Ok(hash),
            other => Err(RemoteError::Rpc(format!("unexpected response: {:?}", other))),
        }
    }

    pub async fn confirm_transaction(
        &self,
        signature: &Signature,
        source: PoolSource,
    ) -> Result<bool, RemoteError> {
        match self.submit(source, GatewayRequest::Confirm(*signature)).await? {
            GatewayResponse::Confirmed(confirmed) => Ok(confirmed),
            other => Err(RemoteError::Rpc(format!("unexpected response: {:?}", other))),
        }
    }

    /// Open a log subscription for one program on the persistent channel.
    pub async fn subscribe_logs(
        &self,
        program_id: &str,
    ) -> Result<
        (
            BoxStream<'_, Response<RpcLogsResponse>>,
            Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>,
        ),
        RemoteError,
    > {
        let Some(pubsub) = &self.pubsub else {
            return Err(RemoteError::Subscribe(
                "no websocket channel configured".to_string(),
            ));
        };
        pubsub
            .logs_subscribe(
                RpcTransactionLogsFilter::Mentions(vec![program_id.to_string()]),
                RpcTransactionLogsConfig {
                    commitment: Some(CommitmentConfig::confirmed()),
                },
            )
            .await
            .map_err(|e| RemoteError::Subscribe(e.to_string()))
    }

    pub fn stats(&self) -> GatewayStats {
        let queue = self.queue.lock().expect("gateway queue lock");
        let mut queued_by_source: HashMap<PoolSource, usize> = HashMap::new();
        for call in queue.iter() {
            *queued_by_source.entry(call.source).or_insert(0) += 1;
        }
        let queue_len = queue.len();
        drop(queue);

        let executions = self.executions.lock().expect("gateway stats lock");
        let now = Instant::now();
        let recent = executions
            .iter()
            .filter(|at| now.duration_since(**at) <= THROUGHPUT_WINDOW)
            .count();

        GatewayStats {
            calls_per_second: recent as f64 / THROUGHPUT_WINDOW.as_secs_f64(),
            queue_len,
            queued_by_source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Transport that records execution times and serves canned slots.
    struct RecordingTransport {
        executed_at: Mutex<Vec<Instant>>,
        slot: AtomicU64,
    }

    impl RecordingTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                executed_at: Mutex::new(Vec::new()),
                slot: AtomicU64::new(0),
            })
        }
    }

    #[async_trait]
    impl RpcTransport for RecordingTransport {
        async fn execute(&self, _request: &GatewayRequest) -> Result<GatewayResponse, RemoteError> {
            self.executed_at.lock().unwrap().push(Instant::now());
            Ok(GatewayResponse::Slot(self.slot.fetch_add(1, Ordering::SeqCst)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_spaces_calls_by_configured_delay() {
        let transport = RecordingTransport::new();
        let gateway = Arc::new(RpcGateway::with_transport(transport.clone(), 100));
        gateway.start();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let gw = Arc::clone(&gateway);
            handles.push(tokio::spawn(async move {
                gw.fetch_slot(PoolSource::PumpV1).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        let executed = transport.executed_at.lock().unwrap();
        assert_eq!(executed.len(), 5);
        for pair in executed.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(100));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_resolve_in_submission_order() {
        let transport = RecordingTransport::new();
        let gateway = Arc::new(RpcGateway::with_transport(transport, 10));
        gateway.start();

        let first = {
            let gw = Arc::clone(&gateway);
            tokio::spawn(async move { gw.fetch_slot(PoolSource::PumpV1).await })
        };
        // Yield so the first submission lands in the queue before the second.
        tokio::task::yield_now().await;
        let second = {
            let gw = Arc::clone(&gateway);
            tokio::spawn(async move { gw.fetch_slot(PoolSource::PumpAmm).await })
        };

        assert_eq!(first.await.unwrap().unwrap(), 0);
        assert_eq!(second.await.unwrap().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_report_queue_occupancy_by_source() {
        let transport = RecordingTransport::new();
        // Driver not started: submissions stay queued.
        let gateway = Arc::new(RpcGateway::with_transport(transport, 100));

        for source in [PoolSource::PumpV1, PoolSource::PumpV1, PoolSource::LaunchLab] {
            let gw = Arc::clone(&gateway);
            tokio::spawn(async move {
                let _ = gw.fetch_slot(source).await;
            });
        }
        // Let the submissions reach the queue.
        tokio::time::sleep(Duration::from_millis(1)).await;

        let stats = gateway.stats();
        assert_eq!(stats.queue_len, 3);
        assert_eq!(stats.queued_by_source.get(&PoolSource::PumpV1), Some(&2));
        assert_eq!(stats.queued_by_source.get(&PoolSource::LaunchLab), Some(&1));
        assert_eq!(stats.calls_per_second, 0.0);
    }

    struct FailingTransport;

    #[async_trait]
    impl RpcTransport for FailingTransport {
        async fn execute(&self, request: &GatewayRequest) -> Result<GatewayResponse, RemoteError> {
            match request {
                GatewayRequest::Slot => Err(RemoteError::Rpc("429 Too Many Requests".to_string())),
                _ => Ok(GatewayResponse::Confirmed(true)),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_call_rejects_only_its_own_request() {
        let gateway = Arc::new(RpcGateway::with_transport(Arc::new(FailingTransport), 10));
        gateway.start();

        let failing = {
            let gw = Arc::clone(&gateway);
            tokio::spawn(async move { gw.fetch_slot(PoolSource::PumpV1).await })
        };
        tokio::task::yield_now().await;
        let surviving = {
            let gw = Arc::clone(&gateway);
            tokio::spawn(async move {
                gw.confirm_transaction(&Signature::default(), PoolSource::PumpV1)
                    .await
            })
        };

        assert!(failing.await.unwrap().is_err());
        assert_eq!(surviving.await.unwrap().unwrap(), true);
    }
}
