//! The shared drain engine behind every listener.
//!
//! One subscription task feeds a private signature FIFO; one drain task pops
//! a single signature per tick (batch size 1 for provider compatibility) and
//! fetches it through the gateway. Drain intervals and start offsets differ
//! per listener so two listeners never submit in the same tick.

use crate::config::ListenerCfg;
use crate::dispatch::PoolPipeline;
use crate::listeners::{PoolDecoder, TxView};
use crate::rpc::RpcGateway;
use solana_client::rpc_response::RpcLogsResponse;
use solana_sdk::signature::Signature;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use futures_util::StreamExt;

const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

/// Bounded set of signatures that are already queued or in flight.
///
/// Purely a liveness optimization: when the high-water mark is hit the
/// oldest half is evicted, so a re-notified signature may be fetched again.
pub struct DedupSet {
    seen: HashSet<String>,
    order: VecDeque<String>,
    high_water: usize,
}

impl DedupSet {
    pub fn new(high_water: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            high_water: high_water.max(2),
        }
    }

    /// Returns false when the signature is already tracked.
    pub fn insert(&mut self, signature: &str) -> bool {
        if self.seen.contains(signature) {
            return false;
        }
        self.seen.insert(signature.to_string());
        self.order.push_back(signature.to_string());
        if self.order.len() > self.high_water {
            for _ in 0..self.high_water / 2 {
                if let Some(oldest) = self.order.pop_front() {
                    self.seen.remove(&oldest);
                }
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

pub struct ListenerEngine<D: PoolDecoder> {
    decoder: D,
    gateway: Arc<RpcGateway>,
    pipeline: Arc<PoolPipeline>,
    settings: ListenerCfg,
    queue: Mutex<VecDeque<String>>,
    dedup: Mutex<DedupSet>,
}

impl<D: PoolDecoder> ListenerEngine<D> {
    pub fn new(
        decoder: D,
        gateway: Arc<RpcGateway>,
        pipeline: Arc<PoolPipeline>,
        settings: ListenerCfg,
    ) -> Arc<Self> {
        let dedup = DedupSet::new(settings.dedup_capacity);
        Arc::new(Self {
            decoder,
            gateway,
            pipeline,
            settings,
            queue: Mutex::new(VecDeque::new()),
            dedup: Mutex::new(dedup),
        })
    }

    pub fn start(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let subscription = tokio::spawn(Arc::clone(self).subscription_loop());
        let drain = tokio::spawn(Arc::clone(self).drain_loop());
        vec![subscription, drain]
    }

    async fn subscription_loop(self: Arc<Self>) {
        let source = self.decoder.source();
        let program_id = source.program_id();
        loop {
            match self.gateway.subscribe_logs(program_id).await {
                Ok((mut stream, _unsubscribe)) => {
                    info!("[{}] listening for logs from program {}", source, program_id);
                    while let Some(notification) = stream.next().await {
                        self.on_logs(notification.value);
                    }
                    warn!("[{}] log stream ended, resubscribing", source);
                }
                Err(e) => {
                    warn!("[{}] log subscription failed: {}", source, e);
                }
            }
            tokio::time::sleep(RESUBSCRIBE_DELAY).await;
        }
    }

    fn on_logs(&self, logs: RpcLogsResponse) {
        if logs.err.is_some() {
            return;
        }
        if !self.decoder.wants(&logs.logs) {
            return;
        }
        if !self
            .dedup
            .lock()
            .expect("dedup set lock")
            .insert(&logs.signature)
        {
            return;
        }
        self.queue
            .lock()
            .expect("signature queue lock")
            .push_back(logs.signature);
    }

    async fn drain_loop(self: Arc<Self>) {
        tokio::time::sleep(Duration::from_millis(self.settings.start_offset_ms)).await;
        let mut ticker =
            tokio::time::interval(Duration::from_millis(self.settings.drain_interval_ms));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let signature = self
                .queue
                .lock()
                .expect("signature queue lock")
                .pop_front();
            let Some(signature) = signature else { continue };
            // Handle the response off-loop so a slow fetch never skews the
            // drain cadence.
            let engine = Arc::clone(&self);
            tokio::spawn(async move {
                engine.handle_signature(signature).await;
            });
        }
    }

    async fn handle_signature(&self, signature: String) {
        let source = self.decoder.source();
        let Ok(parsed) = signature.parse::<Signature>() else {
            debug!("[{}] unparseable signature: {}", source, signature);
            return;
        };

        match self.gateway.fetch_transaction(&parsed, source).await {
            Ok(tx) => {
                let Some(view) = TxView::from_encoded(&signature, &tx) else {
                    return;
                };
                if let Some(record) = self.decoder.decode(&view) {
                    info!(
                        "[{}] new pool candidate {} (mint {}, {:.4} SOL) in tx {}",
                        source, record.address, record.mint, record.lp_sol, signature
                    );
                    self.pipeline.submit(record);
                }
                // A decode miss is the expected outcome for most
                // transactions that mention the program.
            }
            Err(e) => {
                // Dropped unit of work; the signature is not retried.
                debug!("[{}] transaction fetch failed for {}: {}", source, signature, e);
            }
        }
    }
}
