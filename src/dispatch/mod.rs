//! Final dispatch: the safety evaluation racing the liquidity monitor.
//!
//! For pools born with near-zero liquidity the evaluation and the liquidity
//! check run concurrently; whichever finishes second triggers the single
//! dispatch with the merged, most-current record. The linear control flow in
//! `process` is the whole `AwaitingBoth -> Dispatched` state machine, so the
//! at-most-once guarantee is structural rather than flag-checked.

use crate::monitor::LiquidityMonitor;
use crate::safety::SafetyEvaluator;
use crate::shared::types::{Authority, PoolRecord, SafetyStatus, SafetyVerdict};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::info;

/// The trading collaborator. Invoked only for SAFE verdicts, exactly once
/// per pool.
#[async_trait]
pub trait NewPoolSink: Send + Sync {
    async fn on_new_pool(&self, pool: &PoolRecord);
}

/// The logging collaborator. Best-effort; implementations swallow their own
/// failures.
#[async_trait]
pub trait VerdictLog: Send + Sync {
    async fn log_safe_pool(&self, verdict: &SafetyVerdict);
    async fn log_blocked_pool(&self, verdict: &SafetyVerdict, pool: &PoolRecord);
}

pub struct PoolPipeline {
    evaluator: SafetyEvaluator,
    monitor: Arc<LiquidityMonitor>,
    trade_sink: Arc<dyn NewPoolSink>,
    verdict_log: Arc<dyn VerdictLog>,
    low_liquidity_threshold: f64,
}

impl PoolPipeline {
    pub fn new(
        evaluator: SafetyEvaluator,
        monitor: Arc<LiquidityMonitor>,
        trade_sink: Arc<dyn NewPoolSink>,
        verdict_log: Arc<dyn VerdictLog>,
        low_liquidity_threshold: f64,
    ) -> Self {
        Self {
            evaluator,
            monitor,
            trade_sink,
            verdict_log,
            low_liquidity_threshold,
        }
    }

    /// Fire-and-forget entry point for listeners.
    pub fn submit(self: &Arc<Self>, record: PoolRecord) {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            pipeline.process(record).await;
        });
    }

    pub async fn process(&self, record: PoolRecord) {
        if record.lp_sol >= self.low_liquidity_threshold {
            let verdict = self.evaluator.evaluate(&record).await;
            self.dispatch(verdict, &record).await;
            return;
        }

        // Near-zero liquidity: schedule the balance check, then start the
        // evaluation immediately. Both run concurrently through the gateway.
        let (resolved_tx, resolved_rx) = oneshot::channel();
        self.monitor.schedule_check(
            record.clone(),
            Box::new(move |updated| {
                let _ = resolved_tx.send(updated);
            }),
        );

        let first = self.evaluator.evaluate(&record).await;
        match resolved_rx.await {
            Ok(updated) => {
                // Liquidity appeared: re-evaluate once with the merged
                // record and dispatch that verdict.
                let merged = merge_records(&first.pool, &updated);
                let second = self.evaluator.evaluate(&merged).await;
                self.dispatch(second, &record).await;
            }
            Err(_) => {
                // The monitor gave up within its budget; the verdict on the
                // original record stands.
                self.dispatch(first, &record).await;
            }
        }
    }

    async fn dispatch(&self, verdict: SafetyVerdict, original: &PoolRecord) {
        info!(
            "[{}] {} pool {} ({:.4} SOL, {} ms){}",
            verdict.pool.source,
            verdict.status.as_str(),
            verdict.pool.address,
            verdict.pool.lp_sol,
            verdict.latency_ms,
            if verdict.reasons.is_empty() {
                String::new()
            } else {
                format!(": {}", verdict.reasons.join(", "))
            }
        );

        match verdict.status {
            SafetyStatus::Safe => {
                self.trade_sink.on_new_pool(&verdict.pool).await;
                self.verdict_log.log_safe_pool(&verdict).await;
            }
            SafetyStatus::Blocked => {
                self.verdict_log.log_blocked_pool(&verdict, original).await;
            }
        }
    }
}

/// Merge the two race outcomes: liquidity from the monitor is the freshest,
/// authorities resolved by the completed evaluation beat the decode-time
/// sentinels. Identity fields never change.
fn merge_records(evaluated: &PoolRecord, updated: &PoolRecord) -> PoolRecord {
    let mut merged = updated.clone();
    if evaluated.mint_authority != Authority::Unknown {
        merged.mint_authority = evaluated.mint_authority;
    }
    if evaluated.freeze_authority != Authority::Unknown {
        merged.freeze_authority = evaluated.freeze_authority;
    }
    merged
}
