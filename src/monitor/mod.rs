//! Bounded-retry liquidity monitor.
//!
//! Pools created with zero initial liquidity are registered here and their
//! on-chain balance is polled on a retry schedule until liquidity shows up
//! or the budget runs out. A check that exhausts its budget is removed
//! silently; "never resolved" means "liquidity not found in time", not an
//! error.

use crate::rpc::RpcGateway;
use crate::shared::types::{PoolRecord, PoolSource};
use serde::Deserialize;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

pub type ResolveFn = Box<dyn FnOnce(PoolRecord) + Send + 'static>;

/// Monitor tuning knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub tick_ms: u64,
    pub initial_delay_ms: u64,
    pub retry_interval_ms: u64,
    pub max_retries: u32,
    pub max_pending_ms: u64,
    pub max_checks_per_tick: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            initial_delay_ms: 1000,
            retry_interval_ms: 200,
            max_retries: 15,
            max_pending_ms: 4000, // hard ceiling, independent of retry count
            max_checks_per_tick: 4,
        }
    }
}

struct PendingCheck {
    pool: PoolRecord,
    scheduled_at: Instant,
    retry_count: u32,
    resolve: Option<ResolveFn>,
}

/// Counters and time-to-liquidity samples, kept for the status log.
#[derive(Debug, Default)]
pub struct MonitorStats {
    pub total_scheduled: u64,
    pub total_found: u64,
    pub total_timed_out: u64,
    samples_ms: Vec<u64>,
}

impl MonitorStats {
    const MAX_SAMPLES: usize = 100;

    fn record_found(&mut self, elapsed_ms: u64) {
        self.total_found += 1;
        self.samples_ms.push(elapsed_ms);
        if self.samples_ms.len() > Self::MAX_SAMPLES {
            self.samples_ms.remove(0);
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_scheduled == 0 {
            return 0.0;
        }
        self.total_found as f64 * 100.0 / self.total_scheduled as f64
    }

    /// (avg, median, min, max) over the retained samples, all in ms.
    pub fn timing(&self) -> Option<(u64, u64, u64, u64)> {
        if self.samples_ms.is_empty() {
            return None;
        }
        let mut sorted = self.samples_ms.clone();
        sorted.sort_unstable();
        let avg = sorted.iter().sum::<u64>() / sorted.len() as u64;
        let median = sorted[sorted.len() / 2];
        Some((avg, median, sorted[0], sorted[sorted.len() - 1]))
    }
}

/// Snapshot used by the periodic status task.
#[derive(Debug, Clone)]
pub struct MonitorStatus {
    pub pending_checks: usize,
    pub oldest_check_ms: Option<u64>,
}

pub struct LiquidityMonitor {
    gateway: Arc<RpcGateway>,
    config: MonitorConfig,
    low_liquidity_threshold: f64,
    pending: Mutex<HashMap<(PoolSource, Pubkey), PendingCheck>>,
    stats: Mutex<MonitorStats>,
}

impl LiquidityMonitor {
    pub fn new(
        gateway: Arc<RpcGateway>,
        config: MonitorConfig,
        low_liquidity_threshold: f64,
    ) -> Self {
        Self {
            gateway,
            config,
            low_liquidity_threshold,
            pending: Mutex::new(HashMap::new()),
            stats: Mutex::new(MonitorStats::default()),
        }
    }

    /// Register a pool for delayed liquidity checking.
    ///
    /// Pools that already carry enough liquidity resolve synchronously. A
    /// second request for a key that is still pending is a no-op.
    pub fn schedule_check(&self, pool: PoolRecord, resolve: ResolveFn) {
        if pool.lp_sol >= self.low_liquidity_threshold {
            resolve(pool);
            return;
        }

        let key = (pool.source, pool.address);
        let mut pending = self.pending.lock().expect("pending checks lock");
        if pending.contains_key(&key) {
            return;
        }

        self.stats.lock().expect("monitor stats lock").total_scheduled += 1;
        pending.insert(
            key,
            PendingCheck {
                pool,
                scheduled_at: Instant::now(),
                retry_count: 0,
                resolve: Some(resolve),
            },
        );
    }

    /// Spawn the driver: one shared tick scans every pending check.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(monitor.config.tick_ms));
            loop {
                ticker.tick().await;
                monitor.tick().await;
            }
        })
    }

    async fn tick(&self) {
        let max_pending = Duration::from_millis(self.config.max_pending_ms);
        let now = Instant::now();
        let mut due: Vec<(PoolSource, Pubkey)> = Vec::new();

        {
            let mut pending = self.pending.lock().expect("pending checks lock");
            let mut expired: Vec<(PoolSource, Pubkey)> = Vec::new();
            for (key, check) in pending.iter() {
                let elapsed = now.duration_since(check.scheduled_at);
                if elapsed > max_pending {
                    expired.push(*key);
                    continue;
                }
                let due_after = Duration::from_millis(
                    self.config.initial_delay_ms
                        + u64::from(check.retry_count) * self.config.retry_interval_ms,
                );
                if elapsed >= due_after {
                    due.push(*key);
                }
            }
            for key in expired {
                pending.remove(&key);
                self.stats.lock().expect("monitor stats lock").total_timed_out += 1;
                debug!("[{}] liquidity check expired for {}", key.0, key.1);
            }
        }

        // Cap balance fetches per tick; the rest stay due for the next one.
        due.truncate(self.config.max_checks_per_tick);
        for key in due {
            self.process_check(key).await;
        }
    }

    async fn process_check(&self, key: (PoolSource, Pubkey)) {
        let Some(pool) = self
            .pending
            .lock()
            .expect("pending checks lock")
            .get(&key)
            .map(|check| check.pool.clone())
        else {
            return;
        };

        let lamports = match self.gateway.fetch_account(&key.1, key.0).await {
            Ok(account) => account.lamports,
            Err(e) => {
                // Missing account and transient errors count as "no liquidity
                // yet"; the retry budget decides when to stop asking.
                debug!("[{}] balance fetch failed for {}: {}", key.0, key.1, e);
                0
            }
        };

        if lamports > 0 {
            let resolved = self.pending.lock().expect("pending checks lock").remove(&key);
            if let Some(mut check) = resolved {
                let elapsed_ms = check.scheduled_at.elapsed().as_millis() as u64;
                self.stats
                    .lock()
                    .expect("monitor stats lock")
                    .record_found(elapsed_ms);
                let updated = pool.with_lp_sol(lamports as f64 / LAMPORTS_PER_SOL as f64);
                debug!(
                    "[{}] liquidity appeared on {} after {} ms: {:.4} SOL",
                    key.0, key.1, elapsed_ms, updated.lp_sol
                );
                if let Some(resolve) = check.resolve.take() {
                    resolve(updated);
                }
            }
        } else {
            let mut pending = self.pending.lock().expect("pending checks lock");
            if let Some(check) = pending.get_mut(&key) {
                check.retry_count += 1;
                if check.retry_count >= self.config.max_retries {
                    pending.remove(&key);
                    self.stats.lock().expect("monitor stats lock").total_timed_out += 1;
                    debug!("[{}] retries exhausted for {}", key.0, key.1);
                }
            }
        }
    }

    pub fn status(&self) -> MonitorStatus {
        let pending = self.pending.lock().expect("pending checks lock");
        let oldest_check_ms = pending
            .values()
            .map(|check| check.scheduled_at.elapsed().as_millis() as u64)
            .max();
        MonitorStatus {
            pending_checks: pending.len(),
            oldest_check_ms,
        }
    }

    pub fn stats_summary(&self) -> (u64, u64, u64, f64, Option<(u64, u64, u64, u64)>) {
        let stats = self.stats.lock().expect("monitor stats lock");
        (
            stats.total_scheduled,
            stats.total_found,
            stats.total_timed_out,
            stats.success_rate(),
            stats.timing(),
        )
    }
}
