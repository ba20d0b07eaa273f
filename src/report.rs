// src/report.rs
//! Boundary collaborators for dispatched verdicts: a JSONL decision log, an
//! optional webhook ping, and the log-only trading stub. All best-effort;
//! a failing sink never disturbs the pipeline.

use crate::dispatch::{NewPoolSink, VerdictLog};
use crate::shared::types::{PoolRecord, SafetyVerdict};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

/// One line of the decision log.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerdictEntry {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub pool: String,
    pub mint: String,
    pub status: String,
    pub latency_ms: u64,
    pub lp_sol: f64,
    pub creator_fee: f64,
    pub estimated_slippage: f64,
    pub mint_authority: Option<String>,
    pub freeze_authority: Option<String>,
    pub reasons: Vec<String>,
}

impl VerdictEntry {
    pub fn from_verdict(verdict: &SafetyVerdict) -> Self {
        Self {
            timestamp: Utc::now(),
            source: verdict.pool.source.as_str().to_string(),
            pool: verdict.pool.address.to_string(),
            mint: verdict.pool.mint.to_string(),
            status: verdict.status.as_str().to_string(),
            latency_ms: verdict.latency_ms,
            lp_sol: verdict.pool.lp_sol,
            creator_fee: verdict.pool.creator_fee,
            estimated_slippage: verdict.pool.estimated_slippage,
            mint_authority: verdict.pool.mint_authority.as_log_field(),
            freeze_authority: verdict.pool.freeze_authority.as_log_field(),
            reasons: verdict.reasons.clone(),
        }
    }
}

/// Appends every decision to a JSONL file and optionally pings a webhook.
pub struct VerdictRecorder {
    log_path: PathBuf,
    webhook: Option<(reqwest::Client, String)>,
}

impl VerdictRecorder {
    pub fn new(log_path: &str, webhook_url: Option<String>) -> Self {
        Self {
            log_path: PathBuf::from(log_path),
            webhook: webhook_url.map(|url| (reqwest::Client::new(), url)),
        }
    }

    fn append_entry(&self, entry: &VerdictEntry) -> std::io::Result<()> {
        if let Some(dir) = self.log_path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let line = serde_json::to_string(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(file, "{}", line)
    }

    async fn notify(&self, entry: &VerdictEntry) {
        let Some((client, url)) = &self.webhook else {
            return;
        };
        let marker = if entry.status == "SAFE" { "✅" } else { "⛔" };
        let body = serde_json::json!({
            "content": format!(
                "{} {} – Pool: {} | {} | {:.2} SOL | {} ms",
                marker, entry.status, entry.pool, entry.source, entry.lp_sol, entry.latency_ms
            )
        });
        if let Err(e) = client.post(url).json(&body).send().await {
            warn!("webhook notification failed: {}", e);
        }
    }

    async fn record(&self, entry: VerdictEntry) {
        if let Err(e) = self.append_entry(&entry) {
            warn!("failed to append decision log: {}", e);
        }
        self.notify(&entry).await;
    }
}

#[async_trait]
impl VerdictLog for VerdictRecorder {
    async fn log_safe_pool(&self, verdict: &SafetyVerdict) {
        self.record(VerdictEntry::from_verdict(verdict)).await;
    }

    async fn log_blocked_pool(&self, verdict: &SafetyVerdict, _pool: &PoolRecord) {
        self.record(VerdictEntry::from_verdict(verdict)).await;
    }
}

/// Trading callback used when no execution backend is wired in.
pub struct LogOnlySink;

#[async_trait]
impl NewPoolSink for LogOnlySink {
    async fn on_new_pool(&self, pool: &PoolRecord) {
        info!(
            "🚀 [{}] SAFE pool ready for trading: {} (mint {}, {:.4} SOL)",
            pool.source, pool.address, pool.mint, pool.lp_sol
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::{Authority, PoolSource, SafetyStatus};
    use solana_sdk::pubkey::Pubkey;

    fn verdict() -> SafetyVerdict {
        SafetyVerdict {
            pool: PoolRecord {
                address: Pubkey::new_unique(),
                mint: Pubkey::new_unique(),
                creator: Pubkey::new_unique(),
                source: PoolSource::PumpAmm,
                lp_sol: 2.0,
                mint_authority: Authority::Revoked,
                freeze_authority: Authority::Held(Pubkey::new_unique()),
                creator_fee: 0.0,
                estimated_slippage: 0.0,
            },
            status: SafetyStatus::Blocked,
            reasons: vec!["Freeze authority present".to_string()],
            latency_ms: 42,
        }
    }

    #[test]
    fn test_entry_serialization_round_trip() {
        let entry = VerdictEntry::from_verdict(&verdict());
        let line = serde_json::to_string(&entry).unwrap();
        let parsed: VerdictEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.status, "BLOCKED");
        assert_eq!(parsed.mint_authority, None);
        assert!(parsed.freeze_authority.is_some());
        assert_eq!(parsed.reasons, entry.reasons);
    }

    #[tokio::test]
    async fn test_recorder_appends_jsonl_lines() {
        let dir = std::env::temp_dir().join(format!("poolscout-test-{}", std::process::id()));
        let path = dir.join("decisions.jsonl");
        let recorder = VerdictRecorder::new(path.to_str().unwrap(), None);

        let verdict = verdict();
        recorder.log_blocked_pool(&verdict, &verdict.pool).await;
        recorder.log_safe_pool(&verdict).await;

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
