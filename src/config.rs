use crate::monitor::MonitorConfig;
use crate::safety::{SafetyPolicy, ShortHoldPolicy};
use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashSet;
use std::str::FromStr;
use std::{fs, path::Path};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcCfg {
    pub http_url: String,
    pub ws_url: String,
    /// Delay between queued RPC calls; the global call rate is bounded by
    /// 1000 / this value.
    pub request_delay_ms: u64,
}

impl Default for RpcCfg {
    fn default() -> Self {
        Self {
            http_url: "https://api.mainnet-beta.solana.com".to_string(),
            ws_url: "wss://api.mainnet-beta.solana.com".to_string(),
            request_delay_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenerCfg {
    pub enabled: bool,
    pub drain_interval_ms: u64,
    /// Startup offset so listeners never submit to the gateway in the same
    /// tick.
    pub start_offset_ms: u64,
    pub dedup_capacity: usize,
}

impl Default for ListenerCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            drain_interval_ms: 400,
            start_offset_ms: 0,
            dedup_capacity: 8192,
        }
    }
}

impl ListenerCfg {
    fn with_offset(start_offset_ms: u64) -> Self {
        Self {
            start_offset_ms,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenersCfg {
    pub pump_v1: ListenerCfg,
    pub pump_amm: ListenerCfg,
    pub launchlab: ListenerCfg,
    pub meteora_dbc: ListenerCfg,
}

impl Default for ListenersCfg {
    fn default() -> Self {
        Self {
            pump_v1: ListenerCfg::with_offset(0),
            pump_amm: ListenerCfg::with_offset(100),
            launchlab: ListenerCfg::with_offset(200),
            meteora_dbc: ListenerCfg::with_offset(300),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SafetyCfg {
    /// Below this a pool is handed to the liquidity monitor.
    pub low_liquidity_threshold_sol: f64,
    pub lp_floor_sol: f64,
    pub latency_ceiling_ms: u64,
    pub max_creator_fee_pct: f64,
    pub max_slippage_pct: f64,
    pub blacklist: Vec<String>,
    pub short_hold: ShortHoldPolicy,
}

impl Default for SafetyCfg {
    fn default() -> Self {
        Self {
            low_liquidity_threshold_sol: 0.1,
            lp_floor_sol: 1.0,
            latency_ceiling_ms: 150,
            max_creator_fee_pct: 5.0,
            max_slippage_pct: 3.0,
            blacklist: Vec::new(),
            short_hold: ShortHoldPolicy::default(),
        }
    }
}

impl SafetyCfg {
    pub fn policy(&self) -> Result<SafetyPolicy> {
        let mut blacklist = HashSet::new();
        for entry in &self.blacklist {
            let mint = Pubkey::from_str(entry)
                .with_context(|| format!("invalid blacklisted mint: {}", entry))?;
            blacklist.insert(mint);
        }
        Ok(SafetyPolicy {
            lp_floor_sol: self.lp_floor_sol,
            latency_ceiling_ms: self.latency_ceiling_ms,
            max_creator_fee_pct: self.max_creator_fee_pct,
            max_slippage_pct: self.max_slippage_pct,
            blacklist,
            short_hold: self.short_hold.clone(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifyCfg {
    pub webhook_url: Option<String>,
    pub verdict_log_path: String,
}

impl Default for NotifyCfg {
    fn default() -> Self {
        Self {
            webhook_url: None,
            verdict_log_path: "logs/safety_checks.jsonl".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rpc: RpcCfg,
    pub listeners: ListenersCfg,
    pub monitor: MonitorConfig,
    pub safety: SafetyCfg,
    pub notify: NotifyCfg,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path.as_ref())?;
        let cfg: Self = toml::from_str(&s).context("parse poolscout.toml")?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.rpc.request_delay_ms, 100);
        assert_eq!(cfg.safety.lp_floor_sol, 1.0);
        assert_eq!(cfg.monitor.max_retries, 15);
        assert!(cfg.listeners.pump_v1.enabled);
        // Staggered offsets keep listeners off each other's ticks.
        assert_ne!(
            cfg.listeners.pump_v1.start_offset_ms,
            cfg.listeners.pump_amm.start_offset_ms
        );
    }

    #[test]
    fn test_partial_config_overrides_one_section() {
        let cfg: Config = toml::from_str(
            r#"
            [safety]
            lp_floor_sol = 2.5

            [safety.short_hold]
            enabled = true

            [listeners.launchlab]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.safety.lp_floor_sol, 2.5);
        assert!(cfg.safety.short_hold.enabled);
        assert_eq!(cfg.safety.short_hold.min_lp_sol, 1.5);
        assert!(!cfg.listeners.launchlab.enabled);
        assert!(cfg.listeners.pump_v1.enabled);
    }

    #[test]
    fn test_policy_rejects_bad_blacklist_entry() {
        let cfg = SafetyCfg {
            blacklist: vec!["not-a-pubkey".to_string()],
            ..SafetyCfg::default()
        };
        assert!(cfg.policy().is_err());
    }
}
