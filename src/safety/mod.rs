//! Safety evaluation of freshly detected pools.
//!
//! The evaluator fetches the token's mint account, parses the authority
//! fields out of the fixed SPL mint layout and applies the policy
//! thresholds. It never fails: anything unexpected produces a BLOCKED
//! verdict with a generic reason.

use crate::layout::{read_optional_key, FieldSpec};
use crate::rpc::RpcGateway;
use crate::shared::errors::LayoutError;
use crate::shared::types::{Authority, PoolRecord, SafetyStatus, SafetyVerdict};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// SPL token mint layout, v1. Two COption<Pubkey> authorities around the
/// supply/decimals block; anything shorter than the full account is
/// malformed.
pub const MINT_ACCOUNT_LEN: usize = 82;
pub const MINT_AUTHORITY_TAG: FieldSpec = FieldSpec::new("mint_authority_tag", 0, 4);
pub const MINT_AUTHORITY_KEY: FieldSpec = FieldSpec::new("mint_authority_key", 4, 32);
pub const FREEZE_AUTHORITY_TAG: FieldSpec = FieldSpec::new("freeze_authority_tag", 46, 4);
pub const FREEZE_AUTHORITY_KEY: FieldSpec = FieldSpec::new("freeze_authority_key", 50, 32);

/// Parse the two authority fields from raw mint account bytes.
pub fn parse_mint_authorities(data: &[u8]) -> Result<(Authority, Authority), LayoutError> {
    if data.len() < MINT_ACCOUNT_LEN {
        return Err(LayoutError::OutOfBounds {
            field: "mint_account",
            end: MINT_ACCOUNT_LEN,
            have: data.len(),
        });
    }
    let mint_authority = match read_optional_key(data, &MINT_AUTHORITY_TAG, &MINT_AUTHORITY_KEY)? {
        Some(key) => Authority::Held(key),
        None => Authority::Revoked,
    };
    let freeze_authority =
        match read_optional_key(data, &FREEZE_AUTHORITY_TAG, &FREEZE_AUTHORITY_KEY)? {
            Some(key) => Authority::Held(key),
            None => Authority::Revoked,
        };
    Ok((mint_authority, freeze_authority))
}

/// Freeze-authority leniency for short-hold operation: a held freeze
/// authority is tolerated when liquidity is deep enough and the decision is
/// fast enough to get out before a freeze could land.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShortHoldPolicy {
    pub enabled: bool,
    pub min_lp_sol: f64,
    pub latency_ceiling_ms: u64,
}

impl Default for ShortHoldPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            min_lp_sol: 1.5,
            latency_ceiling_ms: 130,
        }
    }
}

/// Policy thresholds applied to every pool.
#[derive(Debug, Clone)]
pub struct SafetyPolicy {
    pub lp_floor_sol: f64,
    pub latency_ceiling_ms: u64,
    pub max_creator_fee_pct: f64,
    pub max_slippage_pct: f64,
    pub blacklist: HashSet<Pubkey>,
    pub short_hold: ShortHoldPolicy,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            lp_floor_sol: 1.0,
            latency_ceiling_ms: 150,
            max_creator_fee_pct: 5.0,
            max_slippage_pct: 3.0,
            blacklist: HashSet::new(),
            short_hold: ShortHoldPolicy::default(),
        }
    }
}

impl SafetyPolicy {
    /// Collect every violated rule. Rules never short-circuit, so the final
    /// log line explains all causes at once.
    pub fn violations(&self, pool: &PoolRecord, latency_ms: u64) -> Vec<String> {
        let mut reasons = Vec::new();

        if pool.mint_authority.is_held() {
            reasons.push("Mint authority present".to_string());
        }

        let mut lenient = false;
        if pool.freeze_authority.is_held() {
            lenient = self.short_hold.enabled
                && pool.lp_sol >= self.short_hold.min_lp_sol
                && latency_ms < self.short_hold.latency_ceiling_ms;
            if !lenient {
                reasons.push("Freeze authority present".to_string());
            }
        }

        if pool.lp_sol < self.lp_floor_sol {
            reasons.push(format!("LP too low ({} SOL)", pool.lp_sol));
        }

        if self.blacklist.contains(&pool.mint) {
            reasons.push("Mint is blacklisted".to_string());
        }

        if pool.creator_fee > self.max_creator_fee_pct {
            reasons.push(format!("Creator fee too high ({}%)", pool.creator_fee));
        }

        if pool.estimated_slippage > self.max_slippage_pct {
            reasons.push(format!(
                "Slippage too high ({}%)",
                pool.estimated_slippage
            ));
        }

        // Leniency tightens the latency budget for the whole decision.
        let ceiling = if lenient {
            self.short_hold.latency_ceiling_ms
        } else {
            self.latency_ceiling_ms
        };
        if latency_ms >= ceiling {
            reasons.push(format!("Safety check too slow ({} ms)", latency_ms));
        }

        reasons
    }
}

pub struct SafetyEvaluator {
    gateway: Arc<RpcGateway>,
    policy: SafetyPolicy,
}

impl SafetyEvaluator {
    pub fn new(gateway: Arc<RpcGateway>, policy: SafetyPolicy) -> Self {
        Self { gateway, policy }
    }

    /// Render a verdict for one pool. Infallible by contract: fetch or
    /// parse problems fail closed into a BLOCKED verdict.
    pub async fn evaluate(&self, pool: &PoolRecord) -> SafetyVerdict {
        let started = Instant::now();
        let mut record = pool.clone();

        match self.resolve_authorities(&record).await {
            Ok((mint_authority, freeze_authority)) => {
                record.mint_authority = mint_authority;
                record.freeze_authority = freeze_authority;
            }
            Err(reason) => {
                warn!(
                    "[{}] safety evaluation failed for {}: {}",
                    record.source, record.mint, reason
                );
                return SafetyVerdict {
                    pool: record,
                    status: SafetyStatus::Blocked,
                    reasons: vec!["evaluation failed".to_string()],
                    latency_ms: started.elapsed().as_millis() as u64,
                };
            }
        }

        let latency_ms = started.elapsed().as_millis() as u64;
        let reasons = self.policy.violations(&record, latency_ms);
        let status = if reasons.is_empty() {
            SafetyStatus::Safe
        } else {
            SafetyStatus::Blocked
        };
        SafetyVerdict {
            pool: record,
            status,
            reasons,
            latency_ms,
        }
    }

    async fn resolve_authorities(
        &self,
        pool: &PoolRecord,
    ) -> Result<(Authority, Authority), String> {
        let account = self
            .gateway
            .fetch_account(&pool.mint, pool.source)
            .await
            .map_err(|e| e.to_string())?;
        parse_mint_authorities(&account.data).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{GatewayRequest, GatewayResponse, RpcTransport};
    use crate::shared::errors::RemoteError;
    use crate::shared::types::PoolSource;
    use async_trait::async_trait;
    use solana_sdk::account::Account;

    fn mint_data(mint_authority: Option<Pubkey>, freeze_authority: Option<Pubkey>) -> Vec<u8> {
        let mut data = vec![0u8; MINT_ACCOUNT_LEN];
        if let Some(key) = mint_authority {
            data[0] = 1;
            data[4..36].copy_from_slice(key.as_ref());
        }
        if let Some(key) = freeze_authority {
            data[46] = 1;
            data[50..82].copy_from_slice(key.as_ref());
        }
        data
    }

    fn pool(lp_sol: f64, mint_authority: Authority, freeze_authority: Authority) -> PoolRecord {
        PoolRecord {
            address: Pubkey::new_unique(),
            mint: Pubkey::new_unique(),
            creator: Pubkey::new_unique(),
            source: PoolSource::LaunchLab,
            lp_sol,
            mint_authority,
            freeze_authority,
            creator_fee: 0.0,
            estimated_slippage: 0.0,
        }
    }

    #[test]
    fn test_parse_mint_authorities_present() {
        let mint_key = Pubkey::new_unique();
        let data = mint_data(Some(mint_key), None);
        let (mint, freeze) = parse_mint_authorities(&data).unwrap();
        assert_eq!(mint, Authority::Held(mint_key));
        assert_eq!(freeze, Authority::Revoked);
    }

    #[test]
    fn test_parse_mint_authorities_truncated_fails_closed() {
        let data = vec![0u8; MINT_ACCOUNT_LEN - 1];
        assert!(parse_mint_authorities(&data).is_err());
    }

    #[test]
    fn test_parse_mint_authorities_bad_tag_fails_closed() {
        let mut data = vec![0u8; MINT_ACCOUNT_LEN];
        data[0] = 2;
        assert!(parse_mint_authorities(&data).is_err());
    }

    #[test]
    fn test_mint_authority_always_blocks() {
        let policy = SafetyPolicy::default();
        let record = pool(50.0, Authority::Held(Pubkey::new_unique()), Authority::Revoked);
        let reasons = policy.violations(&record, 10);
        assert!(reasons.contains(&"Mint authority present".to_string()));
    }

    #[test]
    fn test_low_lp_is_the_only_reason() {
        let policy = SafetyPolicy::default();
        let record = pool(0.5, Authority::Revoked, Authority::Revoked);
        let reasons = policy.violations(&record, 10);
        assert_eq!(reasons, vec!["LP too low (0.5 SOL)".to_string()]);
    }

    #[test]
    fn test_clean_pool_is_safe() {
        let policy = SafetyPolicy::default();
        let record = pool(2.0, Authority::Revoked, Authority::Revoked);
        assert!(policy.violations(&record, 80).is_empty());
    }

    #[test]
    fn test_short_hold_tolerates_freeze_authority() {
        let policy = SafetyPolicy {
            short_hold: ShortHoldPolicy {
                enabled: true,
                ..ShortHoldPolicy::default()
            },
            ..SafetyPolicy::default()
        };
        let record = pool(1.5, Authority::Revoked, Authority::Held(Pubkey::new_unique()));
        assert!(policy.violations(&record, 120).is_empty());

        let thin = pool(0.5, Authority::Revoked, Authority::Held(Pubkey::new_unique()));
        let reasons = policy.violations(&thin, 120);
        assert!(reasons.contains(&"LP too low (0.5 SOL)".to_string()));
    }

    #[test]
    fn test_short_hold_off_blocks_freeze_authority() {
        let policy = SafetyPolicy::default();
        let record = pool(1.5, Authority::Revoked, Authority::Held(Pubkey::new_unique()));
        let reasons = policy.violations(&record, 120);
        assert_eq!(reasons, vec!["Freeze authority present".to_string()]);
    }

    #[test]
    fn test_latency_ceiling_blocks() {
        let policy = SafetyPolicy::default();
        let record = pool(2.0, Authority::Revoked, Authority::Revoked);
        let reasons = policy.violations(&record, 150);
        assert_eq!(reasons, vec!["Safety check too slow (150 ms)".to_string()]);
    }

    #[test]
    fn test_blacklisted_mint_blocks() {
        let record = pool(2.0, Authority::Revoked, Authority::Revoked);
        let mut policy = SafetyPolicy::default();
        policy.blacklist.insert(record.mint);
        let reasons = policy.violations(&record, 10);
        assert_eq!(reasons, vec!["Mint is blacklisted".to_string()]);
    }

    struct MintTransport {
        data: Vec<u8>,
    }

    #[async_trait]
    impl RpcTransport for MintTransport {
        async fn execute(&self, request: &GatewayRequest) -> Result<GatewayResponse, RemoteError> {
            match request {
                GatewayRequest::Account(_) => Ok(GatewayResponse::Account(Account {
                    lamports: 1_000_000,
                    data: self.data.clone(),
                    owner: spl_token::id(),
                    executable: false,
                    rent_epoch: 0,
                })),
                _ => Err(RemoteError::Rpc("unexpected request".to_string())),
            }
        }
    }

    fn evaluator_with_mint(data: Vec<u8>) -> SafetyEvaluator {
        let gateway = Arc::new(RpcGateway::with_transport(
            Arc::new(MintTransport { data }),
            1,
        ));
        gateway.start();
        SafetyEvaluator::new(gateway, SafetyPolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_evaluate_blocks_on_held_mint_authority() {
        let evaluator = evaluator_with_mint(mint_data(Some(Pubkey::new_unique()), None));
        let verdict = evaluator.evaluate(&pool(2.0, Authority::Unknown, Authority::Unknown)).await;
        assert_eq!(verdict.status, SafetyStatus::Blocked);
        assert!(verdict
            .reasons
            .contains(&"Mint authority present".to_string()));
        assert!(verdict.pool.mint_authority.is_held());
    }

    #[tokio::test(start_paused = true)]
    async fn test_evaluate_passes_clean_mint() {
        let evaluator = evaluator_with_mint(mint_data(None, None));
        let verdict = evaluator.evaluate(&pool(2.0, Authority::Unknown, Authority::Unknown)).await;
        assert_eq!(verdict.status, SafetyStatus::Safe);
        assert!(verdict.reasons.is_empty());
        assert_eq!(verdict.pool.mint_authority, Authority::Revoked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evaluate_fails_closed_on_garbage_account() {
        let evaluator = evaluator_with_mint(vec![0u8; 10]);
        let verdict = evaluator.evaluate(&pool(2.0, Authority::Unknown, Authority::Unknown)).await;
        assert_eq!(verdict.status, SafetyStatus::Blocked);
        assert_eq!(verdict.reasons, vec!["evaluation failed".to_string()]);
    }
}
