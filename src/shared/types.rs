//! Core data model shared across the detection pipeline

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::fmt;

/// Exchange programs we watch for pool creations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolSource {
    PumpV1,
    PumpAmm,
    LaunchLab,
    MeteoraDbc,
}

impl PoolSource {
    pub const ALL: [PoolSource; 4] = [
        PoolSource::PumpV1,
        PoolSource::PumpAmm,
        PoolSource::LaunchLab,
        PoolSource::MeteoraDbc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PoolSource::PumpV1 => "PumpV1",
            PoolSource::PumpAmm => "PumpAMM",
            PoolSource::LaunchLab => "LaunchLab",
            PoolSource::MeteoraDbc => "MeteoraDBC",
        }
    }

    pub fn program_id(&self) -> &'static str {
        match self {
            PoolSource::PumpV1 => "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P",
            PoolSource::PumpAmm => "pAMMBay6oceH9fJKBRHGP5D4bD4sWpmSwMn52FMfXEA",
            PoolSource::LaunchLab => "LanMV9sAd7wArD4vJFi2qDdfnVhFxYSUg6eADduJ3uj",
            PoolSource::MeteoraDbc => "dbcij3LWUppWqq96dh6gJWwBifmcGfLSB5D4DuSMaqN",
        }
    }

    pub fn from_program_id(program_id: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|source| source.program_id() == program_id)
    }
}

impl fmt::Display for PoolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An on-chain authority over a mint, as far as we have resolved it.
///
/// `Unknown` means the chain has not been consulted yet; `Revoked` means the
/// authority option is unset on-chain, which is the safe state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    Unknown,
    Revoked,
    Held(Pubkey),
}

impl Authority {
    pub fn is_held(&self) -> bool {
        matches!(self, Authority::Held(_))
    }

    /// Log-friendly representation: `None` for a revoked authority, the
    /// holder key when held, the sentinel string while unresolved.
    pub fn as_log_field(&self) -> Option<String> {
        match self {
            Authority::Unknown => Some("UNKNOWN".to_string()),
            Authority::Revoked => None,
            Authority::Held(key) => Some(key.to_string()),
        }
    }
}

/// Canonical unit produced by every listener's decode step.
///
/// `address` and `mint` never change after creation; `lp_sol` and the two
/// authority fields may be overwritten later, but only with fresher
/// on-chain data.
#[derive(Debug, Clone)]
pub struct PoolRecord {
    pub address: Pubkey,
    pub mint: Pubkey,
    pub creator: Pubkey,
    pub source: PoolSource,
    pub lp_sol: f64,
    pub mint_authority: Authority,
    pub freeze_authority: Authority,
    pub creator_fee: f64,
    pub estimated_slippage: f64,
}

impl PoolRecord {
    /// Clone-and-update with a freshly observed liquidity balance.
    pub fn with_lp_sol(&self, lp_sol: f64) -> Self {
        let mut updated = self.clone();
        updated.lp_sol = lp_sol;
        updated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyStatus {
    Safe,
    Blocked,
}

impl SafetyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyStatus::Safe => "SAFE",
            SafetyStatus::Blocked => "BLOCKED",
        }
    }
}

/// Outcome of one safety evaluation. Created once per dispatched decision,
/// never reused.
#[derive(Debug, Clone)]
pub struct SafetyVerdict {
    pub pool: PoolRecord,
    pub status: SafetyStatus,
    pub reasons: Vec<String>,
    pub latency_ms: u64,
}

impl SafetyVerdict {
    pub fn is_safe(&self) -> bool {
        self.status == SafetyStatus::Safe
    }
}
