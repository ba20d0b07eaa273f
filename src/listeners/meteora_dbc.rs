//! Meteora dynamic bonding curve pool creations.
//!
//! Same shape as LaunchLab: the initialize instruction is recognized by its
//! log line, accounts sit at fixed positions, and liquidity is resolved
//! later by the monitor.

use crate::listeners::{PoolDecoder, TxView};
use crate::shared::types::{Authority, PoolRecord, PoolSource};
use solana_sdk::pubkey::Pubkey;

const INITIALIZE_LOG: &str = "Instruction: InitializeVirtualPoolWithSplToken";

// Account ordering of the initialize instruction.
const CREATOR_INDEX: usize = 2;
const BASE_MINT_INDEX: usize = 3;
const POOL_STATE_INDEX: usize = 5;

pub struct MeteoraDbcDecoder;

impl PoolDecoder for MeteoraDbcDecoder {
    fn source(&self) -> PoolSource {
        PoolSource::MeteoraDbc
    }

    fn wants(&self, logs: &[String]) -> bool {
        logs.iter().any(|line| line.contains(INITIALIZE_LOG))
    }

    fn decode(&self, tx: &TxView) -> Option<PoolRecord> {
        if !tx.logs.iter().any(|line| line.contains(INITIALIZE_LOG)) {
            return None;
        }
        let instruction = tx.program_instruction(self.source().program_id())?;

        let creator: Pubkey = instruction.accounts.get(CREATOR_INDEX)?.parse().ok()?;
        let mint: Pubkey = instruction.accounts.get(BASE_MINT_INDEX)?.parse().ok()?;
        let address: Pubkey = instruction.accounts.get(POOL_STATE_INDEX)?.parse().ok()?;

        Some(PoolRecord {
            address,
            mint,
            creator,
            source: PoolSource::MeteoraDbc,
            lp_sol: 0.0,
            mint_authority: Authority::Unknown,
            freeze_authority: Authority::Unknown,
            creator_fee: 0.0,
            estimated_slippage: 0.0,
        })
    }
}
