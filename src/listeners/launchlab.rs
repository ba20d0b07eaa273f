//! Raydium LaunchLab pool creations.
//!
//! No event payload here: the CreatePool instruction is recognized by its
//! log line and the record is read from the instruction's fixed account
//! ordering. Liquidity starts at zero and is resolved by the liquidity
//! monitor.

use crate::listeners::{PoolDecoder, TxView};
use crate::shared::types::{Authority, PoolRecord, PoolSource};
use solana_sdk::pubkey::Pubkey;

const CREATE_LOG: &str = "Instruction: CreatePool";

// Account ordering of the CreatePool instruction.
const CREATOR_INDEX: usize = 1;
const POOL_STATE_INDEX: usize = 5;
const BASE_MINT_INDEX: usize = 6;

pub struct LaunchLabDecoder;

impl PoolDecoder for LaunchLabDecoder {
    fn source(&self) -> PoolSource {
        PoolSource::LaunchLab
    }

    fn wants(&self, logs: &[String]) -> bool {
        logs.iter().any(|line| line.contains(CREATE_LOG))
    }

    fn decode(&self, tx: &TxView) -> Option<PoolRecord> {
        if !tx.logs.iter().any(|line| line.contains(CREATE_LOG)) {
            return None;
        }
        let instruction = tx.program_instruction(self.source().program_id())?;

        let creator: Pubkey = instruction.accounts.get(CREATOR_INDEX)?.parse().ok()?;
        let address: Pubkey = instruction.accounts.get(POOL_STATE_INDEX)?.parse().ok()?;
        let mint: Pubkey = instruction.accounts.get(BASE_MINT_INDEX)?.parse().ok()?;

        Some(PoolRecord {
            address,
            mint,
            creator,
            source: PoolSource::LaunchLab,
            lp_sol: 0.0,
            mint_authority: Authority::Unknown,
            freeze_authority: Authority::Unknown,
            creator_fee: 0.0,
            estimated_slippage: 0.0,
        })
    }
}
