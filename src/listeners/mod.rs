//! Per-exchange pool-creation listeners.
//!
//! Every exchange shares the same scaffolding: subscribe to its program's
//! logs, pre-filter, drain signatures through the gateway, decode a
//! [`PoolRecord`]. The scaffolding lives once in [`engine::ListenerEngine`];
//! what differs per exchange is captured by the [`PoolDecoder`] strategy.

pub mod engine;
pub mod launchlab;
pub mod meteora_dbc;
pub mod pump_amm;
pub mod pump_v1;

use crate::shared::types::{PoolRecord, PoolSource};
use serde_json::Value;
use solana_transaction_status::option_serializer::OptionSerializer;
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, EncodedTransaction, UiInstruction, UiMessage,
    UiParsedInstruction,
};

pub use launchlab::LaunchLabDecoder;
pub use meteora_dbc::MeteoraDbcDecoder;
pub use pump_amm::PumpAmmDecoder;
pub use pump_v1::PumpV1Decoder;

/// Source-specific decode strategy plugged into the shared engine.
pub trait PoolDecoder: Send + Sync + 'static {
    fn source(&self) -> PoolSource;

    /// Cheap pre-filter over raw log lines. Only shrinks the fetch volume;
    /// the real determination happens in `decode` after the transaction is
    /// fetched.
    fn wants(&self, logs: &[String]) -> bool;

    /// Reconstruct a pool record from a fetched transaction. `None` is the
    /// expected, frequent outcome for anything that is not a pool creation.
    fn decode(&self, tx: &TxView) -> Option<PoolRecord>;
}

/// A top-level instruction with its resolved account addresses.
#[derive(Debug, Clone)]
pub struct ProgramInstruction {
    pub program_id: String,
    pub accounts: Vec<String>,
}

/// A parsed inner instruction (system / spl-token) as the RPC node decoded
/// it.
#[derive(Debug, Clone)]
pub struct ParsedInner {
    pub program: String,
    pub parsed: Value,
}

/// Flattened view of a JSON-parsed transaction. Decoders work against this
/// instead of the verbose RPC response types, which also keeps their tests
/// small.
#[derive(Debug, Clone)]
pub struct TxView {
    pub signature: String,
    pub account_keys: Vec<String>,
    pub instructions: Vec<ProgramInstruction>,
    pub logs: Vec<String>,
    pub pre_token_balances: Option<usize>,
    pub inner_parsed: Vec<ParsedInner>,
}

impl TxView {
    pub fn from_encoded(
        signature: &str,
        tx: &EncodedConfirmedTransactionWithStatusMeta,
    ) -> Option<Self> {
        let EncodedTransaction::Json(ui_tx) = &tx.transaction.transaction else {
            return None;
        };
        let UiMessage::Parsed(message) = &ui_tx.message else {
            return None;
        };

        let account_keys = message
            .account_keys
            .iter()
            .map(|key| key.pubkey.clone())
            .collect();

        let mut instructions = Vec::new();
        for instruction in &message.instructions {
            match instruction {
                UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(decoded)) => {
                    instructions.push(ProgramInstruction {
                        program_id: decoded.program_id.clone(),
                        accounts: decoded.accounts.clone(),
                    });
                }
                UiInstruction::Parsed(UiParsedInstruction::Parsed(parsed)) => {
                    instructions.push(ProgramInstruction {
                        program_id: parsed.program_id.clone(),
                        accounts: Vec::new(),
                    });
                }
                UiInstruction::Compiled(_) => {}
            }
        }

        let mut logs = Vec::new();
        let mut pre_token_balances = None;
        let mut inner_parsed = Vec::new();
        if let Some(meta) = &tx.transaction.meta {
            if let OptionSerializer::Some(lines) = &meta.log_messages {
                logs = lines.clone();
            }
            if let OptionSerializer::Some(balances) = &meta.pre_token_balances {
                pre_token_balances = Some(balances.len());
            }
            if let OptionSerializer::Some(inner_sets) = &meta.inner_instructions {
                for set in inner_sets {
                    for instruction in &set.instructions {
                        if let UiInstruction::Parsed(UiParsedInstruction::Parsed(parsed)) =
                            instruction
                        {
                            inner_parsed.push(ParsedInner {
                                program: parsed.program.clone(),
                                parsed: parsed.parsed.clone(),
                            });
                        }
                    }
                }
            }
        }

        Some(Self {
            signature: signature.to_string(),
            account_keys,
            instructions,
            logs,
            pre_token_balances,
            inner_parsed,
        })
    }

    /// The program's own instruction with account addresses, if present.
    pub fn program_instruction(&self, program_id: &str) -> Option<&ProgramInstruction> {
        self.instructions
            .iter()
            .find(|instruction| {
                instruction.program_id == program_id && !instruction.accounts.is_empty()
            })
    }
}
