//! Pump.fun V1 bonding-curve creations.
//!
//! There is no structured creation event; the record is reconstructed from
//! the transaction itself: fixed account ordering plus the parsed inner
//! instructions (authority revocation, funding transfer into the curve).

use crate::listeners::{PoolDecoder, TxView};
use crate::shared::types::{Authority, PoolRecord, PoolSource};
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;

pub struct PumpV1Decoder;

impl PoolDecoder for PumpV1Decoder {
    fn source(&self) -> PoolSource {
        PoolSource::PumpV1
    }

    fn wants(&self, logs: &[String]) -> bool {
        logs.iter().any(|line| line.contains("Instruction: Create"))
    }

    fn decode(&self, tx: &TxView) -> Option<PoolRecord> {
        // A creation transaction has no pre-existing token balances.
        if tx.pre_token_balances? != 0 {
            return None;
        }
        let program_id = self.source().program_id();
        if !tx
            .instructions
            .iter()
            .any(|instruction| instruction.program_id == program_id)
        {
            return None;
        }

        // Fixed account ordering: fee payer, mint, bonding curve.
        let creator: Pubkey = tx.account_keys.first()?.parse().ok()?;
        let mint: Pubkey = tx.account_keys.get(1)?.parse().ok()?;
        let curve_key = tx.account_keys.get(2)?;
        let address: Pubkey = curve_key.parse().ok()?;

        let mut mint_authority = Authority::Unknown;
        let mut curve_lamports = 0u64;
        for inner in &tx.inner_parsed {
            match inner.program.as_str() {
                "spl-token" => {
                    if inner.parsed["type"] == "setAuthority"
                        && inner.parsed["info"]["authorityType"] == "mintTokens"
                        && inner.parsed["info"]["newAuthority"].is_null()
                    {
                        mint_authority = Authority::Revoked;
                    }
                }
                "system" => {
                    // The funding transfer into the curve carries the
                    // initial liquidity.
                    if inner.parsed["type"] == "transfer"
                        && inner.parsed["info"]["destination"] == curve_key.as_str()
                    {
                        if let Some(lamports) = inner.parsed["info"]["lamports"].as_u64() {
                            curve_lamports = curve_lamports.max(lamports);
                        }
                    }
                }
                _ => {}
            }
        }

        Some(PoolRecord {
            address,
            mint,
            creator,
            source: PoolSource::PumpV1,
            lp_sol: curve_lamports as f64 / LAMPORTS_PER_SOL as f64,
            mint_authority,
            // Pump.fun mints never carry a freeze authority.
            freeze_authority: Authority::Revoked,
            creator_fee: 0.0,
            estimated_slippage: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listeners::{ParsedInner, ProgramInstruction};
    use serde_json::json;

    fn creation_view() -> TxView {
        let creator = Pubkey::new_unique().to_string();
        let mint = Pubkey::new_unique().to_string();
        let curve = Pubkey::new_unique().to_string();
        let program_id = PoolSource::PumpV1.program_id().to_string();

        TxView {
            signature: "sig".to_string(),
            account_keys: vec![creator, mint, curve.clone()],
            instructions: vec![ProgramInstruction {
                program_id,
                accounts: Vec::new(),
            }],
            logs: vec!["Program log: Instruction: Create".to_string()],
            pre_token_balances: Some(0),
            inner_parsed: vec![
                ParsedInner {
                    program: "spl-token".to_string(),
                    parsed: json!({
                        "type": "setAuthority",
                        "info": {
                            "authorityType": "mintTokens",
                            "newAuthority": null
                        }
                    }),
                },
                ParsedInner {
                    program: "system".to_string(),
                    parsed: json!({
                        "type": "transfer",
                        "info": {
                            "destination": curve,
                            "lamports": 500_000_000u64
                        }
                    }),
                },
                ParsedInner {
                    program: "system".to_string(),
                    parsed: json!({
                        "type": "transfer",
                        "info": {
                            "destination": Pubkey::new_unique().to_string(),
                            "lamports": 9_000_000_000u64
                        }
                    }),
                },
            ],
        }
    }

    #[test]
    fn test_decodes_creation_with_revoked_authority() {
        let view = creation_view();
        let record = PumpV1Decoder.decode(&view).expect("decoded record");
        assert_eq!(record.source, PoolSource::PumpV1);
        assert_eq!(record.creator.to_string(), view.account_keys[0]);
        assert_eq!(record.mint.to_string(), view.account_keys[1]);
        assert_eq!(record.address.to_string(), view.account_keys[2]);
        assert_eq!(record.mint_authority, Authority::Revoked);
        // Only the transfer into the curve counts.
        assert!((record.lp_sol - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_tx_with_existing_token_balances() {
        let mut view = creation_view();
        view.pre_token_balances = Some(2);
        assert!(PumpV1Decoder.decode(&view).is_none());
    }

    #[test]
    fn test_rejects_tx_without_program_instruction() {
        let mut view = creation_view();
        view.instructions.clear();
        assert!(PumpV1Decoder.decode(&view).is_none());
    }

    #[test]
    fn test_authority_unknown_without_revocation() {
        let mut view = creation_view();
        view.inner_parsed.remove(0);
        let record = PumpV1Decoder.decode(&view).expect("decoded record");
        assert_eq!(record.mint_authority, Authority::Unknown);
    }
}
