//! Pump.fun AMM pool creations.
//!
//! The program logs a structured CreatePool event as a base64 `Program data:`
//! line: an 8-byte discriminator followed by a fixed field sequence. The
//! event itself carries everything the record needs, including the initial
//! quote liquidity.

use crate::layout::ByteReader;
use crate::listeners::{PoolDecoder, TxView};
use crate::shared::errors::LayoutError;
use crate::shared::types::{Authority, PoolRecord, PoolSource};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

const EVENT_LOG_PREFIX: &str = "Program data: ";
const EVENT_DISCRIMINATOR_LEN: usize = 8;

/// Fields of the CreatePool event we act on.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePoolEvent {
    pub creator: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub quote_amount_in: u64,
    pub pool: Pubkey,
}

/// Walk the event payload field by field; any truncation fails closed.
pub fn parse_create_pool_event(payload: &[u8]) -> Result<CreatePoolEvent, LayoutError> {
    let mut reader = ByteReader::new(payload);
    reader.skip(EVENT_DISCRIMINATOR_LEN, "event_discriminator")?;
    reader.skip(8, "timestamp")?;
    reader.skip(2, "index")?;
    let creator = reader.read_pubkey("creator")?;
    let base_mint = reader.read_pubkey("base_mint")?;
    let quote_mint = reader.read_pubkey("quote_mint")?;
    reader.skip(1, "base_mint_decimals")?;
    reader.skip(1, "quote_mint_decimals")?;
    reader.skip(8, "base_amount_in")?;
    let quote_amount_in = reader.read_u64_le("quote_amount_in")?;
    reader.skip(8, "pool_base_amount")?;
    reader.skip(8, "pool_quote_amount")?;
    reader.skip(8, "minimum_liquidity")?;
    reader.skip(8, "initial_liquidity")?;
    reader.skip(8, "lp_token_amount_out")?;
    reader.skip(1, "pool_bump")?;
    let pool = reader.read_pubkey("pool")?;
    Ok(CreatePoolEvent {
        creator,
        base_mint,
        quote_mint,
        quote_amount_in,
        pool,
    })
}

pub struct PumpAmmDecoder;

impl PoolDecoder for PumpAmmDecoder {
    fn source(&self) -> PoolSource {
        PoolSource::PumpAmm
    }

    fn wants(&self, logs: &[String]) -> bool {
        logs.iter().any(|line| line.starts_with(EVENT_LOG_PREFIX))
    }

    fn decode(&self, tx: &TxView) -> Option<PoolRecord> {
        let event_line = tx
            .logs
            .iter()
            .find(|line| line.starts_with(EVENT_LOG_PREFIX))?;
        let payload = BASE64.decode(&event_line[EVENT_LOG_PREFIX.len()..]).ok()?;

        let event = match parse_create_pool_event(&payload) {
            Ok(event) => event,
            Err(e) => {
                if payload.len() >= EVENT_DISCRIMINATOR_LEN {
                    debug!(
                        "[{}] event payload did not decode (discriminator {}): {}",
                        self.source(),
                        hex::encode(&payload[..EVENT_DISCRIMINATOR_LEN]),
                        e
                    );
                }
                return None;
            }
        };

        // Only SOL pairs are tradable for us.
        if event.quote_mint != spl_token::native_mint::id() {
            return None;
        }

        Some(PoolRecord {
            address: event.pool,
            mint: event.base_mint,
            creator: event.creator,
            source: PoolSource::PumpAmm,
            lp_sol: event.quote_amount_in as f64 / LAMPORTS_PER_SOL as f64,
            mint_authority: Authority::Unknown,
            freeze_authority: Authority::Unknown,
            creator_fee: 0.0,
            estimated_slippage: 0.0,
        })
    }
}
