//! Poolscout - detection and safety screening of newly created liquidity
//! pools on Solana DEX programs.

pub mod app;
pub mod config;
pub mod dispatch;
pub mod layout;
pub mod listeners;
pub mod monitor;
pub mod report;
pub mod rpc;
pub mod safety;
pub mod shared;

// Re-export main types for convenience
pub use dispatch::PoolPipeline;
pub use monitor::LiquidityMonitor;
pub use rpc::RpcGateway;
pub use safety::SafetyEvaluator;
pub use shared::types::{PoolRecord, PoolSource, SafetyVerdict};
