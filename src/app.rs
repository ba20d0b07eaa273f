// src/app.rs
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::dispatch::PoolPipeline;
use crate::listeners::engine::ListenerEngine;
use crate::listeners::{LaunchLabDecoder, MeteoraDbcDecoder, PumpAmmDecoder, PumpV1Decoder};
use crate::monitor::LiquidityMonitor;
use crate::report::{LogOnlySink, VerdictRecorder};
use crate::rpc::RpcGateway;
use crate::safety::SafetyEvaluator;

const STATUS_INTERVAL: Duration = Duration::from_secs(30);

pub async fn run(cfg: Config) -> Result<()> {
    info!("Starting pool detection engine");

    // The gateway is the single owner of both node connections; everything
    // else receives it by reference.
    let gateway = Arc::new(
        RpcGateway::connect(&cfg.rpc.http_url, &cfg.rpc.ws_url, cfg.rpc.request_delay_ms)
            .await
            .context("connect RPC gateway")?,
    );
    let _gateway_driver = gateway.start();

    let policy = cfg.safety.policy().context("build safety policy")?;
    let evaluator = SafetyEvaluator::new(Arc::clone(&gateway), policy);

    let monitor = Arc::new(LiquidityMonitor::new(
        Arc::clone(&gateway),
        cfg.monitor.clone(),
        cfg.safety.low_liquidity_threshold_sol,
    ));
    let _monitor_driver = monitor.start();

    let recorder = Arc::new(VerdictRecorder::new(
        &cfg.notify.verdict_log_path,
        cfg.notify.webhook_url.clone(),
    ));
    let pipeline = Arc::new(PoolPipeline::new(
        evaluator,
        Arc::clone(&monitor),
        Arc::new(LogOnlySink),
        recorder,
        cfg.safety.low_liquidity_threshold_sol,
    ));

    if cfg.listeners.pump_v1.enabled {
        ListenerEngine::new(
            PumpV1Decoder,
            Arc::clone(&gateway),
            Arc::clone(&pipeline),
            cfg.listeners.pump_v1.clone(),
        )
        .start();
    }
    if cfg.listeners.pump_amm.enabled {
        ListenerEngine::new(
            PumpAmmDecoder,
            Arc::clone(&gateway),
            Arc::clone(&pipeline),
            cfg.listeners.pump_amm.clone(),
        )
        .start();
    }
    if cfg.listeners.launchlab.enabled {
        ListenerEngine::new(
            LaunchLabDecoder,
            Arc::clone(&gateway),
            Arc::clone(&pipeline),
            cfg.listeners.launchlab.clone(),
        )
        .start();
    }
    if cfg.listeners.meteora_dbc.enabled {
        ListenerEngine::new(
            MeteoraDbcDecoder,
            Arc::clone(&gateway),
            Arc::clone(&pipeline),
            cfg.listeners.meteora_dbc.clone(),
        )
        .start();
    }

    start_status_loop(Arc::clone(&gateway), Arc::clone(&monitor));

    tokio::signal::ctrl_c()
        .await
        .context("wait for shutdown signal")?;
    info!("Shutdown signal received, stopping");
    Ok(())
}

/// Periodic operational status, mirroring what the stats are collected for:
/// visibility, not flow control.
fn start_status_loop(gateway: Arc<RpcGateway>, monitor: Arc<LiquidityMonitor>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(STATUS_INTERVAL);
        // The first tick fires immediately; skip it so the first report has
        // data behind it.
        ticker.tick().await;
        loop {
            ticker.tick().await;

            let stats = gateway.stats();
            let mut by_source: Vec<String> = stats
                .queued_by_source
                .iter()
                .map(|(source, count)| format!("{}={}", source, count))
                .collect();
            by_source.sort();
            info!(
                "[STATUS] RPC gateway: {:.1} calls/s, {} queued{}",
                stats.calls_per_second,
                stats.queue_len,
                if by_source.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", by_source.join(", "))
                }
            );

            let status = monitor.status();
            if status.pending_checks > 0 {
                info!(
                    "[STATUS] Liquidity monitor: {} pending checks, oldest {} s",
                    status.pending_checks,
                    status.oldest_check_ms.unwrap_or(0) / 1000
                );
            }
            let (scheduled, found, timed_out, success_rate, timing) = monitor.stats_summary();
            if scheduled > 0 {
                info!(
                    "[STATUS] 📊 LP checks: scheduled {}, found {}, timed out {}, success {:.1}%",
                    scheduled, found, timed_out, success_rate
                );
                if let Some((avg, median, min, max)) = timing {
                    info!(
                        "[STATUS] ⏱️ Time to LP: avg {} ms, median {} ms, range {}-{} ms",
                        avg, median, min, max
                    );
                }
            }
        }
    });
}
