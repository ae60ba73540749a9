// =============================================================================
// Meridian Signal Engine — Main Entry Point
// =============================================================================
//
// Wiring order: config and secrets, then the rate limiter and its gates,
// then upstream clients, pipeline, risk model, and alert sink.  Every
// collaborator is built here and handed down explicitly; no component
// reaches for a global client or registry.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod alerts;
mod config;
mod errors;
mod indicators;
mod pipeline;
mod rate_limit;
mod retry;
mod risk;
mod scheduler;
mod sentiment;
mod signal_engine;
mod sources;
mod types;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::alerts::{AlertSink, TelegramAlerts};
use crate::config::{EngineConfig, Secrets};
use crate::indicators::atr::{calculate_atr, calculate_atr_pct};
use crate::pipeline::TradePipeline;
use crate::rate_limit::{AdmissionGate, RateLimiter};
use crate::retry::retry_with_backoff;
use crate::risk::RiskModel;
use crate::scheduler::FetchScheduler;
use crate::sentiment::{InfluenceScorer, LexiconClassifier};
use crate::signal_engine::SignalEngine;
use crate::sources::{AlphaVantageNews, FinnhubQuotes, NewsSource, QuoteSource};
use crate::types::TradeSignal;

/// Attempts for one alert delivery before the alert is dropped.
const ALERT_ATTEMPTS: u32 = 3;

/// Initial backoff between alert delivery attempts; doubles per retry.
const ALERT_BACKOFF: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Meridian Signal Engine starting up               ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = EngineConfig::load("config.json").unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        EngineConfig::default()
    });

    // Override the symbol universe from env if available.
    if let Ok(syms) = std::env::var("MERIDIAN_SYMBOLS") {
        config.symbols = syms
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
    }

    config.validate()?;
    let secrets = Secrets::from_env()?;

    info!(symbols = ?config.symbols, "Configured symbol universe");
    info!(
        cycle_secs = config.cycle_interval_secs,
        chunk_size = config.chunk_size,
        price_flex = config.price_flex,
        sentiment_threshold = config.sentiment_threshold,
        "Engine parameters"
    );

    // ── 2. Rate limiter & gates ──────────────────────────────────────────
    let limiter = RateLimiter::new(&config.rate_budgets)?;
    let quote_gate = limiter.gate(FinnhubQuotes::NAME)?;
    let news_gate = limiter.gate(AlphaVantageNews::NAME)?;
    // Candle fetches share the quote upstream's budget.
    let candle_gate = limiter.gate(FinnhubQuotes::NAME)?;

    // ── 3. Upstream clients ──────────────────────────────────────────────
    let quotes: Arc<dyn QuoteSource> =
        Arc::new(FinnhubQuotes::new(secrets.finnhub_api_key.clone()));
    let news: Arc<dyn NewsSource> =
        Arc::new(AlphaVantageNews::new(secrets.alpha_vantage_api_key.clone()));

    // ── 4. Pipeline ──────────────────────────────────────────────────────
    let scheduler = FetchScheduler::new(Arc::clone(&quotes), quote_gate, config.chunk_size);
    let cancel = scheduler.cancel_flag();

    let pipeline = TradePipeline::new(
        scheduler,
        Arc::clone(&news),
        news_gate,
        InfluenceScorer::new(Arc::new(LexiconClassifier::default()), &config),
        SignalEngine::new(&config),
    );

    // ── 5. Risk model & alert sink ───────────────────────────────────────
    let risk = RiskModel::new(config.risk.clone());

    let sink: Option<Arc<dyn AlertSink>> = secrets
        .telegram_bot_token
        .as_deref()
        .zip(secrets.telegram_chat_id.as_deref())
        .map(|(token, chat)| Arc::new(TelegramAlerts::new(token, chat)) as Arc<dyn AlertSink>);

    if secrets.telegram_configured() {
        info!("Telegram alert sink configured");
    } else {
        warn!("Telegram credentials absent, signals will only be logged");
    }

    // ── 6. Shutdown wiring ───────────────────────────────────────────────
    let shutdown = Arc::new(Notify::new());
    {
        let shutdown = Arc::clone(&shutdown);
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Shutdown signal received, stopping gracefully");
                cancel.store(true, Ordering::SeqCst);
                shutdown.notify_one();
            }
        });
    }

    info!("All subsystems ready. Press Ctrl+C to stop.");

    // ── 7. Cycle loop ────────────────────────────────────────────────────
    let mut interval =
        tokio::time::interval(Duration::from_secs(config.cycle_interval_secs));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let signals = pipeline.run_cycle(&config.symbols).await;

                for signal in &signals {
                    size_and_deliver(
                        signal,
                        quotes.as_ref(),
                        &candle_gate,
                        &risk,
                        &config,
                        sink.as_ref(),
                    )
                    .await;
                }

                if cancel.load(Ordering::SeqCst) {
                    break;
                }
            }
            _ = shutdown.notified() => break,
        }
    }

    info!("Meridian signal engine shut down complete.");
    Ok(())
}

/// Attach a sized position plan to a fresh signal, then deliver the alert.
///
/// Both halves are best-effort: a failed candle fetch or a refused sizing
/// skips the plan, a failed delivery drops the alert, and neither touches
/// the signal itself.
async fn size_and_deliver(
    signal: &TradeSignal,
    quotes: &dyn QuoteSource,
    candle_gate: &AdmissionGate,
    risk: &RiskModel,
    config: &EngineConfig,
    sink: Option<&Arc<dyn AlertSink>>,
) {
    plan_position(signal, quotes, candle_gate, risk, config).await;

    match sink {
        Some(sink) => {
            let outcome = retry_with_backoff("telegram alert", ALERT_ATTEMPTS, ALERT_BACKOFF, || {
                sink.send_signal(signal)
            })
            .await;
            if let Err(e) = outcome {
                error!(symbol = %signal.symbol, error = %e, "alert delivery failed, dropping alert");
            }
        }
        None => {
            info!(
                symbol = %signal.symbol,
                confidence = signal.confidence,
                stop = signal.stop_loss,
                take_profit = signal.take_profit,
                "signal emitted (no alert sink configured)"
            );
        }
    }
}

/// Fetch daily candles, derive ATR, and log the sized plan for one signal.
async fn plan_position(
    signal: &TradeSignal,
    quotes: &dyn QuoteSource,
    candle_gate: &AdmissionGate,
    risk: &RiskModel,
    config: &EngineConfig,
) {
    let symbol = signal.symbol.as_str();
    let entry = signal.entry_range.0;

    let to = Utc::now().timestamp();
    // Daily bars; weekends and holidays thin the window, so fetch twice the
    // period in calendar days.
    let from = to - (config.atr_period as i64 + 1) * 2 * 86_400;

    candle_gate.acquire().await;
    let candles = match quotes.get_candles(symbol, "D", from, to).await {
        Ok(candles) => candles,
        Err(e) => {
            warn!(symbol, kind = e.kind(), error = %e, "candle fetch failed, skipping sizing");
            return;
        }
    };

    let Some(atr) = calculate_atr(&candles, config.atr_period) else {
        warn!(
            symbol,
            bars = candles.len(),
            "not enough history for ATR, skipping sizing"
        );
        return;
    };

    let market_volatility = calculate_atr_pct(&candles, config.atr_period).unwrap_or(0.0);
    let risk_fraction = risk.risk_on_high_volatility(market_volatility);

    match risk.position_size(config.account_balance, atr, signal.confidence) {
        Ok(shares) => {
            info!(
                symbol,
                shares,
                atr = format!("{atr:.4}"),
                atr_pct = format!("{market_volatility:.2}"),
                risk_fraction,
                stop = format!("{:.2}", risk.stop_loss(atr, entry)),
                trail = format!("{:.2}", risk.trailing_stop(entry, entry, atr)),
                "position plan"
            );
        }
        Err(e) => {
            warn!(symbol, error = %e, "sizing refused");
        }
    }
}
