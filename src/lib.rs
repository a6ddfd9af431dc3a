pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use anyhow::{Context, Result};

use models::settings::Settings;
use services::fallback_chain::FallbackChain;
use services::history_kline::HistoryKlineService;
use services::history_log::HistoryLog;
use services::quote_provider::{DirectQuoteProvider, Instrument, QuoteProvider, SpotBoard, SpotListProvider};
use services::scheduler::{Monitor, PollSchedule};
use utils::http::build_quote_client;

/// 按配置组装完整流水线：共享一个 HTTP client，数据源优先级 ETF 列表 -> A 股列表 -> 直连接口
pub fn build_monitor(settings: &Settings) -> Result<(Monitor, PollSchedule)> {
    let client = build_quote_client(settings.request_timeout_secs, settings.accept_invalid_certs)
        .context("HTTP client 初始化失败")?;
    let instrument = Instrument::new(&settings.code, &settings.name);

    let providers: Vec<Box<dyn QuoteProvider>> = vec![
        Box::new(SpotListProvider::new(client.clone(), instrument.clone(), SpotBoard::Etf)),
        Box::new(SpotListProvider::new(client.clone(), instrument.clone(), SpotBoard::AShare)),
        Box::new(DirectQuoteProvider::new(client.clone(), instrument.clone())),
    ];
    let chain = FallbackChain::new(providers, settings.retry_policy(), instrument.clone());
    let history = HistoryKlineService::new(client, instrument);

    let history_log = HistoryLog::new(settings.history_path());
    if let Err(e) = history_log.ensure_header() {
        // 落盘失败不影响监控，每轮 append 时会再次尝试
        log::warn!("无法初始化历史文件 {}: {}", history_log.path().display(), e);
    }

    let monitor = Monitor::new(
        chain,
        Box::new(history),
        history_log,
        settings.thresholds(),
        settings.history_fetch_bars,
        settings.history_display_bars,
    );
    let schedule = PollSchedule::new(settings.poll_interval_secs, settings.poll_jitter_secs);
    Ok((monitor, schedule))
}
