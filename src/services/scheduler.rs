use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::models::alert::{AlertEvent, Thresholds};
use crate::models::stock::{HistoricalBar, Quote};
use crate::services::alert_service::evaluate;
use crate::services::fallback_chain::{Acquisition, FallbackChain, QuoteSource};
use crate::services::history_kline::KlineSource;
use crate::services::history_log::HistoryLog;
use crate::services::technical_indicators::{latest_ma, load_history};

/// 一轮轮询的完整产出
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub acquisition: Acquisition,
    pub bars: Vec<HistoricalBar>,
    pub alerts: Vec<AlertEvent>,
    pub persisted: bool,
}

impl CycleReport {
    pub fn quote(&self) -> &Quote {
        &self.acquisition.quote
    }

    pub fn source_label(&self) -> &'static str {
        match self.acquisition.source {
            QuoteSource::Provider(name) => name,
            QuoteSource::Synthetic => "synthetic",
        }
    }
}

/// 单轮流水线：取行情 -> 均线 -> 报警 -> 落盘
pub struct Monitor {
    chain: FallbackChain,
    history: Box<dyn KlineSource>,
    log: HistoryLog,
    thresholds: Thresholds,
    fetch_bars: usize,
    display_bars: usize,
}

impl Monitor {
    pub fn new(
        chain: FallbackChain,
        history: Box<dyn KlineSource>,
        log: HistoryLog,
        thresholds: Thresholds,
        fetch_bars: usize,
        display_bars: usize,
    ) -> Self {
        Self { chain, history, log, thresholds, fetch_bars, display_bars }
    }

    pub fn log(&self) -> &HistoryLog {
        &self.log
    }

    pub async fn run_cycle(&self) -> CycleReport {
        let mut acquisition = self.chain.acquire().await;

        // 占位数据不计算指标、不报警、不落盘
        if acquisition.is_synthetic() {
            return CycleReport { acquisition, bars: Vec::new(), alerts: Vec::new(), persisted: false };
        }

        let bars = load_history(self.history.as_ref(), self.fetch_bars, self.display_bars).await;
        let (ma5, ma20) = latest_ma(&bars);
        acquisition.quote.ma5 = ma5;
        acquisition.quote.ma20 = ma20;

        let alerts = evaluate(&acquisition.quote, &self.thresholds);
        for alert in &alerts {
            log::warn!("{}", alert.message);
        }

        let persisted = match self.log.append(&acquisition.quote) {
            Ok(()) => true,
            Err(e) => {
                log::error!("保存历史数据失败（{}）: {}", self.log.path().display(), e);
                false
            }
        };

        CycleReport { acquisition, bars, alerts, persisted }
    }
}

/// 轮询间隔：基础间隔 + [0, max_jitter] 秒随机抖动，每轮重新计算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub base: Duration,
    pub max_jitter: Duration,
}

impl PollSchedule {
    pub fn new(base_secs: u64, max_jitter_secs: u64) -> Self {
        Self {
            base: Duration::from_secs(base_secs),
            max_jitter: Duration::from_secs(max_jitter_secs),
        }
    }

    pub fn next_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        let jitter = rng.random_range(0..=self.max_jitter.as_secs());
        self.base + Duration::from_secs(jitter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Polling,
    Presenting,
    Sleeping,
    Stopped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub persisted: u64,
}

/// 轮询主循环。每轮顺序执行，互不重叠；
/// 停止信号只在轮与轮之间（休眠期间）检查，进行中的请求与重试不会被打断。
pub struct PollScheduler {
    schedule: PollSchedule,
    state: SchedulerState,
}

impl PollScheduler {
    pub fn new(schedule: PollSchedule) -> Self {
        Self { schedule, state: SchedulerState::Idle }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub async fn run<P, S>(&mut self, monitor: &Monitor, mut present: P, shutdown: S) -> RunSummary
    where
        P: FnMut(&CycleReport),
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut summary = RunSummary::default();

        loop {
            self.state = SchedulerState::Polling;
            let report = monitor.run_cycle().await;
            summary.cycles += 1;
            if report.persisted {
                summary.persisted += 1;
            }

            self.state = SchedulerState::Presenting;
            present(&report);

            self.state = SchedulerState::Sleeping;
            let delay = self.schedule.next_delay(&mut rand::rng());
            log::debug!("第 {} 轮完成，{}s 后继续", summary.cycles, delay.as_secs());
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut shutdown => {
                    self.state = SchedulerState::Stopped;
                    log::info!("收到停止信号，共完成 {} 轮，保存 {} 条", summary.cycles, summary.persisted);
                    return summary;
                }
            }
        }
    }
}
