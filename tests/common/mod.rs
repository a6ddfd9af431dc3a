//! 测试用的脚本化数据源，不访问网络
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use etf_monitor::error::{FetchError, ParseError, ProviderError};
use etf_monitor::models::stock::{change_percent, KlineBar, Quote};
use etf_monitor::services::history_kline::KlineSource;
use etf_monitor::services::quote_provider::{QuoteProvider, RawPayload};

pub fn fixed_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap().and_hms_opt(10, 30, 0).unwrap()
}

/// 价格为 `latest`、昨收 1.0 的真实行情
pub fn quote_at(latest: f64) -> Quote {
    let mut q = Quote::placeholder("512000", "券商ETF", fixed_time());
    q.synthetic = false;
    q.latest_price = latest;
    q.prev_close = 1.0;
    q.open = 1.0;
    q.high = latest.max(1.0);
    q.low = latest.min(1.0);
    q.change = latest - 1.0;
    q.change_pct = change_percent(latest, 1.0);
    q.net_value = latest;
    q
}

/// 按脚本依次返回 fetch 结果；正文为数字时解析成该价格的行情，否则视为结构错误
pub struct ScriptedProvider {
    name: &'static str,
    script: Mutex<VecDeque<Result<String, FetchError>>>,
    fallback: Result<String, FetchError>,
    pub calls: Arc<AtomicU32>,
}

impl ScriptedProvider {
    pub fn new(
        name: &'static str,
        script: Vec<Result<String, FetchError>>,
        fallback: Result<String, FetchError>,
    ) -> Self {
        Self {
            name,
            script: Mutex::new(script.into()),
            fallback,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn always(name: &'static str, result: Result<String, FetchError>) -> Self {
        Self::new(name, vec![], result)
    }

    pub fn price(name: &'static str, latest: f64) -> Self {
        Self::always(name, Ok(latest.to_string()))
    }

    pub fn timeout(name: &'static str) -> Self {
        Self::always(name, Err(FetchError::Timeout("operation timed out".into())))
    }
}

#[async_trait]
impl QuoteProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self) -> Result<RawPayload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let body = next.unwrap_or_else(|| self.fallback.clone())?;
        Ok(RawPayload { body, received_at: fixed_time() })
    }

    fn parse(&self, payload: &RawPayload) -> Result<Quote, ParseError> {
        let latest: f64 = payload
            .body
            .parse()
            .map_err(|_| ParseError::MissingField("f2"))?;
        Ok(quote_at(latest))
    }
}

pub struct FakeKline {
    pub result: Result<Vec<KlineBar>, ProviderError>,
}

impl FakeKline {
    /// 收盘价依次为 1..=n 的日K线
    pub fn rising(n: usize) -> Self {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let bars = (1..=n)
            .map(|i| KlineBar {
                date: (start + chrono::Duration::days(i as i64)).format("%Y-%m-%d").to_string(),
                open: i as f64,
                high: i as f64,
                low: i as f64,
                close: i as f64,
                volume: 1000.0,
            })
            .collect();
        Self { result: Ok(bars) }
    }

    pub fn failing() -> Self {
        Self { result: Err(FetchError::Server(502).into()) }
    }
}

#[async_trait]
impl KlineSource for FakeKline {
    async fn fetch_daily(&self, _count: usize) -> Result<Vec<KlineBar>, ProviderError> {
        self.result.clone()
    }
}
