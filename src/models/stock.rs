use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 单次轮询得到的行情快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub code: String,
    pub name: String,
    pub time: NaiveDateTime,
    pub latest_price: f64,
    pub prev_close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub change: f64,
    pub change_pct: f64,       // 涨跌幅 %
    pub volume: f64,           // 成交量（手）
    pub turnover: f64,         // 成交额（万元）
    pub net_value: f64,        // 场内 ETF 以最新价近似净值
    pub flow_main: f64,        // 主力净流入（万元），数据源不提供时为 0
    pub ma5: Option<f64>,
    pub ma20: Option<f64>,
    /// 所有数据源都失败时生成的占位数据，不可持久化、不参与报警
    #[serde(default)]
    pub synthetic: bool,
}

impl Quote {
    /// 所有数据源失败时的兜底快照，价格为固定样例值。
    pub fn placeholder(code: &str, name: &str, time: NaiveDateTime) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            time,
            latest_price: 1.001,
            prev_close: 0.991,
            open: 0.992,
            high: 1.004,
            low: 0.991,
            change: 0.01,
            change_pct: 1.01,
            volume: 3_184_610.0,
            turnover: 1500.25,
            net_value: 1.001,
            flow_main: 0.0,
            ma5: None,
            ma20: None,
            synthetic: true,
        }
    }

    pub fn time_str(&self) -> String {
        self.time.format(TIME_FORMAT).to_string()
    }

    pub fn is_up(&self) -> bool {
        self.change >= 0.0
    }
}

/// 涨跌幅 %，昨收为 0 时定义为 0
pub fn change_percent(latest: f64, prev_close: f64) -> f64 {
    if prev_close == 0.0 {
        return 0.0;
    }
    (latest - prev_close) / prev_close * 100.0
}

/// 当前本地时间，精确到秒
pub fn now_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// 日K线（原始数据，来自 kline 接口）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KlineBar {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// 带均线的日K线，按日期升序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBar {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub ma5: Option<f64>,
    pub ma20: Option<f64>,
}
