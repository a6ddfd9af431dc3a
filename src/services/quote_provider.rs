use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{FetchError, ParseError};
use crate::models::stock::{change_percent, now_timestamp, Quote};
use crate::utils::http::get_text;

const CLIST_URL: &str = "https://88.push2.eastmoney.com/api/qt/clist/get";
const STOCK_GET_URL: &str = "https://push2.eastmoney.com/api/qt/stock/get";
const CLIST_FIELDS: &str = "f2,f3,f4,f5,f6,f12,f14,f15,f16,f17,f18,f62";
const STOCK_GET_FIELDS: &str = "f43,f44,f45,f46,f47,f48,f49,f50,f51,f52,f57,f58,f59,f60,f84,f85,f116";

/// 成交额、资金流：元 -> 万元
const WAN: f64 = 10_000.0;
/// stock/get 接口价格默认放大倍数（f59 缺失时使用）
const DEFAULT_PRICE_SCALE: f64 = 100.0;

/// 被监控的证券
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub code: String,
    pub name: String,
}

impl Instrument {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self { code: code.into(), name: name.into() }
    }

    /// 东方财富 secid：沪市 `1.`，深市 `0.`
    pub fn secid(&self) -> String {
        match self.code.chars().next() {
            Some('5') | Some('6') | Some('9') => format!("1.{}", self.code),
            _ => format!("0.{}", self.code),
        }
    }
}

/// 原始响应正文及接收时间
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub body: String,
    pub received_at: NaiveDateTime,
}

impl RawPayload {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into(), received_at: now_timestamp() }
    }
}

/// 实时行情数据源。fetch 只负责网络，parse 只负责结构映射。
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> Result<RawPayload, FetchError>;

    fn parse(&self, payload: &RawPayload) -> Result<Quote, ParseError>;
}

// ==================== clist 快照列表（ETF / 沪深A股） ====================

/// clist 行情列表的板块过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotBoard {
    /// 场内 ETF 全量
    Etf,
    /// 沪深京 A 股全量
    AShare,
}

impl SpotBoard {
    fn fs(&self) -> &'static str {
        match self {
            SpotBoard::Etf => "b:MK0021,b:MK0022,b:MK0023,b:MK0024",
            SpotBoard::AShare => "m:0+t:6,m:0+t:80,m:1+t:2,m:1+t:23,m:0+t:81+s:2048",
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            SpotBoard::Etf => "eastmoney_etf_spot",
            SpotBoard::AShare => "eastmoney_a_spot",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClistResponse {
    data: Option<ClistData>,
}

#[derive(Debug, Deserialize)]
struct ClistData {
    #[serde(default)]
    diff: Vec<ClistRow>,
}

/// 字段：f2=最新价, f3=涨跌幅, f4=涨跌额, f5=成交量(手), f6=成交额(元),
/// f12=代码, f14=名称, f15=最高, f16=最低, f17=今开, f18=昨收, f62=主力净流入(元)
#[derive(Debug, Deserialize)]
struct ClistRow {
    f12: String,
    #[serde(default)]
    f14: Option<String>,
    #[serde(default)]
    f2: Option<Value>,
    #[serde(default)]
    f3: Option<Value>,
    #[serde(default)]
    f4: Option<Value>,
    #[serde(default)]
    f5: Option<Value>,
    #[serde(default)]
    f6: Option<Value>,
    #[serde(default)]
    f15: Option<Value>,
    #[serde(default)]
    f16: Option<Value>,
    #[serde(default)]
    f17: Option<Value>,
    #[serde(default)]
    f18: Option<Value>,
    #[serde(default)]
    f62: Option<Value>,
}

/// 通过 clist 全量快照按代码查找行情（`fltt=2`，价格为真实小数）
pub struct SpotListProvider {
    client: reqwest::Client,
    instrument: Instrument,
    board: SpotBoard,
}

impl SpotListProvider {
    pub fn new(client: reqwest::Client, instrument: Instrument, board: SpotBoard) -> Self {
        Self { client, instrument, board }
    }

    fn url(&self) -> String {
        format!(
            "{}?pn=1&pz=5000&po=1&np=1&ut=bd1d9ddb04089700cf9c27f6f7426281&fltt=2&invt=2&fid=f3&fs={}&fields={}",
            CLIST_URL,
            self.board.fs(),
            CLIST_FIELDS
        )
    }
}

#[async_trait]
impl QuoteProvider for SpotListProvider {
    fn name(&self) -> &'static str {
        self.board.provider_name()
    }

    async fn fetch(&self) -> Result<RawPayload, FetchError> {
        let body = get_text(&self.client, &self.url()).await?;
        Ok(RawPayload::new(body))
    }

    fn parse(&self, payload: &RawPayload) -> Result<Quote, ParseError> {
        let resp: ClistResponse = serde_json::from_str(&payload.body)?;
        let data = resp.data.ok_or(ParseError::MissingField("data"))?;
        if data.diff.is_empty() {
            return Err(ParseError::EmptyRow);
        }
        let row = data
            .diff
            .iter()
            .find(|r| r.f12 == self.instrument.code)
            .ok_or_else(|| ParseError::RowNotFound(self.instrument.code.clone()))?;

        let latest_price = required_f64("f2", &row.f2)?;
        let prev_close = required_f64("f18", &row.f18)?;
        let change = optional_f64(&row.f4).unwrap_or(latest_price - prev_close);
        let change_pct = optional_f64(&row.f3).unwrap_or_else(|| change_percent(latest_price, prev_close));

        Ok(Quote {
            code: self.instrument.code.clone(),
            name: row.f14.clone().unwrap_or_else(|| self.instrument.name.clone()),
            time: payload.received_at,
            latest_price,
            prev_close,
            open: required_f64("f17", &row.f17)?,
            high: required_f64("f15", &row.f15)?,
            low: required_f64("f16", &row.f16)?,
            change,
            change_pct,
            volume: required_f64("f5", &row.f5)?,
            turnover: required_f64("f6", &row.f6)? / WAN,
            net_value: latest_price,
            flow_main: optional_f64(&row.f62).map(|v| v / WAN).unwrap_or(0.0),
            ma5: None,
            ma20: None,
            synthetic: false,
        })
    }
}

// ==================== stock/get 单只证券原始字段 ====================

#[derive(Debug, Deserialize)]
struct StockGetResponse {
    data: Option<StockGetData>,
}

/// 价格字段为定点整数：f43=最新价, f44=最高, f45=最低, f46=今开, f60=昨收；
/// f47=成交量(手), f48=成交额(元), f57=代码, f58=名称, f59=价格小数位
#[derive(Debug, Deserialize)]
struct StockGetData {
    #[serde(default)]
    f43: Option<Value>,
    #[serde(default)]
    f44: Option<Value>,
    #[serde(default)]
    f45: Option<Value>,
    #[serde(default)]
    f46: Option<Value>,
    #[serde(default)]
    f47: Option<Value>,
    #[serde(default)]
    f48: Option<Value>,
    #[serde(default)]
    f57: Option<String>,
    #[serde(default)]
    f58: Option<String>,
    #[serde(default)]
    f59: Option<Value>,
    #[serde(default)]
    f60: Option<Value>,
}

/// 直接调用 stock/get 接口，按固定字段编号取值并还原定点缩放
pub struct DirectQuoteProvider {
    client: reqwest::Client,
    instrument: Instrument,
}

impl DirectQuoteProvider {
    pub fn new(client: reqwest::Client, instrument: Instrument) -> Self {
        Self { client, instrument }
    }

    fn url(&self) -> String {
        format!(
            "{}?ut=fa5fd1943c7b386f172d6893dbfba10b&invt=2&fields={}&secid={}",
            STOCK_GET_URL,
            STOCK_GET_FIELDS,
            self.instrument.secid()
        )
    }
}

#[async_trait]
impl QuoteProvider for DirectQuoteProvider {
    fn name(&self) -> &'static str {
        "eastmoney_direct"
    }

    async fn fetch(&self) -> Result<RawPayload, FetchError> {
        let body = get_text(&self.client, &self.url()).await?;
        Ok(RawPayload::new(body))
    }

    fn parse(&self, payload: &RawPayload) -> Result<Quote, ParseError> {
        let resp: StockGetResponse = serde_json::from_str(&payload.body)?;
        let data = resp.data.ok_or(ParseError::MissingField("data"))?;

        if let Some(code) = data.f57.as_deref() {
            if code != self.instrument.code {
                return Err(ParseError::RowNotFound(self.instrument.code.clone()));
            }
        }

        let scale = match optional_f64(&data.f59) {
            Some(decimals) if (0.0..=4.0).contains(&decimals) => 10f64.powi(decimals as i32),
            _ => DEFAULT_PRICE_SCALE,
        };
        let latest_price = required_f64("f43", &data.f43)? / scale;
        let prev_close = required_f64("f60", &data.f60)? / scale;

        Ok(Quote {
            code: self.instrument.code.clone(),
            name: data.f58.clone().unwrap_or_else(|| self.instrument.name.clone()),
            time: payload.received_at,
            latest_price,
            prev_close,
            open: required_f64("f46", &data.f46)? / scale,
            high: required_f64("f44", &data.f44)? / scale,
            low: required_f64("f45", &data.f45)? / scale,
            change: latest_price - prev_close,
            change_pct: change_percent(latest_price, prev_close),
            volume: required_f64("f47", &data.f47)?,
            turnover: required_f64("f48", &data.f48)? / WAN,
            net_value: latest_price,
            flow_main: 0.0,
            ma5: None,
            ma20: None,
            synthetic: false,
        })
    }
}

// ==================== 字段取值 ====================

/// 数值或数值字符串（允许 `%` 后缀）。东方财富停牌等场景返回 `"-"`，视为无值。
fn number_value(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    }
}

fn required_f64(field: &'static str, value: &Option<Value>) -> Result<f64, ParseError> {
    match value {
        None | Some(Value::Null) => Err(ParseError::MissingField(field)),
        Some(v) => number_value(v).ok_or_else(|| ParseError::InvalidValue {
            field,
            raw: v.to_string(),
        }),
    }
}

fn optional_f64(value: &Option<Value>) -> Option<f64> {
    value.as_ref().and_then(number_value)
}
