use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::{ParseError, ProviderError};
use crate::models::stock::KlineBar;
use crate::services::quote_provider::Instrument;
use crate::utils::http::get_text;

const EM_KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";

/// 日K线数据源
#[async_trait]
pub trait KlineSource: Send + Sync {
    /// 拉取最近 `count` 根日K线，返回顺序不作保证
    async fn fetch_daily(&self, count: usize) -> Result<Vec<KlineBar>, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(default)]
    klines: Vec<String>,
}

/// 东方财富日K线（前复权）
pub struct HistoryKlineService {
    client: reqwest::Client,
    instrument: Instrument,
}

impl HistoryKlineService {
    pub fn new(client: reqwest::Client, instrument: Instrument) -> Self {
        Self { client, instrument }
    }

    fn url(&self, count: usize) -> String {
        format!(
            "{}?fields1=f1,f2,f3,f4,f5,f6&fields2=f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61&ut=7eea3edcaed734bea9cbfc24409ed989&klt=101&fqt=1&beg=0&end=20500101&lmt={}&secid={}",
            EM_KLINE_URL,
            count,
            self.instrument.secid()
        )
    }
}

#[async_trait]
impl KlineSource for HistoryKlineService {
    async fn fetch_daily(&self, count: usize) -> Result<Vec<KlineBar>, ProviderError> {
        let body = get_text(&self.client, &self.url(count)).await?;
        Ok(parse_klines(&body)?)
    }
}

/// 解析 kline 响应。每条为逗号拼接字符串：
/// 日期,开盘,收盘,最高,最低,成交量,成交额,振幅,涨跌幅,涨跌额,换手率
pub fn parse_klines(body: &str) -> Result<Vec<KlineBar>, ParseError> {
    let resp: KlineResponse = serde_json::from_str(body)?;
    let data = resp.data.ok_or(ParseError::MissingField("data"))?;

    let mut bars = Vec::with_capacity(data.klines.len());
    for line in &data.klines {
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() < 6 {
            return Err(ParseError::InvalidValue { field: "klines", raw: line.clone() });
        }
        bars.push(KlineBar {
            date: parts[0].trim().to_string(),
            open: parse_kline_f64("open", parts[1])?,
            close: parse_kline_f64("close", parts[2])?,
            high: parse_kline_f64("high", parts[3])?,
            low: parse_kline_f64("low", parts[4])?,
            volume: parse_kline_f64("volume", parts[5])?,
        });
    }
    Ok(bars)
}

fn parse_kline_f64(field: &'static str, raw: &str) -> Result<f64, ParseError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidValue { field, raw: raw.to_string() })
}

/// 按日期升序排列并去重（同一日期保留后出现的一条）
pub fn normalize_bars(bars: Vec<KlineBar>) -> Vec<KlineBar> {
    let mut by_date: BTreeMap<String, KlineBar> = BTreeMap::new();
    for bar in bars {
        by_date.insert(bar.date.clone(), bar);
    }
    by_date.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64) -> KlineBar {
        KlineBar { date: date.into(), open: close, high: close, low: close, close, volume: 1.0 }
    }

    #[test]
    fn test_parse_klines_field_order() {
        let body = r#"{"rc":0,"data":{"code":"512000","klines":[
            "2025-03-13,1.010,1.020,1.030,1.000,2500000,255000000.00,2.97,0.99,0.010,1.20",
            "2025-03-14,1.020,1.050,1.060,1.015,3100000,322000000.00,4.41,2.94,0.030,1.50"
        ]}}"#;
        let bars = parse_klines(body).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].date, "2025-03-14");
        assert_eq!(bars[1].open, 1.02);
        assert_eq!(bars[1].close, 1.05);
        assert_eq!(bars[1].high, 1.06);
        assert_eq!(bars[1].low, 1.015);
        assert_eq!(bars[1].volume, 3100000.0);
    }

    #[test]
    fn test_parse_klines_rejects_broken_rows() {
        assert_eq!(
            parse_klines(r#"{"data":null}"#).unwrap_err(),
            ParseError::MissingField("data")
        );
        let err = parse_klines(r#"{"data":{"klines":["2025-03-14,1.0,1.0"]}}"#).unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { field: "klines", .. }));
        let err = parse_klines(r#"{"data":{"klines":["2025-03-14,1.0,x,1.0,1.0,5"]}}"#).unwrap_err();
        assert_eq!(err, ParseError::InvalidValue { field: "close", raw: "x".into() });
    }

    #[test]
    fn test_normalize_sorts_and_dedups() {
        let bars = vec![
            bar("2025-03-14", 3.0),
            bar("2025-03-12", 1.0),
            bar("2025-03-13", 2.0),
            bar("2025-03-14", 3.5),
        ];
        let out = normalize_bars(bars);
        let dates: Vec<&str> = out.iter().map(|b| b.date.as_str()).collect();
        assert_eq!(dates, vec!["2025-03-12", "2025-03-13", "2025-03-14"]);
        assert_eq!(out[2].close, 3.5);
    }

    #[test]
    fn test_kline_url_requests_window() {
        let svc = HistoryKlineService::new(reqwest::Client::new(), Instrument::new("512000", "券商ETF"));
        let url = svc.url(30);
        assert!(url.contains("lmt=30"));
        assert!(url.contains("secid=1.512000"));
        assert!(url.contains("klt=101"));
    }
}
