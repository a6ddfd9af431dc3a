use std::fmt::Write;

use crate::models::alert::AlertEvent;
use crate::models::stock::{HistoricalBar, Quote};

const RULE_WIDTH: usize = 80;
const GREEN: &str = "\x1b[92m";
const RED: &str = "\x1b[91m";
const YELLOW: &str = "\x1b[93m";
const RESET: &str = "\x1b[0m";

/// 终端展示所需的全部数据，由纯函数构造，不含任何 I/O
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorView {
    pub code: String,
    pub name: String,
    pub time: String,
    pub source: String,
    pub synthetic: bool,
    pub is_up: bool,
    pub latest_price: f64,
    pub change: f64,
    pub change_pct: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub prev_close: f64,
    pub volume: f64,
    pub turnover: f64,
    pub flow_main: f64,
    pub ma: Option<(f64, f64)>,
    pub alerts: Vec<String>,
    pub bars: Vec<HistoricalBar>,
}

pub fn build_view(quote: &Quote, source: &str, alerts: &[AlertEvent], bars: &[HistoricalBar]) -> MonitorView {
    MonitorView {
        code: quote.code.clone(),
        name: quote.name.clone(),
        time: quote.time_str(),
        source: source.to_string(),
        synthetic: quote.synthetic,
        is_up: quote.is_up(),
        latest_price: quote.latest_price,
        change: quote.change,
        change_pct: quote.change_pct,
        open: quote.open,
        high: quote.high,
        low: quote.low,
        prev_close: quote.prev_close,
        volume: quote.volume,
        turnover: quote.turnover,
        flow_main: quote.flow_main,
        ma: quote.ma5.zip(quote.ma20),
        alerts: alerts.iter().map(|a| a.message.clone()).collect(),
        bars: bars.to_vec(),
    }
}

pub fn render(view: &MonitorView) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(
        out,
        "ETF实时监控 - {}({}) | 更新时间: {} | 数据源: {}",
        view.name, view.code, view.time, view.source
    );
    let _ = writeln!(out, "{}", rule);

    if view.synthetic {
        let _ = writeln!(out, "{}[占位数据] 所有数据源均不可用，以下数值仅为示意，未保存{}", YELLOW, RESET);
    }

    let color = if view.is_up { GREEN } else { RED };
    let _ = writeln!(
        out,
        "{}最新价: {:.3} | 涨跌: {:.3} ({:.2}%){}",
        color, view.latest_price, view.change, view.change_pct, RESET
    );
    let _ = writeln!(
        out,
        "今开: {:.3} | 最高: {:.3} | 最低: {:.3} | 昨收: {:.3}",
        view.open, view.high, view.low, view.prev_close
    );
    let _ = writeln!(out, "成交量: {:.0}手 | 成交额: {:.2}万元", view.volume, view.turnover);
    if let Some((ma5, ma20)) = view.ma {
        let _ = writeln!(out, "5日均线: {:.4} | 20日均线: {:.4}", ma5, ma20);
    }

    if !view.alerts.is_empty() {
        let _ = writeln!(out);
        for alert in &view.alerts {
            let _ = writeln!(out, "{}{}{}", YELLOW, alert, RESET);
        }
    }

    let _ = writeln!(out, "\n[资金流向分析]");
    let _ = writeln!(out, "主力净流入: {:.2}万元", view.flow_main);

    if view.bars.is_empty() {
        let _ = writeln!(out, "\n[历史数据] 无可用数据");
    } else {
        let _ = writeln!(out, "\n[最近{}日行情]", view.bars.len());
        let _ = writeln!(
            out,
            "{:<12}{:>9}{:>9}{:>9}{:>9}{:>14}{:>9}{:>9}",
            "日期", "开盘", "最高", "最低", "收盘", "成交量", "MA5", "MA20"
        );
        for bar in &view.bars {
            let _ = writeln!(
                out,
                "{:<12}{:>9.3}{:>9.3}{:>9.3}{:>9.3}{:>14.0}{:>9}{:>9}",
                bar.date,
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.volume,
                fmt_opt(bar.ma5),
                fmt_opt(bar.ma20)
            );
        }
    }

    let _ = writeln!(out, "\n{}", rule);
    let _ = writeln!(out, "按 Ctrl+C 停止监控...");
    out
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{:.4}", x)).unwrap_or_else(|| "-".to_string())
}
