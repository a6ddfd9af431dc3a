use serde::{Deserialize, Serialize};

/// 报警阈值，启动时读取一次，运行期间不变
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// 涨跌幅绝对值触发线 %
    pub price_change_pct: f64,
    /// 主力净流入触发线（万元）
    pub flow_main: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "up")]
    Up,
    #[serde(rename = "down")]
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    pub fn label_cn(&self) -> &'static str {
        match self {
            Direction::Up => "上涨",
            Direction::Down => "下跌",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertKind {
    PriceMove { direction: Direction, change_pct: f64 },
    FundFlow { flow_main: f64 },
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::PriceMove { .. } => "price_move",
            AlertKind::FundFlow { .. } => "fund_flow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "warning")]
    Warning,
}

/// 单条报警，只用于展示，不持久化也不去重
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    #[serde(flatten)]
    pub kind: AlertKind,
    pub message: String,
    pub severity: Severity,
}
