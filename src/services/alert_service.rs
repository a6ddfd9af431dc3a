use crate::models::alert::{AlertEvent, AlertKind, Direction, Severity, Thresholds};
use crate::models::stock::Quote;

/// 根据阈值生成报警。纯函数，顺序固定：价格异动在前，主力资金在后。
/// 不做去重和冷却，条件持续成立时每轮都会重复触发。
pub fn evaluate(quote: &Quote, thresholds: &Thresholds) -> Vec<AlertEvent> {
    let mut alerts = Vec::new();

    if quote.change_pct.abs() >= thresholds.price_change_pct {
        let direction = if quote.change_pct > 0.0 { Direction::Up } else { Direction::Down };
        alerts.push(AlertEvent {
            kind: AlertKind::PriceMove { direction, change_pct: quote.change_pct },
            message: format!(
                "【价格异动】{}超过{}%! 当前涨跌幅 {:.2}%",
                direction.label_cn(),
                thresholds.price_change_pct,
                quote.change_pct
            ),
            severity: Severity::Warning,
        });
    }

    if quote.flow_main > thresholds.flow_main {
        alerts.push(AlertEvent {
            kind: AlertKind::FundFlow { flow_main: quote.flow_main },
            message: format!(
                "【主力资金】单日净流入超{:.0}亿元! 当前 {:.2}万元",
                thresholds.flow_main / 10000.0,
                quote.flow_main
            ),
            severity: Severity::Warning,
        });
    }

    alerts
}
