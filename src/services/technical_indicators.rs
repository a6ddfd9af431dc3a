use crate::models::stock::{HistoricalBar, KlineBar};
use crate::services::history_kline::{normalize_bars, KlineSource};

pub const MA_SHORT: usize = 5;
pub const MA_LONG: usize = 20;

/// 拉取日K线并计算 MA5/MA20，只返回最近 `display_bars` 根。
/// 拉取或解析失败时返回空序列，调用方按"无指标"处理。
pub async fn load_history(
    source: &dyn KlineSource,
    fetch_bars: usize,
    display_bars: usize,
) -> Vec<HistoricalBar> {
    // 至少要覆盖 MA20 + 展示窗口
    let count = fetch_bars.max(MA_LONG + display_bars.saturating_sub(1));
    match source.fetch_daily(count).await {
        Ok(bars) => {
            let bars = normalize_bars(bars);
            let with_ma = compute_moving_averages(&bars);
            tail(with_ma, display_bars)
        }
        Err(e) => {
            log::warn!("历史K线获取失败，本轮不显示均线: {}", e);
            Vec::new()
        }
    }
}

/// 为升序K线逐根附加 MA5/MA20；不足窗口长度的位置为 None
pub fn compute_moving_averages(bars: &[KlineBar]) -> Vec<HistoricalBar> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ma5 = calc_ma(&closes, MA_SHORT);
    let ma20 = calc_ma(&closes, MA_LONG);

    bars.iter()
        .enumerate()
        .map(|(i, b)| HistoricalBar {
            date: b.date.clone(),
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
            ma5: ma5[i],
            ma20: ma20[i],
        })
        .collect()
}

/// 最新一根K线的 (MA5, MA20)
pub fn latest_ma(bars: &[HistoricalBar]) -> (Option<f64>, Option<f64>) {
    bars.last().map(|b| (b.ma5, b.ma20)).unwrap_or((None, None))
}

fn tail(mut bars: Vec<HistoricalBar>, n: usize) -> Vec<HistoricalBar> {
    if bars.len() > n {
        bars.drain(..bars.len() - n);
    }
    bars
}

/// 简单移动平均，第 i 位为 [i-period+1, i] 收盘价均值
pub fn calc_ma(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 || data.len() < period { return result; }

    let mut sum: f64 = data[..period].iter().sum();
    result[period - 1] = Some(sum / period as f64);

    for i in period..data.len() {
        sum += data[i] - data[i - period];
        result[i] = Some(sum / period as f64);
    }
    result
}
