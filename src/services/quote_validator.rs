use crate::error::ValidationError;
use crate::models::stock::Quote;

/// 价格合理区间（开区间）。超出即视为单位错乱或缺字段默认 0 的脏数据。
pub const PRICE_FLOOR: f64 = 0.1;
pub const PRICE_CEILING: f64 = 1000.0;

pub fn check_price(field: &'static str, value: f64) -> Result<(), ValidationError> {
    // NaN 也落在这里
    if value > PRICE_FLOOR && value < PRICE_CEILING {
        Ok(())
    } else {
        Err(ValidationError { field, value })
    }
}

/// 逐个检查价格字段，遇到第一个越界字段即返回
pub fn validate_quote(quote: Quote) -> Result<Quote, ValidationError> {
    check_price("latest_price", quote.latest_price)?;
    check_price("prev_close", quote.prev_close)?;
    check_price("open", quote.open)?;
    check_price("high", quote.high)?;
    check_price("low", quote.low)?;
    Ok(quote)
}
