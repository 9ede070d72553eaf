//! 两个核心派生指标的唯一计算口径。

/// 平均成交额 (ATW) 的缩放系数。
pub const ATW_SCALE: f64 = 1000.0;

/// 交割成交额 = 交割量 × 收盘价。
pub fn delivery_turnover(delivered_quantity: f64, close: f64) -> f64 {
    delivered_quantity * close
}

/// 平均成交额 = 总成交额 / 1000。
pub fn average_traded_worth(total_traded_value: f64) -> f64 {
    total_traded_value / ATW_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formulas() {
        assert_eq!(delivery_turnover(60_000.0, 100.0), 6_000_000.0);
        assert_eq!(average_traded_worth(9_000_000.0), 9_000.0);
        assert_eq!(delivery_turnover(0.0, 100.0), 0.0);
    }
}
