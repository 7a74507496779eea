//! 分位数与均值/标准差，所有分位数均为线性插值。

use bigdecimal::BigDecimal;

/// 总体均值与标准差 (ddof = 0)
pub fn mean_std(vals: &[f64]) -> (f64, f64) {
    if vals.is_empty() {
        return (0.0, 0.0);
    }
    let n = vals.len() as f64;
    let mean = vals.iter().sum::<f64>() / n;
    let sq_diff: f64 = vals.iter().map(|v| (v - mean).powi(2)).sum();
    (mean, (sq_diff / n).sqrt())
}

/// 浮点分位数，q 取 [0, 100]
pub fn percentile(vals: &[f64], q: f64) -> Option<f64> {
    if vals.is_empty() {
        return None;
    }
    let mut sorted = vals.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = (sorted.len() - 1) as f64 * (q / 100.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// 十进制分位数，q 为整数百分位 [0, 100]，插值全程精确
pub fn decimal_percentile(vals: &[BigDecimal], q: u32) -> Option<BigDecimal> {
    if vals.is_empty() {
        return None;
    }
    let mut sorted: Vec<&BigDecimal> = vals.iter().collect();
    sorted.sort();

    // pos = (n - 1) * q / 100 = lo + rem / 100
    let scaled = (sorted.len() - 1) * q.min(100) as usize;
    let lo = scaled / 100;
    let rem = scaled % 100;
    if rem == 0 {
        return Some(sorted[lo].clone());
    }

    let frac = BigDecimal::from(rem as u64) / BigDecimal::from(100);
    let spread = sorted[lo + 1] - sorted[lo];
    Some(sorted[lo] + &(spread * frac))
}
