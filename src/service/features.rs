use bigdecimal::ToPrimitive;
use chrono::Datelike;

use crate::models::AsInvoice;
use crate::service::stats::mean_std;

pub const FEATURE_NAMES: [&str; 3] = ["amount", "invoice_month", "invoice_weekday"];

/// 特征向量: [amount, 月份 1-12, 星期 0-6 (周一为 0)]
pub fn feature_vector<R: AsInvoice>(record: &R) -> Vec<f64> {
    let inv = record.invoice();
    vec![
        inv.amount.to_f64().unwrap_or(0.0),
        inv.invoice_date.month() as f64,
        inv.invoice_date.weekday().num_days_from_monday() as f64,
    ]
}

/// 标准化 (零均值 / 单位方差)
///
/// 零方差特征的 scale 取 1.0，只做平移。
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    /// 至少有一个特征方差非零
    pub informative: bool,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Option<Self> {
        let width = rows.first()?.len();
        let mut mean = Vec::with_capacity(width);
        let mut scale = Vec::with_capacity(width);
        let mut informative = false;

        for f in 0..width {
            let column: Vec<f64> = rows.iter().map(|r| r[f]).collect();
            let (m, s) = mean_std(&column);
            mean.push(m);
            if s > 0.0 && s.is_finite() {
                scale.push(s);
                informative = true;
            } else {
                scale.push(1.0);
            }
        }

        Some(Self {
            mean,
            scale,
            informative,
        })
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|r| {
                r.iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(v, (m, s))| (v - m) / s)
                    .collect()
            })
            .collect()
    }
}
