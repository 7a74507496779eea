use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::aging::{AgedRecord, AgingBucket};
use super::invoice::AsInvoice;

/// 严重程度 (Low < Medium < High)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 异常条目 = 原始行 + 原因 + 严重程度
///
/// 同一行可被多条规则/模型命中，每次命中各自一条。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly<R = AgedRecord> {
    #[serde(flatten)]
    pub record: R,
    pub anomaly_reason: String,
    pub severity: Severity,
    /// 模型决策分数 (越负越异常)，规则命中时为空
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_score: Option<f64>,
}

impl<R> Anomaly<R> {
    pub fn new(record: R, reason: impl Into<String>, severity: Severity) -> Self {
        Self {
            record,
            anomaly_reason: reason.into(),
            severity,
            anomaly_score: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.anomaly_score = Some(score);
        self
    }
}

/// 导出用扁平行 (报表 / CSV 消费方约定的列)
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyRow {
    pub invoice_id: String,
    pub entity_name: String,
    pub amount: BigDecimal,
    pub invoice_date: NaiveDate,
    pub days_overdue: Option<i64>,
    pub aging_bucket: Option<AgingBucket>,
    pub anomaly_reason: String,
    pub severity: Severity,
    pub anomaly_score: Option<f64>,
}

impl<R: AsInvoice> From<&Anomaly<R>> for AnomalyRow {
    fn from(a: &Anomaly<R>) -> Self {
        let inv = a.record.invoice();
        let aging = a.record.aging();
        Self {
            invoice_id: inv.invoice_id.clone(),
            entity_name: inv.entity_name.clone(),
            amount: inv.amount.clone(),
            invoice_date: inv.invoice_date,
            days_overdue: aging.map(|(d, _)| d),
            aging_bucket: aging.map(|(_, b)| b),
            anomaly_reason: a.anomaly_reason.clone(),
            severity: a.severity,
            anomaly_score: a.anomaly_score,
        }
    }
}
