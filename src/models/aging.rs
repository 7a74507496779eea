use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::invoice::{AsInvoice, InvoiceRecord};

/// 账龄区间 (有序)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgingBucket {
    #[serde(rename = "Current")]
    Current,
    #[serde(rename = "1-30 Days")]
    Days1To30,
    #[serde(rename = "31-60 Days")]
    Days31To60,
    #[serde(rename = "61-90 Days")]
    Days61To90,
    #[serde(rename = "90+ Days")]
    Over90,
}

impl AgingBucket {
    pub const ALL: [AgingBucket; 5] = [
        AgingBucket::Current,
        AgingBucket::Days1To30,
        AgingBucket::Days31To60,
        AgingBucket::Days61To90,
        AgingBucket::Over90,
    ];

    /// 按逾期天数划分: <=0, <=30, <=60, <=90, 其余
    pub fn from_days_overdue(days: i64) -> Self {
        match days {
            d if d <= 0 => AgingBucket::Current,
            d if d <= 30 => AgingBucket::Days1To30,
            d if d <= 60 => AgingBucket::Days31To60,
            d if d <= 90 => AgingBucket::Days61To90,
            _ => AgingBucket::Over90,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgingBucket::Current => "Current",
            AgingBucket::Days1To30 => "1-30 Days",
            AgingBucket::Days31To60 => "31-60 Days",
            AgingBucket::Days61To90 => "61-90 Days",
            AgingBucket::Over90 => "90+ Days",
        }
    }
}

impl fmt::Display for AgingBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 带账龄的台账行，批次内只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgedRecord {
    #[serde(flatten)]
    pub record: InvoiceRecord,
    pub days_overdue: i64,
    pub aging_bucket: AgingBucket,
}

impl AsInvoice for AgedRecord {
    fn invoice(&self) -> &InvoiceRecord {
        &self.record
    }

    fn aging(&self) -> Option<(i64, AgingBucket)> {
        Some((self.days_overdue, self.aging_bucket))
    }
}

/// 单个账龄区间汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketTotal {
    pub bucket: AgingBucket,
    pub total_amount: BigDecimal,
    pub invoice_count: usize,
}

/// 批次账龄汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgingSummary {
    pub buckets: Vec<BucketTotal>,
    pub total_amount: BigDecimal,
    pub invoice_count: usize,
    pub overdue_amount: BigDecimal,
}
