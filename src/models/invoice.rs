use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::aging::AgingBucket;

/// CSV 原始行 (所有字段均为字符串，缺失或无法解析时在清洗阶段丢弃/补全)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInvoiceRow {
    #[serde(default)]
    pub invoice_id: Option<String>,
    #[serde(default)]
    pub entity_name: Option<String>,
    #[serde(default)]
    pub invoice_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, rename = "type")]
    pub invoice_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// 已类型化的输入 (JSON 接口)，必填字段缺失时反序列化直接失败
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceInput {
    pub invoice_id: String,
    pub entity_name: String,
    pub invoice_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub amount: BigDecimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, rename = "type")]
    pub invoice_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// 清洗后的台账行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub invoice_id: String,
    pub entity_name: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub amount: BigDecimal,
    pub currency: String,
    pub amount_normalized: BigDecimal,
    #[serde(rename = "type")]
    pub invoice_type: String,
    pub status: String,
}

/// 检测器对输入行的最小要求：能拿到底层台账行，可选地带账龄信息
pub trait AsInvoice {
    fn invoice(&self) -> &InvoiceRecord;

    fn aging(&self) -> Option<(i64, AgingBucket)> {
        None
    }
}

impl AsInvoice for InvoiceRecord {
    fn invoice(&self) -> &InvoiceRecord {
        self
    }
}
