use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate};
use std::io::{Read, Write};
use std::str::FromStr;

use crate::error::{EngineError, Result};
use crate::models::{InvoiceInput, InvoiceRecord, RawInvoiceRow};

/// 输入必须具备的列
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "invoice_id",
    "entity_name",
    "invoice_date",
    "due_date",
    "amount",
    "currency",
    "type",
    "status",
];

/// 固定汇率表 (折算到 USD)，未知币种按 1.0
const CURRENCY_RATES: [(&str, &str); 3] = [("USD", "1.0"), ("EUR", "1.1"), ("GBP", "1.25")];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

/// 清洗统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub loaded: usize,
    pub dropped: usize,
    pub defaulted_due_dates: usize,
}

/// 台账清洗器
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    default_due_days: i64,
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new(30)
    }
}

impl RecordNormalizer {
    pub fn new(default_due_days: i64) -> Self {
        Self { default_due_days }
    }

    /// 校验表头，一次性列出所有缺失列
    pub fn validate_schema<'a>(&self, headers: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let present: Vec<&str> = headers.into_iter().map(str::trim).collect();
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| !present.contains(*col))
            .map(|col| col.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            tracing::error!("Schema validation failed: missing columns {:?}", missing);
            Err(EngineError::MissingColumns(missing))
        }
    }

    /// 读取 CSV 并清洗
    pub fn read_csv<R: Read>(&self, reader: R) -> Result<(Vec<InvoiceRecord>, NormalizeStats)> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);
        self.validate_schema(rdr.headers()?.iter())?;

        let mut rows = Vec::new();
        for row in rdr.deserialize::<RawInvoiceRow>() {
            rows.push(row?);
        }
        tracing::info!("Loaded {} raw records", rows.len());

        Ok(self.clean_rows(rows))
    }

    /// 字段强制转换 + 补全 + 丢弃必填缺失的行
    pub fn clean_rows(&self, rows: Vec<RawInvoiceRow>) -> (Vec<InvoiceRecord>, NormalizeStats) {
        let mut stats = NormalizeStats {
            loaded: rows.len(),
            ..Default::default()
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(input) = coerce_row(row) else {
                stats.dropped += 1;
                continue;
            };
            let defaulted = input.due_date.is_none();
            match self.normalize(input) {
                Ok(record) => {
                    if defaulted {
                        stats.defaulted_due_dates += 1;
                    }
                    records.push(record);
                }
                Err(e) => {
                    tracing::warn!("Dropping row: {}", e);
                    stats.dropped += 1;
                }
            }
        }

        if stats.defaulted_due_dates > 0 {
            tracing::warn!(
                "Found {} records with missing due dates, defaulting to net {} days",
                stats.defaulted_due_dates, self.default_due_days
            );
        }
        if stats.dropped > 0 {
            tracing::warn!(
                "Dropped {} records missing invoice_id / invoice_date / amount",
                stats.dropped
            );
        }

        (records, stats)
    }

    /// 已类型化输入的清洗 (JSON 接口)，任一记录无法补全到期日即整体拒绝
    pub fn normalize_inputs(&self, inputs: Vec<InvoiceInput>) -> Result<Vec<InvoiceRecord>> {
        let defaulted = inputs.iter().filter(|i| i.due_date.is_none()).count();
        if defaulted > 0 {
            tracing::warn!(
                "Found {} records with missing due dates, defaulting to net {} days",
                defaulted, self.default_due_days
            );
        }
        inputs.into_iter().map(|i| self.normalize(i)).collect()
    }

    fn normalize(&self, input: InvoiceInput) -> Result<InvoiceRecord> {
        let due_date = match input.due_date {
            Some(d) => d,
            None => input
                .invoice_date
                .checked_add_signed(Duration::days(self.default_due_days))
                .ok_or_else(|| {
                    EngineError::InvalidParameter(format!(
                        "invoice {}: due date out of range for invoice_date {}",
                        input.invoice_id.trim(),
                        input.invoice_date
                    ))
                })?,
        };
        let currency = input
            .currency
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_default();
        // 统一两位小数，避免不同汇率带出不同精度
        let amount_normalized = (&input.amount * &currency_rate(&currency)).round(2).with_scale(2);

        Ok(InvoiceRecord {
            invoice_id: input.invoice_id.trim().to_string(),
            entity_name: input.entity_name.trim().to_uppercase(),
            invoice_date: input.invoice_date,
            due_date,
            amount: input.amount,
            currency,
            amount_normalized,
            invoice_type: input.invoice_type.unwrap_or_default(),
            status: input.status.unwrap_or_default(),
        })
    }
}

/// 写出清洗后的台账
pub fn write_csv<W: Write>(writer: W, records: &[InvoiceRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for rec in records {
        wtr.serialize(rec)?;
    }
    wtr.flush()?;
    Ok(())
}

/// 币种折算率
pub fn currency_rate(currency: &str) -> BigDecimal {
    CURRENCY_RATES
        .iter()
        .find(|(code, _)| *code == currency)
        .and_then(|(_, rate)| BigDecimal::from_str(rate).ok())
        .unwrap_or_else(|| BigDecimal::from(1))
}

/// 宽松日期解析，无法解析返回 None
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let head = s.get(..10).unwrap_or(s);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(head, fmt).ok())
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn coerce_row(row: RawInvoiceRow) -> Option<InvoiceInput> {
    let invoice_id = non_empty(row.invoice_id)?;
    let invoice_date = row.invoice_date.as_deref().and_then(parse_date)?;
    let amount = non_empty(row.amount)
        .and_then(|a| BigDecimal::from_str(&a.replace(',', "")).ok())?;

    Some(InvoiceInput {
        invoice_id,
        entity_name: non_empty(row.entity_name).unwrap_or_default(),
        invoice_date,
        due_date: row.due_date.as_deref().and_then(parse_date),
        amount,
        currency: non_empty(row.currency),
        invoice_type: non_empty(row.invoice_type),
        status: non_empty(row.status),
    })
}
