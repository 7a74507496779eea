use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

use crate::models::{Anomaly, AsInvoice, Severity};
use crate::service::stats::decimal_percentile;

pub const REASON_DUPLICATE: &str = "Potential Duplicate";
pub const REASON_WEEKEND: &str = "Invoice Dated on Weekend";

/// 高金额阈值使用的百分位
pub const HIGH_AMOUNT_PERCENTILE: u32 = 98;

/// 规则检测器 (无状态，阈值每次调用按本批数据重新计算)
///
/// 三条规则互不排斥，同一行可以同时命中多条:
/// 1. 重复: (entity_name, amount, invoice_date) 完全相同且组内 >= 2 行，全部标记，High
/// 2. 高金额: amount 严格大于全批 98 分位，Medium
/// 3. 周末开票: invoice_date 为周六/周日，Low
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedDetector;

impl RuleBasedDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect<R: AsInvoice + Clone>(&self, records: &[R]) -> Vec<Anomaly<R>> {
        if records.is_empty() {
            return Vec::new();
        }

        let mut anomalies = Vec::new();
        anomalies.extend(self.duplicates(records));
        anomalies.extend(self.high_amounts(records));
        anomalies.extend(self.weekend_dated(records));

        tracing::info!(
            "[Rules] {} records checked, {} rule hits",
            records.len(),
            anomalies.len()
        );
        anomalies
    }

    /// 重复检测: 组内每一行都输出，而不是只保留一行
    fn duplicates<R: AsInvoice + Clone>(&self, records: &[R]) -> Vec<Anomaly<R>> {
        let mut group_sizes: HashMap<(&str, &BigDecimal, NaiveDate), usize> = HashMap::new();
        for r in records {
            let inv = r.invoice();
            *group_sizes
                .entry((inv.entity_name.as_str(), &inv.amount, inv.invoice_date))
                .or_insert(0) += 1;
        }

        records
            .iter()
            .filter(|r| {
                let inv = r.invoice();
                group_sizes
                    .get(&(inv.entity_name.as_str(), &inv.amount, inv.invoice_date))
                    .is_some_and(|&n| n >= 2)
            })
            .map(|r| Anomaly::new(r.clone(), REASON_DUPLICATE, Severity::High))
            .collect()
    }

    fn high_amounts<R: AsInvoice + Clone>(&self, records: &[R]) -> Vec<Anomaly<R>> {
        let amounts: Vec<BigDecimal> = records.iter().map(|r| r.invoice().amount.clone()).collect();
        let Some(threshold) = decimal_percentile(&amounts, HIGH_AMOUNT_PERCENTILE) else {
            return Vec::new();
        };
        tracing::debug!("[Rules] high amount threshold (p{}) = {}", HIGH_AMOUNT_PERCENTILE, threshold);

        let reason = high_amount_reason(&threshold);
        records
            .iter()
            .filter(|r| r.invoice().amount > threshold)
            .map(|r| Anomaly::new(r.clone(), reason.clone(), Severity::Medium))
            .collect()
    }

    fn weekend_dated<R: AsInvoice + Clone>(&self, records: &[R]) -> Vec<Anomaly<R>> {
        records
            .iter()
            .filter(|r| is_weekend(r.invoice().invoice_date))
            .map(|r| Anomaly::new(r.clone(), REASON_WEEKEND, Severity::Low))
            .collect()
    }
}

/// 阈值保留两位小数写入原因文本
pub fn high_amount_reason(threshold: &BigDecimal) -> String {
    format!("Unusually High Amount (>{})", threshold.round(2).with_scale(2))
}

/// 周六 (5) / 周日 (6)，周一为 0
pub fn is_weekend(date: NaiveDate) -> bool {
    date.weekday().num_days_from_monday() >= 5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InvoiceRecord;
    use std::str::FromStr;

    fn rec(id: &str, entity: &str, amount: &str, date: &str) -> InvoiceRecord {
        let invoice_date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        InvoiceRecord {
            invoice_id: id.to_string(),
            entity_name: entity.to_string(),
            invoice_date,
            due_date: invoice_date + chrono::Duration::days(30),
            amount: BigDecimal::from_str(amount).unwrap(),
            currency: "USD".to_string(),
            amount_normalized: BigDecimal::from_str(amount).unwrap(),
            invoice_type: "AP".to_string(),
            status: "Open".to_string(),
        }
    }

    fn reasons_for<'a>(anoms: &'a [Anomaly<InvoiceRecord>], id: &str) -> Vec<&'a str> {
        anoms
            .iter()
            .filter(|a| a.record.invoice_id == id)
            .map(|a| a.anomaly_reason.as_str())
            .collect()
    }

    #[test]
    fn empty_batch_yields_nothing() {
        let out = RuleBasedDetector::new().detect::<InvoiceRecord>(&[]);
        assert!(out.is_empty());
    }

    #[test]
    fn duplicate_and_weekend_scenario() {
        let records = vec![
            rec("1", "ACME", "1000", "2024-01-06"),
            rec("2", "ACME", "1000", "2024-01-06"),
            rec("3", "BETA", "50", "2024-01-08"),
        ];
        let out = RuleBasedDetector::new().detect(&records);

        for id in ["1", "2"] {
            let reasons = reasons_for(&out, id);
            assert_eq!(reasons.len(), 2, "invoice {id}: {reasons:?}");
            assert!(reasons.contains(&REASON_DUPLICATE));
            assert!(reasons.contains(&REASON_WEEKEND));
        }
        assert!(reasons_for(&out, "3").is_empty());

        let dup = out.iter().find(|a| a.anomaly_reason == REASON_DUPLICATE).unwrap();
        assert_eq!(dup.severity, Severity::High);
        let weekend = out.iter().find(|a| a.anomaly_reason == REASON_WEEKEND).unwrap();
        assert_eq!(weekend.severity, Severity::Low);
    }

    #[test]
    fn duplicate_requires_all_three_keys() {
        let records = vec![
            rec("1", "ACME", "1000", "2024-01-08"),
            rec("2", "ACME", "1000.01", "2024-01-08"),
            rec("3", "ACMEX", "1000", "2024-01-08"),
            rec("4", "ACME", "1000", "2024-01-09"),
        ];
        let out = RuleBasedDetector::new().detect(&records);
        assert!(out.iter().all(|a| a.anomaly_reason != REASON_DUPLICATE));
    }

    #[test]
    fn single_record_never_exceeds_its_own_threshold() {
        let out = RuleBasedDetector::new().detect(&[rec("1", "ACME", "999999", "2024-01-08")]);
        assert!(out.is_empty());
    }

    #[test]
    fn weekend_only_on_saturday_and_sunday() {
        // 2024-01-08 is a Monday
        for offset in 0..7 {
            let date = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap() + chrono::Duration::days(offset);
            assert_eq!(is_weekend(date), offset >= 5, "{date}");
        }
    }

    #[test]
    fn reason_embeds_two_decimal_threshold() {
        assert_eq!(
            high_amount_reason(&BigDecimal::from(9500)),
            "Unusually High Amount (>9500.00)"
        );
        assert_eq!(
            high_amount_reason(&BigDecimal::from_str("29.6").unwrap()),
            "Unusually High Amount (>29.60)"
        );
        // 精确十进制上四舍五入
        assert_eq!(
            high_amount_reason(&BigDecimal::from_str("29.605").unwrap()),
            "Unusually High Amount (>29.61)"
        );
    }

    #[test]
    fn detection_is_idempotent() {
        let records: Vec<InvoiceRecord> = (0..40)
            .map(|i| rec(&i.to_string(), "ACME", &(100 + i * 13).to_string(), "2024-02-03"))
            .collect();
        let det = RuleBasedDetector::new();
        assert_eq!(det.detect(&records), det.detect(&records));
    }
}
