use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;

use crate::models::{AgedRecord, AgingBucket, AgingSummary, BucketTotal, InvoiceRecord};

/// 账龄计算: 逾期天数 = 基准日 - 到期日
pub fn classify(records: &[InvoiceRecord], reference_date: NaiveDate) -> Vec<AgedRecord> {
    records
        .iter()
        .map(|rec| {
            let days_overdue = (reference_date - rec.due_date).num_days();
            AgedRecord {
                record: rec.clone(),
                days_overdue,
                aging_bucket: AgingBucket::from_days_overdue(days_overdue),
            }
        })
        .collect()
}

/// 按账龄区间汇总金额 (五个区间全部输出，按顺序)
pub fn summarize(aged: &[AgedRecord]) -> AgingSummary {
    let mut buckets: Vec<BucketTotal> = AgingBucket::ALL
        .iter()
        .map(|&bucket| BucketTotal {
            bucket,
            total_amount: BigDecimal::zero(),
            invoice_count: 0,
        })
        .collect();

    let mut total_amount = BigDecimal::zero();
    let mut overdue_amount = BigDecimal::zero();

    for rec in aged {
        let slot = &mut buckets[rec.aging_bucket as usize];
        slot.total_amount += &rec.record.amount;
        slot.invoice_count += 1;

        total_amount += &rec.record.amount;
        if rec.days_overdue > 0 {
            overdue_amount += &rec.record.amount;
        }
    }

    AgingSummary {
        buckets,
        total_amount,
        invoice_count: aged.len(),
        overdue_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, due: NaiveDate, amount: i64) -> InvoiceRecord {
        InvoiceRecord {
            invoice_id: id.to_string(),
            entity_name: "ACME".to_string(),
            invoice_date: due - chrono::Duration::days(30),
            due_date: due,
            amount: BigDecimal::from(amount),
            currency: "USD".to_string(),
            amount_normalized: BigDecimal::from(amount),
            invoice_type: "AP".to_string(),
            status: "Open".to_string(),
        }
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(AgingBucket::from_days_overdue(-5), AgingBucket::Current);
        assert_eq!(AgingBucket::from_days_overdue(0), AgingBucket::Current);
        assert_eq!(AgingBucket::from_days_overdue(1), AgingBucket::Days1To30);
        assert_eq!(AgingBucket::from_days_overdue(30), AgingBucket::Days1To30);
        assert_eq!(AgingBucket::from_days_overdue(31), AgingBucket::Days31To60);
        assert_eq!(AgingBucket::from_days_overdue(60), AgingBucket::Days31To60);
        assert_eq!(AgingBucket::from_days_overdue(90), AgingBucket::Days61To90);
        assert_eq!(AgingBucket::from_days_overdue(91), AgingBucket::Over90);
        assert!(AgingBucket::Current < AgingBucket::Over90);
    }

    #[test]
    fn classify_and_summarize() {
        let reference = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let records = vec![
            record("A", NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(), 100),
            record("B", NaiveDate::from_ymd_opt(2024, 6, 20).unwrap(), 200),
            record("C", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 300),
        ];

        let aged = classify(&records, reference);
        assert_eq!(aged[0].days_overdue, -15);
        assert_eq!(aged[1].aging_bucket, AgingBucket::Days1To30);
        assert_eq!(aged[2].aging_bucket, AgingBucket::Over90);

        let summary = summarize(&aged);
        assert_eq!(summary.buckets.len(), 5);
        assert_eq!(summary.invoice_count, 3);
        assert_eq!(summary.total_amount, BigDecimal::from(600));
        assert_eq!(summary.overdue_amount, BigDecimal::from(500));
        assert_eq!(summary.buckets[4].total_amount, BigDecimal::from(300));
        assert_eq!(summary.buckets[2].invoice_count, 0);
    }
}
