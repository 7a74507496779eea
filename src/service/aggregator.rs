use indexmap::IndexMap;

use crate::config::AggregationMode;
use crate::models::{Anomaly, AsInvoice, Severity};

/// 合并规则结果与模型结果
///
/// 默认 `Concatenate`: 规则在前、模型在后直接拼接，不跨检测器去重，
/// 同一发票被规则和模型同时命中时输出两行。
pub fn aggregate<R: AsInvoice>(
    rule_anomalies: Vec<Anomaly<R>>,
    model_anomalies: Vec<Anomaly<R>>,
    mode: AggregationMode,
) -> Vec<Anomaly<R>> {
    let combined = rule_anomalies.into_iter().chain(model_anomalies);
    match mode {
        AggregationMode::Concatenate => combined.collect(),
        AggregationMode::MergePerInvoice => merge_per_invoice(combined),
    }
}

/// 按 invoice_id 合并: 保持首次出现顺序，原因用 "; " 连接且不重复，严重程度取最高
fn merge_per_invoice<R: AsInvoice>(items: impl Iterator<Item = Anomaly<R>>) -> Vec<Anomaly<R>> {
    let mut merged: IndexMap<String, Anomaly<R>> = IndexMap::new();

    for item in items {
        let key = item.record.invoice().invoice_id.clone();
        match merged.get_mut(&key) {
            Some(existing) => {
                if !existing
                    .anomaly_reason
                    .split("; ")
                    .any(|r| r == item.anomaly_reason)
                {
                    existing.anomaly_reason.push_str("; ");
                    existing.anomaly_reason.push_str(&item.anomaly_reason);
                }
                existing.severity = existing.severity.max(item.severity);
                if existing.anomaly_score.is_none() {
                    existing.anomaly_score = item.anomaly_score;
                }
            }
            None => {
                merged.insert(key, item);
            }
        }
    }

    merged.into_values().collect()
}

/// 展示用: 按金额降序 (稳定排序，同额保持原顺序)
pub fn sort_by_amount_desc<R: AsInvoice>(anomalies: &mut [Anomaly<R>]) {
    anomalies.sort_by(|a, b| {
        b.record
            .invoice()
            .amount
            .cmp(&a.record.invoice().amount)
    });
}

/// 展示用: 只保留指定严重程度
pub fn filter_by_severity<R: AsInvoice + Clone>(
    anomalies: &[Anomaly<R>],
    severities: &[Severity],
) -> Vec<Anomaly<R>> {
    anomalies
        .iter()
        .filter(|a| severities.contains(&a.severity))
        .cloned()
        .collect()
}
