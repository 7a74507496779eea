use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{AggregationMode, DetectionConfig};
use crate::error::Result;
use crate::models::{AgedRecord, AgingSummary, Anomaly, InvoiceRecord, Severity};
use crate::service::aggregator::aggregate;
use crate::service::aging;
use crate::service::outlier::OutlierModelDetector;
use crate::service::rules::RuleBasedDetector;

/// 单批次检测统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionStats {
    pub records: usize,
    pub rule_hits: usize,
    pub model_hits: usize,
    pub anomalies: usize,
    pub high_severity: usize,
}

/// 单批次检测结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub aging: AgingSummary,
    pub stats: DetectionStats,
    pub anomalies: Vec<Anomaly>,
}

/// 异常检测引擎: 账龄 -> {规则, 模型} -> 合并
///
/// 引擎本身只持有参数，离群模型在每次 `run` 内新建，批次之间不共享拟合状态。
#[derive(Debug, Clone)]
pub struct AnomalyEngine {
    config: DetectionConfig,
    rules: RuleBasedDetector,
}

impl AnomalyEngine {
    /// 参数在构造时校验
    pub fn new(config: DetectionConfig) -> Result<Self> {
        OutlierModelDetector::from_config(&config)?;
        Ok(Self {
            config,
            rules: RuleBasedDetector::new(),
        })
    }

    pub fn with_aggregation(mut self, mode: AggregationMode) -> Self {
        self.config.aggregation = mode;
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// 对已带账龄的批次执行检测
    pub fn run(&self, aged: &[AgedRecord]) -> Result<(Vec<Anomaly>, DetectionStats)> {
        let rule_anomalies = self.rules.detect(aged);
        let model = OutlierModelDetector::from_config(&self.config)?;
        let model_anomalies = model.fit_and_score(aged)?;

        let rule_hits = rule_anomalies.len();
        let model_hits = model_anomalies.len();
        let anomalies = aggregate(rule_anomalies, model_anomalies, self.config.aggregation);

        let stats = DetectionStats {
            records: aged.len(),
            rule_hits,
            model_hits,
            anomalies: anomalies.len(),
            high_severity: anomalies.iter().filter(|a| a.severity == Severity::High).count(),
        };
        tracing::info!(
            "[Engine] 检测完成: records {}, rule hits {}, model hits {}, output {} ({} high)",
            stats.records, stats.rule_hits, stats.model_hits, stats.anomalies, stats.high_severity
        );

        Ok((anomalies, stats))
    }

    /// 清洗后的台账 -> 账龄 -> 检测
    pub fn process(&self, records: &[InvoiceRecord], reference_date: NaiveDate) -> Result<BatchOutcome> {
        let aged = aging::classify(records, reference_date);
        let summary = aging::summarize(&aged);
        tracing::info!(
            "[Engine] 账龄基准日 {}: {} invoices, overdue amount {}",
            reference_date, summary.invoice_count, summary.overdue_amount
        );

        let (anomalies, stats) = self.run(&aged)?;
        Ok(BatchOutcome {
            aging: summary,
            stats,
            anomalies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn invalid_contamination_fails_at_construction() {
        let cfg = DetectionConfig {
            contamination: 0.75,
            ..Default::default()
        };
        assert!(matches!(
            AnomalyEngine::new(cfg),
            Err(EngineError::InvalidContamination(_))
        ));
    }

    #[test]
    fn empty_batch_is_not_an_error() {
        let engine = AnomalyEngine::new(DetectionConfig::default()).unwrap();
        let outcome = engine
            .process(&[], NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
            .unwrap();
        assert!(outcome.anomalies.is_empty());
        assert_eq!(outcome.stats.records, 0);
        assert_eq!(outcome.aging.invoice_count, 0);
    }
}
