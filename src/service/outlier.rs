use crate::config::DetectionConfig;
use crate::error::Result;
use crate::models::{Anomaly, AsInvoice, Severity};
use crate::service::features::{feature_vector, StandardScaler};
use crate::service::isolation_forest::{ForestParams, IsolationForest};

pub const REASON_ML_OUTLIER: &str = "Statistical Outlier (ML)";

/// 决策分数低于该值升级为 High (固定调参常量，不随批次变化)
pub const HIGH_SEVERITY_CUTOFF: f64 = -0.2;

/// 统计离群检测器
///
/// 只保存参数；每次 `fit_and_score` 都重新标准化、重新训练一片新森林，
/// 拟合结果随调用结束丢弃，不同批次 (AP / AR) 之间互不影响。
#[derive(Debug, Clone)]
pub struct OutlierModelDetector {
    params: ForestParams,
}

impl OutlierModelDetector {
    /// contamination 必须在 (0, 0.5] 内，越界直接报错不做截断
    pub fn new(contamination: f64) -> Result<Self> {
        Self::with_params(ForestParams {
            contamination,
            ..Default::default()
        })
    }

    pub fn with_params(params: ForestParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn from_config(cfg: &DetectionConfig) -> Result<Self> {
        Self::with_params(ForestParams {
            n_estimators: cfg.n_estimators,
            max_samples: cfg.max_samples,
            contamination: cfg.contamination,
            seed: cfg.random_seed,
        })
    }

    pub fn contamination(&self) -> f64 {
        self.params.contamination
    }

    pub fn fit_and_score<R: AsInvoice + Clone>(&self, records: &[R]) -> Result<Vec<Anomaly<R>>> {
        let raw: Vec<Vec<f64>> = records.iter().map(feature_vector).collect();

        let Some(scaler) = StandardScaler::fit(&raw) else {
            return Ok(Vec::new());
        };
        if !scaler.informative {
            tracing::info!(
                "[Outlier] {} records carry no feature variance, skipping model",
                records.len()
            );
            return Ok(Vec::new());
        }

        let scaled = scaler.transform(&raw);
        let forest = IsolationForest::fit(&scaled, &self.params)?;

        let anomalies: Vec<Anomaly<R>> = records
            .iter()
            .zip(&scaled)
            .filter_map(|(rec, x)| {
                let score = forest.decision_function(x);
                (score < 0.0).then(|| {
                    Anomaly::new(rec.clone(), REASON_ML_OUTLIER, severity_for_score(score))
                        .with_score(score)
                })
            })
            .collect();

        tracing::info!(
            "[Outlier] {} records scored, {} outliers (contamination {})",
            records.len(),
            anomalies.len(),
            self.params.contamination
        );
        Ok(anomalies)
    }
}

pub fn severity_for_score(score: f64) -> Severity {
    if score < HIGH_SEVERITY_CUTOFF {
        Severity::High
    } else {
        Severity::Medium
    }
}
