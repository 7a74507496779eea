use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub detection: DetectionConfig,
    pub ingest: IngestConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 检测参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// 预期异常比例，取值 (0, 0.5]
    pub contamination: f64,
    pub n_estimators: usize,
    pub max_samples: usize,
    pub random_seed: u64,
    pub aggregation: AggregationMode,
}

/// 规则结果与模型结果的合并方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// 直接拼接，同一发票可出现多行
    #[default]
    Concatenate,
    /// 按 invoice_id 合并为一行
    MergePerInvoice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// 缺失到期日时的默认账期 (天)
    pub default_due_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub top_n: usize,
    pub sender: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            detection: DetectionConfig::default(),
            ingest: IngestConfig { default_due_days: 30 },
            report: ReportConfig {
                top_n: 5,
                sender: "anomaly-alerts@localhost".to_string(),
            },
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            contamination: 0.05,
            n_estimators: 100,
            max_samples: 256,
            random_seed: 42,
            aggregation: AggregationMode::Concatenate,
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 -> config/arap.toml (可选) -> ARAP_ 前缀环境变量
    ///
    /// 例: `ARAP_SERVER__PORT=9000`, `ARAP_DETECTION__CONTAMINATION=0.1`
    pub fn from_env() -> Result<Self> {
        let settings = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name("config/arap").required(false))
            .add_source(
                Environment::with_prefix("ARAP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_layering() {
        let cfg = AppConfig::from_env().unwrap();
        assert_eq!(cfg.ingest.default_due_days, 30);
        assert_eq!(cfg.report.top_n, 5);
        assert_eq!(cfg.detection.aggregation, AggregationMode::Concatenate);
    }
}
