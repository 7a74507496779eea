pub mod aggregator;
pub mod aging;
pub mod engine;
pub mod features;
pub mod isolation_forest;
pub mod outlier;
pub mod report;
pub mod rules;
pub mod stats;

pub use aggregator::{aggregate, filter_by_severity, sort_by_amount_desc};
pub use engine::{AnomalyEngine, BatchOutcome, DetectionStats};
pub use isolation_forest::{ForestParams, IsolationForest};
pub use outlier::OutlierModelDetector;
pub use report::{write_anomalies_csv, AlertReporter};
pub use rules::RuleBasedDetector;
