pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod service;

pub use config::{AggregationMode, AppConfig};
pub use error::{EngineError, Result};
pub use ingest::RecordNormalizer;
pub use service::{AlertReporter, AnomalyEngine, OutlierModelDetector, RuleBasedDetector};
