use crate::config::{AggregationMode, AppConfig};
use crate::error::{EngineError, Result};
use crate::ingest::{self, RecordNormalizer};
use crate::models::{AgingSummary, AlertMessage, Anomaly, InvoiceInput, InvoiceRecord};
use crate::service::{write_anomalies_csv, AlertReporter, AnomalyEngine, BatchOutcome, DetectionStats};
use axum::{
    extract::{Json, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 共享状态: 只读配置与无状态组件，模型在每个请求内新建
pub struct ServiceState {
    pub config: AppConfig,
    pub normalizer: RecordNormalizer,
    pub reporter: AlertReporter,
}

impl ServiceState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            normalizer: RecordNormalizer::new(config.ingest.default_due_days),
            reporter: AlertReporter::new(&config.report),
            config,
        }
    }

    fn engine(&self, opts: &BatchOptions) -> Result<AnomalyEngine> {
        let mut detection = self.config.detection.clone();
        if let Some(c) = opts.contamination {
            detection.contamination = c;
        }
        if let Some(mode) = opts.aggregation {
            detection.aggregation = mode;
        }
        AnomalyEngine::new(detection)
    }

    fn process(&self, records: &[InvoiceRecord], opts: &BatchOptions) -> Result<BatchOutcome> {
        let reference_date = opts
            .reference_date
            .unwrap_or_else(|| Local::now().date_naive());
        self.engine(opts)?.process(records, reference_date)
    }
}

/// 批次参数 (JSON 字段或查询串)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchOptions {
    pub reference_date: Option<NaiveDate>,
    pub aggregation: Option<AggregationMode>,
    pub contamination: Option<f64>,
}

/// 请求体: 已类型化的发票列表
#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub records: Vec<InvoiceInput>,
    #[serde(flatten)]
    pub options: BatchOptions,
}

/// 请求体: 报告
#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub records: Vec<InvoiceInput>,
    pub recipient: Option<String>,
    #[serde(flatten)]
    pub options: BatchOptions,
}

/// 响应体
#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub success: bool,
    pub message: String,
    pub aging: Option<AgingSummary>,
    pub stats: Option<DetectionStats>,
    pub anomalies: Vec<Anomaly>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub success: bool,
    pub report: String,
    pub alert: Option<AlertMessage>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// JSON 批次检测
pub async fn detect_json(
    State(state): State<Arc<ServiceState>>,
    Json(req): Json<DetectRequest>,
) -> Response {
    let result = blocking(move || {
        let records = state.normalizer.normalize_inputs(req.records)?;
        state.process(&records, &req.options)
    })
    .await;
    detect_response(result)
}

/// CSV 批次检测 (请求体为原始 CSV)
pub async fn detect_csv(
    State(state): State<Arc<ServiceState>>,
    Query(opts): Query<BatchOptions>,
    body: String,
) -> Response {
    let result = blocking(move || {
        let (records, _) = state.normalizer.read_csv(body.as_bytes())?;
        state.process(&records, &opts)
    })
    .await;
    detect_response(result)
}

/// CSV 批次检测并导出异常表 CSV
pub async fn export_csv(
    State(state): State<Arc<ServiceState>>,
    Query(opts): Query<BatchOptions>,
    body: String,
) -> Response {
    let result = blocking(move || {
        let (records, _) = state.normalizer.read_csv(body.as_bytes())?;
        let outcome = state.process(&records, &opts)?;
        let mut out = Vec::new();
        write_anomalies_csv(&mut out, &outcome.anomalies)?;
        Ok(out)
    })
    .await;

    match result {
        Ok(bytes) => csv_response(bytes),
        Err(e) => error_response(e),
    }
}

/// 清洗 CSV 并返回处理后的台账
pub async fn normalize_csv(State(state): State<Arc<ServiceState>>, body: String) -> Response {
    let result = blocking(move || {
        let (records, stats) = state.normalizer.read_csv(body.as_bytes())?;
        tracing::info!(
            "Normalized {} of {} rows ({} dropped)",
            records.len(),
            stats.loaded,
            stats.dropped
        );
        let mut out = Vec::new();
        ingest::write_csv(&mut out, &records)?;
        Ok(out)
    })
    .await;

    match result {
        Ok(bytes) => csv_response(bytes),
        Err(e) => error_response(e),
    }
}

/// 文本报告 + 可选告警邮件内容
pub async fn report(
    State(state): State<Arc<ServiceState>>,
    Json(req): Json<ReportRequest>,
) -> Response {
    let result = blocking(move || {
        let records = state.normalizer.normalize_inputs(req.records)?;
        let outcome = state.process(&records, &req.options)?;
        let report = state.reporter.generate_report(&outcome.anomalies);
        let alert = req
            .recipient
            .as_deref()
            .and_then(|to| state.reporter.compose_alert(to, &outcome.anomalies));
        Ok(ReportResponse {
            success: true,
            report,
            alert,
        })
    })
    .await;

    match result {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => error_response(e),
    }
}

/// 检测是纯 CPU 计算，放到阻塞线程池执行
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(EngineError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("detection task failed: {}", e),
        ))),
    }
}

fn detect_response(result: Result<BatchOutcome>) -> Response {
    match result {
        Ok(outcome) => {
            let response = DetectResponse {
                success: true,
                message: format!(
                    "Checked {} records, {} anomalies ({} high severity)",
                    outcome.stats.records, outcome.stats.anomalies, outcome.stats.high_severity
                ),
                aging: Some(outcome.aging),
                stats: Some(outcome.stats),
                anomalies: outcome.anomalies,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

fn csv_response(bytes: Vec<u8>) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/csv")], bytes).into_response()
}

fn error_response(e: EngineError) -> Response {
    let status = if e.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!("Request failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let response = ErrorResponse {
        success: false,
        message: format!("Error: {}", e),
    };
    (status, Json(response)).into_response()
}
