use arap_anomaly::{api, AppConfig};
use tracing::info;
use tracing_subscriber::{fmt::time::ChronoLocal, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式，RUST_LOG 控制级别
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = api::router(config);

    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/anomalies         - JSON batch detection");
    info!("  POST /api/anomalies/csv     - CSV batch detection");
    info!("  POST /api/anomalies/export  - CSV batch detection, anomaly table as CSV");
    info!("  POST /api/report            - text report and alert message");
    info!("  POST /api/normalize         - cleaned ledger as CSV");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
