use bill_anomaly_rust::{connect_optional, router, AppConfig, AppState};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载配置
    let config = AppConfig::load()?;

    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_max_level(config.logging.tracing_level())
        .with_target(true)
        .with_level(true)
        .init();

    info!("Starting server with config: {:?}", config.server);

    // 构建分析器 (基准价表与规则来自配置)
    let analyzer = config.build_analyzer()?;
    info!(
        "Analyzer ready: {} benchmark codes",
        analyzer.benchmarks().len()
    );

    // 数据库可选
    let pool = connect_optional(config.database.url.as_deref()).await;
    if pool.is_none() {
        info!("Persistence disabled");
    }

    let app = router(AppState::new(analyzer, pool))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET  /health");
    info!("  POST /api/analyze-bill");
    info!("  POST /api/analyze-bill/csv");
    info!("  POST /api/analyze-bill/batch");
    info!("  POST /api/estimate-cost");
    info!("  POST /api/predict-denial");
    info!("  POST /api/explain-bill");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
