use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;
use std::time::Duration;

/// 创建数据库连接池
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let mut connect_options = PgConnectOptions::from_str(database_url)?;

    // 分析结果写入都是单行插入, 超过 2 秒记为慢查询
    connect_options = connect_options.log_slow_statements(
        tracing::log::LevelFilter::Warn,
        Duration::from_secs(2),
    );

    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(connect_options)
        .await
}

/// 配置了 url 才建连; 连接失败时记录告警并关闭持久化
pub async fn connect_optional(database_url: Option<&str>) -> Option<PgPool> {
    let url = database_url.filter(|u| !u.is_empty())?;
    match create_pool(url).await {
        Ok(pool) => {
            tracing::info!("Database pool created");
            Some(pool)
        }
        Err(e) => {
            tracing::warn!("Database unavailable, analysis results will not be persisted: {}", e);
            None
        }
    }
}
