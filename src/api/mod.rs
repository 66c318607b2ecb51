pub mod handlers;

pub use handlers::*;

use crate::service::{BillAnalyzer, CostEstimator, DenialPredictor, Explainer};
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<BillAnalyzer>,
    pub estimator: Arc<CostEstimator>,
    pub denial: Arc<DenialPredictor>,
    pub explainer: Explainer,
    /// None 时不持久化
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(analyzer: BillAnalyzer, pool: Option<PgPool>) -> Self {
        let estimator = CostEstimator::new(analyzer.benchmarks().clone());
        Self {
            analyzer: Arc::new(analyzer),
            estimator: Arc::new(estimator),
            denial: Arc::new(DenialPredictor::new()),
            explainer: Explainer::default(),
            pool,
        }
    }

    pub fn with_explainer(mut self, explainer: Explainer) -> Self {
        self.explainer = explainer;
        self
    }
}

/// 构建路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/analyze-bill", post(analyze_bill))
        .route("/api/analyze-bill/csv", post(analyze_bill_csv))
        .route("/api/analyze-bill/batch", post(analyze_bill_batch))
        .route("/api/estimate-cost", post(estimate_cost))
        .route("/api/predict-denial", post(predict_denial))
        .route("/api/explain-bill", post(explain_bill))
        .with_state(state)
}
