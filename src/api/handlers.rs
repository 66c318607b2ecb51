use super::AppState;
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::{
    AnalysisReport, BillAnalysis, Capability, CostEstimate, DenialPrediction, LineItem,
};
use crate::service::{
    line_items_from_document, parse_line_items, parse_price, write_report_csv, BillSubmission,
    ClaimProfile, DEFAULT_PAYER_DENIAL_RATE,
};
use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bigdecimal::{BigDecimal, Zero};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const SERVICE_NAME: &str = "Bill Anomaly Backend";

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// InvalidInput 返回 400, 其余 500
fn error_response(err: &AppError) -> Response {
    let status = match err {
        AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => {
            tracing::error!("request failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let response = ErrorResponse {
        error: err.to_string(),
    };
    (status, Json(response)).into_response()
}

/// 字符串或数字形式的标识, 空串视为缺失
fn identifier(value: &Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// 健康检查
pub async fn health_check() -> Response {
    let body = json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "analyze_bill": "/api/analyze-bill",
            "analyze_bill_csv": "/api/analyze-bill/csv",
            "analyze_bill_batch": "/api/analyze-bill/batch",
            "estimate_cost": "/api/estimate-cost",
            "predict_denial": "/api/predict-denial",
            "explain_bill": "/api/explain-bill",
        },
    });
    (StatusCode::OK, Json(body)).into_response()
}

/// 请求体: 明细 (或文档识别结果) 及可选的账单/患者标识
#[derive(Debug, Deserialize)]
pub struct AnalyzeBillRequest {
    #[serde(default)]
    pub bill_id: Option<Value>,
    #[serde(default)]
    pub patient_id: Option<Value>,
    #[serde(default)]
    pub line_items: Option<Value>,
    #[serde(default)]
    pub extracted_document: Option<Value>,
}

/// 分析响应: 报告 + 元数据
#[derive(Debug, Serialize)]
pub struct AnalyzeBillResponse {
    #[serde(flatten)]
    pub report: AnalysisReport,
    pub bill_id: Option<String>,
    pub patient_id: Option<String>,
    pub analysis_timestamp: String,
}

/// 文档识别结果优先, 不可用时退回 line_items
fn resolve_line_items(req: &AnalyzeBillRequest) -> Result<Vec<LineItem>> {
    if let Some(document) = &req.extracted_document {
        match line_items_from_document(document) {
            Capability::Ok(items) => return Ok(items),
            Capability::Unavailable(reason) => {
                tracing::warn!(
                    "Document extraction unavailable, using provided line_items: {}",
                    reason
                );
                if req.line_items.is_none() {
                    return Err(AppError::invalid_input(format!(
                        "no line items could be extracted: {}",
                        reason
                    )));
                }
            }
        }
    }

    match &req.line_items {
        Some(value) => parse_line_items(value),
        None => Err(AppError::invalid_input(
            "Missing required field: extracted_document or line_items",
        )),
    }
}

/// 账单异常分析
pub async fn analyze_bill(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeBillRequest>,
) -> Response {
    let items = match resolve_line_items(&req) {
        Ok(items) => items,
        Err(e) => return error_response(&e),
    };

    let report = state.analyzer.analyze(&items);
    let bill_id = identifier(&req.bill_id);
    let patient_id = identifier(&req.patient_id);

    if let (Some(pool), Some(patient), Some(bill)) = (&state.pool, &patient_id, &bill_id) {
        if let Err(e) = queries::save_bill_analysis(pool, patient, bill, &report).await {
            tracing::warn!("Failed to save analysis for bill {}: {}", bill, e);
        }
    }

    let response = AnalyzeBillResponse {
        report,
        bill_id,
        patient_id,
        analysis_timestamp: Local::now().to_rfc3339(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// 账单分析, 以 CSV 返回问题列表
pub async fn analyze_bill_csv(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeBillRequest>,
) -> Response {
    let items = match resolve_line_items(&req) {
        Ok(items) => items,
        Err(e) => return error_response(&e),
    };

    let report = state.analyzer.analyze(&items);
    let mut body = Vec::new();
    if let Err(e) = write_report_csv(&report, &mut body) {
        return error_response(&e);
    }

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"bill_analysis.csv\""),
        ],
        body,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct BatchBill {
    #[serde(default)]
    pub bill_id: Option<Value>,
    pub line_items: Value,
}

#[derive(Debug, Deserialize)]
pub struct BatchAnalyzeRequest {
    pub bills: Vec<BatchBill>,
}

#[derive(Debug, Serialize)]
pub struct BatchAnalyzeResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<BillAnalysis>,
}

/// 批量账单分析
pub async fn analyze_bill_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchAnalyzeRequest>,
) -> Response {
    let mut bills = Vec::with_capacity(req.bills.len());
    for (idx, bill) in req.bills.iter().enumerate() {
        match parse_line_items(&bill.line_items) {
            Ok(line_items) => bills.push(BillSubmission {
                bill_id: identifier(&bill.bill_id),
                line_items,
            }),
            Err(AppError::InvalidInput(msg)) => {
                return error_response(&AppError::invalid_input(format!("bills[{}]: {}", idx, msg)))
            }
            Err(e) => return error_response(&e),
        }
    }

    let analyzer = state.analyzer.clone();
    let results = match tokio::task::spawn_blocking(move || analyzer.analyze_batch(&bills)).await {
        Ok(results) => results,
        Err(e) => {
            let err = AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, e));
            return error_response(&err);
        }
    };

    let total_issues: usize = results.iter().map(|r| r.report.total_issues).sum();
    let response = BatchAnalyzeResponse {
        success: true,
        message: format!(
            "Successfully analyzed {} bills, {} issues found",
            results.len(),
            total_issues
        ),
        results,
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct EstimateCostRequest {
    #[serde(default)]
    pub procedure_code: Option<String>,
    #[serde(default)]
    pub insurance_plan: Option<String>,
    #[serde(default)]
    pub deductible_used: Option<Value>,
    #[serde(default)]
    pub annual_income: Option<Value>,
    #[serde(default)]
    pub patient_id: Option<Value>,
}

/// 可选金额字段: 缺失为 None, 存在但无法解析为错误
fn optional_amount(name: &str, value: &Option<Value>) -> Result<Option<BigDecimal>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => parse_price(v)
            .map(Some)
            .ok_or_else(|| {
                AppError::invalid_input(format!("{} must be a non-negative number", name))
            }),
    }
}

/// 自付费用估算
pub async fn estimate_cost(
    State(state): State<AppState>,
    Json(req): Json<EstimateCostRequest>,
) -> Response {
    let (Some(procedure_code), Some(insurance_plan)) = (
        req.procedure_code.as_deref().filter(|s| !s.is_empty()),
        req.insurance_plan.as_deref().filter(|s| !s.is_empty()),
    ) else {
        return error_response(&AppError::invalid_input(
            "Missing required fields: procedure_code, insurance_plan",
        ));
    };

    let amounts = optional_amount("deductible_used", &req.deductible_used)
        .and_then(|d| Ok((d, optional_amount("annual_income", &req.annual_income)?)));
    let (deductible_used, annual_income) = match amounts {
        Ok(amounts) => amounts,
        Err(e) => return error_response(&e),
    };

    let estimate: CostEstimate = state.estimator.estimate(
        procedure_code,
        insurance_plan,
        &deductible_used.unwrap_or_else(BigDecimal::zero),
        annual_income.as_ref(),
    );

    if let (Some(pool), Some(patient)) = (&state.pool, identifier(&req.patient_id)) {
        if let Err(e) = queries::save_cost_estimate(pool, &patient, &estimate).await {
            tracing::warn!("Failed to save estimate to database: {}", e);
        }
    }

    (StatusCode::OK, Json(estimate)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct PredictDenialRequest {
    #[serde(default)]
    pub claim_id: Option<Value>,
    #[serde(default)]
    pub procedure_code: Option<String>,
    #[serde(default)]
    pub diagnosis_code: Option<String>,
    #[serde(default)]
    pub payer_id: Option<String>,
    #[serde(default)]
    pub prior_auth_obtained: bool,
    #[serde(default)]
    pub modifier_present: bool,
    #[serde(default)]
    pub payer_denial_rate: Option<f64>,
    #[serde(default)]
    pub days_since_last_claim: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PredictDenialResponse {
    #[serde(flatten)]
    pub prediction: DenialPrediction,
    pub claim_id: Option<String>,
    pub procedure_code: String,
    pub diagnosis_code: String,
    pub payer_id: String,
}

/// 拒付风险预测
pub async fn predict_denial(
    State(state): State<AppState>,
    Json(req): Json<PredictDenialRequest>,
) -> Response {
    let non_empty = |s: &Option<String>| s.clone().filter(|v| !v.is_empty());
    let (Some(procedure_code), Some(diagnosis_code), Some(payer_id)) = (
        non_empty(&req.procedure_code),
        non_empty(&req.diagnosis_code),
        non_empty(&req.payer_id),
    ) else {
        return error_response(&AppError::invalid_input(
            "Missing required fields: procedure_code, diagnosis_code, payer_id",
        ));
    };

    let claim = ClaimProfile {
        prior_auth_obtained: req.prior_auth_obtained,
        modifier_present: req.modifier_present,
        payer_denial_rate: req.payer_denial_rate.unwrap_or(DEFAULT_PAYER_DENIAL_RATE),
        days_since_last_claim: req.days_since_last_claim.unwrap_or(365),
    };
    let prediction = state.denial.predict(&claim);
    let claim_id = identifier(&req.claim_id);

    if let (Some(pool), Some(id)) = (&state.pool, &claim_id) {
        if let Err(e) = queries::save_denial_prediction(pool, id, &prediction).await {
            tracing::warn!("Failed to save prediction to database: {}", e);
        }
    }

    let response = PredictDenialResponse {
        prediction,
        claim_id,
        procedure_code,
        diagnosis_code,
        payer_id,
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ExplainBillRequest {
    #[serde(default)]
    pub bill_context: String,
    #[serde(default)]
    pub bill_items: Vec<Value>,
    #[serde(default)]
    pub issues: Vec<Value>,
    #[serde(default)]
    pub patient_id: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ExplainBillResponse {
    pub explanation: String,
    pub template_fallback: bool,
    pub bill_items_count: usize,
    pub issues_count: usize,
    pub patient_id: Option<String>,
    pub generated_at: String,
}

/// 生成账单解释
pub async fn explain_bill(
    State(state): State<AppState>,
    Json(req): Json<ExplainBillRequest>,
) -> Response {
    if req.bill_items.is_empty() && req.issues.is_empty() {
        return error_response(&AppError::invalid_input(
            "Missing required field: bill_items or issues",
        ));
    }

    let explanation = state
        .explainer
        .explain(&req.bill_context, &req.bill_items, &req.issues);

    let response = ExplainBillResponse {
        explanation: explanation.text,
        template_fallback: explanation.from_template,
        bill_items_count: req.bill_items.len(),
        issues_count: req.issues.len(),
        patient_id: identifier(&req.patient_id),
        generated_at: Local::now().to_rfc3339(),
    };
    (StatusCode::OK, Json(response)).into_response()
}
