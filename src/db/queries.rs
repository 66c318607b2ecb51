use crate::models::{AnalysisReport, CostEstimate, DenialPrediction};
use sqlx::types::Json;
use sqlx::PgPool;

/// 保存账单分析结果 (bill_analyses)
///
/// 问题列表存为 JSONB
pub async fn save_bill_analysis(
    pool: &PgPool,
    patient_id: &str,
    bill_id: &str,
    report: &AnalysisReport,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO bill_analyses
            (patient_id, bill_id, issues_found, total_savings, analysis_timestamp)
        VALUES ($1, $2, $3, $4, now())
        "#,
    )
    .bind(patient_id)
    .bind(bill_id)
    .bind(Json(&report.issues))
    .bind(&report.total_savings)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// 保存费用估算 (cost_estimates)
pub async fn save_cost_estimate(
    pool: &PgPool,
    patient_id: &str,
    estimate: &CostEstimate,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO cost_estimates
            (patient_id, procedure_code, insurance_plan, estimated_total,
             patient_oop, risk_level, confidence_interval)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(patient_id)
    .bind(&estimate.procedure_code)
    .bind(&estimate.insurance_plan)
    .bind(&estimate.estimated_total)
    .bind(&estimate.patient_oop)
    .bind(estimate.risk_level.as_str())
    .bind(&estimate.confidence_interval)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// 保存拒付预测 (denial_predictions), 风险因素存为 JSONB
pub async fn save_denial_prediction(
    pool: &PgPool,
    claim_id: &str,
    prediction: &DenialPrediction,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO denial_predictions
            (claim_id, denial_probability, predicted_class, risk_factors, timestamp)
        VALUES ($1, $2, $3, $4, now())
        "#,
    )
    .bind(claim_id)
    .bind(prediction.denial_probability)
    .bind(prediction.predicted_class.as_str())
    .bind(Json(&prediction.risk_factors))
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Issue, IssueDetail, IssueType, Severity};
    use bigdecimal::BigDecimal;
    use sqlx::{Postgres, Type, TypeInfo};

    #[test]
    fn json_columns_bind_as_jsonb() {
        let report = AnalysisReport::from_issues(vec![Issue {
            issue_type: IssueType::Overpriced,
            severity: Severity::Medium,
            description: "Procedure 99214 charged $300.00, benchmark is $200.00".to_string(),
            estimated_savings: BigDecimal::from(50),
            detail: IssueDetail::Overpriced {
                code: "99214".to_string(),
                charged_price: BigDecimal::from(300),
                benchmark_price: BigDecimal::from(200),
                overcharge: BigDecimal::from(100),
            },
        }]);

        assert_eq!(<Json<&Vec<Issue>> as Type<Postgres>>::type_info().name(), "JSONB");
        assert_eq!(<Json<&Vec<String>> as Type<Postgres>>::type_info().name(), "JSONB");

        let encoded = serde_json::to_value(Json(&report.issues)).unwrap();
        assert_eq!(encoded, serde_json::to_value(&report.issues).unwrap());
        assert_eq!(encoded[0]["type"], "overpriced");
        assert_eq!(encoded[0]["code"], "99214");
    }
}
