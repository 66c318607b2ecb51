use bigdecimal::BigDecimal;
use serde::Serialize;

/// 财务风险等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Catastrophic,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
            RiskLevel::Catastrophic => "CATASTROPHIC",
        }
    }
}

/// 自付费用估算
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    pub estimated_total: BigDecimal,
    pub patient_oop: BigDecimal,
    pub insurance_pays: BigDecimal,
    pub confidence_interval: BigDecimal,
    pub risk_level: RiskLevel,
    pub procedure_code: String,
    pub insurance_plan: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DenialClass {
    Approved,
    Denied,
}

impl DenialClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialClass::Approved => "APPROVED",
            DenialClass::Denied => "DENIED",
        }
    }
}

/// 拒付风险预测
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DenialPrediction {
    pub denial_probability: f64,
    pub predicted_class: DenialClass,
    pub risk_factors: Vec<String>,
    pub confidence: f64,
}
