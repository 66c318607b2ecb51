use crate::models::{DenialClass, DenialPrediction};

/// 未提供时使用的支付方拒付率
pub const DEFAULT_PAYER_DENIAL_RATE: f64 = 0.3;

const MISSING_PRIOR_AUTH_PENALTY: f64 = 0.25;
const MISSING_MODIFIER_PENALTY: f64 = 0.1;
const MAX_PROBABILITY: f64 = 0.95;
const RULE_CONFIDENCE: f64 = 0.7;

/// 拒付预测输入
#[derive(Debug, Clone)]
pub struct ClaimProfile {
    pub prior_auth_obtained: bool,
    pub modifier_present: bool,
    pub payer_denial_rate: f64,
    pub days_since_last_claim: i64,
}

impl Default for ClaimProfile {
    fn default() -> Self {
        Self {
            prior_auth_obtained: false,
            modifier_present: false,
            payer_denial_rate: DEFAULT_PAYER_DENIAL_RATE,
            days_since_last_claim: 365,
        }
    }
}

/// 规则版拒付风险预测
#[derive(Debug, Clone, Default)]
pub struct DenialPredictor;

impl DenialPredictor {
    pub fn new() -> Self {
        Self
    }

    pub fn predict(&self, claim: &ClaimProfile) -> DenialPrediction {
        let mut probability = claim.payer_denial_rate;
        if !claim.prior_auth_obtained {
            probability += MISSING_PRIOR_AUTH_PENALTY;
        }
        if !claim.modifier_present {
            probability += MISSING_MODIFIER_PENALTY;
        }
        let probability = round4(probability.clamp(0.0, MAX_PROBABILITY));

        let predicted_class = if probability > 0.5 {
            DenialClass::Denied
        } else {
            DenialClass::Approved
        };

        DenialPrediction {
            denial_probability: probability,
            predicted_class,
            risk_factors: risk_factors(claim),
            confidence: RULE_CONFIDENCE,
        }
    }
}

fn risk_factors(claim: &ClaimProfile) -> Vec<String> {
    let mut factors = Vec::new();

    if !claim.prior_auth_obtained {
        factors.push("Prior authorization missing for this procedure".to_string());
    }
    if claim.payer_denial_rate > 0.4 {
        factors.push(format!(
            "High denial rate for this payer ({:.1}%)",
            claim.payer_denial_rate * 100.0
        ));
    }
    if claim.days_since_last_claim < 30 {
        factors.push("Recent similar claim may trigger frequency limit".to_string());
    }
    if !claim.modifier_present && claim.payer_denial_rate > 0.3 {
        factors.push("Missing modifier may cause coding denial".to_string());
    }

    factors
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
