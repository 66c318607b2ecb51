use crate::models::{BenchmarkTable, CostEstimate, RiskLevel};
use bigdecimal::{BigDecimal, Zero};
use std::collections::HashMap;
use std::str::FromStr;

/// 保险计划: (允许金额系数, 自付比例)
const PLAN_RATES: &[(&str, &str, &str)] = &[
    ("medicare", "0.8", "0.2"),
    ("medicaid", "0.7", "0.05"),
    ("blue_cross", "0.85", "0.15"),
    ("aetna", "0.88", "0.18"),
    ("united_healthcare", "0.87", "0.17"),
    ("cigna", "0.86", "0.16"),
    ("self_pay", "1.0", "1.0"),
];

const UNKNOWN_PROCEDURE_COST: i64 = 1000;
const ANNUAL_DEDUCTIBLE: i64 = 5000;

#[derive(Debug, Clone)]
struct PlanRates {
    adjustment: BigDecimal,
    copay_rate: BigDecimal,
}

/// 规则版自付费用估算
#[derive(Debug, Clone)]
pub struct CostEstimator {
    benchmarks: BenchmarkTable,
    plans: HashMap<String, PlanRates>,
    default_plan: PlanRates,
}

impl Default for CostEstimator {
    fn default() -> Self {
        Self::new(BenchmarkTable::standard())
    }
}

impl CostEstimator {
    pub fn new(benchmarks: BenchmarkTable) -> Self {
        let plans = PLAN_RATES
            .iter()
            .map(|(plan, adjustment, copay)| {
                (
                    plan.to_string(),
                    PlanRates {
                        adjustment: decimal(adjustment),
                        copay_rate: decimal(copay),
                    },
                )
            })
            .collect();

        Self {
            benchmarks,
            plans,
            default_plan: PlanRates {
                adjustment: decimal("0.9"),
                copay_rate: decimal("0.2"),
            },
        }
    }

    pub fn estimate(
        &self,
        procedure_code: &str,
        insurance_plan: &str,
        deductible_used: &BigDecimal,
        annual_income: Option<&BigDecimal>,
    ) -> CostEstimate {
        let base_cost = self
            .benchmarks
            .get(procedure_code)
            .cloned()
            .unwrap_or_else(|| BigDecimal::from(UNKNOWN_PROCEDURE_COST));
        let rates = self.plans.get(insurance_plan).unwrap_or(&self.default_plan);
        let allowed = &base_cost * &rates.adjustment;

        let remaining_deductible = max(
            BigDecimal::zero(),
            BigDecimal::from(ANNUAL_DEDUCTIBLE) - deductible_used,
        );

        let patient_oop = if remaining_deductible > BigDecimal::zero() {
            let deductible_payment = min(remaining_deductible, allowed.clone());
            let copay_payment = max(
                BigDecimal::zero(),
                (&allowed - &deductible_payment) * &rates.copay_rate,
            );
            deductible_payment + copay_payment
        } else {
            &allowed * &rates.copay_rate
        };

        let confidence_interval = &allowed * &decimal("0.15");
        let risk_level = categorize_risk(&patient_oop, annual_income);

        tracing::debug!(
            "估算 {} / {}: 允许金额 {}, 自付 {}",
            procedure_code,
            insurance_plan,
            allowed,
            patient_oop
        );

        CostEstimate {
            insurance_pays: (&allowed - &patient_oop).round(2),
            estimated_total: allowed.round(2),
            patient_oop: patient_oop.round(2),
            confidence_interval: confidence_interval.round(2),
            risk_level,
            procedure_code: procedure_code.to_string(),
            insurance_plan: insurance_plan.to_string(),
        }
    }
}

/// 有收入时按自付占收入比例, 否则按绝对金额
fn categorize_risk(patient_oop: &BigDecimal, annual_income: Option<&BigDecimal>) -> RiskLevel {
    if let Some(income) = annual_income.filter(|i| **i > BigDecimal::zero()) {
        let share = patient_oop / income * BigDecimal::from(100);
        return if share > BigDecimal::from(40) {
            RiskLevel::Catastrophic
        } else if share > BigDecimal::from(20) {
            RiskLevel::High
        } else if share > BigDecimal::from(10) {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        };
    }

    if *patient_oop > BigDecimal::from(50_000) {
        RiskLevel::Catastrophic
    } else if *patient_oop > BigDecimal::from(20_000) {
        RiskLevel::High
    } else if *patient_oop > BigDecimal::from(5_000) {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

fn max(a: BigDecimal, b: BigDecimal) -> BigDecimal {
    if a >= b {
        a
    } else {
        b
    }
}

fn min(a: BigDecimal, b: BigDecimal) -> BigDecimal {
    if a <= b {
        a
    } else {
        b
    }
}

fn decimal(literal: &str) -> BigDecimal {
    BigDecimal::from_str(literal).unwrap_or_default()
}
