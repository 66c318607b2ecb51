use super::issue::{Issue, Severity};
use bigdecimal::{BigDecimal, Zero};
use serde::Serialize;

/// 单次分析结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub issues: Vec<Issue>,
    pub total_issues: usize,
    pub total_savings: BigDecimal,
    pub high_severity_count: usize,
    pub medium_severity_count: usize,
    pub low_severity_count: usize,
}

impl AnalysisReport {
    /// 汇总: 问题数、节省金额 (保留两位小数)、各严重程度计数
    pub fn from_issues(issues: Vec<Issue>) -> Self {
        let total_savings = issues
            .iter()
            .fold(BigDecimal::zero(), |acc, issue| acc + &issue.estimated_savings)
            .round(2);

        let count = |severity: Severity| issues.iter().filter(|i| i.severity == severity).count();
        let high_severity_count = count(Severity::High);
        let medium_severity_count = count(Severity::Medium);
        let low_severity_count = count(Severity::Low);

        Self {
            total_issues: issues.len(),
            total_savings,
            high_severity_count,
            medium_severity_count,
            low_severity_count,
            issues,
        }
    }
}

/// 批量分析中的单张账单
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillAnalysis {
    pub bill_id: Option<String>,
    #[serde(flatten)]
    pub report: AnalysisReport,
}

/// 金额格式化为两位小数 (四舍五入)
pub fn format_money(amount: &BigDecimal) -> String {
    amount.round(2).with_scale(2).to_string()
}
