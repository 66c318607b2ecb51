use bigdecimal::BigDecimal;
use serde::Serialize;
use std::fmt;

/// 问题类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    DuplicateCharge,
    Overpriced,
    RiskyCombination,
    FutureDate,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::DuplicateCharge => "duplicate_charge",
            IssueType::Overpriced => "overpriced",
            IssueType::RiskyCombination => "risky_combination",
            IssueType::FutureDate => "future_date",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 严重程度, 与金额影响无关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 各类问题的附加字段
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IssueDetail {
    DuplicateCharge {
        code: String,
        date: String,
        count: usize,
        line_items: Vec<String>,
    },
    Overpriced {
        code: String,
        charged_price: BigDecimal,
        benchmark_price: BigDecimal,
        overcharge: BigDecimal,
    },
    RiskyCombination {
        codes: Vec<String>,
        date: String,
    },
    FutureDate {
        code: String,
        date: String,
    },
}

/// 一条检测出的异常
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: Severity,
    pub description: String,
    pub estimated_savings: BigDecimal,
    #[serde(flatten)]
    pub detail: IssueDetail,
}

impl Issue {
    /// 附加字段里的编码 (组合问题取第一个)
    pub fn code(&self) -> Option<&str> {
        match &self.detail {
            IssueDetail::DuplicateCharge { code, .. }
            | IssueDetail::Overpriced { code, .. }
            | IssueDetail::FutureDate { code, .. } => Some(code.as_str()),
            IssueDetail::RiskyCombination { codes, .. } => codes.first().map(String::as_str),
        }
    }

    pub fn date(&self) -> Option<&str> {
        match &self.detail {
            IssueDetail::DuplicateCharge { date, .. }
            | IssueDetail::RiskyCombination { date, .. }
            | IssueDetail::FutureDate { date, .. } => Some(date.as_str()),
            IssueDetail::Overpriced { .. } => None,
        }
    }
}
