pub mod capability;
pub mod estimate;
pub mod issue;
pub mod line_item;
pub mod report;
pub mod rules;

pub use capability::Capability;
pub use estimate::{CostEstimate, DenialClass, DenialPrediction, RiskLevel};
pub use issue::{Issue, IssueDetail, IssueType, Severity};
pub use line_item::{parse_service_date, LineItem, SERVICE_DATE_FORMAT};
pub use report::{format_money, AnalysisReport, BillAnalysis};
pub use rules::{AnalyzerPolicy, BenchmarkTable, RiskyCombination};
