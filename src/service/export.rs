use crate::error::Result;
use crate::models::AnalysisReport;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct IssueRow<'a> {
    #[serde(rename = "type")]
    issue_type: &'a str,
    severity: &'a str,
    description: &'a str,
    estimated_savings: String,
    code: &'a str,
    date: &'a str,
}

/// 导出问题列表为 CSV, 每个问题一行
pub fn write_report_csv<W: Write>(report: &AnalysisReport, writer: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_writer(writer);

    if report.issues.is_empty() {
        // 空报告也输出表头
        wtr.write_record(["type", "severity", "description", "estimated_savings", "code", "date"])?;
    }

    for issue in &report.issues {
        wtr.serialize(IssueRow {
            issue_type: issue.issue_type.as_str(),
            severity: issue.severity.as_str(),
            description: &issue.description,
            estimated_savings: issue.estimated_savings.round(2).to_string(),
            code: issue.code().unwrap_or(""),
            date: issue.date().unwrap_or(""),
        })?;
    }

    wtr.flush()?;
    Ok(())
}
