use crate::models::{
    format_money, AnalysisReport, AnalyzerPolicy, BenchmarkTable, BillAnalysis, Issue,
    IssueDetail, IssueType, LineItem, RiskyCombination, Severity,
};
use bigdecimal::{BigDecimal, Zero};
use chrono::{Local, NaiveDate};
use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;

/// 批量分析的输入: 一张账单及其明细
#[derive(Debug, Clone)]
pub struct BillSubmission {
    pub bill_id: Option<String>,
    pub line_items: Vec<LineItem>,
}

/// 账单异常分析服务
///
/// 五个相互独立的检测阶段按固定顺序执行, 结果依次拼接:
/// 同日重复收费、超基准价、高风险组合、拆分收费 (预留)、日期异常。
/// 基准价表和组合规则在构建时注入, 构建后只读, 可在多线程中共享。
#[derive(Debug, Clone)]
pub struct BillAnalyzer {
    benchmarks: BenchmarkTable,
    risky_combinations: Vec<RiskyCombination>,
    policy: AnalyzerPolicy,
}

impl Default for BillAnalyzer {
    fn default() -> Self {
        Self::new(
            BenchmarkTable::standard(),
            RiskyCombination::standard(),
            AnalyzerPolicy::default(),
        )
    }
}

impl BillAnalyzer {
    pub fn new(
        benchmarks: BenchmarkTable,
        risky_combinations: Vec<RiskyCombination>,
        policy: AnalyzerPolicy,
    ) -> Self {
        Self {
            benchmarks,
            risky_combinations,
            policy,
        }
    }

    pub fn benchmarks(&self) -> &BenchmarkTable {
        &self.benchmarks
    }

    pub fn policy(&self) -> &AnalyzerPolicy {
        &self.policy
    }

    /// 以本地当前日期作为 "今天" 进行分析
    pub fn analyze(&self, line_items: &[LineItem]) -> AnalysisReport {
        self.analyze_at(line_items, Local::now().date_naive())
    }

    /// 以指定日期作为 "今天" 进行分析
    pub fn analyze_at(&self, line_items: &[LineItem], today: NaiveDate) -> AnalysisReport {
        let mut issues = Vec::new();

        // 1. 同日重复收费
        let duplicates = self.check_duplicate_charges(line_items);
        tracing::debug!("duplicate pass: {} issues", duplicates.len());
        issues.extend(duplicates);

        // 2. 超基准价
        let overpriced = self.check_overpriced_items(line_items);
        tracing::debug!("overpriced pass: {} issues", overpriced.len());
        issues.extend(overpriced);

        // 3. 高风险组合
        let combos = self.check_risky_combinations(line_items);
        tracing::debug!("risky combination pass: {} issues", combos.len());
        issues.extend(combos);

        // 4. 拆分收费
        issues.extend(self.check_unbundled_charges(line_items));

        // 5. 日期异常
        let dates = self.check_date_inconsistencies(line_items, today);
        tracing::debug!("date pass: {} issues", dates.len());
        issues.extend(dates);

        let report = AnalysisReport::from_issues(issues);
        tracing::info!(
            "分析完成: {} 条明细, {} 个问题, 预计可节省 {}",
            line_items.len(),
            report.total_issues,
            report.total_savings
        );
        report
    }

    /// 并行分析多张账单, 结果顺序与输入一致
    pub fn analyze_batch(&self, bills: &[BillSubmission]) -> Vec<BillAnalysis> {
        let today = Local::now().date_naive();
        bills
            .par_iter()
            .map(|bill| BillAnalysis {
                bill_id: bill.bill_id.clone(),
                report: self.analyze_at(&bill.line_items, today),
            })
            .collect()
    }

    /// 按 (日期, 编码) 分组, 组内多于一条即为重复
    ///
    /// 日期按原样比较, 空日期同样归为一组。输出顺序: 日期首次出现顺序,
    /// 同一日期内编码首次出现顺序。
    pub fn check_duplicate_charges(&self, line_items: &[LineItem]) -> Vec<Issue> {
        let mut by_date: IndexMap<&str, IndexMap<&str, Vec<&LineItem>>> = IndexMap::new();
        for item in line_items {
            by_date
                .entry(item.date.as_str())
                .or_default()
                .entry(item.code.as_str())
                .or_default()
                .push(item);
        }

        let mut issues = Vec::new();
        for (date, by_code) in &by_date {
            for (code, items) in by_code {
                if items.len() < 2 {
                    continue;
                }

                let redundant = BigDecimal::from((items.len() - 1) as u64);
                let savings =
                    items[0].price_or_zero() * redundant * &self.policy.duplicate_recovery_rate;

                issues.push(Issue {
                    issue_type: IssueType::DuplicateCharge,
                    severity: Severity::High,
                    description: format!(
                        "Procedure code {} appears {} times on {}",
                        code,
                        items.len(),
                        date
                    ),
                    estimated_savings: savings,
                    detail: IssueDetail::DuplicateCharge {
                        code: code.to_string(),
                        date: date.to_string(),
                        count: items.len(),
                        line_items: items
                            .iter()
                            .map(|i| i.description_or_empty().to_string())
                            .collect(),
                    },
                });
            }
        }

        issues
    }

    /// 价格严格高于 基准价 × 阈值 时报告; 无基准价或基准价为 0 的编码跳过
    pub fn check_overpriced_items(&self, line_items: &[LineItem]) -> Vec<Issue> {
        let mut issues = Vec::new();

        for item in line_items {
            let Some(benchmark) = self.benchmarks.get(&item.code) else {
                continue;
            };
            if benchmark.is_zero() {
                continue;
            }
            let price = item.price_or_zero();
            if price <= benchmark * &self.policy.markup_threshold {
                continue;
            }

            let overcharge = &price - benchmark;
            let savings = &overcharge * &self.policy.overpriced_recovery_rate;

            issues.push(Issue {
                issue_type: IssueType::Overpriced,
                severity: Severity::Medium,
                description: format!(
                    "Procedure {} charged ${}, benchmark is ${}",
                    item.code,
                    format_money(&price),
                    format_money(benchmark)
                ),
                estimated_savings: savings,
                detail: IssueDetail::Overpriced {
                    code: item.code.clone(),
                    charged_price: price,
                    benchmark_price: benchmark.clone(),
                    overcharge: overcharge.round(2),
                },
            });
        }

        issues
    }

    /// 组合内所有编码都出现, 且相关明细只有一个日期时报告, 需人工复核
    pub fn check_risky_combinations(&self, line_items: &[LineItem]) -> Vec<Issue> {
        let present: IndexSet<&str> = line_items.iter().map(|i| i.code.as_str()).collect();
        let mut issues = Vec::new();

        for combo in &self.risky_combinations {
            if !combo.codes.iter().all(|c| present.contains(c.as_str())) {
                continue;
            }

            let dates: IndexSet<&str> = line_items
                .iter()
                .filter(|i| combo.codes.iter().any(|c| *c == i.code))
                .map(|i| i.date.as_str())
                .collect();
            if dates.len() != 1 {
                continue;
            }

            issues.push(Issue {
                issue_type: IssueType::RiskyCombination,
                severity: Severity::Medium,
                description: combo.description.clone(),
                estimated_savings: BigDecimal::zero(),
                detail: IssueDetail::RiskyCombination {
                    codes: combo.codes.clone(),
                    date: dates.first().map(|d| d.to_string()).unwrap_or_default(),
                },
            });
        }

        issues
    }

    /// 拆分收费检测, 目前没有捆绑规则
    pub fn check_unbundled_charges(&self, _line_items: &[LineItem]) -> Vec<Issue> {
        Vec::new()
    }

    /// 服务日期晚于今天的明细; 无法解析的日期直接跳过
    pub fn check_date_inconsistencies(
        &self,
        line_items: &[LineItem],
        today: NaiveDate,
    ) -> Vec<Issue> {
        line_items
            .iter()
            .filter_map(|item| {
                let service_date = item.service_date?;
                if service_date <= today {
                    return None;
                }
                Some(Issue {
                    issue_type: IssueType::FutureDate,
                    severity: Severity::High,
                    description: format!("Charge dated {} is in the future", item.date),
                    estimated_savings: BigDecimal::zero(),
                    detail: IssueDetail::FutureDate {
                        code: item.code.clone(),
                        date: item.date.clone(),
                    },
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn item(code: &str, date: &str, price: &str) -> LineItem {
        LineItem::new(code, date, Some(dec(price)))
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let report = BillAnalyzer::default().analyze_at(&[], today());
        assert_eq!(report.total_issues, 0);
        assert_eq!(report.total_savings, BigDecimal::zero());
        assert!(report.issues.is_empty());
    }

    #[test]
    fn duplicate_same_day_charge() {
        let items = vec![
            item("99213", "2024-01-01", "150").with_description("Office visit"),
            item("99213", "2024-01-01", "150").with_description("Office visit (again)"),
        ];
        let issues = BillAnalyzer::default().check_duplicate_charges(&items);

        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.issue_type, IssueType::DuplicateCharge);
        assert_eq!(issue.severity, Severity::High);
        assert_eq!(issue.estimated_savings, dec("135.0"));
        assert_eq!(issue.description, "Procedure code 99213 appears 2 times on 2024-01-01");
        match &issue.detail {
            IssueDetail::DuplicateCharge { line_items, count, .. } => {
                assert_eq!(*count, 2);
                assert_eq!(
                    line_items,
                    &vec!["Office visit".to_string(), "Office visit (again)".to_string()]
                );
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn duplicate_savings_use_first_price() {
        let items = vec![
            item("80053", "2024-02-02", "40"),
            item("80053", "2024-02-02", "90"),
            item("80053", "2024-02-02", "90"),
        ];
        let issues = BillAnalyzer::default().check_duplicate_charges(&items);
        assert_eq!(issues.len(), 1);
        // 40 * 2 * 0.9
        assert_eq!(issues[0].estimated_savings, dec("72"));
    }

    #[test]
    fn duplicates_on_different_days_are_not_flagged() {
        let items = vec![item("99213", "2024-01-01", "150"), item("99213", "2024-01-02", "150")];
        assert!(BillAnalyzer::default().check_duplicate_charges(&items).is_empty());
    }

    #[test]
    fn blank_dates_group_together() {
        let items = vec![
            LineItem::new("36415", "", Some(dec("25"))),
            LineItem::new("36415", "", None),
        ];
        let issues = BillAnalyzer::default().check_duplicate_charges(&items);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].date(), Some(""));
        assert_eq!(issues[0].estimated_savings, dec("22.5"));
    }

    #[test]
    fn duplicate_order_follows_first_seen_date_then_code() {
        let items = vec![
            item("A", "d1", "1"),
            item("B", "d2", "1"),
            item("C", "d1", "1"),
            item("B", "d2", "1"),
            item("C", "d1", "1"),
            item("A", "d1", "1"),
        ];
        let issues = BillAnalyzer::default().check_duplicate_charges(&items);
        let order: Vec<_> = issues.iter().map(|i| (i.date().unwrap(), i.code().unwrap())).collect();
        assert_eq!(order, vec![("d1", "A"), ("d1", "C"), ("d2", "B")]);
    }

    #[test]
    fn overpriced_threshold_is_strict() {
        let analyzer = BillAnalyzer::default();

        let at_threshold = vec![item("99213", "2024-01-01", "195.0")];
        assert!(analyzer.check_overpriced_items(&at_threshold).is_empty());

        let above = vec![item("99213", "2024-01-01", "195.01")];
        let issues = analyzer.check_overpriced_items(&above);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Medium);
        assert_eq!(issues[0].estimated_savings, dec("22.505"));
        assert_eq!(
            issues[0].description,
            "Procedure 99213 charged $195.01, benchmark is $150.00"
        );
        match &issues[0].detail {
            IssueDetail::Overpriced { overcharge, benchmark_price, .. } => {
                assert_eq!(overcharge, &dec("45.01"));
                assert_eq!(benchmark_price, &dec("150"));
            }
            other => panic!("unexpected detail {:?}", other),
        }

        let report = analyzer.analyze_at(&above, today());
        assert_eq!(report.total_savings, dec("22.51"));
    }

    #[test]
    fn unknown_code_is_never_overpriced() {
        let items = vec![item("XYZ01", "2024-01-01", "100000"), item("", "2024-01-01", "100000")];
        assert!(BillAnalyzer::default().check_overpriced_items(&items).is_empty());
    }

    #[test]
    fn zero_benchmark_is_skipped() {
        let benchmarks: BenchmarkTable = vec![("X1".to_string(), dec("0"))].into_iter().collect();
        let analyzer = BillAnalyzer::new(benchmarks, Vec::new(), AnalyzerPolicy::default());
        assert!(analyzer
            .check_overpriced_items(&[item("X1", "2024-01-01", "500")])
            .is_empty());
    }

    #[test]
    fn padded_future_date_is_not_parsed() {
        let items = vec![
            item("99213", " 2024-06-02", "100"),
            item("99213", "+2024-06-02", "100"),
        ];
        let issues = BillAnalyzer::default().check_date_inconsistencies(&items, today());
        assert!(issues.is_empty());
    }

    #[test]
    fn missing_price_is_not_overpriced() {
        let items = vec![LineItem::new("27447", "2024-01-01", None)];
        assert!(BillAnalyzer::default().check_overpriced_items(&items).is_empty());
    }

    #[test]
    fn risky_combination_requires_single_date() {
        let analyzer = BillAnalyzer::default();

        let different_days = vec![
            item("99213", "2024-01-01", "100"),
            item("99214", "2024-01-02", "100"),
        ];
        assert!(analyzer.check_risky_combinations(&different_days).is_empty());

        let same_day = vec![
            item("99213", "2024-01-01", "100"),
            item("99214", "2024-01-01", "100"),
            item("85025", "2024-01-03", "30"),
            item("36415", "2024-01-04", "20"),
        ];
        let issues = analyzer.check_risky_combinations(&same_day);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::RiskyCombination);
        assert_eq!(issues[0].estimated_savings, BigDecimal::zero());
        assert_eq!(issues[0].description, "Same-day office visits at different levels");
        assert_eq!(issues[0].date(), Some("2024-01-01"));
    }

    #[test]
    fn risky_combination_needs_every_code() {
        let items = vec![item("93000", "2024-01-01", "100"), item("93000", "2024-01-01", "100")];
        assert!(BillAnalyzer::default().check_risky_combinations(&items).is_empty());
    }

    #[test]
    fn risky_combination_spanning_repeat_on_another_day_is_skipped() {
        let items = vec![
            item("93000", "2024-01-01", "100"),
            item("93010", "2024-01-01", "40"),
            item("93010", "2024-01-05", "40"),
        ];
        assert!(BillAnalyzer::default().check_risky_combinations(&items).is_empty());
    }

    #[test]
    fn unbundled_pass_is_empty() {
        let items = vec![item("80053", "2024-01-01", "50"), item("36415", "2024-01-01", "25")];
        assert!(BillAnalyzer::default().check_unbundled_charges(&items).is_empty());
    }

    #[test]
    fn future_dates_are_flagged() {
        let analyzer = BillAnalyzer::default();
        let items = vec![
            item("99213", "2024-06-02", "100"),
            item("99213", "2024-06-01", "100"),
            item("99214", "2023-12-31", "100"),
            item("99214", "not-a-date", "100"),
            item("99214", "", "100"),
        ];
        let issues = analyzer.check_date_inconsistencies(&items, today());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::FutureDate);
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(issues[0].estimated_savings, BigDecimal::zero());
        assert_eq!(issues[0].description, "Charge dated 2024-06-02 is in the future");
    }

    #[test]
    fn passes_are_concatenated_in_order() {
        let items = vec![
            item("99213", "2024-01-01", "150"),
            item("99213", "2024-01-01", "150"),
            item("99214", "2024-01-01", "300"),
            item("93000", "2099-01-01", "100"),
        ];
        let report = BillAnalyzer::default().analyze_at(&items, today());
        let kinds: Vec<_> = report.issues.iter().map(|i| i.issue_type).collect();
        assert_eq!(
            kinds,
            vec![
                IssueType::DuplicateCharge,
                IssueType::Overpriced,
                IssueType::RiskyCombination,
                IssueType::FutureDate,
            ]
        );
        // 135 + (300 - 200) * 0.5
        assert_eq!(report.total_savings, dec("185.00"));
        assert_eq!(report.high_severity_count, 2);
        assert_eq!(report.medium_severity_count, 2);
        assert_eq!(report.low_severity_count, 0);
    }

    #[test]
    fn analysis_is_deterministic_and_leaves_input_untouched() {
        let items = vec![
            item("99213", "2024-01-01", "150"),
            item("99213", "2024-01-01", "150"),
            item("45378", "2024-01-01", "9000"),
        ];
        let snapshot = items.clone();
        let analyzer = BillAnalyzer::default();

        let first = analyzer.analyze_at(&items, today());
        let second = analyzer.analyze_at(&items, today());
        assert_eq!(first, second);
        assert_eq!(items, snapshot);
    }

    #[test]
    fn injected_rules_replace_defaults() {
        let benchmarks: BenchmarkTable = vec![("X1".to_string(), dec("10"))].into_iter().collect();
        let policy = AnalyzerPolicy {
            markup_threshold: dec("2"),
            duplicate_recovery_rate: dec("1"),
            overpriced_recovery_rate: dec("1"),
        };
        let analyzer = BillAnalyzer::new(
            benchmarks,
            vec![RiskyCombination::new(["X1", "X2"], "custom rule")],
            policy,
        );

        let items = vec![
            item("X1", "2024-01-01", "25"),
            item("X2", "2024-01-01", "5"),
            item("99213", "2024-01-01", "900"),
        ];
        let report = analyzer.analyze_at(&items, today());
        assert_eq!(report.total_issues, 2);
        assert_eq!(report.issues[0].estimated_savings, dec("15"));
        assert_eq!(report.issues[1].description, "custom rule");
    }

    #[test]
    fn batch_preserves_order() {
        let bills = vec![
            BillSubmission {
                bill_id: Some("b1".to_string()),
                line_items: vec![
                    item("99213", "2024-01-01", "150"),
                    item("99213", "2024-01-01", "150"),
                ],
            },
            BillSubmission {
                bill_id: Some("b2".to_string()),
                line_items: Vec::new(),
            },
        ];
        let results = BillAnalyzer::default().analyze_batch(&bills);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].bill_id.as_deref(), Some("b1"));
        assert_eq!(results[0].report.total_issues, 1);
        assert_eq!(results[1].bill_id.as_deref(), Some("b2"));
        assert_eq!(results[1].report.total_issues, 0);
    }
}
