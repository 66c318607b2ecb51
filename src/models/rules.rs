use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::str::FromStr;

/// 默认基准价 (编码, 价格)
pub const DEFAULT_BENCHMARKS: &[(&str, i64)] = &[
    ("99213", 150),   // 门诊, 复诊
    ("99214", 200),   // 门诊, 详细
    ("36415", 25),    // 静脉采血
    ("80053", 50),    // 综合代谢
    ("85025", 30),    // 血常规
    ("93000", 100),   // 心电图
    ("45378", 2000),  // 结肠镜
    ("27447", 15000), // 全膝置换
    ("27130", 20000), // 全髋置换
    ("99221", 500),   // 住院首诊
    ("99232", 400),   // 住院复诊
    ("99284", 800),   // 急诊
];

/// 默认高风险组合
pub const DEFAULT_RISKY_COMBINATIONS: &[(&[&str], &str)] = &[
    (&["99213", "99214"], "Same-day office visits at different levels"),
    (&["93000", "93010"], "Multiple EKGs same day without justification"),
];

/// 基准价表: 编码 -> 参考价格, 构建后只读
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BenchmarkTable {
    prices: HashMap<String, BigDecimal>,
}

impl BenchmarkTable {
    pub fn get(&self, code: &str) -> Option<&BigDecimal> {
        self.prices.get(code)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn standard() -> Self {
        DEFAULT_BENCHMARKS
            .iter()
            .map(|(code, price)| (code.to_string(), BigDecimal::from(*price)))
            .collect()
    }
}

impl FromIterator<(String, BigDecimal)> for BenchmarkTable {
    fn from_iter<I: IntoIterator<Item = (String, BigDecimal)>>(iter: I) -> Self {
        Self {
            prices: iter.into_iter().collect(),
        }
    }
}

/// 高风险编码组合
#[derive(Debug, Clone, PartialEq)]
pub struct RiskyCombination {
    pub codes: Vec<String>,
    pub description: String,
}

impl RiskyCombination {
    pub fn new<S: Into<String>>(
        codes: impl IntoIterator<Item = S>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
            description: description.into(),
        }
    }

    pub fn standard() -> Vec<Self> {
        DEFAULT_RISKY_COMBINATIONS
            .iter()
            .map(|(codes, description)| Self::new(codes.iter().copied(), *description))
            .collect()
    }
}

/// 可回收比例等策略参数
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerPolicy {
    /// 超过基准价的倍数阈值 (严格大于才触发)
    pub markup_threshold: BigDecimal,
    pub duplicate_recovery_rate: BigDecimal,
    pub overpriced_recovery_rate: BigDecimal,
}

impl Default for AnalyzerPolicy {
    fn default() -> Self {
        Self {
            markup_threshold: decimal("1.3"),
            duplicate_recovery_rate: decimal("0.9"),
            overpriced_recovery_rate: decimal("0.5"),
        }
    }
}

fn decimal(literal: &str) -> BigDecimal {
    // 常量字面量, 解析不会失败
    BigDecimal::from_str(literal).unwrap_or_default()
}
