use crate::error::{AppError, Result};
use crate::models::rules::{DEFAULT_BENCHMARKS, DEFAULT_RISKY_COMBINATIONS};
use crate::models::{AnalyzerPolicy, BenchmarkTable, RiskyCombination};
use crate::service::BillAnalyzer;
use bigdecimal::BigDecimal;
use config::{Config, Environment, File, Source};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub analyzer: AnalyzerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// url 为空时不持久化分析结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl LoggingConfig {
    pub fn tracing_level(&self) -> tracing::Level {
        tracing::Level::from_str(&self.level).unwrap_or(tracing::Level::INFO)
    }
}

/// 分析规则配置: 基准价表、高风险组合、可回收比例
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub markup_threshold: f64,
    pub duplicate_recovery_rate: f64,
    pub overpriced_recovery_rate: f64,
    /// 列表形式, 编码作为值保存以保留大小写; 配置文件中的列表整体替换内置表
    pub benchmarks: Vec<BenchmarkEntry>,
    pub risky_combinations: Vec<RiskyCombinationConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    pub code: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskyCombinationConfig {
    pub codes: Vec<String>,
    pub description: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            markup_threshold: 1.3,
            duplicate_recovery_rate: 0.9,
            overpriced_recovery_rate: 0.5,
            benchmarks: DEFAULT_BENCHMARKS
                .iter()
                .map(|(code, price)| BenchmarkEntry {
                    code: code.to_string(),
                    price: *price as f64,
                })
                .collect(),
            risky_combinations: DEFAULT_RISKY_COMBINATIONS
                .iter()
                .map(|(codes, description)| RiskyCombinationConfig {
                    codes: codes.iter().map(|c| c.to_string()).collect(),
                    description: description.to_string(),
                })
                .collect(),
        }
    }
}

impl AppConfig {
    /// 加载配置: 内置默认值 < config/default.toml < BILLCHECK__* < SERVER_HOST 等环境变量
    pub fn load() -> Result<Self> {
        Self::load_with(File::with_name("config/default").required(false))
    }

    /// 以给定的文件源替代 config/default.toml
    pub fn load_with<S>(file: S) -> Result<Self>
    where
        S: Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(file)
            .add_source(Environment::with_prefix("BILLCHECK").separator("__"))
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option(
                "server.port",
                std::env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse::<u16>().ok())
                    .map(i64::from),
            )?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("logging.level", std::env::var("LOG_LEVEL").ok())?
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        Ok(config)
    }

    pub fn build_analyzer(&self) -> Result<BillAnalyzer> {
        self.analyzer.build()
    }
}

impl AnalyzerConfig {
    /// 转为分析器, 非法数值 (NaN、负数) 视为配置错误
    pub fn build(&self) -> Result<BillAnalyzer> {
        let policy = AnalyzerPolicy {
            markup_threshold: non_negative("markup_threshold", self.markup_threshold)?,
            duplicate_recovery_rate: non_negative(
                "duplicate_recovery_rate",
                self.duplicate_recovery_rate,
            )?,
            overpriced_recovery_rate: non_negative(
                "overpriced_recovery_rate",
                self.overpriced_recovery_rate,
            )?,
        };

        let benchmarks = self
            .benchmarks
            .iter()
            .map(|entry| Ok((entry.code.clone(), positive(&entry.code, entry.price)?)))
            .collect::<Result<BenchmarkTable>>()?;

        let risky_combinations = self
            .risky_combinations
            .iter()
            .map(|rule| {
                if rule.codes.is_empty() {
                    return Err(AppError::InvalidConfig(format!(
                        "risky combination '{}' has no codes",
                        rule.description
                    )));
                }
                Ok(RiskyCombination::new(rule.codes.iter().cloned(), rule.description.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(BillAnalyzer::new(benchmarks, risky_combinations, policy))
    }
}

fn non_negative(name: &str, value: f64) -> Result<BigDecimal> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::InvalidConfig(format!(
            "{} must be a non-negative number, got {}",
            name, value
        )));
    }
    BigDecimal::from_str(&value.to_string())
        .map_err(|e| AppError::InvalidConfig(format!("{}: {}", name, e)))
}

/// 基准价须大于 0
fn positive(name: &str, value: f64) -> Result<BigDecimal> {
    if value == 0.0 {
        return Err(AppError::InvalidConfig(format!(
            "{} must be a positive number, got 0",
            name
        )));
    }
    non_negative(name, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IssueType, LineItem};
    use chrono::NaiveDate;
    use config::FileFormat;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn default_analyzer_matches_standard_rules() {
        let analyzer = AppConfig::default().build_analyzer().unwrap();
        let standard = BillAnalyzer::default();

        assert_eq!(analyzer.policy(), standard.policy());
        assert_eq!(analyzer.benchmarks(), standard.benchmarks());
    }

    #[test]
    fn defaults_survive_config_layering() {
        let loaded: AppConfig = Config::builder()
            .add_source(Config::try_from(&AppConfig::default()).unwrap())
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(loaded.server, AppConfig::default().server);
        assert_eq!(loaded.analyzer.benchmarks.len(), 12);
        assert_eq!(loaded.analyzer.risky_combinations.len(), 2);
        assert!(loaded.database.url.is_none());
    }

    #[test]
    fn rejects_invalid_numbers() {
        let mut cfg = AnalyzerConfig::default();
        cfg.duplicate_recovery_rate = -0.1;
        assert!(matches!(cfg.build(), Err(AppError::InvalidConfig(_))));

        let mut cfg = AnalyzerConfig::default();
        cfg.benchmarks.push(BenchmarkEntry {
            code: "99999".to_string(),
            price: f64::NAN,
        });
        assert!(matches!(cfg.build(), Err(AppError::InvalidConfig(_))));

        let mut cfg = AnalyzerConfig::default();
        cfg.benchmarks.push(BenchmarkEntry {
            code: "99999".to_string(),
            price: 0.0,
        });
        assert!(matches!(cfg.build(), Err(AppError::InvalidConfig(_))));

        let mut cfg = AnalyzerConfig::default();
        cfg.risky_combinations.push(RiskyCombinationConfig {
            codes: Vec::new(),
            description: "empty".to_string(),
        });
        assert!(matches!(cfg.build(), Err(AppError::InvalidConfig(_))));
    }

    #[test]
    fn log_level_falls_back_to_info() {
        let logging = LoggingConfig {
            level: "verbose".to_string(),
        };
        assert_eq!(logging.tracing_level(), tracing::Level::INFO);

        let logging = LoggingConfig {
            level: "debug".to_string(),
        };
        assert_eq!(logging.tracing_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn file_overrides_policy_rate() {
        let toml = "[analyzer]\nduplicate_recovery_rate = 0.5\n";
        let config = AppConfig::load_with(File::from_str(toml, FileFormat::Toml)).unwrap();
        assert_eq!(config.analyzer.duplicate_recovery_rate, 0.5);
        assert_eq!(config.analyzer.markup_threshold, 1.3);

        let analyzer = config.build_analyzer().unwrap();
        let items = vec![
            LineItem::new("36415", "2024-01-01", Some(dec("100"))),
            LineItem::new("36415", "2024-01-01", Some(dec("100"))),
        ];
        let report = analyzer.analyze_at(&items, today());

        assert_eq!(report.total_issues, 1);
        assert_eq!(report.issues[0].estimated_savings, dec("50"));
    }

    #[test]
    fn file_benchmarks_keep_code_case() {
        let toml = r#"
[[analyzer.benchmarks]]
code = "G0101"
price = 50

[[analyzer.benchmarks]]
code = "j1100"
price = 10
"#;
        let config = AppConfig::load_with(File::from_str(toml, FileFormat::Toml)).unwrap();
        let analyzer = config.build_analyzer().unwrap();

        assert_eq!(analyzer.benchmarks().len(), 2);
        assert_eq!(analyzer.benchmarks().get("G0101"), Some(&dec("50")));
        assert!(analyzer.benchmarks().get("g0101").is_none());

        let items = vec![LineItem::new("G0101", "2024-01-01", Some(dec("1000")))];
        let report = analyzer.analyze_at(&items, today());

        assert_eq!(report.total_issues, 1);
        assert_eq!(report.issues[0].issue_type, IssueType::Overpriced);
        assert_eq!(report.issues[0].code(), Some("G0101"));
    }
}
