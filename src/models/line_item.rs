use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::Serialize;

/// 服务日期格式
pub const SERVICE_DATE_FORMAT: &str = "%Y-%m-%d";

/// 账单明细 (一条收费记录)
///
/// `date` 保留原始字符串, 重复收费分组直接使用它; `service_date`
/// 是解析成功后的日历日期, 只有日期检查会用到。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub code: String,
    pub date: String,
    #[serde(skip)]
    pub service_date: Option<NaiveDate>,
    /// None 表示缺失或无法解析, 与合法的 0 区分
    pub price: Option<BigDecimal>,
    pub description: Option<String>,
}

impl LineItem {
    pub fn new(
        code: impl Into<String>,
        date: impl Into<String>,
        price: Option<BigDecimal>,
    ) -> Self {
        let date = date.into();
        Self {
            code: code.into(),
            service_date: parse_service_date(&date),
            date,
            price,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 缺失价格按 0 处理
    pub fn price_or_zero(&self) -> BigDecimal {
        self.price.clone().unwrap_or_else(BigDecimal::zero)
    }

    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// 严格按 YYYY-MM-DD 解析, 不做 trim
///
/// 年份必须是开头的 4 位数字, 拒绝前导空白、正负号和 5 位以上年份
pub fn parse_service_date(raw: &str) -> Option<NaiveDate> {
    let year = raw.get(..4)?;
    if !year.bytes().all(|b| b.is_ascii_digit()) || raw.as_bytes().get(4) != Some(&b'-') {
        return None;
    }
    NaiveDate::parse_from_str(raw, SERVICE_DATE_FORMAT).ok()
}
