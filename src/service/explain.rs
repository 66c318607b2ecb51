use crate::models::{format_money, Capability};
use crate::service::ingest::parse_price;
use bigdecimal::{BigDecimal, Zero};
use serde_json::Value;
use std::sync::Arc;

/// 自然语言解释的生成后端
pub trait ExplanationProvider: Send + Sync {
    fn generate(
        &self,
        context: &str,
        bill_items: &[String],
        issues: &[String],
    ) -> Capability<String>;
}

/// 未配置后端时使用
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredProvider;

impl ExplanationProvider for UnconfiguredProvider {
    fn generate(
        &self,
        _context: &str,
        _bill_items: &[String],
        _issues: &[String],
    ) -> Capability<String> {
        Capability::unavailable("no explanation backend configured")
    }
}

/// 解释结果
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub text: String,
    /// 是否使用了模板兜底
    pub from_template: bool,
}

/// 账单解释服务: 先调用后端, 不可用时退回模板
#[derive(Clone)]
pub struct Explainer {
    provider: Arc<dyn ExplanationProvider>,
}

impl Default for Explainer {
    fn default() -> Self {
        Self::new(Arc::new(UnconfiguredProvider))
    }
}

impl Explainer {
    pub fn new(provider: Arc<dyn ExplanationProvider>) -> Self {
        Self { provider }
    }

    pub fn explain(&self, context: &str, bill_items: &[Value], issues: &[Value]) -> Explanation {
        let items: Vec<String> = bill_items.iter().map(format_bill_item).collect();
        let issues: Vec<String> = issues.iter().map(format_issue).collect();
        let context = if context.is_empty() {
            "Medical bill analysis"
        } else {
            context
        };

        match self.provider.generate(context, &items, &issues) {
            Capability::Ok(text) => Explanation {
                text,
                from_template: false,
            },
            Capability::Unavailable(reason) => {
                tracing::warn!("解释后端不可用, 使用模板: {}", reason);
                Explanation {
                    text: template_explanation(&issues),
                    from_template: true,
                }
            }
        }
    }
}

/// `{code}: {description} - ${price}`, 非对象原样输出
fn format_bill_item(item: &Value) -> String {
    match item {
        Value::Object(fields) => {
            let text = |key: &str| match fields.get(key) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => "N/A".to_string(),
            };
            let price = fields
                .get("price")
                .and_then(parse_price)
                .unwrap_or_else(BigDecimal::zero);
            format!("{}: {} - ${}", text("code"), text("description"), format_money(&price))
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_issue(issue: &Value) -> String {
    match issue {
        Value::Object(fields) => match fields.get("description") {
            Some(Value::String(s)) => s.clone(),
            _ => issue.to_string(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn template_explanation(issues: &[String]) -> String {
    let mut text = String::from("We've analyzed your medical bill and found the following:\n\n");

    if issues.is_empty() {
        text.push_str("No major issues were found in your bill.\n\n");
    } else {
        text.push_str("Issues Found:\n");
        for (idx, issue) in issues.iter().enumerate() {
            text.push_str(&format!("{}. {}\n", idx + 1, issue));
        }
        text.push('\n');
    }

    text.push_str("Next Steps:\n");
    text.push_str("1. Review the flagged items with your healthcare provider\n");
    text.push_str("2. Contact your insurance company if you have questions\n");
    text.push_str("3. Consider requesting an itemized bill for detailed review\n");
    text.push_str("4. If you believe there are errors, file an appeal with your insurance\n\n");
    text.push_str("If you need help understanding any charges, please contact our support team.");
    text
}
