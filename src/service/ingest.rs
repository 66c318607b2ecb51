use crate::error::{AppError, Result};
use crate::models::{Capability, LineItem};
use bigdecimal::{BigDecimal, Zero};
use serde_json::{Map, Value};
use std::str::FromStr;

/// 将请求中的 line_items 转为明细列表
///
/// 只有整体不是数组、或数组元素不是对象时才报错;
/// 单个字段的格式问题一律吸收 (价格缺失、日期无法解析等)。
pub fn parse_line_items(value: &Value) -> Result<Vec<LineItem>> {
    let Value::Array(entries) = value else {
        return Err(AppError::invalid_input("line_items must be an array"));
    };

    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| match entry {
            Value::Object(fields) => Ok(line_item_from_object(fields)),
            _ => Err(AppError::invalid_input(format!(
                "line_items[{}] must be an object",
                idx
            ))),
        })
        .collect()
}

fn line_item_from_object(fields: &Map<String, Value>) -> LineItem {
    let code = fields.get("code").map(scalar_text).unwrap_or_default();
    let date = match fields.get("date") {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };
    let price = fields.get("price").and_then(parse_price);
    if fields.contains_key("price") && price.is_none() {
        tracing::debug!("明细 {} 价格无法解析, 按缺失处理", code);
    }

    let mut item = LineItem::new(code, date, price);
    if let Some(Value::String(desc)) = fields.get("description") {
        item.description = Some(desc.clone());
    }
    item
}

/// 字符串或数字转文本, 其他类型视为空
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// 解析价格: 数字, 或带 `$` / 千分位的字符串; 负数和无法解析的值返回 None
pub fn parse_price(value: &Value) -> Option<BigDecimal> {
    let parsed = match value {
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) => parse_price_text(s),
        _ => None,
    }?;

    if parsed < BigDecimal::zero() {
        None
    } else {
        Some(parsed)
    }
}

fn parse_price_text(raw: &str) -> Option<BigDecimal> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != '$' && *c != ',').collect();
    BigDecimal::from_str(cleaned.trim()).ok()
}

/// 表头对应的明细字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Code,
    Date,
    Price,
    Description,
}

fn classify_header(header: &str) -> Option<Column> {
    let header = header.to_lowercase();
    if header.contains("code") || header.contains("cpt") {
        Some(Column::Code)
    } else if header.contains("date") {
        Some(Column::Date)
    } else if header.contains("price") || header.contains("amount") || header.contains("charge") {
        Some(Column::Price)
    } else if header.contains("description") || header.contains("service") {
        Some(Column::Description)
    } else {
        None
    }
}

/// 从文档识别结果 (tables / key_value_pairs) 提取明细
///
/// 表格首行为表头, 没有编码列值的行会被丢弃。所有表格都没有产出明细时,
/// 退回到键名包含 code/cpt 的键值对。什么都提取不到时返回 Unavailable。
pub fn line_items_from_document(document: &Value) -> Capability<Vec<LineItem>> {
    let Value::Object(document) = document else {
        return Capability::unavailable("extracted document is not an object");
    };

    let mut items = Vec::new();
    if let Some(Value::Array(tables)) = document.get("tables") {
        for table in tables {
            items.extend(items_from_table(table));
        }
    }

    if items.is_empty() {
        if let Some(Value::Object(pairs)) = document.get("key_value_pairs") {
            for (key, value) in pairs {
                let lowered = key.to_lowercase();
                if lowered.contains("code") || lowered.contains("cpt") {
                    items.push(
                        LineItem::new(scalar_text(value), "", Some(BigDecimal::zero()))
                            .with_description(key.clone()),
                    );
                }
            }
        }
    }

    if items.is_empty() {
        return Capability::unavailable("no line items found in extracted document");
    }

    tracing::debug!("从文档提取到 {} 条明细", items.len());
    Capability::Ok(items)
}

fn items_from_table(table: &Value) -> Vec<LineItem> {
    let Value::Array(rows) = table else {
        return Vec::new();
    };
    let Some((header_row, data_rows)) = rows.split_first() else {
        return Vec::new();
    };
    let Value::Array(headers) = header_row else {
        return Vec::new();
    };
    let columns: Vec<Option<Column>> = headers
        .iter()
        .map(|h| classify_header(&scalar_text(h)))
        .collect();

    let mut items = Vec::new();
    for row in data_rows {
        let Value::Array(cells) = row else {
            continue;
        };

        let mut code: Option<String> = None;
        let mut date = String::new();
        let mut price: Option<BigDecimal> = None;
        let mut description: Option<String> = None;

        for (column, cell) in columns.iter().zip(cells) {
            match column {
                Some(Column::Code) => code = Some(scalar_text(cell)),
                Some(Column::Date) => date = scalar_text(cell),
                Some(Column::Price) => price = parse_price(cell),
                Some(Column::Description) => description = Some(scalar_text(cell)),
                None => {}
            }
        }

        if let Some(code) = code {
            let mut item = LineItem::new(code, date, price);
            item.description = description;
            items.push(item);
        }
    }

    items
}
