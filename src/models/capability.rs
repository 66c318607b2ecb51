/// 外部能力调用结果: 可用时携带值, 不可用时携带原因, 由调用方决定降级路径
#[derive(Debug, Clone, PartialEq)]
pub enum Capability<T> {
    Ok(T),
    Unavailable(String),
}

impl<T> Capability<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Capability::Unavailable(reason.into())
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Ok(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Capability::Ok(value) => Some(value),
            Capability::Unavailable(_) => None,
        }
    }

    /// 不可用时调用 fallback, 原因会传入
    pub fn unwrap_or_else(self, fallback: impl FnOnce(&str) -> T) -> T {
        match self {
            Capability::Ok(value) => value,
            Capability::Unavailable(reason) => fallback(&reason),
        }
    }
}
