//! 错误信息结构
//!
//! 提供结构化的错误信息给切面记录

use std::error::Error;

/// 结构化的错误信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// 错误消息
    pub message: String,

    /// 错误类型名称
    pub error_type: String,

    /// 错误源链（cause chain）
    pub source_chain: Vec<String>,
}

impl ErrorInfo {
    /// 从标准错误创建 ErrorInfo
    pub fn from_error<E: Error + ?Sized>(error: &E) -> Self {
        let source_chain = std::iter::successors(error.source(), |&source| source.source())
            .map(ToString::to_string)
            .collect();

        Self {
            message: error.to_string(),
            error_type: std::any::type_name::<E>().to_string(),
            source_chain,
        }
    }

    /// 完整的错误描述（包含源链）
    pub fn full_description(&self) -> String {
        if self.source_chain.is_empty() {
            return self.message.clone();
        }
        format!(
            "{}\nCaused by:\n  {}",
            self.message,
            self.source_chain.join("\n  ")
        )
    }
}
