//! AOP 错误类型
//!
//! 配置类错误（缺失处理方法、未设置通知类型）在注册时同步返回；
//! 签名解析失败在匹配阶段被吸收为“不匹配”。

use serde_json::Value;
use thiserror::Error;

/// AOP 引擎错误
#[derive(Debug, Error)]
pub enum AopError {
    /// 签名或模式不符合 `<visibility> <owner>-><method>(<args>)` 形式
    #[error("Malformed method signature: '{0}'")]
    MalformedSignature(String),

    /// 切面上不存在声明的处理方法
    #[error("Handler method '{method}' not found on aspect '{aspect}'")]
    HandlerNotFound { aspect: String, method: String },

    /// 切点在构建前没有设置通知类型
    #[error("Pointcut '{pattern}' has no advice type (call before/around/after first)")]
    InvalidAdviceKind { pattern: String },

    /// 只有环绕通知可以调用 proceed()
    #[error("JoinPoint::proceed() called outside of an around advice for {0}")]
    ProceedOutsideAround(String),

    /// 目标方法已经执行失败，不会被再次调用
    #[error("Target method {0} already failed and cannot be invoked again")]
    TargetAlreadyFailed(String),

    /// 通知处理方法或目标方法返回的错误
    #[error(transparent)]
    Invocation(#[from] anyhow::Error),
}

/// AOP 操作结果
pub type AopResult<T> = Result<T, AopError>;

/// 通知处理方法的返回值转换
///
/// 允许处理方法返回 `()`、`Value`、`AopResult<()>` 或 `AopResult<Value>`，
/// 前置/后置通知通常不关心返回值。
pub trait IntoAdviceResult {
    fn into_advice_result(self) -> AopResult<Value>;
}

impl IntoAdviceResult for () {
    fn into_advice_result(self) -> AopResult<Value> {
        Ok(Value::Null)
    }
}

impl IntoAdviceResult for Value {
    fn into_advice_result(self) -> AopResult<Value> {
        Ok(self)
    }
}

impl IntoAdviceResult for AopResult<()> {
    fn into_advice_result(self) -> AopResult<Value> {
        self.map(|_| Value::Null)
    }
}

impl IntoAdviceResult for AopResult<Value> {
    fn into_advice_result(self) -> AopResult<Value> {
        self
    }
}

impl IntoAdviceResult for anyhow::Result<Value> {
    fn into_advice_result(self) -> AopResult<Value> {
        self.map_err(AopError::from)
    }
}
