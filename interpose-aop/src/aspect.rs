//! 切面（Aspect）定义
//!
//! 切面是横切关注点的模块化。切面按名称暴露处理方法，
//! 切点构建时通过 [`Aspect::handler`] 把名称解析成可调用的 [`AdviceHandler`]。

use crate::advice::{AdviceHandler, AdviceType};
use crate::error::AopResult;
use crate::error_info::ErrorInfo;
use crate::joinpoint::JoinPoint;
use crate::pointcut::Pointcut;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// 切面 Trait
///
/// 一般通过 `#[aspect]` 宏实现
pub trait Aspect: Send + Sync + 'static {
    /// 切面名称，同时作为通知去重时的类型标识
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// 按方法名解析处理函数，不存在时返回 None
    fn handler(self: Arc<Self>, method: &str) -> Option<AdviceHandler>;
}

/// 切面注册器
///
/// 用于 inventory 自动收集，由 `#[aspect]` 宏为带 `#[before(..)]`/`#[around(..)]`/`#[after(..)]`
/// 属性的方法生成
pub struct AspectRegistration {
    /// 目标类型名称
    pub target_type: &'static str,

    /// 方法签名模式
    pub pattern: &'static str,

    /// 通知类型
    pub advice_type: AdviceType,

    /// 通知顺序
    pub order: i32,

    /// 处理方法名
    pub method: &'static str,

    /// 创建切面实例的函数
    pub creator: fn() -> Arc<dyn Aspect>,
}

impl AspectRegistration {
    pub const fn new(
        target_type: &'static str,
        pattern: &'static str,
        advice_type: AdviceType,
        order: i32,
        method: &'static str,
        creator: fn() -> Arc<dyn Aspect>,
    ) -> Self {
        Self {
            target_type,
            pattern,
            advice_type,
            order,
            method,
            creator,
        }
    }

    /// 创建切面实例
    pub fn create_instance(&self) -> Arc<dyn Aspect> {
        (self.creator)()
    }

    /// 转换为切点
    pub fn to_pointcut(&self, match_cache: bool) -> AopResult<Pointcut> {
        Pointcut::builder()
            .aspect(self.create_instance())
            .intercept(self.pattern)
            .advice(self.advice_type, self.order)
            .with_method(self.method)
            .match_cache(match_cache)
            .build()
    }
}

inventory::collect!(AspectRegistration);

/// 获取所有注册的切面注册器
pub fn get_all_aspect_registrations() -> impl Iterator<Item = &'static AspectRegistration> {
    inventory::iter::<AspectRegistration>()
}

// ============================================================================
// 预定义的常用切面
// ============================================================================

/// 日志切面 - 记录方法进入和退出
///
/// 处理方法：`before`、`after`
#[derive(Debug, Clone, Default)]
pub struct LoggingAspect {
    log_args: bool,
    log_result: bool,
}

impl LoggingAspect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_args(mut self) -> Self {
        self.log_args = true;
        self
    }

    pub fn with_result(mut self) -> Self {
        self.log_result = true;
        self
    }

    fn before(&self, join_point: &JoinPoint<'_>) {
        if self.log_args {
            tracing::info!("→ Entering: {} with {:?}", join_point.signature(), join_point.arguments());
        } else {
            tracing::info!("→ Entering: {}", join_point.signature());
        }
    }

    fn after(&self, join_point: &JoinPoint<'_>) {
        let elapsed = join_point.elapsed();
        match join_point.result() {
            Some(result) if self.log_result => {
                tracing::info!("← Exiting: {} = {} (took {:?})", join_point.signature(), result, elapsed)
            }
            _ => tracing::info!("← Exiting: {} (took {:?})", join_point.signature(), elapsed),
        }
    }
}

impl Aspect for LoggingAspect {
    fn name(&self) -> &str {
        "LoggingAspect"
    }

    fn handler(self: Arc<Self>, method: &str) -> Option<AdviceHandler> {
        match method {
            "before" => Some(AdviceHandler::new(move |jp| {
                self.before(jp);
                Ok(Value::Null)
            })),
            "after" => Some(AdviceHandler::new(move |jp| {
                self.after(jp);
                Ok(Value::Null)
            })),
            _ => None,
        }
    }
}

/// 性能监控切面
///
/// 处理方法：`around`
#[derive(Debug, Clone)]
pub struct PerformanceAspect {
    threshold: Duration,
}

impl PerformanceAspect {
    pub fn new(threshold_ms: u64) -> Self {
        Self {
            threshold: Duration::from_millis(threshold_ms),
        }
    }

    fn around(&self, join_point: &mut JoinPoint<'_>) -> AopResult<Value> {
        let result = join_point.proceed();
        let elapsed = join_point.elapsed();
        if elapsed > self.threshold {
            tracing::warn!(
                "⚠️ Slow method detected: {} took {:?} (threshold: {:?})",
                join_point.signature(),
                elapsed,
                self.threshold
            );
        }
        result
    }
}

impl Aspect for PerformanceAspect {
    fn name(&self) -> &str {
        "PerformanceAspect"
    }

    fn handler(self: Arc<Self>, method: &str) -> Option<AdviceHandler> {
        match method {
            "around" => Some(AdviceHandler::new(move |jp| self.around(jp))),
            _ => None,
        }
    }
}

/// 异常处理切面 - 记录失败的调用并原样返回错误
///
/// 处理方法：`around`
#[derive(Debug, Clone, Default)]
pub struct ExceptionHandlingAspect;

impl ExceptionHandlingAspect {
    pub fn new() -> Self {
        Self
    }

    fn around(&self, join_point: &mut JoinPoint<'_>) -> AopResult<Value> {
        join_point.proceed().inspect_err(|err| {
            let info = ErrorInfo::from_error(err);
            tracing::error!("❌ Exception in {}: {}", join_point.signature(), info.full_description());
        })
    }
}

impl Aspect for ExceptionHandlingAspect {
    fn name(&self) -> &str {
        "ExceptionHandlingAspect"
    }

    fn handler(self: Arc<Self>, method: &str) -> Option<AdviceHandler> {
        match method {
            "around" => Some(AdviceHandler::new(move |jp| self.around(jp))),
            _ => None,
        }
    }
}
