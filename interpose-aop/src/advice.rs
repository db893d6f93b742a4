//! 通知（Advice）定义
//!
//! 通知由切点派生：切点匹配某个方法时为其创建一个 Advice，
//! 按类型（Before < Around < After）和 order 排入通知链。

use crate::chain::InterceptorChain;
use crate::error::AopResult;
use crate::joinpoint::JoinPoint;
use crate::pointcut::Pointcut;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// 通知类型
///
/// 声明顺序即通知链中的分组顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AdviceType {
    /// 前置通知
    Before,
    /// 环绕通知（可以控制目标方法是否执行）
    Around,
    /// 后置通知（目标方法执行后调用）
    After,
}

impl AdviceType {
    /// 未指定处理方法时使用的默认方法名
    pub fn default_handler(&self) -> &'static str {
        match self {
            AdviceType::Before => "before",
            AdviceType::Around => "around",
            AdviceType::After => "after",
        }
    }
}

impl fmt::Display for AdviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_handler())
    }
}

/// 已解析的通知处理函数
///
/// 在注册切点时绑定一次，调用时不再按名称查找
#[derive(Clone)]
pub struct AdviceHandler(Arc<dyn Fn(&mut JoinPoint<'_>) -> AopResult<Value> + Send + Sync>);

impl AdviceHandler {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&mut JoinPoint<'_>) -> AopResult<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(handler))
    }

    pub fn call(&self, join_point: &mut JoinPoint<'_>) -> AopResult<Value> {
        (self.0)(join_point)
    }
}

impl fmt::Debug for AdviceHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdviceHandler(..)")
    }
}

/// 终止通知的排序值
///
/// 终止通知只在环绕分组为空时合成，取最小值即排在环绕分组首位
pub const TERMINAL_ORDER: i32 = i32::MIN;

/// 终止通知在去重标识中使用的切面名
pub const TERMINAL_ASPECT: &str = "interpose::Terminal";

/// 通知去重标识：(类型, 切面类型, 处理方法名)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdviceIdentity {
    pub advice_type: AdviceType,
    pub aspect: String,
    pub method: String,
}

impl fmt::Display for AdviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.advice_type, self.aspect, self.method)
    }
}

/// 通知来源
#[derive(Debug, Clone)]
pub enum AdviceSource {
    /// 由切点声明
    Pointcut(Arc<Pointcut>),
    /// 内置终止通知，处理逻辑固定为 `join_point.proceed()`
    Terminal,
}

/// 通知链中的一个通知
#[derive(Debug, Clone)]
pub struct Advice {
    advice_type: AdviceType,
    order: i32,
    source: AdviceSource,
}

impl Advice {
    /// 由匹配的切点创建通知
    pub fn from_pointcut(pointcut: &Arc<Pointcut>) -> Self {
        Self {
            advice_type: pointcut.advice_type(),
            order: pointcut.order(),
            source: AdviceSource::Pointcut(Arc::clone(pointcut)),
        }
    }

    /// 创建终止环绕通知
    pub fn terminal() -> Self {
        Self {
            advice_type: AdviceType::Around,
            order: TERMINAL_ORDER,
            source: AdviceSource::Terminal,
        }
    }

    pub fn advice_type(&self) -> AdviceType {
        self.advice_type
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn source(&self) -> &AdviceSource {
        &self.source
    }

    /// 声明此通知的切点（终止通知没有）
    pub fn pointcut(&self) -> Option<&Arc<Pointcut>> {
        match &self.source {
            AdviceSource::Pointcut(pointcut) => Some(pointcut),
            AdviceSource::Terminal => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.source, AdviceSource::Terminal)
    }

    pub fn identity(&self) -> AdviceIdentity {
        match &self.source {
            AdviceSource::Pointcut(pointcut) => AdviceIdentity {
                advice_type: self.advice_type,
                aspect: pointcut.aspect_name().to_string(),
                method: pointcut.handler_method().to_string(),
            },
            AdviceSource::Terminal => AdviceIdentity {
                advice_type: self.advice_type,
                aspect: TERMINAL_ASPECT.to_string(),
                method: "proceed".to_string(),
            },
        }
    }

    /// 执行通知
    ///
    /// 前置/后置通知执行处理函数后总是继续通知链；
    /// 环绕通知只记录处理函数的返回值，是否继续由处理函数自己调用 `proceed()` 决定。
    pub(crate) fn invoke(
        &self,
        chain: &InterceptorChain,
        join_point: &mut JoinPoint<'_>,
    ) -> AopResult<()> {
        let outer = join_point.enter(self.advice_type);
        let outcome = self.call_handler(join_point);
        join_point.leave(outer);

        match self.advice_type {
            AdviceType::Before | AdviceType::After => {
                outcome?;
                chain.proceed(join_point)
            }
            AdviceType::Around => {
                join_point.set_result(outcome?);
                Ok(())
            }
        }
    }

    fn call_handler(&self, join_point: &mut JoinPoint<'_>) -> AopResult<Value> {
        match &self.source {
            AdviceSource::Pointcut(pointcut) => pointcut.handler().call(join_point),
            AdviceSource::Terminal => join_point.proceed(),
        }
    }
}

impl fmt::Display for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.order, self.identity())
    }
}
