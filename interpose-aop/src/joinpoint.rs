//! 连接点（JoinPoint）定义
//!
//! 连接点是一次被拦截调用的上下文：参数、逐步形成的返回值、通知链游标，
//! 以及只能执行一次的目标方法。每次调用新建，调用结束即丢弃，不跨线程共享。

use crate::advice::AdviceType;
use crate::chain::InterceptorChain;
use crate::error::{AopError, AopResult};
use crate::signature::MethodSignature;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

/// 调用真实（未拦截）方法的回调
pub type TargetFn<'a> = Box<dyn FnOnce(&[Value]) -> AopResult<Value> + 'a>;

/// 目标方法的执行状态
#[derive(Debug, Clone)]
enum TargetState {
    Pending,
    Returned(Value),
    Failed,
}

/// 连接点信息
pub struct JoinPoint<'a> {
    chain: &'a InterceptorChain,
    instance: Option<&'a dyn Any>,
    args: Vec<Value>,
    result: Option<Value>,
    cursor: Option<usize>,
    /// 正在执行的通知类型及其在链中的位置
    active: Option<(AdviceType, usize)>,
    /// 每个环绕通知第一次 proceed() 的结果（失败为 None），按链中位置索引
    proceeded: HashMap<usize, Option<Value>>,
    target: Option<TargetFn<'a>>,
    target_state: TargetState,
    timestamp: Instant,
}

impl<'a> JoinPoint<'a> {
    pub(crate) fn new(
        chain: &'a InterceptorChain,
        instance: Option<&'a dyn Any>,
        args: Vec<Value>,
        target: TargetFn<'a>,
    ) -> Self {
        Self {
            chain,
            instance,
            args,
            result: None,
            cursor: None,
            active: None,
            proceeded: HashMap::new(),
            target: Some(target),
            target_state: TargetState::Pending,
            timestamp: Instant::now(),
        }
    }

    /// 被拦截方法的签名
    pub fn signature(&self) -> &MethodSignature {
        self.chain.signature()
    }

    /// 目标类型名称
    pub fn target_type(&self) -> &str {
        self.signature().owner()
    }

    /// 被拦截的目标对象，未提供或类型不符时返回 None
    pub fn target<T: Any>(&self) -> Option<&T> {
        self.instance.and_then(|instance| instance.downcast_ref::<T>())
    }

    /// 方法名称
    pub fn method_name(&self) -> &str {
        self.signature().method()
    }

    pub fn arguments(&self) -> &[Value] {
        &self.args
    }

    /// 可变参数，环绕通知可以在 `proceed()` 之前改写参数
    pub fn arguments_mut(&mut self) -> &mut Vec<Value> {
        &mut self.args
    }

    pub fn argument(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// 当前结果（尚未产生时为 None）
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn set_result(&mut self, result: Value) {
        self.result = Some(result);
    }

    /// 目标方法是否已经执行过
    pub fn target_invoked(&self) -> bool {
        !matches!(self.target_state, TargetState::Pending)
    }

    /// 调用时间戳
    pub fn timestamp(&self) -> &Instant {
        &self.timestamp
    }

    /// 自调用开始经过的时间
    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }

    /// 继续执行
    ///
    /// 下一个通知是环绕通知时交给通知链执行（环绕通知之间接力）；
    /// 否则执行真实的目标方法，随后跑完剩余的后置通知，并返回目标方法的结果。
    /// 目标方法每次调用最多执行一次；同一个环绕通知重复 `proceed()` 返回它第一次得到的结果。
    ///
    /// 只能在环绕通知的处理函数中调用。
    pub fn proceed(&mut self) -> AopResult<Value> {
        let Some((AdviceType::Around, index)) = self.active else {
            return Err(AopError::ProceedOutsideAround(self.signature().to_string()));
        };

        match self.proceeded.get(&index) {
            Some(Some(value)) => return Ok(value.clone()),
            Some(None) => return Err(AopError::TargetAlreadyFailed(self.signature().to_string())),
            None => {}
        }

        let outcome = self.proceed_once();
        self.proceeded.insert(index, outcome.as_ref().ok().cloned());
        outcome
    }

    fn proceed_once(&mut self) -> AopResult<Value> {
        let chain = self.chain;
        match chain.peek(self.cursor) {
            Some(next) if next.advice_type() == AdviceType::Around => {
                chain.proceed(self)?;
                Ok(self.result.clone().unwrap_or(Value::Null))
            }
            _ => {
                let value = self.invoke_target()?;
                self.result = Some(value.clone());
                chain.proceed(self)?;
                Ok(value)
            }
        }
    }

    fn invoke_target(&mut self) -> AopResult<Value> {
        let Some(target) = self.target.take() else {
            return match &self.target_state {
                TargetState::Returned(value) => Ok(value.clone()),
                _ => Err(AopError::TargetAlreadyFailed(self.signature().to_string())),
            };
        };

        tracing::trace!("Invoking target method {}", self.signature());
        match target(&self.args) {
            Ok(value) => {
                self.target_state = TargetState::Returned(value.clone());
                Ok(value)
            }
            Err(err) => {
                self.target_state = TargetState::Failed;
                Err(err)
            }
        }
    }

    pub(crate) fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub(crate) fn advance_to(&mut self, index: usize) {
        self.cursor = Some(index);
    }

    /// 标记游标处正在执行的通知，返回外层的标记
    pub(crate) fn enter(&mut self, advice_type: AdviceType) -> Option<(AdviceType, usize)> {
        let index = self.cursor.unwrap_or_default();
        self.active.replace((advice_type, index))
    }

    pub(crate) fn leave(&mut self, outer: Option<(AdviceType, usize)>) {
        self.active = outer;
    }

    pub(crate) fn into_result(self) -> Value {
        self.result.unwrap_or(Value::Null)
    }
}

impl fmt::Debug for JoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinPoint")
            .field("signature", &self.signature().as_str())
            .field("args", &self.args)
            .field("result", &self.result)
            .field("cursor", &self.cursor)
            .field("target_state", &self.target_state)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

impl fmt::Display for JoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}
