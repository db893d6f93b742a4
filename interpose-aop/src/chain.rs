//! 拦截器链
//!
//! 每个方法签名一条，构建后不可变，可在多个线程的并发调用之间共享；
//! 执行游标保存在每次调用独有的 [`JoinPoint`] 上。

use crate::advice::Advice;
use crate::error::AopResult;
use crate::joinpoint::JoinPoint;
use crate::signature::MethodSignature;
use serde_json::Value;
use std::any::Any;

/// 拦截器链
#[derive(Debug)]
pub struct InterceptorChain {
    signature: MethodSignature,
    advice: Vec<Advice>,
}

impl InterceptorChain {
    pub(crate) fn new(signature: MethodSignature, advice: Vec<Advice>) -> Self {
        Self { signature, advice }
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    /// 有序通知列表
    pub fn advice(&self) -> &[Advice] {
        &self.advice
    }

    pub fn len(&self) -> usize {
        self.advice.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advice.is_empty()
    }

    /// 查看游标之后的下一个通知（不移动游标）
    pub fn peek(&self, cursor: Option<usize>) -> Option<&Advice> {
        self.advice.get(cursor.map_or(0, |c| c + 1))
    }

    /// 执行下一个通知
    ///
    /// 通知链已经走完时什么都不做，游标也不移动
    pub fn proceed(&self, join_point: &mut JoinPoint<'_>) -> AopResult<()> {
        let next = join_point.cursor().map_or(0, |c| c + 1);
        let Some(advice) = self.advice.get(next) else {
            return Ok(());
        };

        join_point.advance_to(next);
        tracing::trace!("Invoking advice {} on {}", advice, self.signature);
        advice.invoke(self, join_point)
    }

    /// 拦截一次调用
    ///
    /// 创建新的连接点并启动通知链，返回最终结果；
    /// 没有任何处理函数产生结果时返回 `Value::Null`。
    pub fn intercept<F>(&self, args: Vec<Value>, target: F) -> AopResult<Value>
    where
        F: FnOnce(&[Value]) -> AopResult<Value>,
    {
        self.intercept_on(None, args, target)
    }

    /// 拦截对某个目标对象的调用，通知可以通过 [`JoinPoint::target`] 读取它
    pub fn intercept_on<'a, F>(
        &'a self,
        instance: Option<&'a dyn Any>,
        args: Vec<Value>,
        target: F,
    ) -> AopResult<Value>
    where
        F: FnOnce(&[Value]) -> AopResult<Value> + 'a,
    {
        if self.advice.is_empty() {
            return target(&args);
        }

        let mut join_point = JoinPoint::new(self, instance, args, Box::new(target));
        self.proceed(&mut join_point)?;
        Ok(join_point.into_result())
    }
}
