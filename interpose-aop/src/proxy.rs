//! 单实例代理
//!
//! `Proxy<T>` 持有目标对象和只属于它的切点集合，
//! 同一类型的不同实例可以织入不同的通知。

use crate::config::AopConfig;
use crate::error::AopResult;
use crate::pointcut::PointcutBuilder;
use crate::registry::AspectRegistry;
use serde_json::Value;
use std::any::Any;
use std::fmt;

/// 织入了切面的目标对象
pub struct Proxy<T> {
    target: T,
    target_type: String,
    registry: AspectRegistry,
}

impl<T> Proxy<T> {
    pub fn new(target_type: impl Into<String>, target: T) -> Self {
        Self::with_config(target_type, target, AopConfig::default())
    }

    pub fn with_config(target_type: impl Into<String>, target: T, config: AopConfig) -> Self {
        Self {
            target,
            target_type: target_type.into(),
            registry: AspectRegistry::with_config(config),
        }
    }

    /// 为此实例添加切点
    pub fn add_pointcut(&self, pointcut: PointcutBuilder) -> AopResult<&Self> {
        self.registry.register(&self.target_type, pointcut)?;
        Ok(self)
    }

    /// 按此实例配置预设好的切点构造器
    pub fn pointcut(&self) -> PointcutBuilder {
        self.registry.pointcut()
    }

    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn registry(&self) -> &AspectRegistry {
        &self.registry
    }

    pub fn into_inner(self) -> T {
        self.target
    }

    /// 通过通知链调用目标方法
    ///
    /// 通知可以通过 [`JoinPoint::target`](crate::JoinPoint::target) 读取目标对象
    pub fn call<F>(&self, signature: &str, args: Vec<Value>, method: F) -> AopResult<Value>
    where
        T: Any,
        F: FnOnce(&T, &[Value]) -> AopResult<Value>,
    {
        let target = &self.target;
        self.registry.intercept_instance(
            &self.target_type,
            target as &dyn Any,
            signature,
            args,
            |args| method(target, args),
        )
    }

    /// 通过通知链调用可变方法
    ///
    /// 目标对象被真实方法可变借用，通知中 `JoinPoint::target` 返回 None
    pub fn call_mut<F>(&mut self, signature: &str, args: Vec<Value>, method: F) -> AopResult<Value>
    where
        F: FnOnce(&mut T, &[Value]) -> AopResult<Value>,
    {
        let Self {
            target,
            target_type,
            registry,
        } = self;
        registry.intercept(target_type, signature, args, |args| method(target, args))
    }
}

impl<T> fmt::Debug for Proxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("target_type", &self.target_type)
            .field("pointcuts", &self.registry.len())
            .finish_non_exhaustive()
    }
}
