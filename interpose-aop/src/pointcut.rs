//! 切点（Pointcut）
//!
//! 切点把一个方法签名模式绑定到一个通知：通知类型、顺序和处理函数。
//! 处理函数在构建切点时解析，找不到时立即返回 `HandlerNotFound`。
//!
//! ```ignore
//! let pointcut = Pointcut::builder()
//!     .aspect(Arc::new(AuditAspect::default()))
//!     .intercept(".* UserService->save.*(.*)")
//!     .before(0)
//!     .with_method("audit")
//!     .build()?;
//! ```

use crate::advice::{AdviceHandler, AdviceType};
use crate::aspect::Aspect;
use crate::error::{AopError, AopResult};
use crate::joinpoint::JoinPoint;
use crate::signature::{MethodSignature, SignatureMatcher, SignaturePattern};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 以闭包注册的处理函数使用的切面名前缀
///
/// 每个闭包得到独立的切面名 `closure#<n>`，同名的不同闭包不会被去重
pub const CLOSURE_ASPECT: &str = "closure";

static NEXT_CLOSURE_ID: AtomicUsize = AtomicUsize::new(0);

/// 切点
///
/// 创建后只读，可在多个拦截器链之间共享；匹配结果缓存在切点自身。
pub struct Pointcut {
    aspect: String,
    method: String,
    handler: AdviceHandler,
    advice_type: AdviceType,
    order: i32,
    matcher: SignatureMatcher,
}

impl Pointcut {
    pub fn builder() -> PointcutBuilder {
        PointcutBuilder::default()
    }

    /// 检查方法签名是否匹配
    pub fn matches(&self, signature: &MethodSignature) -> bool {
        self.matcher.matches(signature)
    }

    /// 切面类型标识
    pub fn aspect_name(&self) -> &str {
        &self.aspect
    }

    /// 处理方法名
    pub fn handler_method(&self) -> &str {
        &self.method
    }

    pub fn handler(&self) -> &AdviceHandler {
        &self.handler
    }

    pub fn advice_type(&self) -> AdviceType {
        self.advice_type
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn pattern(&self) -> &SignaturePattern {
        self.matcher.pattern()
    }

    pub fn matcher(&self) -> &SignatureMatcher {
        &self.matcher
    }
}

impl fmt::Debug for Pointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pointcut")
            .field("pattern", &self.pattern().as_str())
            .field("advice_type", &self.advice_type)
            .field("order", &self.order)
            .field("aspect", &self.aspect)
            .field("method", &self.method)
            .finish()
    }
}

impl fmt::Display for Pointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pattern().as_str())
    }
}

/// 切点构造器
pub struct PointcutBuilder {
    aspect: Option<Arc<dyn Aspect>>,
    closure: Option<(String, usize, AdviceHandler)>,
    pattern: Option<String>,
    advice: Option<(AdviceType, i32)>,
    method: Option<String>,
    match_cache: bool,
}

impl Default for PointcutBuilder {
    fn default() -> Self {
        Self {
            aspect: None,
            closure: None,
            pattern: None,
            advice: None,
            method: None,
            match_cache: true,
        }
    }
}

impl PointcutBuilder {
    /// 绑定切面实例
    pub fn aspect(mut self, aspect: Arc<dyn Aspect>) -> Self {
        self.aspect = Some(aspect);
        self
    }

    /// 要拦截的方法签名模式
    pub fn intercept(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// 设置通知类型和顺序
    pub fn advice(mut self, advice_type: AdviceType, order: i32) -> Self {
        self.advice = Some((advice_type, order));
        self
    }

    pub fn before(self, order: i32) -> Self {
        self.advice(AdviceType::Before, order)
    }

    pub fn around(self, order: i32) -> Self {
        self.advice(AdviceType::Around, order)
    }

    pub fn after(self, order: i32) -> Self {
        self.advice(AdviceType::After, order)
    }

    /// 切面上的处理方法名，未设置时使用通知类型的默认名（before/around/after）
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// 直接以闭包作为处理函数，不需要切面实例
    pub fn handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut JoinPoint<'_>) -> AopResult<Value> + Send + Sync + 'static,
    {
        let id = NEXT_CLOSURE_ID.fetch_add(1, Ordering::Relaxed);
        self.closure = Some((name.into(), id, AdviceHandler::new(handler)));
        self
    }

    /// 是否缓存匹配结果（默认开启）
    pub fn match_cache(mut self, enabled: bool) -> Self {
        self.match_cache = enabled;
        self
    }

    pub fn build(self) -> AopResult<Pointcut> {
        let pattern = self.pattern.unwrap_or_default();

        let Some((advice_type, order)) = self.advice else {
            return Err(AopError::InvalidAdviceKind { pattern });
        };

        let (aspect, method, handler) = match (self.closure, self.aspect) {
            (Some((name, id, handler)), _) => {
                (format!("{}#{}", CLOSURE_ASPECT, id), name, handler)
            }
            (None, Some(aspect)) => {
                let method = self
                    .method
                    .unwrap_or_else(|| advice_type.default_handler().to_string());
                let aspect_name = aspect.name().to_string();
                let handler = aspect.handler(&method).ok_or_else(|| AopError::HandlerNotFound {
                    aspect: aspect_name.clone(),
                    method: method.clone(),
                })?;
                (aspect_name, method, handler)
            }
            (None, None) => {
                return Err(AopError::HandlerNotFound {
                    aspect: "<none>".to_string(),
                    method: self
                        .method
                        .unwrap_or_else(|| advice_type.default_handler().to_string()),
                })
            }
        };

        tracing::trace!(
            "Built pointcut '{}' -> {}::{} ({} {})",
            pattern,
            aspect,
            method,
            advice_type,
            order
        );

        Ok(Pointcut {
            aspect,
            method,
            handler,
            advice_type,
            order,
            matcher: SignatureMatcher::new(SignaturePattern::new(pattern))
                .with_caching(self.match_cache),
        })
    }
}
