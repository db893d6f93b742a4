//! Interpose AOP - 方法拦截与切面编程
//!
//! 按方法签名模式把前置、环绕、后置通知织入方法调用：
//! - 基于正则的签名模式匹配（`<visibility> <owner>-><method>(<args>)`）
//! - 按类型和顺序排列的拦截器链，环绕通知可短路或接力
//! - 声明式切面（`#[aspect]` 宏 + inventory 自动注册）
//! - 全局注册表与单实例代理 `Proxy<T>`
//!
//! ```ignore
//! use interpose_aop::prelude::*;
//!
//! let registry = AspectRegistry::new();
//! registry.register(
//!     "UserService",
//!     registry
//!         .pointcut()
//!         .intercept(".* UserService->find(.*)")
//!         .before(0)
//!         .handler("audit", |jp| {
//!             tracing::info!("finding user {:?}", jp.argument(0));
//!             Ok(Value::Null)
//!         }),
//! )?;
//!
//! let user = registry.intercept("UserService", "public UserService->find($id)", vec![json!(7)], |args| {
//!     service.find(args)
//! })?;
//! ```

pub mod advice;
pub mod aspect;
pub mod builder;
pub mod chain;
pub mod config;
pub mod error;
pub mod error_info;
pub mod joinpoint;
pub mod logging;
pub mod pointcut;
pub mod proxy;
pub mod registry;
pub mod signature;

// 重新导出核心类型
pub use advice::{Advice, AdviceHandler, AdviceIdentity, AdviceSource, AdviceType, TERMINAL_ORDER};
pub use aspect::{
    get_all_aspect_registrations, Aspect, AspectRegistration, ExceptionHandlingAspect, LoggingAspect,
    PerformanceAspect,
};
pub use builder::ChainBuilder;
pub use chain::InterceptorChain;
pub use config::{AopConfig, ConfigFile};
pub use error::{AopError, AopResult, IntoAdviceResult};
pub use error_info::ErrorInfo;
pub use joinpoint::JoinPoint;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use pointcut::{Pointcut, PointcutBuilder, CLOSURE_ASPECT};
pub use proxy::Proxy;
pub use registry::{get_global_registry, AspectRegistry};
pub use signature::{matches, MethodSignature, SignatureMatcher, SignaturePattern};

// 导出供宏使用
pub use inventory;
pub use serde_json;

/// 预导入模块
pub mod prelude {
    pub use crate::advice::{AdviceHandler, AdviceType};
    pub use crate::aspect::{Aspect, AspectRegistration};
    pub use crate::error::{AopError, AopResult, IntoAdviceResult};
    pub use crate::intercept;
    pub use crate::joinpoint::JoinPoint;
    pub use crate::pointcut::Pointcut;
    pub use crate::proxy::Proxy;
    pub use crate::registry::{get_global_registry, AspectRegistry};
    pub use crate::signature::MethodSignature;
    pub use serde_json::{json, Value};
}

/// 通过全局注册表拦截一次方法调用
///
/// 参数用 `serde_json::json!` 转换，`$body` 是接收 `&[Value]` 的真实方法调用。
///
/// ```ignore
/// use interpose_aop::intercept;
///
/// pub fn find(&self, id: u32) -> AopResult<Value> {
///     intercept!("UserService", "public UserService->find($id)", [id], |args| {
///         Ok(self.repository.load(args[0].as_u64()))
///     })
/// }
/// ```
#[macro_export]
macro_rules! intercept {
    ($target:expr, $signature:expr, [$($arg:expr),* $(,)?], $body:expr) => {
        $crate::get_global_registry().intercept(
            $target,
            $signature,
            ::std::vec![$($crate::serde_json::json!($arg)),*],
            $body,
        )
    };
}
