//! 切面注册表
//!
//! 按目标类型保存切点，并按方法签名缓存拦截器链。
//! 注册新切点会使该类型已缓存的链失效。

use crate::aspect::get_all_aspect_registrations;
use crate::builder::ChainBuilder;
use crate::chain::InterceptorChain;
use crate::config::AopConfig;
use crate::error::AopResult;
use crate::pointcut::{Pointcut, PointcutBuilder};
use crate::signature::MethodSignature;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 全局 AOP 注册表
///
/// 首次访问时按环境变量配置初始化，并加载所有通过 inventory 注册的切面
static GLOBAL_ASPECT_REGISTRY: Lazy<Arc<AspectRegistry>> = Lazy::new(|| {
    let registry = AspectRegistry::with_config(AopConfig::from_env());
    if let Err(e) = registry.auto_load_aspects() {
        tracing::error!("Failed to auto-load aspects: {}", e);
    }
    Arc::new(registry)
});

/// 获取全局 AOP 注册表
///
/// 使用示例：
/// ```ignore
/// use interpose_aop::get_global_registry;
///
/// let user = get_global_registry().intercept(
///     "UserService",
///     "public UserService->find($id)",
///     vec![json!(7)],
///     |args| service.find(args),
/// )?;
/// ```
pub fn get_global_registry() -> &'static Arc<AspectRegistry> {
    &GLOBAL_ASPECT_REGISTRY
}

type ChainCache = HashMap<String, Option<Arc<InterceptorChain>>>;

/// 切面注册表
pub struct AspectRegistry {
    config: AopConfig,
    pointcuts: RwLock<HashMap<String, Vec<Arc<Pointcut>>>>,
    /// 切点集合每次变化时递增，只在持有 pointcuts 写锁时修改
    generation: AtomicU64,
    chains: RwLock<HashMap<String, ChainCache>>,
}

impl AspectRegistry {
    pub fn new() -> Self {
        Self::with_config(AopConfig::default())
    }

    pub fn with_config(config: AopConfig) -> Self {
        Self {
            config,
            pointcuts: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            chains: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &AopConfig {
        &self.config
    }

    /// 按注册表配置预设好的切点构造器
    pub fn pointcut(&self) -> PointcutBuilder {
        Pointcut::builder().match_cache(self.config.match_cache)
    }

    /// 构建并注册切点
    ///
    /// 处理方法找不到时在这里返回 `HandlerNotFound`
    pub fn register(&self, target_type: &str, pointcut: PointcutBuilder) -> AopResult<()> {
        let pointcut = if self.config.match_cache {
            pointcut
        } else {
            pointcut.match_cache(false)
        };
        self.register_pointcut(target_type, Arc::new(pointcut.build()?));
        Ok(())
    }

    /// 注册已构建的切点，可与其他类型共享
    pub fn register_pointcut(&self, target_type: &str, pointcut: Arc<Pointcut>) {
        tracing::debug!(
            "Registering pointcut '{}' ({} {}) on {} -> {}::{}",
            pointcut,
            pointcut.advice_type(),
            pointcut.order(),
            target_type,
            pointcut.aspect_name(),
            pointcut.handler_method()
        );

        {
            let mut pointcuts = self.pointcuts.write();
            pointcuts
                .entry(target_type.to_string())
                .or_default()
                .push(pointcut);
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        self.chains.write().remove(target_type);
    }

    /// 切点快照及其对应的代数
    fn snapshot(&self, target_type: &str) -> (Vec<Arc<Pointcut>>, u64) {
        let pointcuts = self.pointcuts.read();
        let snapshot = pointcuts.get(target_type).cloned().unwrap_or_default();
        (snapshot, self.generation.load(Ordering::Acquire))
    }

    /// 缓存拦截器链；构建期间切点集合发生过变化时放弃缓存
    fn store_chain(
        &self,
        target_type: &str,
        signature: &str,
        generation: u64,
        chain: Option<Arc<InterceptorChain>>,
    ) -> bool {
        let mut chains = self.chains.write();
        if self.generation.load(Ordering::Acquire) != generation {
            tracing::trace!(
                "Pointcuts of {} changed while building {}, not caching",
                target_type,
                signature
            );
            return false;
        }
        chains
            .entry(target_type.to_string())
            .or_default()
            .insert(signature.to_string(), chain);
        true
    }

    /// 指定类型上注册的切点（按注册顺序）
    pub fn pointcuts_for(&self, target_type: &str) -> Vec<Arc<Pointcut>> {
        self.pointcuts
            .read()
            .get(target_type)
            .cloned()
            .unwrap_or_default()
    }

    /// 获取方法的拦截器链
    ///
    /// 类型没有切点、签名格式错误或没有切点匹配时返回 None
    pub fn chain_for(&self, target_type: &str, signature: &str) -> Option<Arc<InterceptorChain>> {
        if self.config.chain_cache {
            if let Some(cached) = self
                .chains
                .read()
                .get(target_type)
                .and_then(|chains| chains.get(signature))
            {
                return cached.clone();
            }
        }

        let (pointcuts, generation) = self.snapshot(target_type);
        if pointcuts.is_empty() {
            return None;
        }

        let parsed = match MethodSignature::parse(signature) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Skipping interception on {}: {}", target_type, e);
                return None;
            }
        };

        let chain = ChainBuilder::build(&pointcuts, parsed).map(Arc::new);
        if self.config.chain_cache {
            self.store_chain(target_type, signature, generation, chain.clone());
        }
        chain
    }

    /// 拦截一次方法调用
    ///
    /// AOP 关闭或没有匹配的切点时直接调用目标方法
    pub fn intercept<F>(
        &self,
        target_type: &str,
        signature: &str,
        args: Vec<Value>,
        target: F,
    ) -> AopResult<Value>
    where
        F: FnOnce(&[Value]) -> AopResult<Value>,
    {
        self.dispatch(target_type, None, signature, args, target)
    }

    /// 拦截对某个目标对象的方法调用，通知可以通过 `JoinPoint::target` 读取它
    pub fn intercept_instance<F>(
        &self,
        target_type: &str,
        instance: &dyn Any,
        signature: &str,
        args: Vec<Value>,
        target: F,
    ) -> AopResult<Value>
    where
        F: FnOnce(&[Value]) -> AopResult<Value>,
    {
        self.dispatch(target_type, Some(instance), signature, args, target)
    }

    fn dispatch<F>(
        &self,
        target_type: &str,
        instance: Option<&dyn Any>,
        signature: &str,
        args: Vec<Value>,
        target: F,
    ) -> AopResult<Value>
    where
        F: FnOnce(&[Value]) -> AopResult<Value>,
    {
        if !self.config.enabled {
            return target(&args);
        }

        match self.chain_for(target_type, signature) {
            Some(chain) => chain.intercept_on(instance, args, target),
            None => target(&args),
        }
    }

    /// 已注册的切点总数
    pub fn len(&self) -> usize {
        self.pointcuts.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 清除所有切点和缓存的链
    pub fn clear(&self) {
        {
            let mut pointcuts = self.pointcuts.write();
            pointcuts.clear();
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        self.chains.write().clear();
    }

    /// 从 inventory 自动加载所有通过 `#[aspect]` 宏注册的切点
    ///
    /// 返回加载的切点数量
    pub fn auto_load_aspects(&self) -> AopResult<usize> {
        let registrations: Vec<_> = get_all_aspect_registrations().collect();
        tracing::info!("Auto-loading {} aspect registration(s)", registrations.len());

        for registration in &registrations {
            tracing::debug!(
                "  ├─ Loading {}::{} on {} with pattern: {}",
                registration.advice_type,
                registration.method,
                registration.target_type,
                registration.pattern
            );
            let pointcut = registration.to_pointcut(self.config.match_cache)?;
            self.register_pointcut(registration.target_type, Arc::new(pointcut));
        }

        Ok(registrations.len())
    }
}

impl Default for AspectRegistry {
    fn default() -> Self {
        Self::new()
    }
}
