//! AOP 配置
//!
//! 三种来源彼此独立，不做合并：
//! 显式构造（`AopConfig::new()` 加构造方法）、环境变量 `INTERPOSE_AOP_*`（`AopConfig::from_env`）、
//! 配置文件 TOML（`ConfigFile`）。每种来源中未给出的字段都取默认值。
//! 全局注册表使用 `from_env`；需要配置文件时用 `AspectRegistry::with_config(file.aop)`。

use crate::logging::LoggingConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "INTERPOSE_AOP_";

/// AOP 运行时开关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AopConfig {
    /// 关闭后注册表直接调用目标方法，不构建拦截器链
    pub enabled: bool,

    /// 切点是否缓存签名匹配结果
    pub match_cache: bool,

    /// 注册表是否按签名缓存拦截器链
    pub chain_cache: bool,
}

impl Default for AopConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            match_cache: true,
            chain_cache: true,
        }
    }
}

impl AopConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn match_cache(mut self, enabled: bool) -> Self {
        self.match_cache = enabled;
        self
    }

    pub fn chain_cache(mut self, enabled: bool) -> Self {
        self.chain_cache = enabled;
        self
    }

    /// 从环境变量读取：INTERPOSE_AOP_ENABLED、INTERPOSE_AOP_MATCH_CACHE、INTERPOSE_AOP_CHAIN_CACHE
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |name: &str, default: bool| {
            let key = format!("{}{}", ENV_PREFIX, name);
            match lookup(&key) {
                Some(value) => parse_bool(&value).unwrap_or_else(|| {
                    tracing::warn!("Ignoring invalid boolean '{}' for {}", value, key);
                    default
                }),
                None => default,
            }
        };

        let defaults = Self::default();
        Self {
            enabled: flag("ENABLED", defaults.enabled),
            match_cache: flag("MATCH_CACHE", defaults.match_cache),
            chain_cache: flag("CHAIN_CACHE", defaults.chain_cache),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// 配置文件
///
/// ```toml
/// [aop]
/// enabled = true
/// chain_cache = false
///
/// [logging]
/// level = "debug"
/// format = "json"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub aop: AopConfig,
    pub logging: LoggingConfig,
}

impl ConfigFile {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse AOP configuration")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        tracing::debug!("Loading AOP configuration from {}", path.display());
        Self::parse(&content)
    }
}
