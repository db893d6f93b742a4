//! 方法签名与签名匹配
//!
//! 方法签名的规范文本形式为 `<visibility> <owner>-><method>(<args>)`，
//! 例如 `public UserService->find_user($id)`。
//!
//! 切点模式与签名形状相同，但每个字段都是正则表达式，例如
//! `.* .*->find.*(.*)`。匹配时逐字段锚定比较（`^(?:字段)$`），四个字段都匹配才算命中。

use crate::error::{AopError, AopResult};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

/// 签名分解用的正则（贪婪匹配）
static SIGNATURE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<visibility>.*) (?P<owner>.*)->(?P<method>.*)\((?P<args>.*)\)$")
        .expect("signature shape regex is valid")
});

/// 签名字段名，按匹配顺序排列
const FIELDS: [&str; 4] = ["visibility", "owner", "method", "args"];

/// 把签名形状的文本分解为四个字段
fn decompose(text: &str) -> AopResult<[String; 4]> {
    let captures = SIGNATURE_SHAPE
        .captures(text)
        .ok_or_else(|| AopError::MalformedSignature(text.to_string()))?;

    Ok(FIELDS.map(|name| {
        captures
            .name(name)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }))
}

/// 方法签名
///
/// 一旦解析完成即不可变
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    text: String,
    visibility: String,
    owner: String,
    method: String,
    args: String,
}

impl MethodSignature {
    /// 解析签名文本
    pub fn parse(text: impl Into<String>) -> AopResult<Self> {
        let text = text.into();
        let [visibility, owner, method, args] = decompose(&text)?;
        Ok(Self {
            text,
            visibility,
            owner,
            method,
            args,
        })
    }

    /// 从组成部分构造规范签名
    pub fn builder(owner: impl Into<String>, method: impl Into<String>) -> SignatureBuilder {
        SignatureBuilder {
            modifiers: Vec::new(),
            owner: owner.into(),
            method: method.into(),
            args: Vec::new(),
        }
    }

    /// 签名原文
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn visibility(&self) -> &str {
        &self.visibility
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn args(&self) -> &str {
        &self.args
    }

    /// 按匹配顺序返回四个字段
    pub fn fields(&self) -> [&str; 4] {
        [&self.visibility, &self.owner, &self.method, &self.args]
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// 签名构造器
///
/// 修饰符以空格连接，参数以 `, ` 连接
#[derive(Debug, Clone)]
pub struct SignatureBuilder {
    modifiers: Vec<String>,
    owner: String,
    method: String,
    args: Vec<String>,
}

impl SignatureBuilder {
    /// 追加修饰符，例如 `public`、`static`
    pub fn modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifiers.push(modifier.into());
        self
    }

    /// 追加参数描述，例如 `$name` 或 `array $items`
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn build(self) -> AopResult<MethodSignature> {
        MethodSignature::parse(format!(
            "{} {}->{}({})",
            self.modifiers.join(" "),
            self.owner,
            self.method,
            self.args.join(", ")
        ))
    }
}

/// 签名模式
///
/// 创建时即编译四个字段；不符合签名形状或字段不是合法正则的模式永远不匹配
#[derive(Debug, Clone)]
pub struct SignaturePattern {
    text: String,
    fields: Option<[Regex; 4]>,
}

impl SignaturePattern {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let fields = Self::compile(&text);
        if fields.is_none() {
            tracing::warn!("Pointcut pattern '{}' is not signature-shaped, it will never match", text);
        }
        Self { text, fields }
    }

    fn compile(text: &str) -> Option<[Regex; 4]> {
        let [visibility, owner, method, args] = decompose(text).ok()?;
        let anchored = |field: &str| Regex::new(&format!("^(?:{})$", field)).ok();
        Some([
            anchored(&visibility)?,
            anchored(&owner)?,
            anchored(&method)?,
            anchored(&args)?,
        ])
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// 模式是否可用于匹配
    pub fn is_valid(&self) -> bool {
        self.fields.is_some()
    }

    /// 逐字段匹配已解析的签名
    pub fn matches(&self, signature: &MethodSignature) -> bool {
        match &self.fields {
            Some(fields) => fields
                .iter()
                .zip(signature.fields())
                .all(|(pattern, field)| pattern.is_match(field)),
            None => false,
        }
    }

    /// 匹配签名文本，签名无法解析时视为不匹配
    pub fn matches_str(&self, signature: &str) -> bool {
        MethodSignature::parse(signature)
            .map(|signature| self.matches(&signature))
            .unwrap_or(false)
    }
}

impl fmt::Display for SignaturePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// 不带缓存的一次性匹配
pub fn matches(pattern: &str, signature: &str) -> bool {
    SignaturePattern::new(pattern).matches_str(signature)
}

/// 带结果缓存的签名匹配器
///
/// 每个切点持有一个；模式固定，因此缓存以签名文本为键。
/// 缓存只是记忆化，关闭后结果不变。
#[derive(Debug)]
pub struct SignatureMatcher {
    pattern: SignaturePattern,
    cache: RwLock<HashMap<String, bool>>,
    caching: bool,
}

impl SignatureMatcher {
    pub fn new(pattern: SignaturePattern) -> Self {
        Self {
            pattern,
            cache: RwLock::new(HashMap::new()),
            caching: true,
        }
    }

    /// 设置是否缓存匹配结果
    pub fn with_caching(mut self, caching: bool) -> Self {
        self.caching = caching;
        self
    }

    pub fn pattern(&self) -> &SignaturePattern {
        &self.pattern
    }

    pub fn matches(&self, signature: &MethodSignature) -> bool {
        if !self.caching {
            return self.pattern.matches(signature);
        }

        if let Some(hit) = self.cache.read().get(signature.as_str()) {
            return *hit;
        }

        let matched = self.pattern.matches(signature);
        self.cache
            .write()
            .insert(signature.as_str().to_string(), matched);
        matched
    }

    /// 已缓存的结果数量
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signature() {
        let sig = MethodSignature::parse("public static UserService->find_user($id, $name)").unwrap();
        assert_eq!(sig.visibility(), "public static");
        assert_eq!(sig.owner(), "UserService");
        assert_eq!(sig.method(), "find_user");
        assert_eq!(sig.args(), "$id, $name");
        assert_eq!(sig.to_string(), "public static UserService->find_user($id, $name)");
    }

    #[test]
    fn test_parse_malformed() {
        for text in ["", "find_user", "public UserService.find_user()", "public UserService->find_user"] {
            let err = MethodSignature::parse(text).unwrap_err();
            assert!(matches!(err, AopError::MalformedSignature(_)), "{}", text);
        }
    }

    #[test]
    fn test_builder() {
        let sig = MethodSignature::builder("TestAspectable", "append")
            .modifier("public")
            .arg("$arg1")
            .arg("array $items")
            .build()
            .unwrap();
        assert_eq!(sig.as_str(), "public TestAspectable->append($arg1, array $items)");

        let bare = MethodSignature::builder("Foo", "bar").build().unwrap();
        assert_eq!(bare.visibility(), "");
        assert_eq!(bare.args(), "");
    }

    #[test]
    fn test_wildcard_pattern() {
        assert!(matches(".* .*->app.*(.*)", "public TestAspectable->append($arg1)"));
        assert!(!matches(".* .*->app.*(.*)", "public TestAspectable->getName()"));
    }

    #[test]
    fn test_fields_are_anchored() {
        // method 字段 "app" 不能命中 "append"
        assert!(!matches(".* .*->app(.*)", "public TestAspectable->append($arg1)"));
        // 备选分支也整体锚定
        assert!(matches(".* .*->get|set(.*)", "public Foo->set($v)"));
        assert!(!matches(".* .*->get|set(.*)", "public Foo->getter()"));
    }

    #[test]
    fn test_every_field_must_match() {
        let sig = "protected Repo->save($entity)";
        assert!(matches("protected Repo->save(.*)", sig));
        assert!(!matches("public Repo->save(.*)", sig));
        assert!(!matches("protected Other->save(.*)", sig));
        assert!(!matches("protected Repo->save()", sig));
    }

    #[test]
    fn test_malformed_pattern_never_matches() {
        let pattern = SignaturePattern::new("save");
        assert!(!pattern.is_valid());
        assert!(!pattern.matches_str("public Repo->save()"));

        let bad_regex = SignaturePattern::new(".* .*->sa[ve(.*)");
        assert!(!bad_regex.is_valid());
        assert!(!bad_regex.matches_str("public Repo->save()"));
    }

    #[test]
    fn test_malformed_signature_is_not_a_match() {
        assert!(!matches(".* .*->.*(.*)", "not a signature"));
    }

    #[test]
    fn test_matcher_cache() {
        let matcher = SignatureMatcher::new(SignaturePattern::new(".* .*->find.*(.*)"));
        let hit = MethodSignature::parse("public Repo->find_all()").unwrap();
        let miss = MethodSignature::parse("public Repo->save($e)").unwrap();

        assert!(matcher.matches(&hit));
        assert!(matcher.matches(&hit));
        assert!(!matcher.matches(&miss));
        assert_eq!(matcher.cached(), 2);
    }

    #[test]
    fn test_matcher_without_cache() {
        let matcher = SignatureMatcher::new(SignaturePattern::new(".* .*->find.*(.*)"))
            .with_caching(false);
        let hit = MethodSignature::parse("public Repo->find_all()").unwrap();

        assert!(matcher.matches(&hit));
        assert_eq!(matcher.cached(), 0);
    }
}
