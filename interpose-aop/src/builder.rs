//! 通知链构建
//!
//! 从某个目标类型注册的切点中筛选出匹配方法签名的切点，
//! 按 Before < Around < After 分组、组内按 order 升序（相同 order 保持注册顺序），
//! 没有环绕通知时补一个终止通知，最后按 (类型, 切面, 处理方法) 去重。

use crate::advice::{Advice, AdviceType};
use crate::chain::InterceptorChain;
use crate::pointcut::Pointcut;
use crate::signature::MethodSignature;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// 通知链构建器
pub struct ChainBuilder;

impl ChainBuilder {
    /// 构建有序通知列表，没有任何切点匹配时返回空列表
    pub fn build_advice(pointcuts: &[Arc<Pointcut>], signature: &MethodSignature) -> Vec<Advice> {
        let mut buckets: BTreeMap<AdviceType, Vec<Advice>> = BTreeMap::new();

        for pointcut in pointcuts.iter().filter(|p| p.matches(signature)) {
            buckets
                .entry(pointcut.advice_type())
                .or_default()
                .push(Advice::from_pointcut(pointcut));
        }

        if buckets.is_empty() {
            return Vec::new();
        }

        // sort_by_key 是稳定排序
        for bucket in buckets.values_mut() {
            bucket.sort_by_key(Advice::order);
        }

        if !buckets.contains_key(&AdviceType::Around) {
            tracing::trace!("No around advice matched {}, adding terminal advice", signature);
            buckets.insert(AdviceType::Around, vec![Advice::terminal()]);
        }

        let mut seen = HashSet::new();
        buckets
            .into_values()
            .flatten()
            .filter(|advice| seen.insert(advice.identity()))
            .collect()
    }

    /// 构建拦截器链，没有任何切点匹配时返回 None，调用方应直接执行目标方法
    pub fn build(pointcuts: &[Arc<Pointcut>], signature: MethodSignature) -> Option<InterceptorChain> {
        let advice = Self::build_advice(pointcuts, &signature);
        if advice.is_empty() {
            tracing::trace!("No pointcut matches {}", signature);
            return None;
        }

        tracing::debug!(
            "Built advice chain for {}: [{}]",
            signature,
            advice
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );

        Some(InterceptorChain::new(signature, advice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::AdviceHandler;
    use crate::aspect::Aspect;
    use serde_json::Value;

    const SIGNATURE: &str = "public TestAspectable->append($arg1)";

    fn signature() -> MethodSignature {
        MethodSignature::parse(SIGNATURE).unwrap()
    }

    fn pointcut(pattern: &str, advice_type: AdviceType, order: i32, method: &str) -> Arc<Pointcut> {
        Arc::new(
            Pointcut::builder()
                .intercept(pattern)
                .advice(advice_type, order)
                .handler(method, |_| Ok(Value::Null))
                .build()
                .unwrap(),
        )
    }

    struct Audit;

    impl Aspect for Audit {
        fn handler(self: Arc<Self>, method: &str) -> Option<AdviceHandler> {
            (method == "log").then(|| AdviceHandler::new(|_| Ok(Value::Null)))
        }
    }

    fn audit_pointcut(order: i32) -> Arc<Pointcut> {
        Arc::new(
            Pointcut::builder()
                .aspect(Arc::new(Audit))
                .intercept(".* .*->.*(.*)")
                .before(order)
                .with_method("log")
                .build()
                .unwrap(),
        )
    }

    fn names(advice: &[Advice]) -> Vec<String> {
        advice
            .iter()
            .map(|a| {
                let identity = a.identity();
                format!("{}/{}::{}", a.order(), identity.advice_type, identity.method)
            })
            .collect()
    }

    #[test]
    fn test_no_match_builds_nothing() {
        let pointcuts = vec![pointcut(".* .*->get.*(.*)", AdviceType::Before, 0, "log")];
        assert!(ChainBuilder::build_advice(&pointcuts, &signature()).is_empty());
        assert!(ChainBuilder::build(&pointcuts, signature()).is_none());
    }

    #[test]
    fn test_no_pointcuts_builds_nothing() {
        assert!(ChainBuilder::build(&[], signature()).is_none());
    }

    #[test]
    fn test_groups_by_type_then_order() {
        let pointcuts = vec![
            pointcut(".* .*->app.*(.*)", AdviceType::After, 2, "after_b"),
            pointcut(".* .*->app.*(.*)", AdviceType::Around, 5, "around_b"),
            pointcut(".* .*->app.*(.*)", AdviceType::Before, 9, "before_b"),
            pointcut(".* .*->app.*(.*)", AdviceType::After, 1, "after_a"),
            pointcut(".* .*->app.*(.*)", AdviceType::Around, -3, "around_a"),
            pointcut(".* .*->app.*(.*)", AdviceType::Before, 0, "before_a"),
        ];

        let advice = ChainBuilder::build_advice(&pointcuts, &signature());
        assert_eq!(
            names(&advice),
            vec![
                "0/before::before_a",
                "9/before::before_b",
                "-3/around::around_a",
                "5/around::around_b",
                "1/after::after_a",
                "2/after::after_b",
            ]
        );
    }

    #[test]
    fn test_equal_order_keeps_registration_order() {
        let pointcuts = vec![
            pointcut(".* .*->.*(.*)", AdviceType::Before, 1, "second_registered_first"),
            pointcut(".* .*->.*(.*)", AdviceType::Before, 1, "registered_second"),
            pointcut(".* .*->.*(.*)", AdviceType::Before, 0, "lowest"),
        ];

        let advice = ChainBuilder::build_advice(&pointcuts, &signature());
        let methods: Vec<_> = advice
            .iter()
            .filter_map(|a| a.pointcut().map(|p| p.handler_method().to_string()))
            .collect();
        assert_eq!(methods, vec!["lowest", "second_registered_first", "registered_second"]);
    }

    #[test]
    fn test_terminal_added_without_around() {
        let pointcuts = vec![
            pointcut(".* .*->.*(.*)", AdviceType::After, 0, "after"),
            pointcut(".* .*->.*(.*)", AdviceType::Before, 0, "before"),
        ];

        let advice = ChainBuilder::build_advice(&pointcuts, &signature());
        assert_eq!(advice.len(), 3);
        assert_eq!(advice[0].advice_type(), AdviceType::Before);
        assert!(advice[1].is_terminal());
        assert_eq!(advice[2].advice_type(), AdviceType::After);
    }

    #[test]
    fn test_no_terminal_with_explicit_around() {
        let pointcuts = vec![pointcut(".* .*->.*(.*)", AdviceType::Around, 0, "around")];

        let advice = ChainBuilder::build_advice(&pointcuts, &signature());
        assert_eq!(advice.len(), 1);
        assert!(!advice[0].is_terminal());
    }

    #[test]
    fn test_duplicate_pointcut_is_deduplicated() {
        let shared = pointcut(".* .*->.*(.*)", AdviceType::Before, 0, "log");
        let pointcuts = vec![Arc::clone(&shared), shared];

        let advice = ChainBuilder::build_advice(&pointcuts, &signature());
        // 一个前置通知 + 终止通知
        assert_eq!(advice.len(), 2);
    }

    #[test]
    fn test_same_handler_different_order_keeps_first() {
        let pointcuts = vec![audit_pointcut(5), audit_pointcut(1)];

        let advice = ChainBuilder::build_advice(&pointcuts, &signature());
        assert_eq!(advice.len(), 2);
        assert_eq!(advice[0].order(), 1);
    }

    #[test]
    fn test_distinct_closures_with_same_name_are_kept() {
        let pointcuts = vec![
            pointcut(".* .*->.*(.*)", AdviceType::Before, 0, "log"),
            pointcut(".* .*->.*(.*)", AdviceType::Before, 0, "log"),
        ];

        let advice = ChainBuilder::build_advice(&pointcuts, &signature());
        // 两个前置通知 + 终止通知
        assert_eq!(advice.len(), 3);
        assert_eq!(names(&advice[..2]), vec!["0/before::log", "0/before::log"]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let pointcuts = vec![
            pointcut(".* .*->.*(.*)", AdviceType::After, 0, "a"),
            pointcut(".* .*->.*(.*)", AdviceType::Before, 0, "b"),
            pointcut(".* .*->.*(.*)", AdviceType::Before, 0, "c"),
            pointcut(".* .*->.*(.*)", AdviceType::Around, 0, "d"),
        ];

        let first = names(&ChainBuilder::build_advice(&pointcuts, &signature()));
        let second = names(&ChainBuilder::build_advice(&pointcuts, &signature()));
        assert_eq!(first, second);
    }
}
