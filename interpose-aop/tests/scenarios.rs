//! 通过 AspectRegistry 拦截调用的场景测试

use interpose_aop::prelude::*;
use interpose_aop::{AopConfig, ConfigFile, LoggingAspect, PerformanceAspect};
use parking_lot::Mutex;
use std::sync::Arc;

const TARGET: &str = "OrderService";
const PLACE: &str = "public OrderService->place($order, $qty)";

type Journal = Arc<Mutex<Vec<String>>>;

fn record(journal: &Journal, entry: &str) {
    journal.lock().push(entry.to_string());
}

fn real_place(journal: &Journal) -> impl FnOnce(&[Value]) -> AopResult<Value> + '_ {
    move |args| {
        record(journal, "X");
        Ok(json!({ "order": args[0], "qty": args[1] }))
    }
}

fn register_recorder(registry: &AspectRegistry, journal: &Journal, kind: AdviceType, order: i32, entry: &'static str) {
    let journal = Arc::clone(journal);
    registry
        .register(
            TARGET,
            registry
                .pointcut()
                .intercept(".* OrderService->place(.*)")
                .advice(kind, order)
                .handler(entry, move |_| {
                    record(&journal, entry);
                    Ok(Value::Null)
                }),
        )
        .unwrap();
}

#[test]
fn test_before_and_after_wrap_target() {
    let registry = AspectRegistry::new();
    let journal = Journal::default();
    register_recorder(&registry, &journal, AdviceType::Before, 0, "A");
    register_recorder(&registry, &journal, AdviceType::After, 0, "B");

    let result = registry
        .intercept(TARGET, PLACE, vec![json!(17), json!(2)], real_place(&journal))
        .unwrap();

    assert_eq!(*journal.lock(), vec!["A", "X", "B"]);
    assert_eq!(result, json!({ "order": 17, "qty": 2 }));
}

#[test]
fn test_closures_sharing_a_name_all_run() {
    let registry = AspectRegistry::new();
    let journal = Journal::default();
    let other = Journal::default();
    register_recorder(&registry, &journal, AdviceType::Before, 0, "log");
    register_recorder(&registry, &other, AdviceType::Before, 0, "log");

    registry
        .intercept(TARGET, PLACE, vec![json!(1), json!(1)], real_place(&journal))
        .unwrap();

    assert_eq!(*journal.lock(), vec!["log", "X"]);
    assert_eq!(*other.lock(), vec!["log"]);
}

#[test]
fn test_around_observes_result() {
    let registry = AspectRegistry::new();
    let journal = Journal::default();
    let observed = Arc::clone(&journal);
    registry
        .register(
            TARGET,
            registry
                .pointcut()
                .intercept(".* OrderService->.*(.*)")
                .around(0)
                .handler("observe", move |jp| {
                    let result = jp.proceed()?;
                    record(&observed, &format!("result={}", result["order"]));
                    Ok(result)
                }),
        )
        .unwrap();

    let result = registry
        .intercept(TARGET, PLACE, vec![json!(5), json!(1)], real_place(&journal))
        .unwrap();

    assert_eq!(result, json!({ "order": 5, "qty": 1 }));
    assert_eq!(*journal.lock(), vec!["X", "result=5"]);
}

#[test]
fn test_around_short_circuit() {
    let registry = AspectRegistry::new();
    let journal = Journal::default();
    register_recorder(&registry, &journal, AdviceType::After, 0, "B");
    registry
        .register(
            TARGET,
            registry
                .pointcut()
                .intercept(".* OrderService->place(.*)")
                .around(0)
                .handler("reject", |_| Ok(json!("rejected"))),
        )
        .unwrap();

    let result = registry
        .intercept(TARGET, PLACE, vec![json!(1), json!(1)], real_place(&journal))
        .unwrap();

    assert_eq!(result, json!("rejected"));
    assert!(journal.lock().is_empty());
}

#[test]
fn test_nothing_matches() {
    let registry = AspectRegistry::new();
    let journal = Journal::default();
    register_recorder(&registry, &journal, AdviceType::Before, 0, "A");

    let result = registry
        .intercept(
            TARGET,
            "public OrderService->cancel($order)",
            vec![json!(3), json!(0)],
            real_place(&journal),
        )
        .unwrap();

    assert_eq!(result, json!({ "order": 3, "qty": 0 }));
    assert_eq!(*journal.lock(), vec!["X"]);
}

#[test]
fn test_execution_order_across_kinds() {
    let registry = AspectRegistry::new();
    let journal = Journal::default();
    register_recorder(&registry, &journal, AdviceType::After, 2, "after-2");
    register_recorder(&registry, &journal, AdviceType::Before, 5, "before-5");
    register_recorder(&registry, &journal, AdviceType::After, -1, "after--1");
    register_recorder(&registry, &journal, AdviceType::Before, 1, "before-1");

    let around = Arc::clone(&journal);
    registry
        .register(
            TARGET,
            registry
                .pointcut()
                .intercept(".* OrderService->place(.*)")
                .around(0)
                .handler("around", move |jp| {
                    record(&around, "around");
                    jp.proceed()
                }),
        )
        .unwrap();

    registry
        .intercept(TARGET, PLACE, vec![json!(1), json!(1)], real_place(&journal))
        .unwrap();

    assert_eq!(
        *journal.lock(),
        vec!["before-1", "before-5", "around", "X", "after--1", "after-2"]
    );
}

#[test]
fn test_predefined_aspects() {
    let registry = AspectRegistry::new();
    registry
        .register(
            TARGET,
            registry
                .pointcut()
                .aspect(Arc::new(LoggingAspect::new().with_args().with_result()))
                .intercept(".* OrderService->.*(.*)")
                .before(0),
        )
        .unwrap();
    registry
        .register(
            TARGET,
            registry
                .pointcut()
                .aspect(Arc::new(PerformanceAspect::new(1_000)))
                .intercept(".* OrderService->.*(.*)")
                .around(0),
        )
        .unwrap();

    let journal = Journal::default();
    let result = registry
        .intercept(TARGET, PLACE, vec![json!(9), json!(4)], real_place(&journal))
        .unwrap();

    assert_eq!(result, json!({ "order": 9, "qty": 4 }));
    assert_eq!(*journal.lock(), vec!["X"]);
}

#[test]
fn test_registry_from_config_file() {
    let file = ConfigFile::parse("[aop]\nenabled = false\n").unwrap();
    let registry = AspectRegistry::with_config(file.aop);
    let journal = Journal::default();
    register_recorder(&registry, &journal, AdviceType::Before, 0, "A");

    registry
        .intercept(TARGET, PLACE, vec![json!(1), json!(1)], real_place(&journal))
        .unwrap();

    assert_eq!(*registry.config(), AopConfig::new().enabled(false));
    assert_eq!(*journal.lock(), vec!["X"]);
}

#[test]
fn test_concurrent_calls_share_chain() {
    let registry = Arc::new(AspectRegistry::new());
    let journal = Journal::default();
    register_recorder(&registry, &journal, AdviceType::Before, 0, "A");

    std::thread::scope(|scope| {
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            let journal = Arc::clone(&journal);
            scope.spawn(move || {
                for i in 0..25 {
                    let result = registry
                        .intercept(TARGET, PLACE, vec![json!(i), json!(1)], real_place(&journal))
                        .unwrap();
                    assert_eq!(result["order"], json!(i));
                }
            });
        }
    });

    let entries = journal.lock();
    assert_eq!(entries.iter().filter(|e| *e == "A").count(), 200);
    assert_eq!(entries.iter().filter(|e| *e == "X").count(), 200);
}
