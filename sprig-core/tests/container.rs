//! Container lookup, scopes, dependency wiring, validation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use sprig_core::{
    ArgumentError, BeanDescription, BeanType, Container, ContainerError, ContainerSettings,
    Dependency, TypeRegistry, WiringTable,
};

trait TestBeanInterface: Send + Sync {
    fn label(&self) -> String;
}

#[derive(Debug, Default)]
struct TestBean;

impl TestBeanInterface for TestBean {
    fn label(&self) -> String {
        "test-bean".into()
    }
}

struct TestBeanWithConstructor {
    test_bean: Arc<dyn TestBeanInterface>,
}

impl TestBeanInterface for TestBeanWithConstructor {
    fn label(&self) -> String {
        format!("wraps {}", self.test_bean.label())
    }
}

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register(
            BeanType::of::<TestBean>()
                .default_constructor()
                .expose(|b| Arc::new(b) as Arc<dyn TestBeanInterface>),
        )
        .unwrap()
        .register(
            BeanType::of::<TestBeanWithConstructor>()
                .constructor([Dependency::of::<dyn TestBeanInterface>()], |args| {
                    Ok::<_, ArgumentError>(TestBeanWithConstructor {
                        test_bean: args.next()?,
                    })
                })
                .expose(|b| Arc::new(b) as Arc<dyn TestBeanInterface>),
        )
        .unwrap();
    registry
}

fn container(descriptions: Vec<BeanDescription>) -> Container {
    Container::new(registry(), descriptions).unwrap()
}

#[test]
fn empty_container_has_no_beans() {
    let container = Container::empty();
    let err = container.get_bean("abc").unwrap_err();
    assert!(matches!(err, ContainerError::NoSuchBean(ref name) if name == "abc"));
    assert!(container.bean_names().is_empty());
}

#[test]
fn empty_description_list_is_valid() {
    let container = container(Vec::new());
    assert!(container.bean_names().is_empty());
    assert!(container.get_bean("FirstBean").unwrap_err().is_not_found());
}

#[test]
fn names_keep_declared_order() {
    let container = container(vec![
        BeanDescription::singleton("FirstBean", "TestBean"),
        BeanDescription::singleton("SecondBean", "TestBean"),
        BeanDescription::singleton("ThirdBean", "TestBean"),
    ]);
    assert_eq!(container.bean_names(), ["FirstBean", "SecondBean", "ThirdBean"]);
}

#[test]
fn singleton_is_identity_stable() {
    let container = container(vec![BeanDescription::singleton("FirstBean", "TestBean")]);
    let bean1 = container.get_bean("FirstBean").unwrap();
    let bean2 = container.get_bean("FirstBean").unwrap();
    assert!(bean1.ptr_eq(&bean2));

    let typed1 = container.get::<Arc<dyn TestBeanInterface>>("FirstBean").unwrap();
    let typed2 = container.get::<Arc<dyn TestBeanInterface>>("FirstBean").unwrap();
    assert!(Arc::ptr_eq(&typed1, &typed2));
    assert_eq!(typed1.label(), "test-bean");
    assert_eq!(container.singleton_count(), 1);
}

#[test]
fn prototype_builds_fresh_instances() {
    let container = container(vec![BeanDescription::prototype("FirstBean", "TestBean")]);
    let bean1 = container.get_bean("FirstBean").unwrap();
    let bean2 = container.get_bean("FirstBean").unwrap();
    assert!(!bean1.ptr_eq(&bean2));
    assert!(!container.is_instantiated("FirstBean"));
    assert_eq!(container.singleton_count(), 0);
}

#[test]
fn same_type_under_two_names_gives_two_instances() {
    let container = container(vec![
        BeanDescription::singleton("FirstBean", "TestBean"),
        BeanDescription::singleton("SecondBean", "TestBean"),
    ]);
    let bean1 = container.get_bean("FirstBean").unwrap();
    let bean2 = container.get_bean("SecondBean").unwrap();
    assert!(!bean1.ptr_eq(&bean2));
}

#[test]
fn constructor_dependency_resolved_by_type_name() {
    let container = container(vec![
        BeanDescription::singleton("testBeanInterface", "TestBean"),
        BeanDescription::singleton("testBeanWithConstructor", "TestBeanWithConstructor"),
    ]);
    let bean = container
        .get::<Arc<dyn TestBeanInterface>>("testBeanWithConstructor")
        .unwrap();
    assert_eq!(bean.label(), "wraps test-bean");
    // the dependency went through get_bean and is now a cached singleton
    assert!(container.is_instantiated("testBeanInterface"));
}

#[test]
fn missing_dependency_is_not_found_with_context() {
    let container = container(vec![BeanDescription::singleton(
        "testBeanWithConstructor",
        "TestBeanWithConstructor",
    )]);
    let err = container.get_bean("testBeanWithConstructor").unwrap_err();
    assert!(err.is_not_found());
    match &err {
        ContainerError::Dependency {
            bean, dependency, ..
        } => {
            assert_eq!(bean, "testBeanWithConstructor");
            assert_eq!(dependency, "testBeanInterface");
        }
        other => panic!("expected dependency error, got {other:?}"),
    }
    assert!(matches!(err.root(), ContainerError::NoSuchBean(name) if name == "testBeanInterface"));
    assert!(!container.is_instantiated("testBeanWithConstructor"));
}

#[test]
fn wiring_table_overrides_convention() {
    let container = Container::builder(registry())
        .bean(BeanDescription::singleton("plainBean", "TestBean"))
        .bean(BeanDescription::singleton("wrapper", "TestBeanWithConstructor"))
        .naming(WiringTable::new().wire("TestBeanInterface", "plainBean"))
        .build()
        .unwrap();
    let bean = container.get::<Arc<dyn TestBeanInterface>>("wrapper").unwrap();
    assert_eq!(bean.label(), "wraps test-bean");
}

struct LegacyClient {
    backend: Arc<dyn TestBeanInterface>,
}

#[test]
fn types_and_dependencies_can_be_named_explicitly() {
    let mut registry = TypeRegistry::new();
    registry
        .register(
            BeanType::named::<TestBean>("LegacyBackend")
                .default_constructor()
                .expose(|b| Arc::new(b) as Arc<dyn TestBeanInterface>),
        )
        .unwrap()
        .register(
            BeanType::of::<LegacyClient>()
                .constructor([Dependency::named("LegacyBackend")], |args| {
                    assert_eq!(args.remaining(), 1);
                    let backend = args.next()?;
                    assert_eq!(args.remaining(), 0);
                    Ok::<_, ArgumentError>(LegacyClient { backend })
                }),
        )
        .unwrap();
    assert!(registry.contains("LegacyBackend"));
    assert!(!registry.contains("TestBean"));

    let container = Container::new(
        registry,
        vec![
            BeanDescription::singleton("legacyBackend", "LegacyBackend"),
            BeanDescription::singleton("client", "LegacyClient"),
        ],
    )
    .unwrap();
    assert!(container.contains_bean("legacyBackend"));
    assert!(!container.contains_bean("testBean"));

    let client = container.get::<Arc<LegacyClient>>("client").unwrap();
    assert_eq!(client.backend.label(), "test-bean");
}

#[test]
fn typed_lookup_with_wrong_type_fails() {
    let container = container(vec![BeanDescription::singleton("FirstBean", "TestBean")]);
    let err = container.get::<Arc<TestBean>>("FirstBean").unwrap_err();
    assert!(matches!(err, ContainerError::TypeMismatch { ref name, .. } if name == "FirstBean"));
}

#[test]
fn default_publish_is_arc_of_type() {
    let mut registry = TypeRegistry::new();
    registry
        .register(BeanType::of::<TestBean>().default_constructor())
        .unwrap();
    let container = Container::new(
        registry,
        vec![BeanDescription::singleton("plain", "TestBean")],
    )
    .unwrap();
    let bean = container.get::<Arc<TestBean>>("plain").unwrap();
    assert_eq!(bean.label(), "test-bean");
}

#[test]
fn duplicate_names_are_rejected() {
    let err = Container::new(
        registry(),
        vec![
            BeanDescription::singleton("FirstBean", "TestBean"),
            BeanDescription::prototype("FirstBean", "TestBean"),
        ],
    )
    .err()
    .unwrap();
    assert!(matches!(err, ContainerError::DuplicateName(ref name) if name == "FirstBean"));
}

#[test]
fn unknown_type_and_empty_name_are_rejected() {
    let err = Container::new(registry(), vec![BeanDescription::singleton("a", "Nope")])
        .err()
        .unwrap();
    assert!(matches!(err, ContainerError::UnknownType { ref type_name, .. } if type_name == "Nope"));

    let err = Container::new(registry(), vec![BeanDescription::singleton("", "TestBean")])
        .err()
        .unwrap();
    assert!(matches!(err, ContainerError::EmptyName));
}

struct Flaky;

#[test]
fn failed_construction_is_not_cached_and_retried() {
    static ATTEMPTS: AtomicUsize = AtomicUsize::new(0);
    let mut registry = TypeRegistry::new();
    registry
        .register(BeanType::of::<Flaky>().constructor(Vec::new(), |_| {
            if ATTEMPTS.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("first attempt fails")
            } else {
                Ok(Flaky)
            }
        }))
        .unwrap();
    let container = Container::new(registry, vec![BeanDescription::singleton("flaky", "Flaky")])
        .unwrap();

    let err = container.get_bean("flaky").unwrap_err();
    assert!(matches!(err, ContainerError::Construction { ref name, .. } if name == "flaky"));
    assert!(!container.is_instantiated("flaky"));

    let first = container.get_bean("flaky").unwrap();
    let second = container.get_bean("flaky").unwrap();
    assert!(first.ptr_eq(&second));
    assert_eq!(ATTEMPTS.load(Ordering::SeqCst), 2);
}

struct Counted;

#[test]
fn concurrent_first_access_builds_once() {
    static BUILT: AtomicUsize = AtomicUsize::new(0);
    let mut registry = TypeRegistry::new();
    registry
        .register(BeanType::of::<Counted>().constructor(Vec::new(), |_| {
            BUILT.fetch_add(1, Ordering::SeqCst);
            thread::sleep(std::time::Duration::from_millis(20));
            Ok::<_, ArgumentError>(Counted)
        }))
        .unwrap();
    let container = Arc::new(
        Container::new(registry, vec![BeanDescription::singleton("counted", "Counted")]).unwrap(),
    );

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let container = Arc::clone(&container);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                container.get_bean("counted").unwrap()
            })
        })
        .collect();
    let beans: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(BUILT.load(Ordering::SeqCst), 1);
    assert!(beans.windows(2).all(|w| w[0].ptr_eq(&w[1])));
}

struct Ping;
struct Pong;

fn ping_pong_container() -> Container {
    let mut registry = TypeRegistry::new();
    registry
        .register(
            BeanType::of::<Ping>()
                .constructor([Dependency::of::<Pong>()], |args| {
                    args.next_bean()?;
                    Ok::<_, ArgumentError>(Ping)
                }),
        )
        .unwrap()
        .register(
            BeanType::of::<Pong>()
                .constructor([Dependency::of::<Ping>()], |args| {
                    args.next_bean()?;
                    Ok::<_, ArgumentError>(Pong)
                }),
        )
        .unwrap();
    Container::new(
        registry,
        vec![
            BeanDescription::singleton("ping", "Ping"),
            BeanDescription::singleton("pong", "Pong"),
        ],
    )
    .unwrap()
}

#[test]
fn dependency_cycle_is_reported() {
    let container = ping_pong_container();
    let err = container.get_bean("ping").unwrap_err();
    match err.root() {
        ContainerError::Circular(path) => assert_eq!(path, "ping -> pong -> ping"),
        other => panic!("expected cycle, got {other:?}"),
    }
    assert_eq!(container.singleton_count(), 0);
}

#[test]
fn cycle_entered_from_both_ends_on_two_threads_fails_instead_of_hanging() {
    for _ in 0..500 {
        let container = Arc::new(ping_pong_container());
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = ["ping", "pong"]
            .into_iter()
            .map(|name| {
                let container = Arc::clone(&container);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    container.get_bean(name).unwrap_err()
                })
            })
            .collect();
        for handle in handles {
            let err = handle.join().unwrap();
            assert!(
                matches!(err.root(), ContainerError::Circular(_)),
                "expected cycle, got {err:?}"
            );
        }

        // no slot is left locked behind
        let err = container.get_bean("ping").unwrap_err();
        assert!(matches!(err.root(), ContainerError::Circular(_)));
        assert_eq!(container.singleton_count(), 0);
    }
}

#[test]
fn eager_init_builds_every_singleton() {
    let container = Container::builder(registry())
        .bean(BeanDescription::singleton("testBeanInterface", "TestBean"))
        .bean(BeanDescription::prototype("other", "TestBean"))
        .bean(BeanDescription::singleton("wrapper", "TestBeanWithConstructor"))
        .settings(ContainerSettings {
            eager_init: true,
            ..ContainerSettings::default()
        })
        .build()
        .unwrap();
    assert!(container.is_instantiated("testBeanInterface"));
    assert!(container.is_instantiated("wrapper"));
    assert!(!container.is_instantiated("other"));
    assert_eq!(container.singleton_count(), 2);
}

#[test]
fn eager_init_surfaces_build_errors() {
    let err = Container::builder(registry())
        .bean(BeanDescription::singleton("wrapper", "TestBeanWithConstructor"))
        .settings(ContainerSettings {
            eager_init: true,
            ..ContainerSettings::default()
        })
        .build()
        .err()
        .unwrap();
    assert!(err.is_not_found());
}

#[test]
fn settings_deserialize_from_camel_case() {
    let settings: ContainerSettings =
        serde_json::from_str(r#"{"eagerInit": true, "postConstructFailure": "log"}"#).unwrap();
    assert!(settings.eager_init);
    assert_eq!(
        settings.post_construct_failure,
        sprig_core::HookFailurePolicy::Log
    );
}
