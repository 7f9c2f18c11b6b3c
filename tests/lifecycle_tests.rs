//! Lifecycle Tests
//!
//! Registration, dependency-ordered activation, reload and shutdown through
//! the public runtime surface.
//!
//! Run: cargo nextest run --test lifecycle_tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use plugin_runtime::prelude::*;
use serde_json::{Value, json};

/// Appends `<name>:activate` / `<name>:deactivate` to a shared journal.
struct Journaled {
    name: &'static str,
    journal: Arc<Mutex<Vec<String>>>,
    fail_deactivate: bool,
}

#[async_trait]
impl Plugin for Journaled {
    async fn activate(&self, _ctx: &PluginContext) -> std::result::Result<(), BoxError> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}:activate", self.name));
        Ok(())
    }

    async fn deactivate(&self) -> std::result::Result<(), BoxError> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}:deactivate", self.name));
        if self.fail_deactivate {
            return Err("resource still busy".into());
        }
        Ok(())
    }
}

fn journaled(
    name: &'static str,
    journal: &Arc<Mutex<Vec<String>>>,
    fail_deactivate: bool,
) -> BoxFactory {
    let journal = journal.clone();
    factory_fn(move |_| {
        Ok(Arc::new(Journaled {
            name,
            journal: journal.clone(),
            fail_deactivate,
        }) as Arc<dyn Plugin>)
    })
}

// =============================================================================
// Registration
// =============================================================================

mod registration_tests {
    use super::*;

    #[test]
    fn test_register_and_query() {
        let runtime = PluginRuntime::new();
        let journal = Arc::default();
        runtime
            .register(
                "db",
                journaled("db", &journal, false),
                PluginOptions::new()
                    .version("2.1.0")
                    .description("storage")
                    .permission(Capability::Timers),
            )
            .unwrap();

        let info = runtime.get_plugin_info("db").unwrap();
        assert_eq!(info.version, "2.1.0");
        assert_eq!(info.state, PluginState::Registered);
        assert!(!info.activated);
        assert_eq!(runtime.get_all_plugins().len(), 1);
        assert!(runtime.get_plugin_info("ghost").is_none());
    }

    #[test]
    fn test_overwrite_reports_previous_version() {
        let runtime = PluginRuntime::new();
        let journal = Arc::default();
        runtime
            .register(
                "db",
                journaled("db", &journal, false),
                PluginOptions::new().version("1.0.0"),
            )
            .unwrap();
        let outcome = runtime
            .register(
                "db",
                journaled("db", &journal, false),
                PluginOptions::new().version("1.1.0"),
            )
            .unwrap();
        assert!(outcome.is_replaced());
        assert_eq!(runtime.get_plugin_info("db").unwrap().version, "1.1.0");
    }

    #[test]
    fn test_invalid_registration_rejected() {
        let runtime = PluginRuntime::new();
        let journal = Arc::default();
        let err = runtime
            .register(
                "loop",
                journaled("loop", &journal, false),
                PluginOptions::new().depends_on("loop"),
            )
            .unwrap_err();
        assert!(matches!(err, PluginError::InvalidPlugin { .. }));
        assert!(
            runtime
                .register("", journaled("x", &journal, false), PluginOptions::new())
                .is_err()
        );
    }
}

// =============================================================================
// Activation
// =============================================================================

mod activation_tests {
    use super::*;

    #[tokio::test]
    async fn test_activate_twice_runs_once() {
        let runtime = PluginRuntime::new();
        let journal = Arc::default();
        runtime
            .register("p", journaled("p", &journal, false), PluginOptions::new())
            .unwrap();

        runtime.activate("p", json!({})).await.unwrap();
        runtime.activate("p", json!({})).await.unwrap();

        assert_eq!(*journal.lock().unwrap(), vec!["p:activate"]);
        assert!(runtime.is_active("p"));
        assert!(runtime.get("p").is_some());
    }

    #[tokio::test]
    async fn test_dependency_activated_first() {
        let runtime = PluginRuntime::new();
        let journal = Arc::default();
        runtime
            .register(
                "app",
                journaled("app", &journal, false),
                PluginOptions::new().depends_on("cache"),
            )
            .unwrap();
        runtime
            .register(
                "cache",
                journaled("cache", &journal, false),
                PluginOptions::new().depends_on("db"),
            )
            .unwrap();
        runtime
            .register("db", journaled("db", &journal, false), PluginOptions::new())
            .unwrap();

        runtime.activate("app", Value::Null).await.unwrap();

        assert_eq!(
            *journal.lock().unwrap(),
            vec!["db:activate", "cache:activate", "app:activate"]
        );
        assert_eq!(runtime.active_plugins(), vec!["db", "cache", "app"]);
    }

    #[tokio::test]
    async fn test_missing_dependency_named() {
        let runtime = PluginRuntime::new();
        let journal = Arc::default();
        runtime
            .register(
                "A",
                journaled("A", &journal, false),
                PluginOptions::new().depends_on("B"),
            )
            .unwrap();

        let err = runtime.activate("A", Value::Null).await.err().unwrap();
        assert!(err.to_string().contains("B"));
        assert!(matches!(err, PluginError::MissingDependencies { ref missing, .. } if missing == &["B"]));
        assert!(journal.lock().unwrap().is_empty());
        assert_eq!(
            runtime.get_plugin_info("A").unwrap().state,
            PluginState::Registered
        );
    }

    #[tokio::test]
    async fn test_missing_optional_dependency_tolerated() {
        let runtime = PluginRuntime::new();
        let journal = Arc::default();
        runtime
            .register(
                "A",
                journaled("A", &journal, false),
                PluginOptions::new().optional("telemetry"),
            )
            .unwrap();
        runtime.activate("A", Value::Null).await.unwrap();
        assert!(runtime.is_active("A"));
    }

    #[tokio::test]
    async fn test_cycle_rejected_without_side_effects() {
        let runtime = PluginRuntime::new();
        let journal = Arc::default();
        runtime
            .register(
                "a",
                journaled("a", &journal, false),
                PluginOptions::new().depends_on("b"),
            )
            .unwrap();
        runtime
            .register(
                "b",
                journaled("b", &journal, false),
                PluginOptions::new().depends_on("c"),
            )
            .unwrap();
        runtime
            .register(
                "c",
                journaled("c", &journal, false),
                PluginOptions::new().depends_on("a"),
            )
            .unwrap();

        let err = runtime.activate("a", Value::Null).await.err().unwrap();
        match err {
            PluginError::CyclicDependency { cycle } => {
                assert_eq!(cycle.first(), cycle.last());
                assert_eq!(cycle.len(), 4);
            }
            other => panic!("expected a cycle, got {other}"),
        }
        assert!(journal.lock().unwrap().is_empty());
        assert!(runtime.active_plugins().is_empty());
    }

    #[tokio::test]
    async fn test_failing_dependency_wraps_cause() {
        struct Refuses;

        #[async_trait]
        impl Plugin for Refuses {
            async fn activate(&self, _ctx: &PluginContext) -> std::result::Result<(), BoxError> {
                Err("disk full".into())
            }

            async fn deactivate(&self) -> std::result::Result<(), BoxError> {
                Ok(())
            }
        }

        let runtime = PluginRuntime::new();
        let journal = Arc::default();
        runtime
            .register(
                "db",
                factory_fn(|_| Ok(Arc::new(Refuses) as Arc<dyn Plugin>)),
                PluginOptions::new(),
            )
            .unwrap();
        runtime
            .register(
                "app",
                journaled("app", &journal, false),
                PluginOptions::new().depends_on("db"),
            )
            .unwrap();

        let err = runtime.activate("app", Value::Null).await.err().unwrap();
        assert!(matches!(err, PluginError::DependencyActivation { ref dependency, .. } if dependency == "db"));
        assert!(err.root_cause().to_string().contains("disk full"));
        assert!(!runtime.is_active("app"));
        assert!(!runtime.is_active("db"));
    }

    #[tokio::test]
    async fn test_concurrent_activation_single_flight() {
        struct Slow {
            calls: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl Plugin for Slow {
            async fn activate(&self, _ctx: &PluginContext) -> std::result::Result<(), BoxError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok(())
            }

            async fn deactivate(&self) -> std::result::Result<(), BoxError> {
                Ok(())
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let runtime = Arc::new(PluginRuntime::new());
        let factory_calls = calls.clone();
        runtime
            .register(
                "slow",
                factory_fn(move |_| {
                    Ok(Arc::new(Slow {
                        calls: factory_calls.clone(),
                    }) as Arc<dyn Plugin>)
                }),
                PluginOptions::new(),
            )
            .unwrap();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let runtime = runtime.clone();
            tasks.push(tokio::spawn(async move {
                runtime.activate("slow", Value::Null).await.map(|_| ())
            }));
        }
        for task in futures::future::join_all(tasks).await {
            task.unwrap().unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            runtime.get_plugin_info("slow").unwrap().activation_count,
            1
        );
    }
}

// =============================================================================
// Configuration
// =============================================================================

mod config_tests {
    use super::*;
    use plugin_runtime::config::ConfigBuilder;

    #[tokio::test]
    async fn test_provider_section_merged_with_caller_config() {
        let provider = ConfigBuilder::new()
            .memory(
                MemoryConfigProvider::new()
                    .json("runtime", json!({"autoActivate": false}))
                    .json("plugins.db", json!({"host": "db.local", "port": 5432})),
            )
            .build();
        let runtime = RuntimeBuilder::from_provider(Arc::new(provider))
            .await
            .unwrap()
            .build();
        let journal = Arc::default();
        runtime
            .register(
                "db",
                journaled("db", &journal, false),
                PluginOptions::new()
                    .auto_activate(true)
                    .config_schema(ConfigSchema::new().require("host")),
            )
            .unwrap();

        assert!(runtime.start().await.activated.is_empty());

        runtime.activate("db", json!({"port": 6543})).await.unwrap();
        let ctx = runtime.context("db").unwrap();
        assert_eq!(ctx.config, json!({"host": "db.local", "port": 6543}));
        assert_eq!(ctx.config_value("port"), Some(&json!(6543)));
    }

    #[tokio::test]
    async fn test_schema_violation_blocks_activation() {
        let runtime = PluginRuntime::new();
        let journal = Arc::default();
        runtime
            .register(
                "db",
                journaled("db", &journal, false),
                PluginOptions::new().config_schema(
                    ConfigSchema::new()
                        .require("host")
                        .field("port", ValueType::Number),
                ),
            )
            .unwrap();

        let err = runtime
            .activate("db", json!({"port": 1}))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PluginError::InvalidConfig { .. }));
        assert!(err.to_string().contains("host"));
        assert!(journal.lock().unwrap().is_empty());
    }
}

// =============================================================================
// Deactivation, reload and shutdown
// =============================================================================

mod teardown_tests {
    use super::*;

    #[tokio::test]
    async fn test_reload_with_new_config() {
        let runtime = PluginRuntime::new();
        let journal = Arc::default();
        runtime
            .register("p", journaled("p", &journal, false), PluginOptions::new())
            .unwrap();
        runtime.activate("p", json!({"v": 1})).await.unwrap();
        runtime.reload("p", Some(json!({"v": 2}))).await.unwrap();

        assert_eq!(
            *journal.lock().unwrap(),
            vec!["p:activate", "p:deactivate", "p:activate"]
        );
        assert_eq!(runtime.context("p").unwrap().config, json!({"v": 2}));
    }

    #[tokio::test]
    async fn test_reactivate_after_deactivate() {
        let runtime = PluginRuntime::new();
        let journal = Arc::default();
        runtime
            .register("p", journaled("p", &journal, false), PluginOptions::new())
            .unwrap();
        runtime.activate("p", Value::Null).await.unwrap();
        assert!(runtime.deactivate("p").await.unwrap());
        assert_eq!(
            runtime.get_plugin_info("p").unwrap().state,
            PluginState::Inactive
        );

        runtime.activate("p", Value::Null).await.unwrap();
        let info = runtime.get_plugin_info("p").unwrap();
        assert_eq!(info.activation_count, 2);
        assert!(info.last_deactivated_at.is_some());
    }

    #[tokio::test]
    async fn test_shutdown_continues_past_failure() {
        let runtime = PluginRuntime::new();
        let journal: Arc<Mutex<Vec<String>>> = Arc::default();
        runtime
            .register("one", journaled("one", &journal, false), PluginOptions::new())
            .unwrap();
        runtime
            .register("two", journaled("two", &journal, true), PluginOptions::new())
            .unwrap();
        runtime
            .register(
                "three",
                journaled("three", &journal, false),
                PluginOptions::new(),
            )
            .unwrap();
        for name in ["one", "two", "three"] {
            runtime.activate(name, Value::Null).await.unwrap();
        }
        journal.lock().unwrap().clear();

        let report = runtime.shutdown().await;

        assert_eq!(
            *journal.lock().unwrap(),
            vec!["three:deactivate", "two:deactivate", "one:deactivate"]
        );
        assert_eq!(report.deactivated, vec!["three", "one"]);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            &report.failures[0],
            PluginError::Shutdown { plugin, .. } if plugin == "two"
        ));
        assert!(runtime.active_plugins().is_empty());
        assert!(runtime.get_all_plugins().is_empty());
    }

    #[tokio::test]
    async fn test_start_orders_by_dependencies() {
        let runtime = PluginRuntime::new();
        let journal = Arc::default();
        runtime
            .register(
                "web",
                journaled("web", &journal, false),
                PluginOptions::new().depends_on("auth").auto_activate(true),
            )
            .unwrap();
        runtime
            .register(
                "auth",
                journaled("auth", &journal, false),
                PluginOptions::new().auto_activate(true),
            )
            .unwrap();

        let report = runtime.start().await;
        assert!(report.is_clean());
        assert_eq!(report.activated, vec!["auth", "web"]);
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["auth:activate", "web:activate"]
        );
    }
}
