use super::*;
use crate::analytics::models::{Parameter, ParameterValue};
use crate::remote_config::models::FetchInfo;
use crate::remote_config::models::ConfigValue;
use crate::remote_config::{FetchSource, LayeredRemoteConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

#[derive(Clone, Copy)]
enum Behavior {
    Succeed,
    Fail,
    Hang,
}

struct MockDependencies {
    result: DependencyStatus,
    behavior: Behavior,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl MockDependencies {
    fn available() -> Self {
        Self::with(DependencyStatus::Available, Behavior::Succeed)
    }

    fn with(result: DependencyStatus, behavior: Behavior) -> Self {
        Self {
            result,
            behavior,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl DependencyChecker for MockDependencies {
    async fn check_dependencies(&self) -> anyhow::Result<DependencyStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match self.behavior {
            Behavior::Succeed => Ok(self.result),
            Behavior::Fail => Err(anyhow::anyhow!("play services missing")),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

#[derive(Default)]
struct RecordingAnalytics {
    collection_enabled: Mutex<Option<bool>>,
    events: Mutex<Vec<(String, Vec<Parameter>)>>,
    fail_enable: bool,
}

impl RecordingAnalytics {
    fn events(&self) -> Vec<(String, Vec<Parameter>)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AnalyticsSink for RecordingAnalytics {
    fn set_analytics_collection_enabled(&self, enabled: bool) -> anyhow::Result<()> {
        if self.fail_enable {
            anyhow::bail!("analytics unavailable");
        }
        *self.collection_enabled.lock().unwrap() = Some(enabled);
        Ok(())
    }

    async fn log_event(&self, name: &str, parameters: &[Parameter]) -> anyhow::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push((name.to_string(), parameters.to_vec()));
        Ok(())
    }
}

struct StaticSource {
    entries: Option<HashMap<String, String>>,
}

#[async_trait::async_trait]
impl FetchSource for StaticSource {
    async fn fetch_entries(&self) -> anyhow::Result<Option<HashMap<String, String>>> {
        match &self.entries {
            Some(entries) => Ok(Some(entries.clone())),
            None => Err(anyhow::anyhow!("network unreachable")),
        }
    }
}

/// Layered store whose `set_defaults` can be gated, failed or hung.
struct MockStore {
    inner: LayeredRemoteConfig<StaticSource>,
    defaults_behavior: Behavior,
    defaults_gate: Option<Arc<Notify>>,
    set_defaults_calls: AtomicUsize,
    activated: AtomicBool,
}

impl MockStore {
    fn new(remote: Option<&[(&str, &str)]>) -> Self {
        let entries = remote.map(|pairs| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        });
        Self {
            inner: LayeredRemoteConfig::new(StaticSource { entries }),
            defaults_behavior: Behavior::Succeed,
            defaults_gate: None,
            set_defaults_calls: AtomicUsize::new(0),
            activated: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl RemoteConfigStore for MockStore {
    async fn set_defaults(&self, defaults: &HashMap<String, Primitive>) -> anyhow::Result<()> {
        self.set_defaults_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.defaults_gate {
            gate.notified().await;
        }
        match self.defaults_behavior {
            Behavior::Succeed => self.inner.set_defaults(defaults).await,
            Behavior::Fail => Err(anyhow::anyhow!("defaults rejected")),
            Behavior::Hang => std::future::pending().await,
        }
    }

    async fn fetch(&self, max_age: Duration) -> anyhow::Result<()> {
        self.inner.fetch(max_age).await
    }

    async fn activate(&self) -> anyhow::Result<bool> {
        self.activated.store(true, Ordering::SeqCst);
        self.inner.activate().await
    }

    fn info(&self) -> FetchInfo {
        self.inner.info()
    }

    fn has_key(&self, key: &str) -> bool {
        self.inner.has_key(key)
    }

    fn get_value(&self, key: &str) -> anyhow::Result<ConfigValue> {
        self.inner.get_value(key)
    }
}

struct Harness {
    manager: Arc<FirebaseManager>,
    dependencies: Arc<MockDependencies>,
    analytics: Arc<RecordingAnalytics>,
    store: Arc<MockStore>,
}

fn harness(
    dependencies: MockDependencies,
    analytics: RecordingAnalytics,
    store: MockStore,
) -> Harness {
    let dependencies = Arc::new(dependencies);
    let analytics = Arc::new(analytics);
    let store = Arc::new(store);
    let manager = Arc::new(FirebaseManager::new(
        dependencies.clone(),
        analytics.clone(),
        store.clone(),
        ManagerConfig::default(),
    ));
    Harness {
        manager,
        dependencies,
        analytics,
        store,
    }
}

fn default_harness() -> Harness {
    harness(
        MockDependencies::available(),
        RecordingAnalytics::default(),
        MockStore::new(Some(&[("x", "3.14"), ("y", "3,5"), ("a", "true")])),
    )
}

fn defaults(pairs: &[(&str, Primitive)]) -> HashMap<String, Primitive> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn test_init_while_initializing_is_dropped() {
    let gate = Arc::new(Notify::new());
    let dependencies = MockDependencies {
        gate: Some(gate.clone()),
        ..MockDependencies::available()
    };
    let h = harness(dependencies, RecordingAnalytics::default(), MockStore::new(None));

    let mut rx = h.manager.subscribe();
    let manager = h.manager.clone();
    let first = tokio::spawn(async move { manager.init(None).await });
    rx.wait_for(|s| *s == Status::Initializing).await.unwrap();
    // Let the first attempt reach the dependency check.
    while h.dependencies.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    assert_eq!(h.manager.init(Some(defaults(&[("a", true.into())]))).await, Status::Initializing);
    assert_eq!(h.dependencies.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.set_defaults_calls.load(Ordering::SeqCst), 0);

    gate.notify_one();
    assert_eq!(first.await.unwrap(), Status::Initialized);
    assert_eq!(h.dependencies.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_superseded_attempt_leaves_status_to_newer_attempt() {
    let dependencies_gate = Arc::new(Notify::new());
    let defaults_gate = Arc::new(Notify::new());
    let dependencies = MockDependencies {
        gate: Some(dependencies_gate.clone()),
        ..MockDependencies::available()
    };
    let store = MockStore {
        defaults_gate: Some(defaults_gate.clone()),
        ..MockStore::new(None)
    };
    let h = harness(dependencies, RecordingAnalytics::default(), store);

    // The stored permit lets the first attempt through its dependency check.
    dependencies_gate.notify_one();
    let mut rx = h.manager.subscribe();
    let manager = h.manager.clone();
    let first =
        tokio::spawn(async move { manager.init(Some(defaults(&[("a", true.into())]))).await });
    rx.wait_for(|s| *s == Status::FetchingRemoteDefaults).await.unwrap();

    // A second attempt is accepted while the first waits on its defaults.
    let manager = h.manager.clone();
    let second = tokio::spawn(async move { manager.init(None).await });
    while h.dependencies.calls.load(Ordering::SeqCst) < 2 {
        tokio::task::yield_now().await;
    }
    assert_eq!(h.manager.status(), Status::Initializing);

    defaults_gate.notify_one();
    assert_eq!(first.await.unwrap(), Status::Initializing);
    assert_eq!(h.manager.status(), Status::Initializing);

    // The newer attempt still owns `Initializing`, so a third call is dropped.
    assert_eq!(h.manager.init(None).await, Status::Initializing);
    assert_eq!(h.dependencies.calls.load(Ordering::SeqCst), 2);

    dependencies_gate.notify_one();
    assert_eq!(second.await.unwrap(), Status::Initialized);
    assert_eq!(
        h.manager.status.history(),
        vec![
            Status::Uninitialized,
            Status::Initializing,
            Status::DependenciesAvailable,
            Status::FetchingRemoteDefaults,
            Status::Initializing,
            Status::DependenciesAvailable,
            Status::Initialized,
        ]
    );
}

#[tokio::test]
async fn test_init_without_defaults_skips_remote_defaults() {
    let h = default_harness();
    assert_eq!(h.manager.status(), Status::Uninitialized);

    assert_eq!(h.manager.init(None).await, Status::Initialized);
    assert_eq!(h.manager.init(Some(HashMap::new())).await, Status::Initialized);

    assert_eq!(h.store.set_defaults_calls.load(Ordering::SeqCst), 0);
    assert_eq!(*h.analytics.collection_enabled.lock().unwrap(), Some(true));
    assert_eq!(
        h.manager.status.history(),
        vec![
            Status::Uninitialized,
            Status::Initializing,
            Status::DependenciesAvailable,
            Status::Initialized,
            Status::Initializing,
            Status::DependenciesAvailable,
            Status::Initialized,
        ]
    );
}

#[tokio::test]
async fn test_init_with_defaults_passes_through_fetching() {
    let gate = Arc::new(Notify::new());
    let store = MockStore {
        defaults_gate: Some(gate.clone()),
        ..MockStore::new(None)
    };
    let h = harness(MockDependencies::available(), RecordingAnalytics::default(), store);

    let mut rx = h.manager.subscribe();
    let manager = h.manager.clone();
    let task =
        tokio::spawn(async move { manager.init(Some(defaults(&[("a", true.into())]))).await });

    rx.wait_for(|s| *s == Status::FetchingRemoteDefaults).await.unwrap();
    assert!(!h.manager.is_initialized());

    gate.notify_one();
    assert_eq!(task.await.unwrap(), Status::Initialized);
    assert_eq!(h.store.set_defaults_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        h.manager.status.history(),
        vec![
            Status::Uninitialized,
            Status::Initializing,
            Status::DependenciesAvailable,
            Status::FetchingRemoteDefaults,
            Status::RemoteDefaultsFetched,
            Status::Initialized,
        ]
    );
}

/// Statuses a failed or timed-out remote-defaults push moves through.
fn skipped_defaults_history() -> Vec<Status> {
    vec![
        Status::Uninitialized,
        Status::Initializing,
        Status::DependenciesAvailable,
        Status::FetchingRemoteDefaults,
        Status::Initialized,
    ]
}

#[tokio::test]
async fn test_get_value_returns_default_until_initialized() {
    let h = default_harness();
    h.store.inner.fetch(Duration::ZERO).await.unwrap();
    h.store.inner.activate().await.unwrap();

    assert!(!h.manager.get_bool("a", false));
    assert_eq!(h.manager.get_double("x", 1.0), 1.0);
    assert_eq!(h.manager.get_string("a", "fallback"), "fallback");

    h.manager.init(None).await;
    assert!(h.manager.get_bool("a", false));
    assert_eq!(h.manager.get_double("x", 1.0), 3.14);
}

#[tokio::test]
async fn test_defaults_scenario_reads_store_value() {
    let h = harness(
        MockDependencies::available(),
        RecordingAnalytics::default(),
        MockStore::new(None),
    );

    let status = h.manager.init(Some(defaults(&[("a", true.into())]))).await;
    assert_eq!(status, Status::Initialized);
    assert!(h.manager.get_bool("a", false));
    assert_eq!(h.manager.get_int("missing", 7), 7);
}

#[tokio::test]
async fn test_float_reads_and_fallbacks() {
    let h = default_harness();
    h.manager.init(None).await;
    assert!(h.manager.fetch_remote_data(|| {}).await);

    assert_eq!(h.manager.get_float("x", 1.0), 3.14);
    assert_eq!(h.manager.get_double("y", 1.0), 3.5);
    // "true" is neither invariant nor lenient numeric text.
    assert_eq!(h.manager.get_double("a", 1.0), 1.0);
    assert_eq!(h.manager.get_long("x", 9), 9);
}

#[tokio::test]
async fn test_long_event_name_is_truncated() {
    let h = default_harness();
    h.manager.init(None).await;

    let name = "Level_Complete_With_Bonus_Points_Extra";
    let name = format!("{}{}", name, "X".repeat(40 - name.len()));
    assert_eq!(name.len(), 40);
    h.manager.log_event(&name, None).await;

    let events = h.analytics.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, name[..32].to_lowercase());
    assert!(events[0].1.is_empty());
}

#[tokio::test]
async fn test_unsupported_parameter_is_filtered() {
    let h = default_harness();
    h.manager.init(None).await;

    h.manager
        .log_event(
            "purchase",
            Some(vec![
                ("Item".to_string(), Primitive::from("sword")),
                ("Premium".to_string(), Primitive::from(true)),
            ]),
        )
        .await;

    let events = h.analytics.events();
    assert_eq!(
        events,
        vec![(
            "purchase".to_string(),
            vec![Parameter {
                name: "item".to_string(),
                value: ParameterValue::String("sword".to_string()),
            }],
        )]
    );
}

#[tokio::test]
async fn test_log_event_requires_initialization_and_name() {
    let h = default_harness();
    h.manager.log_event("early", None).await;
    h.manager.init(None).await;
    h.manager.log_event("", None).await;

    assert!(h.analytics.events().is_empty());
}

#[tokio::test]
async fn test_unavailable_dependencies_fail_and_allow_retry() {
    let h = harness(
        MockDependencies::with(DependencyStatus::UnavailableMissing, Behavior::Succeed),
        RecordingAnalytics::default(),
        MockStore::new(None),
    );

    assert_eq!(h.manager.init(None).await, Status::InitializeFailed);
    assert_eq!(h.manager.status(), Status::InitializeFailed);
    assert!(h.analytics.collection_enabled.lock().unwrap().is_none());

    assert_eq!(h.manager.init(None).await, Status::InitializeFailed);
    assert_eq!(h.dependencies.calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        h.manager.status.history(),
        vec![
            Status::Uninitialized,
            Status::Initializing,
            Status::InitializeFailed,
            Status::Initializing,
            Status::InitializeFailed,
        ]
    );
}

#[tokio::test]
async fn test_dependency_error_fails_initialization() {
    let h = harness(
        MockDependencies::with(DependencyStatus::Available, Behavior::Fail),
        RecordingAnalytics::default(),
        MockStore::new(None),
    );
    assert_eq!(h.manager.init(None).await, Status::InitializeFailed);
}

#[tokio::test(start_paused = true)]
async fn test_dependency_check_timeout_fails_initialization() {
    let h = harness(
        MockDependencies::with(DependencyStatus::Available, Behavior::Hang),
        RecordingAnalytics::default(),
        MockStore::new(None),
    );
    assert_eq!(h.manager.init(None).await, Status::InitializeFailed);
}

#[tokio::test]
async fn test_analytics_failure_does_not_change_outcome() {
    let analytics = RecordingAnalytics {
        fail_enable: true,
        ..Default::default()
    };
    let h = harness(MockDependencies::available(), analytics, MockStore::new(None));
    assert_eq!(h.manager.init(None).await, Status::Initialized);
}

#[tokio::test]
async fn test_remote_defaults_failure_is_absorbed() {
    let store = MockStore {
        defaults_behavior: Behavior::Fail,
        ..MockStore::new(None)
    };
    let h = harness(MockDependencies::available(), RecordingAnalytics::default(), store);

    let status = h.manager.init(Some(defaults(&[("a", true.into())]))).await;
    assert_eq!(status, Status::Initialized);
    assert!(!h.manager.get_bool("a", false));
    assert_eq!(h.manager.status.history(), skipped_defaults_history());
}

#[tokio::test(start_paused = true)]
async fn test_remote_defaults_timeout_is_absorbed() {
    let store = MockStore {
        defaults_behavior: Behavior::Hang,
        ..MockStore::new(None)
    };
    let h = harness(MockDependencies::available(), RecordingAnalytics::default(), store);

    let status = h.manager.init(Some(defaults(&[("a", true.into())]))).await;
    assert_eq!(status, Status::Initialized);
    assert_eq!(h.manager.status.history(), skipped_defaults_history());
}

#[tokio::test]
async fn test_fetch_remote_data_invokes_callback_after_activation() {
    let h = default_harness();
    h.manager.init(Some(defaults(&[("a", false.into())]))).await;
    assert!(!h.manager.get_bool("a", true));

    let called = AtomicBool::new(false);
    let store = h.store.clone();
    let ran = h
        .manager
        .fetch_remote_data(|| {
            assert!(store.activated.load(Ordering::SeqCst));
            called.store(true, Ordering::SeqCst);
        })
        .await;

    assert!(ran);
    assert!(called.load(Ordering::SeqCst));
    assert!(h.manager.get_bool("a", false));
}

#[tokio::test]
async fn test_unsuccessful_fetch_skips_callback() {
    let h = harness(
        MockDependencies::available(),
        RecordingAnalytics::default(),
        MockStore::new(None),
    );
    h.manager.init(None).await;

    let mut called = false;
    let ran = h
        .manager
        .fetch_remote_data_with_expiration(|| called = true, 0)
        .await;

    assert!(!ran);
    assert!(!called);
    assert!(!h.store.activated.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_fetch_requires_initialization() {
    let h = default_harness();
    let mut called = false;
    assert!(!h.manager.fetch_remote_data(|| called = true).await);
    assert!(!called);
    assert!(!h.store.info().succeeded());
}

#[tokio::test]
async fn test_wait_until_settled() {
    let h = default_harness();
    assert_eq!(
        h.manager.wait_until_settled(Duration::from_millis(10)).await,
        Some(Status::Uninitialized)
    );

    let manager = h.manager.clone();
    let task = tokio::spawn(async move { manager.init(None).await });
    let settled = h.manager.wait_until_settled(Duration::from_secs(5)).await;
    assert!(matches!(settled, Some(Status::Uninitialized) | Some(Status::Initialized)));
    task.await.unwrap();
    assert_eq!(
        h.manager.wait_until_settled(Duration::from_millis(10)).await,
        Some(Status::Initialized)
    );
}
