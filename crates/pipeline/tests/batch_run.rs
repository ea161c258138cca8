//! Integration tests for the batch orchestrator.
//!
//! All tests run on a paused clock so pacing and timeout behavior are
//! asserted deterministically without real sleeping.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use assert_matches::assert_matches;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use atelier_core::batch::{GenerationContext, WorkItem};
use atelier_core::credits::OperationKind;
use atelier_core::error::CoreError;
use atelier_core::types::DbId;
use atelier_core::version::{MoodboardFrame, SourceKind, Version};
use atelier_events::{EventBus, StudioEvent};
use atelier_store::{
    GatewayError, InMemoryGateway, PersistenceGateway, SoftDeleteOutcome, StoreRegistry,
};
use atelier_pipeline::{
    BatchConfig, BatchOrchestrator, CreditBalanceProvider, CreditLedger, GenerationAdapter,
    GenerationError,
};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Adapter whose behavior is scripted per call index.
struct ScriptedAdapter {
    calls: AtomicUsize,
    /// Call indices that fail with an invalid-prompt error.
    fail_on: HashSet<usize>,
    /// Call indices that hang until the per-item timeout expires.
    hang_on: HashSet<usize>,
    /// Token to cancel on the first call, for the cancellation test.
    cancel_on_first_call: Option<CancellationToken>,
}

impl ScriptedAdapter {
    fn succeeding() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: HashSet::new(),
            hang_on: HashSet::new(),
            cancel_on_first_call: None,
        }
    }

    fn failing_on(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            fail_on: indices.into_iter().collect(),
            ..Self::succeeding()
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationAdapter<u32> for ScriptedAdapter {
    async fn generate(&self, _context: &GenerationContext) -> Result<u32, GenerationError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        if index == 0 {
            if let Some(token) = &self.cancel_on_first_call {
                token.cancel();
            }
        }
        if self.hang_on.contains(&index) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail_on.contains(&index) {
            return Err(GenerationError::InvalidPrompt(
                "prompt must not be empty".to_string(),
            ));
        }
        Ok(index as u32)
    }
}

struct StubProvider {
    balance: AtomicI64,
    calls: AtomicUsize,
}

impl StubProvider {
    fn new(balance: i64) -> Arc<Self> {
        Arc::new(Self {
            balance: AtomicI64::new(balance),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CreditBalanceProvider for StubProvider {
    async fn balance(&self) -> Result<i64, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.balance.load(Ordering::SeqCst))
    }
}

struct Harness {
    registry: Arc<StoreRegistry<u32>>,
    adapter: Arc<ScriptedAdapter>,
    provider: Arc<StubProvider>,
    bus: Arc<EventBus>,
    orchestrator: BatchOrchestrator<u32>,
}

fn harness(adapter: ScriptedAdapter, balance: i64, config: BatchConfig) -> Harness {
    let bus = Arc::new(EventBus::default());
    let registry = Arc::new(StoreRegistry::new(
        "moodboard_item",
        Arc::new(InMemoryGateway::<u32>::new("moodboard_item")),
        Arc::clone(&bus),
    ));
    let adapter = Arc::new(adapter);
    let provider = StubProvider::new(balance);
    let ledger = Arc::new(CreditLedger::new(provider.clone()));
    let orchestrator = BatchOrchestrator::new(
        Arc::clone(&registry),
        adapter.clone() as Arc<dyn GenerationAdapter<u32>>,
        ledger,
        Arc::clone(&bus),
        config,
    );
    Harness {
        registry,
        adapter,
        provider,
        bus,
        orchestrator,
    }
}

fn work_item(parent_id: DbId, label: &str, operation: OperationKind) -> WorkItem {
    WorkItem {
        label: label.to_string(),
        context: GenerationContext {
            parent_id,
            operation,
            style_name: None,
            style_params: serde_json::json!({}),
            reference_image_id: None,
        },
    }
}

fn prompt_items(count: usize) -> Vec<WorkItem> {
    (0..count)
        .map(|i| work_item(1, &format!("item {}", i + 1), OperationKind::PromptGeneration))
        .collect()
}

// ---------------------------------------------------------------------------
// Loop semantics
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn batch_continues_past_a_failing_item() -> Result<()> {
    let h = harness(
        ScriptedAdapter::failing_on([2]),
        1_000,
        BatchConfig::default(),
    );

    let outcome = h.orchestrator.run_to_completion(prompt_items(5)).await?;

    assert_eq!(outcome.succeeded_count, 4);
    assert_eq!(outcome.failed_count, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].starts_with("item 3:"));
    assert_eq!(h.adapter.call_count(), 5, "items after the failure must still run");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn pacing_applies_exactly_n_minus_one_delays() -> Result<()> {
    let config = BatchConfig {
        inter_item_delay: Duration::from_millis(500),
        ..BatchConfig::default()
    };
    let h = harness(ScriptedAdapter::succeeding(), 1_000, config);

    let start = tokio::time::Instant::now();
    let outcome = h.orchestrator.run_to_completion(prompt_items(3)).await?;
    let elapsed = start.elapsed();

    assert_eq!(outcome.succeeded_count, 3);
    assert!(
        elapsed >= Duration::from_millis(1_000),
        "two inter-item gaps must be awaited, elapsed {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_millis(1_500),
        "no delay may follow the last item, elapsed {elapsed:?}"
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn hung_item_times_out_and_counts_as_failure() -> Result<()> {
    let config = BatchConfig {
        per_item_timeout: Some(Duration::from_secs(2)),
        ..BatchConfig::default()
    };
    let h = harness(
        ScriptedAdapter {
            hang_on: [0].into_iter().collect(),
            ..ScriptedAdapter::succeeding()
        },
        1_000,
        config,
    );

    let outcome = h.orchestrator.run_to_completion(prompt_items(2)).await?;

    assert_eq!(outcome.succeeded_count, 1);
    assert_eq!(outcome.failed_count, 1);
    assert!(outcome.errors[0].contains("timed out"));
    Ok(())
}

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn shortfall_blocks_the_batch_before_any_worker_call() {
    let h = harness(ScriptedAdapter::succeeding(), 3, BatchConfig::default());
    let items = vec![work_item(1, "cover", OperationKind::ImageGeneration)];

    let err = h.orchestrator.run_to_completion(items).await.unwrap_err();

    assert_matches!(
        err,
        CoreError::CreditShortfall {
            required: 5,
            available: 3,
        }
    );
    let msg = err.to_string();
    assert!(msg.contains('5') && msg.contains('3'));
    assert_eq!(h.adapter.call_count(), 0, "no worker call may start");
}

#[tokio::test(start_paused = true)]
async fn ledger_is_refreshed_after_the_run() -> Result<()> {
    let h = harness(ScriptedAdapter::succeeding(), 1_000, BatchConfig::default());

    h.orchestrator.run_to_completion(prompt_items(2)).await?;

    // Once at admission, once after completion.
    assert_eq!(h.provider.calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn empty_work_list_is_a_fatal_validation_error() {
    let h = harness(ScriptedAdapter::succeeding(), 1_000, BatchConfig::default());

    let err = h.orchestrator.run_to_completion(Vec::new()).await.unwrap_err();
    assert_matches!(err, CoreError::Validation(_));
    assert_eq!(h.adapter.call_count(), 0);
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn each_success_is_persisted_before_the_next_item() -> Result<()> {
    let h = harness(ScriptedAdapter::succeeding(), 1_000, BatchConfig::default());
    let items = vec![
        work_item(1, "beat 1", OperationKind::PromptGeneration),
        work_item(2, "beat 2", OperationKind::PromptGeneration),
    ];

    h.orchestrator.run_to_completion(items).await?;

    for parent_id in [1, 2] {
        let store = h.registry.store_for(parent_id).await?;
        let versions = store.versions().await;
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].source_kind, SourceKind::Generated);
        assert!(versions[0].is_active);
    }
    Ok(())
}

/// Gateway whose writes fail, to exercise the save-after-generation path.
struct ReadOnlyGateway;

#[async_trait]
impl PersistenceGateway<u32> for ReadOnlyGateway {
    async fn list(&self, _parent_id: DbId) -> Result<Vec<Version<u32>>, GatewayError> {
        Ok(Vec::new())
    }

    async fn create(
        &self,
        _parent_id: DbId,
        _payload: u32,
        _name: &str,
        _source_kind: SourceKind,
        _set_active: bool,
    ) -> Result<Version<u32>, GatewayError> {
        Err(GatewayError::Transport("backend returned 503".to_string()))
    }

    async fn activate(
        &self,
        _parent_id: DbId,
        version_id: DbId,
    ) -> Result<Version<u32>, GatewayError> {
        Err(GatewayError::NotFound {
            entity: "moodboard_item",
            id: version_id,
        })
    }

    async fn rename(&self, version_id: DbId, _name: &str) -> Result<Version<u32>, GatewayError> {
        Err(GatewayError::NotFound {
            entity: "moodboard_item",
            id: version_id,
        })
    }

    async fn soft_delete(&self, version_id: DbId) -> Result<SoftDeleteOutcome<u32>, GatewayError> {
        Err(GatewayError::NotFound {
            entity: "moodboard_item",
            id: version_id,
        })
    }

    async fn restore(&self, version_id: DbId) -> Result<Version<u32>, GatewayError> {
        Err(GatewayError::NotFound {
            entity: "moodboard_item",
            id: version_id,
        })
    }
}

#[tokio::test(start_paused = true)]
async fn failed_save_is_reported_as_retry_save_not_regenerate() -> Result<()> {
    let bus = Arc::new(EventBus::default());
    let registry = Arc::new(StoreRegistry::new(
        "moodboard_item",
        Arc::new(ReadOnlyGateway),
        Arc::clone(&bus),
    ));
    let adapter = Arc::new(ScriptedAdapter::succeeding());
    let ledger = Arc::new(CreditLedger::new(StubProvider::new(1_000)));
    let orchestrator = BatchOrchestrator::new(
        registry,
        adapter.clone() as Arc<dyn GenerationAdapter<u32>>,
        ledger,
        bus,
        BatchConfig::default(),
    );

    let outcome = orchestrator.run_to_completion(prompt_items(1)).await?;

    assert_eq!(outcome.succeeded_count, 0);
    assert_eq!(outcome.failed_count, 1);
    assert_eq!(adapter.call_count(), 1, "generation itself did run");
    assert!(
        outcome.errors[0].contains("not saved"),
        "error must point at saving, got: {}",
        outcome.errors[0]
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn cancellation_is_observed_between_items() -> Result<()> {
    let token = CancellationToken::new();
    let h = harness(
        ScriptedAdapter {
            cancel_on_first_call: Some(token.clone()),
            ..ScriptedAdapter::succeeding()
        },
        1_000,
        BatchConfig::default(),
    );

    let outcome = h.orchestrator.run(prompt_items(3), token).await?;

    // The in-flight item completes and is recorded; the rest never start.
    assert!(outcome.cancelled);
    assert_eq!(outcome.succeeded_count, 1);
    assert_eq!(outcome.failed_count, 0);
    assert_eq!(h.adapter.call_count(), 1);
    Ok(())
}

// ---------------------------------------------------------------------------
// Progress events
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn progress_is_emitted_before_each_worker_call() -> Result<()> {
    let h = harness(ScriptedAdapter::succeeding(), 1_000, BatchConfig::default());
    let mut rx = h.bus.subscribe();

    h.orchestrator.run_to_completion(prompt_items(2)).await?;

    assert_matches!(rx.recv().await?, StudioEvent::BatchStarted { total_count: 2, .. });
    match rx.recv().await? {
        StudioEvent::BatchItemStarted { progress, .. } => {
            assert_eq!(progress.current_index, 0);
            assert_eq!(progress.total_count, 2);
            assert_eq!(progress.current_label, "item 1");
        }
        other => panic!("expected item start, got {other:?}"),
    }
    // VersionCreated from the store, then the item completion.
    assert_matches!(rx.recv().await?, StudioEvent::VersionCreated { .. });
    assert_matches!(rx.recv().await?, StudioEvent::BatchItemCompleted { index: 0, .. });
    assert_matches!(rx.recv().await?, StudioEvent::BatchItemStarted { .. });
    assert_matches!(rx.recv().await?, StudioEvent::VersionCreated { .. });
    assert_matches!(rx.recv().await?, StudioEvent::BatchItemCompleted { index: 1, .. });
    assert_matches!(rx.recv().await?, StudioEvent::BatchCompleted { .. });
    Ok(())
}

// ---------------------------------------------------------------------------
// End-to-end moodboard scenario
// ---------------------------------------------------------------------------

struct MoodboardAdapter {
    calls: AtomicUsize,
}

#[async_trait]
impl GenerationAdapter<MoodboardFrame> for MoodboardAdapter {
    async fn generate(
        &self,
        context: &GenerationContext,
    ) -> Result<MoodboardFrame, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = context.style_params["prompt"]
            .as_str()
            .unwrap_or_default();
        if prompt.is_empty() {
            return Err(GenerationError::InvalidPrompt(
                "prompt must not be empty".to_string(),
            ));
        }
        Ok(MoodboardFrame {
            image_url: format!("https://cdn.example/{}.png", context.parent_id),
            thumbnail_url: None,
            prompt: Some(prompt.to_string()),
            generation_metadata: None,
        })
    }
}

#[tokio::test(start_paused = true)]
async fn moodboard_beat_with_one_bad_cell() -> Result<()> {
    let bus = Arc::new(EventBus::default());
    let registry = Arc::new(StoreRegistry::new(
        "moodboard_item",
        Arc::new(InMemoryGateway::<MoodboardFrame>::new("moodboard_item")),
        Arc::clone(&bus),
    ));
    let adapter = Arc::new(MoodboardAdapter {
        calls: AtomicUsize::new(0),
    });
    let ledger = Arc::new(CreditLedger::new(StubProvider::new(1_000)));
    let orchestrator = BatchOrchestrator::new(
        Arc::clone(&registry),
        adapter.clone() as Arc<dyn GenerationAdapter<MoodboardFrame>>,
        ledger,
        bus,
        BatchConfig {
            inter_item_delay: Duration::from_millis(500),
            ..BatchConfig::default()
        },
    );

    let items: Vec<WorkItem> = (1..=4)
        .map(|cell| {
            // Cell 2's prompt is empty and will be rejected by the worker.
            let prompt = if cell == 2 { "" } else { "stormy harbor at dusk" };
            WorkItem {
                label: format!("cell {cell}"),
                context: GenerationContext {
                    parent_id: cell,
                    operation: OperationKind::ImageGeneration,
                    style_name: Some("Noir".to_string()),
                    style_params: serde_json::json!({ "prompt": prompt }),
                    reference_image_id: None,
                },
            }
        })
        .collect();

    let outcome = orchestrator.run_to_completion(items).await?;

    assert_eq!(outcome.succeeded_count, 3);
    assert_eq!(outcome.failed_count, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].starts_with("cell 2:"));
    assert!(outcome.errors[0].contains("Invalid prompt"));
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 4);

    for cell in [1, 3, 4] {
        let store = registry.store_for(cell).await?;
        let versions = store.versions().await;
        assert_eq!(versions.len(), 1, "cell {cell} gets exactly one version");
        assert_eq!(versions[0].source_kind, SourceKind::Generated);
        assert!(versions[0].is_active);
        assert!(versions[0].version_name.starts_with("Noir"));
    }
    let empty = registry.store_for(2).await?;
    assert!(empty.versions().await.is_empty(), "the failed cell saves nothing");
    Ok(())
}
