//! Sequential batch generation runner.
//!
//! Runs one generation call at a time over an ordered work list. Strict
//! sequencing is a deliberate rate-limit/backpressure policy toward the
//! upstream provider, not a runtime limitation: item N's persisted result
//! is observable before item N+1 begins.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use atelier_core::batch::{validate_work_items, BatchOutcome, BatchProgress, WorkItem};
use atelier_core::credits;
use atelier_core::error::CoreError;
use atelier_core::types::DbId;
use atelier_core::version::VersionPayload;
use atelier_events::{EventBus, StudioEvent};
use atelier_store::StoreRegistry;

use crate::adapter::{GenerationAdapter, GenerationError};
use crate::config::BatchConfig;
use crate::ledger::CreditLedger;

/// Drives [`GenerationAdapter`] calls for a whole batch and persists every
/// produced artifact immediately through the store registry.
pub struct BatchOrchestrator<P: VersionPayload> {
    registry: Arc<StoreRegistry<P>>,
    adapter: Arc<dyn GenerationAdapter<P>>,
    ledger: Arc<CreditLedger>,
    bus: Arc<EventBus>,
    config: BatchConfig,
}

impl<P: VersionPayload> BatchOrchestrator<P> {
    pub fn new(
        registry: Arc<StoreRegistry<P>>,
        adapter: Arc<dyn GenerationAdapter<P>>,
        ledger: Arc<CreditLedger>,
        bus: Arc<EventBus>,
        config: BatchConfig,
    ) -> Self {
        Self {
            registry,
            adapter,
            ledger,
            bus,
            config,
        }
    }

    /// Run a batch without a way to cancel it.
    pub async fn run_to_completion(&self, items: Vec<WorkItem>) -> Result<BatchOutcome, CoreError> {
        self.run(items, CancellationToken::new()).await
    }

    /// Run a batch.
    ///
    /// Pre-flight failures (inconsistent work list, bad configuration,
    /// unreachable balance, credit shortfall) abort the run before any
    /// worker call. Once the loop starts, per-item failures are collected
    /// into the outcome and never stop the remaining items; there is no
    /// automatic retry, a retry is a new run initiated by the user.
    ///
    /// Cancellation is cooperative and observed between items only: the
    /// in-flight generation always completes and its result is recorded,
    /// then the run stops and returns its partial outcome.
    pub async fn run(
        &self,
        items: Vec<WorkItem>,
        cancel: CancellationToken,
    ) -> Result<BatchOutcome, CoreError> {
        let kind = validate_work_items(&items)?;
        self.config.validate()?;

        // Admission is re-checked here, against a fresh balance, because the
        // cached value the confirm dialog rendered from may be stale. It is
        // not re-checked per item: an admitted batch runs to completion even
        // if the true balance is exhausted partway.
        let cost = credits::estimate_cost(kind, items.len() as u32);
        self.ledger.refresh().await?;
        self.ledger.check_admission(cost)?;

        let run_id = Uuid::new_v4();
        let total_count = items.len();
        tracing::info!(
            %run_id,
            operation = kind.as_str(),
            total_count,
            cost,
            "Batch run started",
        );
        self.bus.publish(StudioEvent::BatchStarted {
            run_id,
            total_count,
        });

        let mut outcome = BatchOutcome::default();
        for (index, item) in items.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(%run_id, index, "Batch run cancelled");
                outcome.cancelled = true;
                break;
            }

            // Emitted before the worker call, so a slow item is visibly in
            // progress rather than silently stalled.
            self.bus.publish(StudioEvent::BatchItemStarted {
                run_id,
                progress: BatchProgress {
                    current_index: index,
                    total_count,
                    current_label: item.label.clone(),
                },
            });

            match self.generate_one(item).await {
                Ok(payload) => match self.persist_artifact(item, payload).await {
                    Ok(version_id) => {
                        outcome.succeeded_count += 1;
                        self.bus.publish(StudioEvent::BatchItemCompleted {
                            run_id,
                            index,
                            label: item.label.clone(),
                            version_id,
                        });
                    }
                    Err(err) => {
                        // The artifact exists but was not recorded; the
                        // error text tells the user to retry saving, not
                        // regenerating.
                        self.record_failure(&mut outcome, run_id, index, item, err.to_string());
                    }
                },
                Err(err) => {
                    self.record_failure(&mut outcome, run_id, index, item, err.to_string());
                }
            }

            let is_last = index + 1 == total_count;
            if !is_last && !cancel.is_cancelled() {
                tokio::time::sleep(self.config.inter_item_delay).await;
            }
        }

        tracing::info!(
            %run_id,
            succeeded = outcome.succeeded_count,
            failed = outcome.failed_count,
            cancelled = outcome.cancelled,
            "Batch run finished",
        );
        self.bus.publish(StudioEvent::BatchCompleted {
            run_id,
            outcome: outcome.clone(),
        });

        // The run consumed credits server-side; bring the courtesy display
        // back in line. Failure here must not fail an otherwise-finished run.
        if let Err(err) = self.ledger.refresh().await {
            tracing::warn!(%run_id, error = %err, "Post-batch credit refresh failed");
        }

        Ok(outcome)
    }

    /// One adapter call, bounded by the per-item timeout when configured.
    async fn generate_one(&self, item: &WorkItem) -> Result<P, GenerationError> {
        match self.config.per_item_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.adapter.generate(&item.context))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(GenerationError::TimedOut(limit.as_secs())),
            },
            None => self.adapter.generate(&item.context).await,
        }
    }

    /// Persist a produced artifact as the parent's new active version.
    /// Runs before the next item starts so partial progress survives a
    /// crash or navigation away mid-batch.
    async fn persist_artifact(&self, item: &WorkItem, payload: P) -> Result<DbId, CoreError> {
        let store = self.registry.store_for(item.context.parent_id).await?;
        let version = store
            .record_generated(payload, item.context.style_name.as_deref())
            .await?;
        Ok(version.id)
    }

    fn record_failure(
        &self,
        outcome: &mut BatchOutcome,
        run_id: Uuid,
        index: usize,
        item: &WorkItem,
        error: String,
    ) {
        tracing::warn!(%run_id, index, label = %item.label, error = %error, "Batch item failed");
        outcome.failed_count += 1;
        outcome.errors.push(format!("{}: {error}", item.label));
        self.bus.publish(StudioEvent::BatchItemFailed {
            run_id,
            index,
            label: item.label.clone(),
            error,
        });
    }
}
