// Mutation pipeline: one transaction per mutation, observers run in ring order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::{entity_to_api_value, FormatOptions};
use crate::authz::AuthContext;
use crate::database::EntityStore;
use crate::observer::context::{CommittedMutation, MutationContext};
use crate::observer::envelope::{MutationEnvelope, MutationRequest};
use crate::observer::error::MutationError;
use crate::observer::implementations::register_default_observers;
use crate::observer::traits::{ObserverBox, ObserverRing};
use crate::schema::EntityKind;
use crate::types::Operation;

/// Executes create/update/delete mutations for every entity under one contract
pub struct MutationPipeline {
    store: Arc<dyn EntityStore>,

    // Observer registry by ring, each list kept in priority order
    observers: HashMap<ObserverRing, Vec<Arc<ObserverBox>>>,
}

impl MutationPipeline {
    /// Pipeline with an empty observer registry
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            observers: HashMap::new(),
        }
    }

    /// Pipeline with the full set of resolve/authorize/apply/validate/persist/audit observers
    pub fn with_default_observers(store: Arc<dyn EntityStore>) -> Self {
        let mut pipeline = Self::new(store);
        register_default_observers(&mut pipeline);
        pipeline
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn register_observer(&mut self, observer: ObserverBox) {
        let ring = observer.ring();
        let name = observer.name();
        let observers = self.observers.entry(ring).or_default();
        observers.push(Arc::new(observer));
        observers.sort_by_key(|o| o.priority());

        tracing::debug!("Registered observer '{}' for ring {:?}", name, ring);
    }

    /// Run one mutation. Never fails: every error ends up in the envelope.
    pub async fn execute(&self, auth: &AuthContext, request: MutationRequest) -> MutationEnvelope {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "mutation",
            %request_id,
            name = %request.name(),
            principal = tracing::field::Empty,
        );

        self.run(request_id, auth, request).instrument(span).await
    }

    /// Answer a mutation whose argument bag could not be read.
    ///
    /// An anonymous caller still gets `Unauthenticated`, as it would from `execute`.
    pub fn reject(&self, auth: &AuthContext, kind: EntityKind, operation: Operation, error: MutationError) -> MutationEnvelope {
        if auth.principal().is_none() {
            return MutationEnvelope::failure(kind, operation, &MutationError::Unauthenticated);
        }
        Self::fail(kind, operation, error)
    }

    async fn run(&self, request_id: Uuid, auth: &AuthContext, request: MutationRequest) -> MutationEnvelope {
        let (kind, operation) = (request.kind, request.operation);

        let Some(principal) = auth.principal() else {
            tracing::info!("Rejected mutation without an authenticated principal");
            return MutationEnvelope::failure(kind, operation, &MutationError::Unauthenticated);
        };
        tracing::Span::current().record("principal", principal.id);

        let tx = match self.store.begin().await {
            Ok(tx) => tx,
            Err(error) => return Self::fail(kind, operation, error.into()),
        };

        let mut ctx = MutationContext::new(request_id, request, principal.clone(), tx);

        tracing::info!(
            "Mutation pipeline starting: operation={:?}, entity={}, backend={}",
            operation,
            kind,
            self.store.backend()
        );

        for ring in ObserverRing::SYNCHRONOUS {
            if let Err(error) = self.execute_ring(ring, &mut ctx).await {
                tracing::warn!("Mutation pipeline stopped at ring {:?}", ring);
                Self::rollback(&mut ctx).await;
                return Self::fail(kind, operation, error);
            }
        }

        let committed = match ctx.tx.take() {
            Some(tx) => tx.commit().await.map_err(MutationError::from),
            None => Err(MutationError::unexpected("transaction closed before commit")),
        };
        if let Err(error) = committed {
            return Self::fail(kind, operation, error);
        }

        self.spawn_async_ring(ctx.committed());

        tracing::info!(
            "Mutation pipeline completed in {:?}: id={:?}",
            ctx.execution_time(),
            ctx.record.id().or(ctx.target_id)
        );

        let entity = (operation != Operation::Delete)
            .then(|| entity_to_api_value(kind, &ctx.record.to_row(), FormatOptions::from_config()));
        MutationEnvelope::success(kind, operation, entity)
    }

    /// Execute observers in a specific ring; the ring's errors are folded into one
    async fn execute_ring(&self, ring: ObserverRing, ctx: &mut MutationContext) -> Result<(), MutationError> {
        let Some(observers) = self.observers.get(&ring) else {
            tracing::debug!("No observers registered for ring {:?}", ring);
            return Ok(());
        };

        for observer in observers {
            if !observer.applies_to(ctx.operation, ctx.kind) {
                tracing::trace!("Observer {} skipped for {:?} {}", observer.name(), ctx.operation, ctx.kind);
                continue;
            }

            let observer_start = Instant::now();
            let result = timeout(observer.timeout(), observer.execute_sync(ctx)).await;
            let execution_time = observer_start.elapsed();

            match result {
                Ok(Ok(())) => {
                    tracing::debug!("Observer: {} completed in {:?}", observer.name(), execution_time);
                }
                Ok(Err(error)) => {
                    tracing::debug!("Observer: {} failed in {:?}: {}", observer.name(), execution_time, error);
                    ctx.errors.push(error);
                    if !ring.collects_all_errors() {
                        break;
                    }
                }
                Err(_elapsed) => {
                    tracing::error!("Observer: {} timed out after {:?}", observer.name(), observer.timeout());
                    ctx.errors.push(MutationError::unexpected(format!(
                        "observer {} timed out after {:?}",
                        observer.name(),
                        observer.timeout()
                    )));
                    break;
                }
            }
        }

        match MutationError::merge(std::mem::take(&mut ctx.errors)) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Post-commit observers run concurrently on a detached task; their failures are logged only
    fn spawn_async_ring(&self, mutation: CommittedMutation) {
        let observers: Vec<Arc<ObserverBox>> = self
            .observers
            .get(&ObserverRing::Audit)
            .into_iter()
            .flatten()
            .filter(|observer| observer.applies_to(mutation.operation, mutation.kind))
            .cloned()
            .collect();
        if observers.is_empty() {
            return;
        }

        let task = async move {
            let mutation = &mutation;
            let runs = observers.iter().map(|observer| async move {
                let result = timeout(observer.timeout(), observer.execute_async(mutation)).await;
                (observer.name(), result)
            });

            for (name, result) in futures::future::join_all(runs).await {
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(error)) => tracing::warn!("Async observer {} failed: {:?}", name, error),
                    Err(_elapsed) => tracing::warn!("Async observer {} timed out", name),
                }
            }
        };
        tokio::spawn(task.in_current_span());
    }

    async fn rollback(ctx: &mut MutationContext) {
        if let Some(tx) = ctx.tx.take() {
            if let Err(error) = tx.rollback().await {
                tracing::error!("Rollback failed: {}", error);
            }
        }
    }

    fn fail(kind: EntityKind, operation: Operation, error: MutationError) -> MutationEnvelope {
        match &error {
            MutationError::Unexpected(detail) => tracing::error!("Mutation failed: {}", detail),
            other => tracing::info!("Mutation rejected: {}", other),
        }
        MutationEnvelope::failure(kind, operation, &error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::Principal;
    use crate::database::bootstrap::ensure_superuser;
    use crate::database::MemoryStore;
    use crate::types::{EntityId, RowData};
    use crate::observer::traits::{AuditObserver, Observer};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct SlowAudit(mpsc::UnboundedSender<Option<EntityId>>);

    impl Observer for SlowAudit {
        fn name(&self) -> &'static str {
            "SlowAudit"
        }

        fn ring(&self) -> ObserverRing {
            ObserverRing::Audit
        }

        fn applies_to_operation(&self, _op: Operation) -> bool {
            true
        }
    }

    #[async_trait]
    impl AuditObserver for SlowAudit {
        async fn execute(&self, mutation: &CommittedMutation) -> Result<(), MutationError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = self.0.send(mutation.entity_id);
            Ok(())
        }
    }

    fn admin() -> AuthContext {
        AuthContext::Authenticated(Principal {
            id: 1,
            username: "admin".into(),
            is_superuser: true,
            is_staff: true,
        })
    }

    #[tokio::test]
    async fn audit_ring_does_not_delay_the_envelope() {
        let (sender, mut audited) = mpsc::unbounded_channel();
        let store = Arc::new(MemoryStore::new());
        ensure_superuser(store.as_ref(), "admin", "admin@example.com", "admin-password").await.unwrap();
        let mut pipeline = MutationPipeline::with_default_observers(store);
        pipeline.register_observer(ObserverBox::Audit(Box::new(SlowAudit(sender))));

        let arguments = json!({ "name": "Acme", "email": "a@acme.com" }).as_object().cloned().unwrap();
        let envelope = pipeline
            .execute(&admin(), MutationRequest::new(Operation::Create, EntityKind::Cleiton, arguments))
            .await;
        assert!(envelope.success, "{:?}", envelope.errors);
        assert!(audited.try_recv().is_err());

        assert_eq!(audited.recv().await, Some(Some(1)));
    }

    #[tokio::test]
    async fn anonymous_callers_are_turned_away_first() {
        let pipeline = MutationPipeline::with_default_observers(Arc::new(MemoryStore::new()));
        let envelope = pipeline
            .execute(
                &AuthContext::Anonymous,
                MutationRequest::new(Operation::Update, EntityKind::Project, RowData::new()),
            )
            .await;
        assert_eq!(envelope.errors.as_deref(), Some("Authentication required."));
    }
}
