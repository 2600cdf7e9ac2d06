use async_trait::async_trait;
use std::time::Duration;

use crate::observer::context::{CommittedMutation, MutationContext};
use crate::observer::error::MutationError;
use crate::schema::EntityKind;
use crate::types::Operation;

/// Observer rings - synchronous (0-4) inside the transaction, asynchronous (5) after commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ObserverRing {
    Resolve = 0,   // Parse arguments, load target and references, ownership chains
    Authorize = 1, // Authorization predicate
    Apply = 2,     // Defaults, sparse update, derived fields
    Validate = 3,  // Field constraints, cross-field rules, uniqueness
    Persist = 4,   // Store writes
    Audit = 5,     // Post-commit logging (async)
}

impl ObserverRing {
    /// Rings run in this order for every mutation
    pub const SYNCHRONOUS: [ObserverRing; 5] = [
        ObserverRing::Resolve,
        ObserverRing::Authorize,
        ObserverRing::Apply,
        ObserverRing::Validate,
        ObserverRing::Persist,
    ];

    /// Validation keeps going after a failure so every violation is reported at once
    pub fn collects_all_errors(&self) -> bool {
        matches!(self, ObserverRing::Validate)
    }
}

/// Base trait for all observers with metadata and applicability checks
pub trait Observer: Send + Sync {
    /// Observer name for logging and debugging
    fn name(&self) -> &'static str;

    /// Which ring this observer belongs to
    fn ring(&self) -> ObserverRing;

    /// Check if observer applies to this operation
    fn applies_to_operation(&self, op: Operation) -> bool;

    /// Check if observer applies to this entity
    fn applies_to_entity(&self, _kind: EntityKind) -> bool {
        true
    }

    /// Execution timeout
    fn timeout(&self) -> Duration {
        Duration::from_millis(crate::config::config().pipeline.observer_timeout_ms)
    }

    /// Priority within ring (lower numbers execute first)
    fn priority(&self) -> u8 {
        50
    }
}

/// Ring 0: Resolve - arguments, target, references, ownership
#[async_trait]
pub trait ResolveObserver: Observer {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError>;
}

/// Ring 1: Authorize
#[async_trait]
pub trait AuthorizeObserver: Observer {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError>;
}

/// Ring 2: Apply - build the candidate record
#[async_trait]
pub trait ApplyObserver: Observer {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError>;
}

/// Ring 3: Validate - check the candidate record
#[async_trait]
pub trait ValidateObserver: Observer {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError>;
}

/// Ring 4: Persist - write through the transaction
#[async_trait]
pub trait PersistObserver: Observer {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError>;
}

/// Ring 5: Audit - runs after commit on a read-only snapshot
#[async_trait]
pub trait AuditObserver: Observer {
    async fn execute(&self, mutation: &CommittedMutation) -> Result<(), MutationError>;
}

/// Concrete observer types for dynamic dispatch
pub enum ObserverBox {
    Resolve(Box<dyn ResolveObserver>),
    Authorize(Box<dyn AuthorizeObserver>),
    Apply(Box<dyn ApplyObserver>),
    Validate(Box<dyn ValidateObserver>),
    Persist(Box<dyn PersistObserver>),
    Audit(Box<dyn AuditObserver>),
}

impl ObserverBox {
    fn observer(&self) -> &dyn Observer {
        match self {
            ObserverBox::Resolve(o) => o.as_ref(),
            ObserverBox::Authorize(o) => o.as_ref(),
            ObserverBox::Apply(o) => o.as_ref(),
            ObserverBox::Validate(o) => o.as_ref(),
            ObserverBox::Persist(o) => o.as_ref(),
            ObserverBox::Audit(o) => o.as_ref(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.observer().name()
    }

    pub fn ring(&self) -> ObserverRing {
        self.observer().ring()
    }

    pub fn priority(&self) -> u8 {
        self.observer().priority()
    }

    pub fn timeout(&self) -> Duration {
        self.observer().timeout()
    }

    pub fn applies_to(&self, op: Operation, kind: EntityKind) -> bool {
        let observer = self.observer();
        observer.applies_to_operation(op) && observer.applies_to_entity(kind)
    }

    pub async fn execute_sync(&self, ctx: &mut MutationContext) -> Result<(), MutationError> {
        match self {
            ObserverBox::Resolve(o) => o.execute(ctx).await,
            ObserverBox::Authorize(o) => o.execute(ctx).await,
            ObserverBox::Apply(o) => o.execute(ctx).await,
            ObserverBox::Validate(o) => o.execute(ctx).await,
            ObserverBox::Persist(o) => o.execute(ctx).await,
            ObserverBox::Audit(_) => Ok(()), // Async observers don't execute in sync phase
        }
    }

    pub async fn execute_async(&self, mutation: &CommittedMutation) -> Result<(), MutationError> {
        match self {
            ObserverBox::Audit(o) => o.execute(mutation).await,
            _ => Ok(()), // Sync observers don't execute in async phase
        }
    }
}
