// Mutation pipeline: every create/update/delete runs through ring-ordered
// observers inside one store transaction.

pub mod context;
pub mod envelope;
pub mod error;
pub mod implementations;
pub mod pipeline;
pub mod traits;

// Re-export core types
pub use context::{CommittedMutation, MutationContext, ResolvedReferences};
pub use envelope::{MutationEnvelope, MutationRequest};
pub use error::MutationError;
pub use pipeline::MutationPipeline;
pub use traits::{Observer, ObserverBox, ObserverRing};
