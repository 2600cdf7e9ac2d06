// Ring 1: Authorization - the single predicate every mutation passes through
use async_trait::async_trait;

use crate::authz::{authorize, AccessRequest, Decision};
use crate::observer::context::MutationContext;
use crate::observer::error::MutationError;
use crate::observer::traits::{AuthorizeObserver, Observer, ObserverRing};
use crate::types::Operation;

#[derive(Default)]
pub struct AuthorizationCheck;

impl Observer for AuthorizationCheck {
    fn name(&self) -> &'static str {
        "AuthorizationCheck"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Authorize
    }

    fn applies_to_operation(&self, _op: Operation) -> bool {
        true
    }
}

#[async_trait]
impl AuthorizeObserver for AuthorizationCheck {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError> {
        let Some(request) = ctx.get_metadata::<AccessRequest>() else {
            return Err(MutationError::unexpected("ownership was not resolved before authorization"));
        };

        match authorize(&ctx.principal, request) {
            Decision::Allowed(tier) => {
                tracing::debug!("Principal {} allowed as {:?}", ctx.principal.id, tier);
                Ok(())
            }
            Decision::Denied => {
                tracing::info!(
                    "Principal {} denied {:?} on {} (owners: {:?})",
                    ctx.principal.id,
                    request.operation,
                    request.kind,
                    request.owners
                );
                Err(MutationError::PermissionDenied)
            }
        }
    }
}
