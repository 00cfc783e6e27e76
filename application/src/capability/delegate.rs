//! Delegate capability: invoking another stage as a tool

use crate::stages::StageInput;
use async_trait::async_trait;
use atlance_domain::{
    CapabilityError, CapabilityGrant, CapabilityKind, StageError, StageId, StageOutput,
    ToolDefinition, ToolParameter,
};
use std::sync::Arc;

/// One delegation call, identified by the provider's call id.
#[derive(Debug, Clone)]
pub struct DelegationRequest {
    pub call_id: String,
    pub stage: StageId,
    pub input: StageInput,
}

/// Routes a delegation call to the sub-stage it names.
///
/// Implemented by the coordinator, which runs the sub-stage against the
/// current run context and records the result under the call id.
#[async_trait]
pub trait DelegateRouter: Send + Sync {
    async fn route(&self, request: DelegationRequest) -> Result<Arc<StageOutput>, StageError>;
}

/// Delegation granted to a stage, restricted to the targets its grant names.
#[derive(Clone)]
pub struct DelegateCapability {
    grant: CapabilityGrant,
    router: Arc<dyn DelegateRouter>,
}

impl DelegateCapability {
    pub fn new(grant: CapabilityGrant, router: Arc<dyn DelegateRouter>) -> Self {
        Self { grant, router }
    }

    pub fn targets(&self) -> impl Iterator<Item = StageId> + '_ {
        self.grant.delegates()
    }

    /// Invoke `stage` and return its validated result or its failure.
    pub async fn invoke(
        &self,
        call_id: impl Into<String>,
        stage: StageId,
        input: StageInput,
    ) -> Result<Arc<StageOutput>, CapabilityError> {
        if !self.grant.allows_delegation_to(stage) {
            return Err(CapabilityError::NotGranted {
                capability: CapabilityKind::Delegate,
                detail: format!("{} is not a delegate of this stage", stage),
            });
        }

        let request = DelegationRequest {
            call_id: call_id.into(),
            stage,
            input,
        };
        self.router
            .route(request)
            .await
            .map_err(|e| CapabilityError::Delegation {
                stage,
                source: Box::new(e),
            })
    }

    /// One tool per delegate target, in a stable order.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.targets()
            .map(|stage| {
                ToolDefinition::new(stage.as_str(), stage.description())
                    .with_parameter(
                        ToolParameter::new(
                            "indices",
                            "0-based indices of the photos to work on; defaults to the current selection",
                            false,
                        )
                        .array_of("integer"),
                    )
                    .with_parameter(ToolParameter::new(
                        "note",
                        "Extra guidance for this call",
                        false,
                    ))
            })
            .collect()
    }
}
