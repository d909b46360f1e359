// ABOUTME: Error types for the blue-green orchestrator.
// ABOUTME: Phase wrappers carry sources; kinds classify for rollback.

use thiserror::Error;

use crate::fleet::FleetError;
use crate::types::InvalidGenerationTag;

/// Errors from a blue-green deployment.
///
/// Each phase wraps its root cause in its own variant, so a caller deciding
/// how to roll back can classify the failure by [`DeployError::kind`]
/// instead of probing error messages.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("deployment aborted by user")]
    Aborted,

    #[error("wait timeout")]
    WaitTimeout,

    #[error("app can't undergo bluegreen deployment due to org limits")]
    OrgLimit,

    #[error("app not in valid state for bluegreen deployments")]
    Validation,

    #[error(transparent)]
    InvalidTag(#[from] InvalidGenerationTag),

    #[error(transparent)]
    Fleet(#[from] FleetError),

    /// Stop-wait partial failure: some blue machines never reached
    /// `stopped`. Non-fatal; force-destroy follows.
    #[error("{} blue machine(s) failed to stop", errors.len())]
    StopIncomplete { errors: Vec<String> },

    /// Destroy partial failure: the hanging machines need manual cleanup.
    #[error("{count} blue machine(s) could not be destroyed")]
    DestroyIncomplete { count: usize },

    #[error("failed to create green machines")]
    CreateGreenMachines(#[source] Box<DeployError>),

    #[error("could not get all green machines into started state")]
    WaitForStartedState(#[source] Box<DeployError>),

    #[error("could not get all green machines to be healthy")]
    WaitForHealthy(#[source] Box<DeployError>),

    #[error("failed to mark green machines as ready")]
    MarkReadyForTraffic(#[source] Box<DeployError>),

    #[error("failed to cordon blue machines")]
    CordonBlueMachines(#[source] Box<DeployError>),

    #[error("failed to stop blue machines")]
    StopBlueMachines(#[source] Box<DeployError>),

    #[error("could not get all blue machines into stopped state")]
    WaitForStoppedState(#[source] Box<DeployError>),

    #[error("failed to destroy previous deployment")]
    DestroyBlueMachines(#[source] Box<DeployError>),
}

/// Flat classification of a deployment failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Aborted,
    WaitTimeout,
    OrgLimit,
    ValidationError,
    Fleet,
    CreateGreenMachine,
    WaitForStartedState,
    WaitForHealthy,
    MarkReadyForTraffic,
    CordonBlueMachines,
    StopBlueMachines,
    WaitForStoppedState,
    DestroyBlueMachines,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Aborted => DeployErrorKind::Aborted,
            DeployError::WaitTimeout => DeployErrorKind::WaitTimeout,
            DeployError::OrgLimit => DeployErrorKind::OrgLimit,
            DeployError::Validation => DeployErrorKind::ValidationError,
            DeployError::InvalidTag(_) => DeployErrorKind::ValidationError,
            DeployError::Fleet(_) => DeployErrorKind::Fleet,
            DeployError::StopIncomplete { .. } => DeployErrorKind::WaitForStoppedState,
            DeployError::DestroyIncomplete { .. } => DeployErrorKind::DestroyBlueMachines,
            DeployError::CreateGreenMachines(_) => DeployErrorKind::CreateGreenMachine,
            DeployError::WaitForStartedState(_) => DeployErrorKind::WaitForStartedState,
            DeployError::WaitForHealthy(_) => DeployErrorKind::WaitForHealthy,
            DeployError::MarkReadyForTraffic(_) => DeployErrorKind::MarkReadyForTraffic,
            DeployError::CordonBlueMachines(_) => DeployErrorKind::CordonBlueMachines,
            DeployError::StopBlueMachines(_) => DeployErrorKind::StopBlueMachines,
            DeployError::WaitForStoppedState(_) => DeployErrorKind::WaitForStoppedState,
            DeployError::DestroyBlueMachines(_) => DeployErrorKind::DestroyBlueMachines,
        }
    }

    /// Whether the user's abort is anywhere in the chain.
    pub fn is_aborted(&self) -> bool {
        match self {
            DeployError::Aborted => true,
            DeployError::CreateGreenMachines(inner)
            | DeployError::WaitForStartedState(inner)
            | DeployError::WaitForHealthy(inner)
            | DeployError::MarkReadyForTraffic(inner)
            | DeployError::CordonBlueMachines(inner)
            | DeployError::StopBlueMachines(inner)
            | DeployError::WaitForStoppedState(inner)
            | DeployError::DestroyBlueMachines(inner) => inner.is_aborted(),
            _ => false,
        }
    }
}
