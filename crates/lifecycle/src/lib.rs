pub mod error;
pub mod readiness;
pub mod reclamation;

pub use error::LifecycleError;
pub use readiness::{wait_for_server_up, wait_until_ready};
pub use reclamation::{ReclamationPolicy, StaleAction, SweepReport, Sweeper, sweep_once};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use gitopsdb_core::{
    ClusterUserId, GitopsEngineInstanceId, Operation, OperationId, OperationState, OperationTarget,
};
use gitopsdb_storage::OperationRepository;

/// Everything a caller supplies when enqueueing work. The target enum is
/// the validation boundary: an operation can only be created against a
/// known table.
#[derive(Debug, Clone)]
pub struct NewOperation {
    pub operation_id: OperationId,
    pub instance_id: GitopsEngineInstanceId,
    pub target: OperationTarget,
    pub owner_user_id: ClusterUserId,
    pub human_readable_state: String,
}

#[derive(Debug)]
pub enum ClaimOutcome {
    Claimed(Operation),
    /// The row is no longer `Waiting`: another worker got there first.
    /// Not an error; try a different operation.
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    Completed,
    Failed,
}

impl OperationOutcome {
    fn state(self) -> OperationState {
        match self {
            Self::Completed => OperationState::Completed,
            Self::Failed => OperationState::Failed,
        }
    }
}

/// The operation lifecycle protocol over an explicit store handle.
///
/// Mutual exclusion between the independent processes sharing the store
/// (API writers, worker pools, the reclamation sweep) lives entirely in
/// the conditional writes underneath; this type holds no locks.
pub struct OperationEngine<S> {
    store: S,
}

impl<S: OperationRepository> OperationEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Insert a `Waiting` operation row with `created_on` and
    /// `last_state_update` both set to `now`.
    pub fn create(
        &mut self,
        new_op: NewOperation,
        now: DateTime<Utc>,
    ) -> Result<Operation, LifecycleError> {
        let mut op = Operation {
            operation_id: new_op.operation_id,
            seq_id: 0,
            instance_id: new_op.instance_id,
            resource_id: new_op.target.resource_id().to_string(),
            resource_type: new_op.target.resource_type().to_string(),
            operation_owner_user_id: new_op.owner_user_id,
            created_on: now,
            last_state_update: now,
            state: OperationState::Waiting,
            human_readable_state: new_op.human_readable_state,
        };
        op.seq_id = self.store.create_operation(&op)?;
        debug!(
            operation = %op.operation_id,
            resource_type = %op.resource_type,
            "operation created"
        );
        Ok(op)
    }

    /// Atomically take ownership of a `Waiting` operation. At most one
    /// claimer succeeds; everyone else observes [`ClaimOutcome::Lost`].
    pub fn claim(
        &mut self,
        id: &OperationId,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome, LifecycleError> {
        let moved = self.store.compare_and_swap_operation_state(
            id,
            OperationState::Waiting,
            OperationState::InProgress,
            None,
            now,
        )?;
        if !moved {
            // Distinguish a lost race from a key that never existed.
            self.store.get_operation(id)?;
            return Ok(ClaimOutcome::Lost);
        }
        let op = self.store.get_operation(id)?;
        debug!(operation = %op.operation_id, "operation claimed");
        Ok(ClaimOutcome::Claimed(op))
    }

    /// Claim the first still-claimable `Waiting` operation, if any.
    pub fn claim_next(&mut self, now: DateTime<Utc>) -> Result<Option<Operation>, LifecycleError> {
        for candidate in self.store.list_waiting_operations()? {
            if let ClaimOutcome::Claimed(op) = self.claim(&candidate.operation_id, now)? {
                return Ok(Some(op));
            }
        }
        Ok(None)
    }

    /// Move a claimed operation to its terminal state, recording the
    /// outcome detail. Fails with `InvalidTransition` if the row is not
    /// `In_Progress` — a racing duplicate finalizer must never silently
    /// overwrite the first outcome.
    pub fn finalize(
        &mut self,
        id: &OperationId,
        outcome: OperationOutcome,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<Operation, LifecycleError> {
        let to = outcome.state();
        let moved = self.store.compare_and_swap_operation_state(
            id,
            OperationState::InProgress,
            to,
            Some(message),
            now,
        )?;
        if moved {
            let op = self.store.get_operation(id)?;
            info!(
                operation = %op.operation_id,
                state = op.state.as_str(),
                "operation finalized"
            );
            return Ok(op);
        }
        let current = self.store.get_operation(id)?;
        Err(LifecycleError::InvalidTransition {
            from: current.state,
            to,
        })
    }

    /// Side-effect-free read, for callers polling on completion.
    pub fn observe(&self, id: &OperationId) -> Result<Operation, LifecycleError> {
        Ok(self.store.get_operation(id)?)
    }
}
