//! All-or-nothing execution of one unit of work.
//!
//! State machine per unit of work: `Idle -> Active -> Committed | RolledBack`.
//!
//! # Invariants
//! - Rollback is attempted only while the transaction is still active.
//! - The error that triggered rollback is the one returned; a failed
//!   rollback is logged and dropped.
//! - A failed `begin` never triggers a rollback.
//! - A transaction left open by a failed rollback is rolled back again
//!   before the next unit of work begins.

use crate::db::session::TransactionControl;
use crate::repo::error::{RepoError, RepoResult, TransactionStage};
use log::{debug, info, warn};

/// State of the executor's current or most recent unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Active,
    Committed,
    RolledBack,
}

/// Terminal state of a finished unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Committed,
    RolledBack,
}

#[derive(Debug)]
pub struct TransactionExecutor {
    state: TransactionState,
}

impl Default for TransactionExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionExecutor {
    pub fn new() -> Self {
        Self {
            state: TransactionState::Idle,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Outcome of the last finished unit of work, if it reached one.
    pub fn last_outcome(&self) -> Option<TransactionOutcome> {
        match self.state {
            TransactionState::Committed => Some(TransactionOutcome::Committed),
            TransactionState::RolledBack => Some(TransactionOutcome::RolledBack),
            TransactionState::Idle | TransactionState::Active => None,
        }
    }

    /// Runs `work` between begin and commit on `control`.
    pub fn run<C, T, F>(&mut self, control: &C, work: F) -> RepoResult<T>
    where
        C: TransactionControl + ?Sized,
        F: FnOnce(&C) -> RepoResult<T>,
    {
        self.recover_stale(control);
        self.state = TransactionState::Idle;

        if let Err(source) = control.begin() {
            warn!("event=tx_begin module=repo status=error error={source}");
            return Err(RepoError::Transaction {
                stage: TransactionStage::Begin,
                source,
            });
        }
        self.state = TransactionState::Active;

        let result = work(control).and_then(|value| {
            control
                .commit()
                .map(|()| value)
                .map_err(|source| RepoError::Transaction {
                    stage: TransactionStage::Commit,
                    source,
                })
        });

        match result {
            Ok(value) => {
                self.state = TransactionState::Committed;
                debug!("event=tx_commit module=repo status=ok");
                Ok(value)
            }
            Err(err) => {
                self.roll_back(control, &err);
                Err(err)
            }
        }
    }

    fn recover_stale<C>(&mut self, control: &C)
    where
        C: TransactionControl + ?Sized,
    {
        if self.state != TransactionState::Active || !control.is_active() {
            return;
        }
        match control.rollback() {
            Ok(()) => {
                self.state = TransactionState::RolledBack;
                info!("event=tx_recover module=repo status=ok");
            }
            Err(err) => {
                warn!("event=tx_recover module=repo status=error error={err}");
            }
        }
    }

    fn roll_back<C>(&mut self, control: &C, cause: &RepoError)
    where
        C: TransactionControl + ?Sized,
    {
        if self.state != TransactionState::Active {
            return;
        }
        if !control.is_active() {
            // The store already discarded the transaction.
            self.state = TransactionState::RolledBack;
            debug!(
                "event=tx_rollback module=repo status=skipped reason=inactive error_code={}",
                cause.code()
            );
            return;
        }

        match control.rollback() {
            Ok(()) => {
                self.state = TransactionState::RolledBack;
                info!(
                    "event=tx_rollback module=repo status=ok error_code={}",
                    cause.code()
                );
            }
            Err(rollback_err) => {
                warn!(
                    "event=tx_rollback module=repo status=error error_code={} error={rollback_err}",
                    cause.code()
                );
            }
        }
    }
}
