//! Stages and progress events for orchestrated ledger operations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A step of a deployment or verification.
///
/// Verification uses a subset: `Preparing`, `TransactionBuilt`, `Signed`,
/// `Submitted`, `Confirmed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preparing,
    CostEstimated,
    AccountCreated,
    PayloadAttached,
    TransactionBuilt,
    Signed,
    Submitted,
    Confirmed,
}

impl Stage {
    /// Human-readable label shown next to the progress bar. Every stage but
    /// `Preparing` is reported after its work completes, so labels read as done.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Preparing => "Preparing",
            Self::CostEstimated => "Cost estimated",
            Self::AccountCreated => "Verifier account created",
            Self::PayloadAttached => "Verification key attached",
            Self::TransactionBuilt => "Transaction built",
            Self::Signed => "Signed",
            Self::Submitted => "Submitted",
            Self::Confirmed => "Confirmed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Preparing => "preparing",
            Self::CostEstimated => "cost_estimated",
            Self::AccountCreated => "account_created",
            Self::PayloadAttached => "payload_attached",
            Self::TransactionBuilt => "transaction_built",
            Self::Signed => "signed",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
        };
        f.write_str(name)
    }
}

/// One progress event: the stage just reached and the overall percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub stage: Stage,
    pub percent: u8,
    pub label: &'static str,
}

/// Emits progress events in table order for one orchestrated call.
///
/// The callback runs inline on the caller's task, so it must not block.
pub(crate) struct ProgressReporter<'a> {
    table: &'static [(Stage, u8)],
    callback: &'a mut (dyn FnMut(Progress) + Send),
    last: u8,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(
        table: &'static [(Stage, u8)],
        callback: &'a mut (dyn FnMut(Progress) + Send),
    ) -> Self {
        Self {
            table,
            callback,
            last: 0,
        }
    }

    /// Report that `stage` has been reached.
    pub(crate) fn reach(&mut self, stage: Stage) {
        let percent = self
            .table
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, p)| *p)
            .unwrap_or(self.last);
        debug_assert!(percent >= self.last, "progress must not go backwards");
        self.last = percent.max(self.last);
        tracing::debug!(%stage, percent, "progress");
        (self.callback)(Progress {
            stage,
            percent: self.last,
            label: stage.label(),
        });
    }
}
