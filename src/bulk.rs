//! Sequential archive/unarchive over the marked repositories.
//!
//! The machine itself does no I/O. Each [`StepRequest`] it hands out is run by
//! the caller (see [`perform_step`]) and the result is fed back through
//! [`BulkMachine::record`], which either yields the next step or the summary.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::model::{Actor, ChangeAction, ChangeRecord, RepositorySnapshot};
use crate::remote::RepoSource;
use crate::store::{self, SharedCache};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BulkKind {
    Archive,
    Unarchive,
}

impl BulkKind {
    pub fn verb(self) -> &'static str {
        match self {
            BulkKind::Archive => "archive",
            BulkKind::Unarchive => "unarchive",
        }
    }

    pub fn change_action(self) -> ChangeAction {
        match self {
            BulkKind::Archive => ChangeAction::Archived,
            BulkKind::Unarchive => ChangeAction::Unarchived,
        }
    }

    fn target_archived(self) -> bool {
        matches!(self, BulkKind::Archive)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("no repositories marked")]
    Empty,
    #[error("marked set mixes archived and active repositories; unmark one group first")]
    Mixed,
    #[error("a bulk action is already running")]
    Busy,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkPlan {
    pub kind: BulkKind,
    pub items: Vec<RepositorySnapshot>,
}

impl BulkPlan {
    /// All archived means unarchive; none archived means archive.
    pub fn classify(items: Vec<RepositorySnapshot>) -> Result<Self, PlanError> {
        if items.is_empty() {
            return Err(PlanError::Empty);
        }
        let archived = items.iter().filter(|r| r.is_archived).count();
        let kind = if archived == 0 {
            BulkKind::Archive
        } else if archived == items.len() {
            BulkKind::Unarchive
        } else {
            return Err(PlanError::Mixed);
        };
        Ok(Self { kind, items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn step(&self, index: usize) -> Option<StepRequest> {
        self.items.get(index).map(|r| StepRequest {
            index,
            kind: self.kind,
            repo: r.clone(),
        })
    }
}

/// One remote call to perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepRequest {
    pub index: usize,
    pub kind: BulkKind,
    pub repo: RepositorySnapshot,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub succeeded: usize,
    pub failed: usize,
    /// `(full_name, message)` per failed item.
    pub errors: Vec<(String, String)>,
    /// Full names whose remote state now matches the action.
    pub done: Vec<String>,
}

impl Tally {
    fn record(&mut self, full_name: &str, result: Result<(), String>) {
        match result {
            Ok(()) => {
                self.succeeded += 1;
                self.done.push(full_name.to_string());
            }
            Err(msg) => {
                self.failed += 1;
                self.errors.push((full_name.to_string(), msg));
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkSummary {
    pub kind: BulkKind,
    pub total: usize,
    pub tally: Tally,
}

impl BulkSummary {
    /// Removes the marks of items that reached the target state.
    pub fn prune_marks(&self, marks: &mut BTreeSet<String>) {
        for full in &self.tally.done {
            marks.remove(full);
        }
    }

    pub fn banner(&self) -> String {
        let mut msg = format!(
            "{}: {} succeeded, {} failed",
            self.kind.verb(),
            self.tally.succeeded,
            self.tally.failed
        );
        if let Some((name, err)) = self.tally.errors.first() {
            msg.push_str(&format!(" (first error: {name}: {err})"));
        }
        msg
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BulkState {
    #[default]
    Idle,
    Confirming(BulkPlan),
    Processing {
        plan: BulkPlan,
        index: usize,
        tally: Tally,
    },
    Complete(BulkSummary),
}

pub enum Advance {
    Step(StepRequest),
    Done(BulkSummary),
}

#[derive(Debug, Default)]
pub struct BulkMachine {
    state: BulkState,
}

impl BulkMachine {
    pub fn state(&self) -> &BulkState {
        &self.state
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.state, BulkState::Processing { .. })
    }

    /// `(done, total)` while processing.
    pub fn progress(&self) -> Option<(usize, usize)> {
        match &self.state {
            BulkState::Processing { plan, index, .. } => Some((*index, plan.len())),
            _ => None,
        }
    }

    /// Snapshots the marked repositories and enters confirmation. On error the
    /// state is unchanged.
    pub fn begin(&mut self, marked: Vec<RepositorySnapshot>) -> Result<&BulkPlan, PlanError> {
        if matches!(
            self.state,
            BulkState::Processing { .. } | BulkState::Confirming(_)
        ) {
            return Err(PlanError::Busy);
        }
        let plan = BulkPlan::classify(marked)?;
        self.state = BulkState::Confirming(plan);
        match &self.state {
            BulkState::Confirming(plan) => Ok(plan),
            _ => Err(PlanError::Busy),
        }
    }

    pub fn cancel(&mut self) {
        if matches!(self.state, BulkState::Confirming(_)) {
            self.state = BulkState::Idle;
        }
    }

    /// Moves from confirmation to the first step.
    pub fn confirm(&mut self) -> Option<StepRequest> {
        let BulkState::Confirming(plan) = std::mem::take(&mut self.state) else {
            return None;
        };
        let first = plan.step(0);
        self.state = BulkState::Processing {
            plan,
            index: 0,
            tally: Tally::default(),
        };
        first
    }

    /// Feeds back the result of step `index`. A result for any other index is
    /// ignored.
    pub fn record(&mut self, index: usize, result: Result<(), String>) -> Option<Advance> {
        let BulkState::Processing {
            plan,
            index: current,
            tally,
        } = &mut self.state
        else {
            return None;
        };
        if index != *current {
            tracing::warn!(index, expected = *current, "ignoring out-of-order bulk result");
            return None;
        }
        let full = plan.items.get(index).map(|r| r.full_name.clone())?;
        tally.record(&full, result);
        *current += 1;

        if let Some(next) = plan.step(*current) {
            return Some(Advance::Step(next));
        }
        let summary = BulkSummary {
            kind: plan.kind,
            total: plan.len(),
            tally: std::mem::take(tally),
        };
        self.state = BulkState::Complete(summary.clone());
        Some(Advance::Done(summary))
    }

    /// Leaves `Complete` so the next action can begin.
    pub fn reset(&mut self) {
        if matches!(self.state, BulkState::Complete(_)) {
            self.state = BulkState::Idle;
        }
    }
}

/// Runs one step against the remote and, on success, updates the cached flag
/// and appends the audit record. Blocking.
///
/// Cache failures after a remote success are logged; the remote is the source
/// of truth and the next refresh repairs the cache.
pub fn perform_step(
    source: &dyn RepoSource,
    cache: &SharedCache,
    step: &StepRequest,
) -> Result<(), String> {
    let repo = &step.repo;
    let res = match step.kind {
        BulkKind::Archive => source.archive(&repo.owner, &repo.name),
        BulkKind::Unarchive => source.unarchive(&repo.owner, &repo.name),
    };
    if let Err(err) = res {
        tracing::warn!(repo = %repo.full_name, action = step.kind.verb(), error = %err, "bulk step failed");
        return Err(err.to_string());
    }

    let mut after = repo.clone();
    after.is_archived = step.kind.target_archived();
    let change = ChangeRecord::new(&repo.owner, &repo.name, step.kind.change_action(), Actor::User)
        .with_states(Some(repo), Some(&after));
    let written = store::lock(cache).and_then(|mut c| {
        c.set_archived(&repo.owner, &repo.name, after.is_archived)?;
        c.record_change(&change)
    });
    if let Err(err) = written {
        tracing::warn!(repo = %repo.full_name, error = %err, "cache update after bulk step failed");
    }
    tracing::info!(repo = %repo.full_name, action = step.kind.verb(), "bulk step done");
    Ok(())
}

#[cfg(test)]
#[path = "tests/bulk_tests.rs"]
mod tests;
