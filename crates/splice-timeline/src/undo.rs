//! Reversible actions, transactions and the undo stack.
//!
//! Every mutation of the store is a primitive step that is applied right
//! away and records a pair of actions: one that puts the store back, one
//! that replays the step. A [`Transaction`] collects the pairs of one
//! request. If a later step fails, the transaction is rolled back by running
//! the collected undo actions newest-first; if all steps succeed, the pairs
//! are folded into a single [`UndoStack`] entry.

use splice_core::{Result, TimelineError};
use std::fmt;
use std::sync::Arc;

use crate::store::TimelineStore;

type Action = dyn Fn(&mut TimelineStore) -> Result<()> + Send + Sync;

/// A reversible action over the store.
#[derive(Clone)]
pub struct Fun(Arc<Action>);

impl Fun {
    pub fn new(f: impl Fn(&mut TimelineStore) -> Result<()> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn noop() -> Self {
        Self::new(|_| Ok(()))
    }

    pub fn call(&self, store: &mut TimelineStore) -> Result<()> {
        (self.0)(store)
    }
}

impl fmt::Debug for Fun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Fun(..)")
    }
}

/// Undo/redo fragments of one request, in application order.
#[derive(Debug, Default)]
pub struct Transaction {
    steps: Vec<(Fun, Fun)>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step that has already been applied.
    pub fn record(&mut self, undo: Fun, redo: Fun) {
        self.steps.push((undo, redo));
    }

    /// Append the steps of a finished nested transaction.
    pub fn absorb(&mut self, other: Transaction) {
        self.steps.extend(other.steps);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Undo every recorded step, newest first.
    ///
    /// Each undo action restores a state that was valid when its step ran,
    /// so a failure here means the store is corrupt; it is logged and the
    /// remaining steps are still attempted.
    pub fn rollback(self, store: &mut TimelineStore) {
        for (undo, _) in self.steps.into_iter().rev() {
            if let Err(err) = undo.call(store) {
                tracing::error!(%err, "rollback step failed");
            }
        }
    }

    /// Fold the steps into one undo action and one redo action.
    ///
    /// Both actions are all-or-nothing: if a step fails halfway, the steps
    /// already replayed are reverted before the error is returned.
    pub fn into_actions(self) -> (Fun, Fun) {
        let (undos, redos): (Vec<Fun>, Vec<Fun>) = self.steps.into_iter().unzip();
        let (undos, redos) = (Arc::new(undos), Arc::new(redos));

        let (u, r) = (Arc::clone(&undos), Arc::clone(&redos));
        let undo = Fun::new(move |store| {
            for i in (0..u.len()).rev() {
                if let Err(err) = u[i].call(store) {
                    compensate(store, r[i + 1..].iter());
                    return Err(err);
                }
            }
            Ok(())
        });
        let redo = Fun::new(move |store| {
            for i in 0..redos.len() {
                if let Err(err) = redos[i].call(store) {
                    compensate(store, undos[..i].iter().rev());
                    return Err(err);
                }
            }
            Ok(())
        });
        (undo, redo)
    }
}

/// Put back the steps of a replay that failed partway.
fn compensate<'a>(store: &mut TimelineStore, steps: impl Iterator<Item = &'a Fun>) {
    for step in steps {
        if let Err(err) = step.call(store) {
            tracing::error!(%err, "could not revert partial replay");
        }
    }
}

/// A single entry in the undo/redo history.
#[derive(Debug, Clone)]
pub struct UndoEntry {
    /// Human-readable label describing the action (e.g., "Move clip").
    pub label: String,
    undo: Fun,
    redo: Fun,
}

/// Linear undo/redo history with a cursor.
///
/// Entries before the cursor can be undone, entries at or after it can be
/// redone. The stack never merges or drops entries on its own; pushing
/// after an undo discards the redo tail.
#[derive(Debug, Default)]
pub struct UndoStack {
    entries: Vec<UndoEntry>,
    cursor: usize,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, discarding anything that could still be redone.
    pub fn push(&mut self, undo: Fun, redo: Fun, label: impl Into<String>) {
        self.entries.truncate(self.cursor);
        self.entries.push(UndoEntry {
            label: label.into(),
            undo,
            redo,
        });
        self.cursor = self.entries.len();
    }

    /// Run the undo action of the entry before the cursor.
    pub fn undo(&mut self, store: &mut TimelineStore) -> Result<&str> {
        if self.cursor == 0 {
            return Err(TimelineError::NothingToUndo);
        }
        let entry = &self.entries[self.cursor - 1];
        entry.undo.call(store)?;
        self.cursor -= 1;
        tracing::debug!(label = %entry.label, cursor = self.cursor, "Undo");
        Ok(&entry.label)
    }

    /// Run the redo action of the entry at the cursor.
    pub fn redo(&mut self, store: &mut TimelineStore) -> Result<&str> {
        let Some(entry) = self.entries.get(self.cursor) else {
            return Err(TimelineError::NothingToRedo);
        };
        entry.redo.call(store)?;
        self.cursor += 1;
        tracing::debug!(label = %entry.label, cursor = self.cursor, "Redo");
        Ok(&entry.label)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Label of the entry the next `undo` would revert.
    pub fn undo_label(&self) -> Option<&str> {
        self.cursor
            .checked_sub(1)
            .map(|i| self.entries[i].label.as_str())
    }

    /// Label of the entry the next `redo` would replay.
    pub fn redo_label(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(|e| e.label.as_str())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Total number of entries, undoable and redoable.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

}
