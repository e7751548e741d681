// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Canonical state store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::config::SignalLayout;
use crate::error::{Error, Result};

use super::{InputVector, OutputPatch, OutputState, StateChange};

/// Immutable view of the canonical state at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    outputs: OutputState,
    inputs: InputVector,
    revision: u64,
    updated_at: Option<DateTime<Utc>>,
}

impl StateSnapshot {
    /// Output values.
    #[must_use]
    pub fn outputs(&self) -> &OutputState {
        &self.outputs
    }

    /// Input values.
    #[must_use]
    pub fn inputs(&self) -> &InputVector {
        &self.inputs
    }

    /// Number of mutations that changed at least one value.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// When the last changing mutation was applied; `None` before the
    /// first one.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

/// Holds the reconciled outputs and inputs.
///
/// Every mutation builds a new [`StateSnapshot`] and swaps it in while the
/// write lock is held, so readers only ever see complete snapshots. After
/// [`seal`](Self::seal) all mutations fail with [`Error::SessionClosed`].
///
/// # Examples
///
/// ```
/// use plc_link::config::SignalLayout;
/// use plc_link::state::{OutputPatch, StateStore};
///
/// let store = StateStore::new(&SignalLayout::default());
/// store.apply_output_patch(&OutputPatch::new().with("M21", true)).unwrap();
///
/// assert_eq!(store.outputs().get("M21"), Some(true));
/// assert_eq!(store.outputs().get("M20"), Some(false));
/// ```
#[derive(Debug)]
pub struct StateStore {
    current: RwLock<Arc<StateSnapshot>>,
    sealed: AtomicBool,
}

impl StateStore {
    /// Creates an all-off store for the layout.
    #[must_use]
    pub fn new(layout: &SignalLayout) -> Self {
        let snapshot = StateSnapshot {
            outputs: OutputState::new(layout),
            inputs: InputVector::new(layout.input_count()),
            revision: 0,
            updated_at: None,
        };
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            sealed: AtomicBool::new(false),
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<StateSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Returns a copy of the current outputs.
    #[must_use]
    pub fn outputs(&self) -> OutputState {
        self.current.read().outputs.clone()
    }

    /// Returns a copy of the current inputs.
    #[must_use]
    pub fn inputs(&self) -> InputVector {
        self.current.read().inputs.clone()
    }

    /// Returns the current value of one output.
    #[must_use]
    pub fn output(&self, key: &str) -> Option<bool> {
        self.current.read().outputs.get(key)
    }

    /// Merges the listed outputs, leaving all others untouched.
    ///
    /// Returns the change of the values that actually moved.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownOutput` if the patch names a key outside the
    /// layout (nothing is applied), or `Error::SessionClosed` once sealed.
    pub fn apply_output_patch(&self, patch: &OutputPatch) -> Result<Option<StateChange>> {
        self.mutate(|next| {
            let mut indexed = Vec::with_capacity(patch.len());
            for (key, value) in patch.iter() {
                let index = next
                    .outputs
                    .index_of(key)
                    .ok_or_else(|| Error::UnknownOutput(key.to_string()))?;
                indexed.push((index, value));
            }
            let mut changes = Vec::new();
            for (index, value) in indexed {
                if next.outputs.set_at(index, value) {
                    changes.push(StateChange::output(next.outputs.key_at(index), value));
                }
            }
            Ok(changes)
        })
    }

    /// Replaces every output with the positional values.
    ///
    /// # Errors
    ///
    /// Returns `Error::LengthMismatch` unless there is exactly one value per
    /// output, or `Error::SessionClosed` once sealed.
    pub fn replace_outputs(&self, values: &[bool]) -> Result<Option<StateChange>> {
        self.mutate(|next| {
            if values.len() != next.outputs.len() {
                return Err(Error::LengthMismatch {
                    expected: next.outputs.len(),
                    actual: values.len(),
                });
            }
            let mut changes = Vec::new();
            for (index, value) in values.iter().copied().enumerate() {
                if next.outputs.set_at(index, value) {
                    changes.push(StateChange::output(next.outputs.key_at(index), value));
                }
            }
            Ok(changes)
        })
    }

    /// Replaces the whole input vector.
    ///
    /// # Errors
    ///
    /// Returns `Error::LengthMismatch` unless the vector has the configured
    /// length, or `Error::SessionClosed` once sealed.
    pub fn replace_inputs(&self, inputs: InputVector) -> Result<Option<StateChange>> {
        self.mutate(|next| {
            if inputs.len() != next.inputs.len() {
                return Err(Error::LengthMismatch {
                    expected: next.inputs.len(),
                    actual: inputs.len(),
                });
            }
            let changes = next
                .inputs
                .diff(&inputs)
                .map(|(index, value)| StateChange::input(index, value))
                .collect();
            next.inputs = inputs;
            Ok(changes)
        })
    }

    /// Freezes the store; later mutations fail.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    /// Returns `true` once the store has been sealed.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Applies `f` to a copy of the current snapshot and swaps it in if any
    /// value changed.
    fn mutate<F>(&self, f: F) -> Result<Option<StateChange>>
    where
        F: FnOnce(&mut StateSnapshot) -> Result<Vec<StateChange>>,
    {
        let mut guard = self.current.write();
        if self.is_sealed() {
            return Err(Error::SessionClosed);
        }

        let mut next = StateSnapshot::clone(&guard);
        let changes = f(&mut next)?;
        if changes.is_empty() {
            return Ok(None);
        }

        next.revision += 1;
        next.updated_at = Some(Utc::now());
        *guard = Arc::new(next);
        Ok(StateChange::collapse(changes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> StateStore {
        StateStore::new(&SignalLayout::default())
    }

    #[test]
    fn starts_all_off() {
        let store = store();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.outputs().values(), [false; 4]);
        assert_eq!(snapshot.inputs().len(), 8);
        assert_eq!(snapshot.revision(), 0);
        assert!(snapshot.updated_at().is_none());
    }

    #[test]
    fn patch_changes_only_listed_keys() {
        let store = store();
        store.replace_outputs(&[true, false, true, false]).unwrap();

        let change = store
            .apply_output_patch(&OutputPatch::new().with("M21", true))
            .unwrap();

        assert_eq!(change, Some(StateChange::output("M21", true)));
        assert_eq!(store.outputs().values(), [true, true, true, false]);
    }

    #[test]
    fn patch_with_unknown_key_applies_nothing() {
        let store = store();
        let patch = OutputPatch::new().with("M20", true).with("X9", true);

        let err = store.apply_output_patch(&patch).unwrap_err();

        assert!(matches!(err, Error::UnknownOutput(ref k) if k == "X9"));
        assert_eq!(store.output("M20"), Some(false));
        assert_eq!(store.snapshot().revision(), 0);
    }

    #[test]
    fn unchanged_values_produce_no_change() {
        let store = store();
        let change = store
            .apply_output_patch(&OutputPatch::new().with("M20", false))
            .unwrap();
        assert!(change.is_none());
        assert_eq!(store.snapshot().revision(), 0);
    }

    #[test]
    fn replace_outputs_is_positional() {
        let store = store();
        let change = store.replace_outputs(&[true, false, false, true]).unwrap();

        let outputs = store.outputs();
        assert_eq!(outputs.get("M20"), Some(true));
        assert_eq!(outputs.get("M21"), Some(false));
        assert_eq!(outputs.get("M22"), Some(false));
        assert_eq!(outputs.get("M23"), Some(true));
        assert_eq!(change.unwrap().change_count(), 2);
    }

    #[test]
    fn replace_outputs_requires_exact_length() {
        let store = store();
        let err = store.replace_outputs(&[true]).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 4,
                actual: 1
            }
        ));
    }

    #[test]
    fn replace_inputs_swaps_vector() {
        let store = store();
        let inputs = InputVector::from_bits([1, 1, 0, 0, 0, 0, 0, 0]);

        let change = store.replace_inputs(inputs.clone()).unwrap().unwrap();

        assert_eq!(store.inputs(), inputs);
        assert_eq!(change.change_count(), 2);
        assert_eq!(store.snapshot().revision(), 1);
        assert!(store.snapshot().updated_at().is_some());
    }

    #[test]
    fn replace_inputs_rejects_other_lengths() {
        let store = store();
        let err = store
            .replace_inputs(InputVector::from_bits([1, 1]))
            .unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { expected: 8, .. }));
        assert_eq!(store.inputs(), InputVector::new(8));
    }

    #[test]
    fn old_snapshots_stay_intact() {
        let store = store();
        let before = store.snapshot();
        store.replace_outputs(&[true; 4]).unwrap();
        assert_eq!(before.outputs().values(), [false; 4]);
        assert_eq!(store.snapshot().outputs().values(), [true; 4]);
    }

    #[test]
    fn sealed_store_rejects_mutations() {
        let store = store();
        store.seal();
        assert!(store.is_sealed());

        let err = store.replace_outputs(&[true; 4]).unwrap_err();
        assert!(matches!(err, Error::SessionClosed));
        assert_eq!(store.outputs().values(), [false; 4]);
    }

    #[test]
    fn concurrent_readers_see_whole_snapshots() {
        let store = Arc::new(store());
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..500 {
                    let value = i % 2 == 0;
                    store.replace_outputs(&[value; 4]).unwrap();
                }
            })
        };

        for _ in 0..500 {
            let snapshot = store.snapshot();
            let values = snapshot.outputs().values();
            assert!(values.iter().all(|v| *v == values[0]));
        }
        writer.join().unwrap();
    }
}
