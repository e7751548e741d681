// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Canonical state of the controller's signals.
//!
//! The [`StateStore`] holds the reconciled [`OutputState`] and
//! [`InputVector`]. Decoded payloads are applied to it as partial merges
//! ([`OutputPatch`]) or full replaces, and each mutation reports the
//! values that moved as a [`StateChange`].
//!
//! # Examples
//!
//! ```
//! use plc_link::config::SignalLayout;
//! use plc_link::state::{InputVector, StateChange, StateStore};
//!
//! let store = StateStore::new(&SignalLayout::default());
//!
//! let change = store
//!     .replace_inputs(InputVector::from_bits([1, 0, 0, 0, 0, 0, 0, 0]))
//!     .unwrap();
//!
//! assert_eq!(change, Some(StateChange::input(0, true)));
//! assert_eq!(store.inputs().get(0), Some(true));
//! ```

mod input_vector;
mod output_state;
mod state_change;
mod store;

pub use input_vector::InputVector;
pub use output_state::{OutputPatch, OutputState};
pub use state_change::StateChange;
pub use store::{StateSnapshot, StateStore};
