// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the crate.
//!
//! - [`SignalState`] - `ON`/`OFF` state carried in control commands
//! - [`ConnectionStatus`] - Lifecycle of the transport session
//! - [`coerce_bool`] - The `1`/`true`, `0`/`false` coercion rule for payloads

mod signal;
mod status;

pub use signal::{SignalState, coerce_bool};
pub use status::ConnectionStatus;
