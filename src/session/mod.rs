// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session orchestration.
//!
//! - [`ConnectionManager`] - status state machine, subscriptions, close-once
//! - [`CommandDispatcher`] - toggle requests to control commands
//! - [`PlcSession`] - wires decoder, state store and the two above together
//!   and exposes the read and write interfaces

mod connection;
mod dispatcher;
mod plc_session;

pub use connection::ConnectionManager;
pub use dispatcher::CommandDispatcher;
pub use plc_session::PlcSession;
