// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast events for session activity.
//!
//! The [`EventBus`] uses tokio's broadcast channel so any number of async
//! consumers (a view, a logger, a test) can follow state changes, status
//! transitions and error reports as [`SyncEvent`]s.
//!
//! # Examples
//!
//! ```
//! use plc_link::event::{EventBus, SyncEvent};
//! use plc_link::types::ConnectionStatus;
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(SyncEvent::status_changed(
//!     ConnectionStatus::Connected,
//!     ConnectionStatus::Disconnected,
//! ));
//! assert!(rx.try_recv().unwrap().is_status_change());
//! ```

mod event_bus;
mod sync_event;

pub use event_bus::EventBus;
pub use sync_event::SyncEvent;
