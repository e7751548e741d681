// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `plc_link` - keep a local view of PLC signals in sync with a controller
//! over MQTT.
//!
//! The controller publishes its outputs and inputs on two topics and takes
//! commands on a third. This library decodes what it publishes into one
//! canonical state, tracks the connection, and turns "flip output X" into a
//! control command without racing the next update.
//!
//! # Topics
//!
//! | Topic | Direction | Payload |
//! |-------|-----------|---------|
//! | `plc/feedback` | inbound | `{"M20":true}`, `[1,0,0,1]` or `ON`/`OFF` |
//! | `plc/inputs` | inbound | `[1,1,0,0,0,0,0,0]` |
//! | `plc/control` | outbound | `{"output":"M21","value":"ON"}` |
//!
//! Topic names, output keys and the number of inputs are configurable via
//! [`config::SessionConfig`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use plc_link::config::{BrokerConfig, SessionConfig};
//! use plc_link::session::PlcSession;
//! use plc_link::subscription::Subscribable;
//!
//! #[tokio::main]
//! async fn main() -> plc_link::Result<()> {
//!     let broker = BrokerConfig::builder()
//!         .host("192.168.1.50")
//!         .credentials("dashboard", "secret")
//!         .build()?;
//!
//!     let (session, events) = PlcSession::connect(SessionConfig::new(broker))?;
//!     let session = Arc::new(session);
//!
//!     session.on_output_changed(|key, value| {
//!         println!("{key} is now {}", if value { "ON" } else { "OFF" });
//!     });
//!     session.spawn(events);
//!
//!     // Later, once connected:
//!     session.request_toggle("M21").await?;
//!
//!     session.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Testing without a broker
//!
//! [`protocol::MemoryTransport`] records requests and lets a test inject
//! [`protocol::TransportEvent`]s directly:
//!
//! ```
//! use plc_link::config::{BrokerConfig, SessionConfig};
//! use plc_link::protocol::{MemoryTransport, TransportEvent};
//! use plc_link::session::PlcSession;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let broker = BrokerConfig::builder().host("unused").build().unwrap();
//! let (transport, _events) = MemoryTransport::new();
//! let session = PlcSession::new(SessionConfig::new(broker), transport);
//!
//! session
//!     .handle_event(TransportEvent::message("plc/inputs", "[1,1,0,0,0,0,0,0]"))
//!     .await;
//! assert_eq!(session.input_vector().get(1), Some(true));
//! # }
//! ```

pub mod command;
pub mod config;
pub mod decoder;
pub mod error;
pub mod event;
pub mod protocol;
pub mod session;
pub mod state;
pub mod subscription;
pub mod types;

pub use command::ControlCommand;
pub use config::{BrokerConfig, SessionConfig, SignalLayout, Topics, TransportKind};
pub use error::{ConfigError, DecodeError, Error, ErrorKind, ProtocolError, Result, ValueError};
pub use event::{EventBus, SyncEvent};
#[cfg(feature = "mqtt")]
pub use protocol::MqttTransport;
pub use protocol::{MemoryTransport, Transport, TransportEvent};
pub use session::PlcSession;
pub use state::{InputVector, OutputPatch, OutputState, StateChange, StateSnapshot, StateStore};
pub use subscription::{CallbackRegistry, Subscribable, SubscriptionId};
pub use types::{ConnectionStatus, SignalState};
