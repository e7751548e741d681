// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session configuration.
//!
//! A session is described by three independent parts:
//!
//! - [`SignalLayout`] - which outputs and how many inputs the PLC exposes
//! - [`Topics`] - the feedback, inputs and control topic names
//! - [`BrokerConfig`] - how to reach the MQTT broker
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use plc_link::config::{BrokerConfig, SessionConfig, SignalLayout, TransportKind};
//!
//! let broker = BrokerConfig::builder()
//!     .host("broker.example.com")
//!     .port(8884)
//!     .transport(TransportKind::SecureWebSocket)
//!     .credentials("dashboard", "secret")
//!     .connect_timeout(Duration::from_secs(4))
//!     .build()
//!     .unwrap();
//!
//! let config = SessionConfig::new(broker)
//!     .with_layout(SignalLayout::new(["Q1", "Q2"], 4).unwrap());
//!
//! assert_eq!(config.layout().output_count(), 2);
//! assert_eq!(config.topics().feedback(), "plc/feedback");
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Default output keys, in wire order.
pub const DEFAULT_OUTPUTS: [&str; 4] = ["M20", "M21", "M22", "M23"];

/// Default number of inputs.
pub const DEFAULT_INPUT_COUNT: usize = 8;

/// Fixed set of outputs and number of inputs of the controller.
///
/// The order of the output keys is significant: array-form feedback
/// payloads are mapped onto it positionally.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawLayout")]
pub struct SignalLayout {
    outputs: Arc<[String]>,
    input_count: usize,
}

#[derive(Deserialize)]
struct RawLayout {
    #[serde(default = "default_outputs")]
    outputs: Vec<String>,
    #[serde(default = "default_input_count")]
    input_count: usize,
}

fn default_outputs() -> Vec<String> {
    DEFAULT_OUTPUTS.iter().map(ToString::to_string).collect()
}

fn default_input_count() -> usize {
    DEFAULT_INPUT_COUNT
}

impl TryFrom<RawLayout> for SignalLayout {
    type Error = ConfigError;

    fn try_from(raw: RawLayout) -> Result<Self, Self::Error> {
        Self::new(raw.outputs, raw.input_count)
    }
}

impl SignalLayout {
    /// Creates a layout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if no outputs are given, a key is empty or a
    /// key is listed twice.
    pub fn new<I, S>(outputs: I, input_count: usize) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let outputs: Vec<String> = outputs.into_iter().map(Into::into).collect();
        if outputs.is_empty() {
            return Err(ConfigError::NoOutputs);
        }
        for (i, key) in outputs.iter().enumerate() {
            if key.is_empty() {
                return Err(ConfigError::EmptyOutputKey);
            }
            if outputs[..i].contains(key) {
                return Err(ConfigError::DuplicateOutput(key.clone()));
            }
        }
        Ok(Self {
            outputs: outputs.into(),
            input_count,
        })
    }

    /// Returns the output keys in configured order.
    #[must_use]
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Returns the shared key list.
    pub(crate) fn shared_outputs(&self) -> Arc<[String]> {
        Arc::clone(&self.outputs)
    }

    /// Returns the number of outputs.
    #[must_use]
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Returns the position of an output key.
    #[must_use]
    pub fn output_index(&self, key: &str) -> Option<usize> {
        self.outputs.iter().position(|k| k == key)
    }

    /// Returns the number of inputs.
    #[must_use]
    pub fn input_count(&self) -> usize {
        self.input_count
    }
}

impl Default for SignalLayout {
    fn default() -> Self {
        Self {
            outputs: default_outputs().into(),
            input_count: DEFAULT_INPUT_COUNT,
        }
    }
}

/// Topic names used by a session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawTopics")]
pub struct Topics {
    feedback: String,
    inputs: String,
    control: String,
}

#[derive(Deserialize)]
#[serde(default)]
struct RawTopics {
    feedback: String,
    inputs: String,
    control: String,
}

impl Default for RawTopics {
    fn default() -> Self {
        let Topics {
            feedback,
            inputs,
            control,
        } = Topics::default();
        Self {
            feedback,
            inputs,
            control,
        }
    }
}

impl TryFrom<RawTopics> for Topics {
    type Error = ConfigError;

    fn try_from(raw: RawTopics) -> Result<Self, Self::Error> {
        Self::new(raw.feedback, raw.inputs, raw.control)
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            feedback: "plc/feedback".to_string(),
            inputs: "plc/inputs".to_string(),
            control: "plc/control".to_string(),
        }
    }
}

/// Inbound topic classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicClass {
    /// Output feedback.
    Feedback,
    /// Input vector.
    Inputs,
}

impl Topics {
    /// Creates a set of topics.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::TopicClash` if two topics are equal.
    pub fn new(
        feedback: impl Into<String>,
        inputs: impl Into<String>,
        control: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let topics = Self {
            feedback: feedback.into(),
            inputs: inputs.into(),
            control: control.into(),
        };
        topics.validate()?;
        Ok(topics)
    }

    /// Checks that all three topics are distinct.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::TopicClash` naming the shared topic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feedback == self.inputs || self.feedback == self.control {
            return Err(ConfigError::TopicClash(self.feedback.clone()));
        }
        if self.inputs == self.control {
            return Err(ConfigError::TopicClash(self.inputs.clone()));
        }
        Ok(())
    }

    /// Inbound topic carrying output feedback.
    #[must_use]
    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    /// Inbound topic carrying the input vector.
    #[must_use]
    pub fn inputs(&self) -> &str {
        &self.inputs
    }

    /// Outbound topic for control commands.
    #[must_use]
    pub fn control(&self) -> &str {
        &self.control
    }

    /// Topics the session subscribes to once connected.
    #[must_use]
    pub fn subscriptions(&self) -> [&str; 2] {
        [&self.feedback, &self.inputs]
    }

    /// Classifies an inbound topic.
    #[must_use]
    pub fn classify(&self, topic: &str) -> Option<TopicClass> {
        if topic == self.feedback {
            Some(TopicClass::Feedback)
        } else if topic == self.inputs {
            Some(TopicClass::Inputs)
        } else {
            None
        }
    }
}

/// Network transport used to reach the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Plain TCP (`mqtt://`).
    #[default]
    Tcp,
    /// TCP with TLS (`mqtts://`).
    Tls,
    /// MQTT over WebSocket (`ws://`).
    WebSocket,
    /// MQTT over secure WebSocket (`wss://`).
    SecureWebSocket,
}

impl TransportKind {
    /// Returns the URL scheme.
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        match self {
            Self::Tcp => "mqtt",
            Self::Tls => "mqtts",
            Self::WebSocket => "ws",
            Self::SecureWebSocket => "wss",
        }
    }

    /// Returns `true` for WebSocket transports.
    #[must_use]
    pub const fn is_websocket(&self) -> bool {
        matches!(self, Self::WebSocket | Self::SecureWebSocket)
    }

    fn default_port(self) -> u16 {
        match self {
            Self::Tcp => 1883,
            Self::Tls => 8883,
            Self::WebSocket => 8000,
            Self::SecureWebSocket => 8884,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "tcp" | "mqtt" => Some(Self::Tcp),
            "tls" | "mqtts" | "ssl" => Some(Self::Tls),
            "ws" => Some(Self::WebSocket),
            "wss" => Some(Self::SecureWebSocket),
            _ => None,
        }
    }
}

/// Connection parameters for the MQTT broker.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    host: String,
    port: u16,
    transport: TransportKind,
    credentials: Option<(String, String)>,
    path: String,
    client_id: String,
    clean_session: bool,
    connect_timeout: Duration,
    keep_alive: Duration,
}

/// Prefix of generated client identifiers.
const CLIENT_ID_PREFIX: &str = "plc_link";

/// Generates a client identifier with a random 8-hex-digit suffix.
#[must_use]
pub fn generate_client_id(prefix: &str) -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &uuid[..8])
}

impl BrokerConfig {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> BrokerConfigBuilder {
        BrokerConfigBuilder::default()
    }

    /// Reads the broker configuration from the environment.
    ///
    /// | Variable | Meaning | Default |
    /// |----------|---------|---------|
    /// | `PLC_MQTT_HOST` | broker host | required |
    /// | `PLC_MQTT_PORT` | broker port | per transport |
    /// | `PLC_MQTT_TRANSPORT` | `tcp`, `tls`, `ws` or `wss` | `tcp` |
    /// | `PLC_MQTT_USER` / `PLC_MQTT_PASS` | credentials | none |
    /// | `PLC_MQTT_PATH` | WebSocket path | `/mqtt` |
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the host is missing or a value cannot be
    /// parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut builder = Self::builder();
        if let Some(host) = lookup("PLC_MQTT_HOST") {
            builder = builder.host(host);
        }
        if let Some(transport) = lookup("PLC_MQTT_TRANSPORT") {
            let kind = TransportKind::parse(&transport).ok_or_else(|| ConfigError::InvalidEnv {
                name: "PLC_MQTT_TRANSPORT".to_string(),
                value: transport.clone(),
            })?;
            builder = builder.transport(kind);
        }
        if let Some(port) = lookup("PLC_MQTT_PORT") {
            let parsed = port.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "PLC_MQTT_PORT".to_string(),
                value: port.clone(),
            })?;
            builder = builder.port(parsed);
        }
        if let (Some(user), Some(pass)) = (lookup("PLC_MQTT_USER"), lookup("PLC_MQTT_PASS")) {
            builder = builder.credentials(user, pass);
        }
        if let Some(path) = lookup("PLC_MQTT_PATH") {
            builder = builder.path(path);
        }
        builder.build()
    }

    /// Broker host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Broker port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Network transport.
    #[must_use]
    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Username and password, if set.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.credentials
            .as_ref()
            .map(|(u, p)| (u.as_str(), p.as_str()))
    }

    /// WebSocket path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// MQTT client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Whether the broker should discard previous session state.
    #[must_use]
    pub fn clean_session(&self) -> bool {
        self.clean_session
    }

    /// How long to wait for the broker to acknowledge the connection.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Keep-alive interval.
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    /// Broker URL, e.g. `wss://broker:8884/mqtt`.
    ///
    /// The path is only part of the URL for WebSocket transports.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = self.transport.scheme();
        if self.transport.is_websocket() {
            format!("{scheme}://{}:{}{}", self.host, self.port, self.path)
        } else {
            format!("{scheme}://{}:{}", self.host, self.port)
        }
    }
}

/// Builder for [`BrokerConfig`].
#[derive(Debug, Default)]
pub struct BrokerConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    transport: TransportKind,
    credentials: Option<(String, String)>,
    path: Option<String>,
    client_id: Option<String>,
    clean_session: Option<bool>,
    connect_timeout: Option<Duration>,
    keep_alive: Option<Duration>,
}

impl BrokerConfigBuilder {
    /// Sets the broker host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the broker port (default depends on the transport).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the network transport (default: TCP).
    #[must_use]
    pub fn transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the WebSocket path (default: `/mqtt`).
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets an explicit client identifier.
    ///
    /// By default a unique identifier is generated for every configuration.
    #[must_use]
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Sets the clean-session flag (default: `true`).
    #[must_use]
    pub fn clean_session(mut self, clean: bool) -> Self {
        self.clean_session = Some(clean);
        self
    }

    /// Sets the connect timeout (default: 4 seconds).
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = Some(interval);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingHost` if no host was set.
    pub fn build(self) -> Result<BrokerConfig, ConfigError> {
        let host = self
            .host
            .filter(|h| !h.trim().is_empty())
            .ok_or(ConfigError::MissingHost)?;

        let mut path = self.path.unwrap_or_else(|| "/mqtt".to_string());
        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        Ok(BrokerConfig {
            host,
            port: self.port.unwrap_or_else(|| self.transport.default_port()),
            transport: self.transport,
            credentials: self.credentials,
            path,
            client_id: self
                .client_id
                .unwrap_or_else(|| generate_client_id(CLIENT_ID_PREFIX)),
            clean_session: self.clean_session.unwrap_or(true),
            connect_timeout: self.connect_timeout.unwrap_or(Duration::from_millis(4000)),
            keep_alive: self.keep_alive.unwrap_or(Duration::from_secs(30)),
        })
    }
}

/// Complete configuration of a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    layout: SignalLayout,
    topics: Topics,
    broker: BrokerConfig,
}

impl SessionConfig {
    /// Creates a configuration with the default layout and topics.
    #[must_use]
    pub fn new(broker: BrokerConfig) -> Self {
        Self {
            layout: SignalLayout::default(),
            topics: Topics::default(),
            broker,
        }
    }

    /// Sets the signal layout.
    #[must_use]
    pub fn with_layout(mut self, layout: SignalLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the topics.
    #[must_use]
    pub fn with_topics(mut self, topics: Topics) -> Self {
        self.topics = topics;
        self
    }

    /// Signal layout.
    #[must_use]
    pub fn layout(&self) -> &SignalLayout {
        &self.layout
    }

    /// Topics.
    #[must_use]
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Broker parameters.
    #[must_use]
    pub fn broker(&self) -> &BrokerConfig {
        &self.broker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_layout() {
        let layout = SignalLayout::default();
        assert_eq!(layout.outputs(), ["M20", "M21", "M22", "M23"]);
        assert_eq!(layout.input_count(), 8);
        assert_eq!(layout.output_index("M22"), Some(2));
        assert_eq!(layout.output_index("M99"), None);
    }

    #[test]
    fn layout_rejects_duplicates() {
        let err = SignalLayout::new(["A", "B", "A"], 2).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateOutput("A".to_string()));
    }

    #[test]
    fn layout_rejects_empty() {
        let none: [&str; 0] = [];
        assert_eq!(SignalLayout::new(none, 8), Err(ConfigError::NoOutputs));
        assert_eq!(
            SignalLayout::new(["A", ""], 8),
            Err(ConfigError::EmptyOutputKey)
        );
    }

    #[test]
    fn layout_deserializes_with_defaults() {
        let layout: SignalLayout = serde_json::from_str(r#"{"input_count": 4}"#).unwrap();
        assert_eq!(layout.output_count(), 4);
        assert_eq!(layout.input_count(), 4);

        let layout: SignalLayout = serde_json::from_str(r#"{"outputs": ["Q0"]}"#).unwrap();
        assert_eq!(layout.outputs(), ["Q0"]);
        assert_eq!(layout.input_count(), 8);

        let dup = serde_json::from_str::<SignalLayout>(r#"{"outputs": ["Q0", "Q0"]}"#);
        assert!(dup.is_err());
    }

    #[test]
    fn topics_classify() {
        let topics = Topics::default();
        assert_eq!(topics.classify("plc/feedback"), Some(TopicClass::Feedback));
        assert_eq!(topics.classify("plc/inputs"), Some(TopicClass::Inputs));
        assert_eq!(topics.classify("plc/control"), None);
        assert_eq!(topics.classify("other"), None);
        assert_eq!(topics.subscriptions(), ["plc/feedback", "plc/inputs"]);
    }

    #[test]
    fn topics_reject_clash() {
        let err = Topics::new("a", "a", "c").unwrap_err();
        assert_eq!(err, ConfigError::TopicClash("a".to_string()));
    }

    #[test]
    fn topics_deserialize_with_defaults() {
        let topics: Topics = serde_json::from_str(r#"{"control":"line1/cmd"}"#).unwrap();
        assert_eq!(topics.feedback(), "plc/feedback");
        assert_eq!(topics.inputs(), "plc/inputs");
        assert_eq!(topics.control(), "line1/cmd");
    }

    #[test]
    fn topics_deserialize_rejects_clash() {
        let result =
            serde_json::from_str::<Topics>(r#"{"feedback":"x","inputs":"x","control":"x"}"#);
        assert!(result.is_err());

        // A single override may also collide with a default.
        let result = serde_json::from_str::<Topics>(r#"{"inputs":"plc/control"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn broker_builder_defaults() {
        let config = BrokerConfig::builder().host("broker").build().unwrap();
        assert_eq!(config.port(), 1883);
        assert_eq!(config.transport(), TransportKind::Tcp);
        assert_eq!(config.path(), "/mqtt");
        assert!(config.clean_session());
        assert_eq!(config.connect_timeout(), Duration::from_millis(4000));
        assert_eq!(config.keep_alive(), Duration::from_secs(30));
        assert!(config.credentials().is_none());
        assert_eq!(config.url(), "mqtt://broker:1883");
    }

    #[test]
    fn broker_builder_requires_host() {
        let err = BrokerConfig::builder().build().unwrap_err();
        assert_eq!(err, ConfigError::MissingHost);
        let err = BrokerConfig::builder().host("  ").build().unwrap_err();
        assert_eq!(err, ConfigError::MissingHost);
    }

    #[test]
    fn websocket_url_includes_path() {
        let config = BrokerConfig::builder()
            .host("hive.example")
            .transport(TransportKind::SecureWebSocket)
            .path("ws")
            .build()
            .unwrap();
        assert_eq!(config.port(), 8884);
        assert_eq!(config.url(), "wss://hive.example:8884/ws");
    }

    #[test]
    fn generated_client_ids_are_unique() {
        let a = BrokerConfig::builder().host("h").build().unwrap();
        let b = BrokerConfig::builder().host("h").build().unwrap();
        assert!(a.client_id().starts_with("plc_link_"));
        assert_eq!(a.client_id().len(), "plc_link_".len() + 8);
        assert_ne!(a.client_id(), b.client_id());
    }

    #[test]
    fn explicit_client_id_is_kept() {
        let config = BrokerConfig::builder()
            .host("h")
            .client_id("panel_1")
            .build()
            .unwrap();
        assert_eq!(config.client_id(), "panel_1");
    }

    #[test]
    fn from_lookup_reads_variables() {
        let vars: HashMap<&str, &str> = [
            ("PLC_MQTT_HOST", "hive.example"),
            ("PLC_MQTT_PORT", "8884"),
            ("PLC_MQTT_TRANSPORT", "wss"),
            ("PLC_MQTT_USER", "user"),
            ("PLC_MQTT_PASS", "pass"),
        ]
        .into_iter()
        .collect();

        let config =
            BrokerConfig::from_lookup(|name| vars.get(name).map(ToString::to_string)).unwrap();
        assert_eq!(config.host(), "hive.example");
        assert_eq!(config.port(), 8884);
        assert_eq!(config.transport(), TransportKind::SecureWebSocket);
        assert_eq!(config.credentials(), Some(("user", "pass")));
    }

    #[test]
    fn from_lookup_rejects_bad_port() {
        let err = BrokerConfig::from_lookup(|name| match name {
            "PLC_MQTT_HOST" => Some("h".to_string()),
            "PLC_MQTT_PORT" => Some("abc".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref name, .. } if name == "PLC_MQTT_PORT"));
    }

    #[test]
    fn from_lookup_requires_host() {
        let err = BrokerConfig::from_lookup(|_| None).unwrap_err();
        assert_eq!(err, ConfigError::MissingHost);
    }
}
