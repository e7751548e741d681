// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MQTT transport using mockforge-mqtt.

#![cfg(feature = "mqtt")]

use std::sync::Arc;
use std::time::Duration;

use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use plc_link::config::{BrokerConfig, SessionConfig};
use plc_link::protocol::MqttTransport;
use plc_link::session::PlcSession;
use plc_link::types::ConnectionStatus;
use tokio::time::{sleep, timeout};

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18850);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to start, bind to port, and be ready to accept connections
    sleep(Duration::from_millis(500)).await;
}

fn session_config(port: u16) -> SessionConfig {
    let broker = BrokerConfig::builder()
        .host("127.0.0.1")
        .port(port)
        .connect_timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    SessionConfig::new(broker)
}

/// Polls until the session leaves `Connecting`.
async fn wait_for_settled(session: &PlcSession<MqttTransport>) -> ConnectionStatus {
    timeout(Duration::from_secs(5), async {
        loop {
            let status = session.connection_status();
            if status != ConnectionStatus::Connecting {
                return status;
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("session never left Connecting")
}

// ============================================================================
// Connection Tests
// ============================================================================

mod connection {
    use super::*;

    #[tokio::test]
    async fn connects_and_subscribes() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (session, events) = PlcSession::connect(session_config(port)).unwrap();
        let session = Arc::new(session);
        let task = session.spawn(events);

        assert_eq!(wait_for_settled(&session).await, ConnectionStatus::Connected);
        assert!(session.is_fully_subscribed());

        assert!(session.shutdown().await);
        task.await.unwrap();
        assert_eq!(session.connection_status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn unreachable_broker_moves_to_error() {
        // Nothing listens on this port.
        let port = get_test_port();

        let (session, events) = PlcSession::connect(session_config(port)).unwrap();
        let session = Arc::new(session);
        let task = session.spawn(events);

        assert_eq!(wait_for_settled(&session).await, ConnectionStatus::Error);

        session.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn client_id_is_generated() {
        let config = session_config(get_test_port());
        assert!(!config.broker().client_id().is_empty());

        let (transport, _events) = MqttTransport::start(config.broker()).unwrap();
        assert_eq!(transport.config().client_id(), config.broker().client_id());
    }
}

// ============================================================================
// Command Tests
// ============================================================================

mod commands {
    use super::*;

    #[tokio::test]
    async fn toggle_publishes_when_connected() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (session, events) = PlcSession::connect(session_config(port)).unwrap();
        let session = Arc::new(session);
        let task = session.spawn(events);
        assert_eq!(wait_for_settled(&session).await, ConnectionStatus::Connected);

        let command = session.request_toggle("M21").await.unwrap();
        assert_eq!(command.payload(), r#"{"output":"M21","value":"ON"}"#);
        // The command alone never moves the displayed state.
        assert_eq!(session.output_state().get("M21"), Some(false));

        session.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn toggle_before_connack_is_rejected() {
        // No broker: the session never reaches Connected.
        let port = get_test_port();

        let (session, _events) = PlcSession::connect(session_config(port)).unwrap();
        let err = session.request_toggle("M20").await.unwrap_err();

        assert_eq!(err.kind(), plc_link::ErrorKind::CommandRejected);
    }
}
