// SPDX-License-Identifier: MPL-2.0

//! Console dashboard: print every change the controller reports and toggle
//! outputs from the keyboard.
//!
//! # Usage
//!
//! ```bash
//! PLC_MQTT_HOST=192.168.1.50 PLC_MQTT_USER=user PLC_MQTT_PASS=pass \
//!     cargo run --example console
//! ```
//!
//! Type an output key (`M20`..`M23`) and press enter to toggle it, `s` to
//! print the current state, `r` to reconnect, `q` to quit. Set `RUST_LOG`
//! (e.g. `RUST_LOG=plc_link=debug`) to see the library's logs.

use std::sync::Arc;

use plc_link::config::{BrokerConfig, SessionConfig};
use plc_link::session::PlcSession;
use plc_link::subscription::Subscribable;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("plc_link=info")),
        )
        .init();

    let broker = BrokerConfig::from_env()?;
    println!("Connecting to {}...", broker.url());

    let (session, events) = PlcSession::connect(SessionConfig::new(broker))?;
    let session = Arc::new(session);

    session.on_status_changed(|status| println!("[status] {status}"));
    session.on_output_changed(|key, value| {
        println!("[output] {key} = {}", if value { "ON" } else { "OFF" });
    });
    session.on_input_changed(|index, value| {
        println!("[input]  I{} = {}", index + 1, u8::from(value));
    });
    session.on_error(|e| println!("[error]  {e}"));

    let task = session.spawn(events);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => {}
            "q" => break,
            "s" => print_state(&session),
            "r" => {
                if let Err(e) = session.reconnect().await {
                    println!("Cannot reconnect: {e}");
                }
            }
            // Failures are printed by the error callback.
            key => {
                if let Ok(command) = session.request_toggle(key).await {
                    println!("Sent {}", command.payload());
                }
            }
        }
    }

    println!("Shutting down...");
    session.shutdown().await;
    task.await?;
    println!("Done!");

    Ok(())
}

fn print_state<T: plc_link::protocol::Transport>(session: &PlcSession<T>) {
    let snapshot = session.snapshot();
    println!(
        "Status: {} (revision {})",
        session.connection_status(),
        snapshot.revision()
    );
    for (key, value) in snapshot.outputs().iter() {
        println!("  {key}: {}", if value { "ON" } else { "OFF" });
    }
    let inputs: Vec<String> = snapshot
        .inputs()
        .iter()
        .map(|v| u8::from(v).to_string())
        .collect();
    println!("  inputs: [{}]", inputs.join(","));
}
