//! MQTT 3.1.1 client stack for embedded systems.
//!
//! The stack is split in three layers:
//!
//! - [`message`] - packet codec over a fixed buffer, zero-copy on receive
//! - [`client`] - the non-blocking session state machine
//! - [`manager`] - reconnect and standoff supervision around one client
//!
//! Supported packets are CONNECT, CONNACK, PUBLISH, PUBACK, SUBSCRIBE,
//! SUBACK, PINGREQ, PINGRESP and DISCONNECT. Outgoing traffic uses QoS 0 or 1;
//! incoming QoS 1 messages are acknowledged before they are dispatched.
//!
//! # Examples
//!
//! ## Building and parsing a packet
//!
//! ```rust
//! use mqtt_rpc::network::application::mqtt::{MqttMessage, PacketType, QoS};
//!
//! let mut out = MqttMessage::<64>::new();
//! out.init_publish("sensors/temp", 0, QoS::AtMostOnce, false, b"21.5").unwrap();
//!
//! let mut received = MqttMessage::<64>::new();
//! for &byte in out.as_bytes() {
//!     received.push_received(byte).unwrap();
//! }
//! assert_eq!(received.validate_received_bytes(), Ok(PacketType::Publish));
//! assert_eq!(received.topic_name(), Ok("sensors/temp"));
//! assert_eq!(received.payload(), Ok(&b"21.5"[..]));
//! ```
//!
//! ## Reacting to a session
//!
//! ```rust
//! use mqtt_rpc::network::application::mqtt::{ClientObserver, Publish, Publisher, QoS};
//!
//! struct Telemetry;
//!
//! impl ClientObserver for Telemetry {
//!     fn on_connect(&mut self, publisher: &mut dyn Publisher) {
//!         let _ = publisher.subscribe("device/cmd/#", QoS::AtLeastOnce);
//!     }
//!
//!     fn on_publish(&mut self, message: &Publish<'_>, publisher: &mut dyn Publisher) {
//!         if message.topic == "device/cmd/ping" {
//!             let _ = publisher.publish("device/pong", message.payload, QoS::AtMostOnce);
//!         }
//!     }
//! }
//! ```

pub mod client;
pub mod manager;
pub mod message;

pub use client::{
    ClientObserver, ConnectFailure, DEFAULT_BUFFER_SIZE, DEFAULT_CONNECT_TIMEOUT_MS,
    DEFAULT_PING_TIMEOUT_MS, DisconnectReason, MAX_CLIENT_ID_LEN, MqttClient, NoopObserver,
    Options, Publish, Publisher, State,
};
pub use manager::{
    ConnectionManager, ManagerOptions, ManagerState, NoStandoffHandler, StandoffHandler,
};
pub use message::{Credentials, MqttMessage, PacketType, QoS};
