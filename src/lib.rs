//! # mqtt-rpc - MQTT client stack with topic-routed RPC
//!
//! A `no_std` MQTT 3.1.1 client and an RPC layer on top of it, written for
//! microcontrollers. Nothing allocates: every buffer, table and queue has a
//! capacity fixed at compile time.
//!
//! ## Features
//!
//! ### Codec
//! - Fixed-capacity byte buffers with in-place insert and replace
//! - Linked fields that address regions of a buffer and follow resizes
//! - MQTT remaining-length encoding
//!
//! ### MQTT
//! - Packet builder and zero-copy parser for CONNECT, CONNACK, PUBLISH,
//!   PUBACK, SUBSCRIBE, SUBACK, PINGREQ, PINGRESP and DISCONNECT
//! - Poll-driven client with connect timeout, keep-alive and ping timeout
//! - Connection manager with reconnect delay and standoff after repeated
//!   failures
//!
//! ### RPC
//! - Node tree mirroring the topic hierarchy, with named methods per node
//! - Outbound calls correlated by a four-character id, with timeouts
//!
//! ### Platform
//! - Transport traits any TCP, TLS or UART link can implement
//! - Lock-free byte FIFO between a receive interrupt and the poll loop
//! - Wrapping microsecond time base
//! - JSON configuration through `serde-json-core`
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! mqtt-rpc = "0.1.0"
//! ```
//!
//! ### Loading a configuration
//!
//! ```rust
//! use mqtt_rpc::config::Config;
//!
//! let config = Config::from_json(r#"{"host":"10.0.0.2","client_id":"pump-3"}"#).unwrap();
//! let options = config.client_options().unwrap();
//! assert_eq!(options.client_id.as_str(), "pump-3");
//! ```
//!
//! See [`network::application`] for a complete run loop.
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `log`: Emit diagnostics through the `log` crate
//! - `defmt`: Emit diagnostics through `defmt` and derive `defmt::Format`

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![doc(html_root_url = "https://docs.rs/mqtt-rpc/0.1.0")]

mod logging;

/// Fixed buffers, linked fields and length encoding.
pub mod codec;

/// Runtime configuration.
pub mod config;

/// Transport traits, the byte FIFO and the application protocols.
pub mod network;

/// Monotonic time base and elapsed-time helpers.
pub mod time;
