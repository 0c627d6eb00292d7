//! # Application Layer Protocols
//!
//! Protocols that run on top of a [`Connection`](crate::network::Connection):
//!
//! - **[`mqtt`]**: MQTT 3.1.1 packet codec, client state machine and
//!   connection supervision
//! - **[`rpc`]**: method dispatch and request/response correlation over MQTT
//!   topics
//!
//! ## Usage Pattern
//!
//! 1. Open a transport with a [`Connect`](crate::network::Connect) implementation
//! 2. Let a [`ConnectionManager`](mqtt::ConnectionManager) own the client
//! 3. Call `update` from the run loop with an observer such as an
//!    [`RpcTree`](rpc::RpcTree)
//!
//! ```rust,no_run
//! use mqtt_rpc::network::application::mqtt::{
//!     ConnectionManager, ManagerOptions, NoStandoffHandler, Options,
//! };
//! use mqtt_rpc::network::application::rpc::RpcTree;
//! use mqtt_rpc::time::TimeBase;
//! # use mqtt_rpc::network::{Connect, Connection};
//! # struct Tcp;
//! # impl Connection for Tcp {}
//! # impl mqtt_rpc::network::Read for Tcp {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl mqtt_rpc::network::Write for Tcp {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl mqtt_rpc::network::Close for Tcp {
//! #     type Error = ();
//! #     fn close(self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # struct Modem;
//! # impl Connect for Modem {
//! #     type Connection = Tcp;
//! #     type Error = ();
//! #     fn connect(&mut self, _remote: &str) -> Result<Tcp, ()> { Ok(Tcp) }
//! # }
//! #[derive(Clone)]
//! struct Clock;
//! impl TimeBase for Clock {
//!     fn now_us(&self) -> u32 { 0 }
//! }
//!
//! let mut manager: ConnectionManager<Modem, Clock> = ConnectionManager::new(
//!     Modem,
//!     Clock,
//!     NoStandoffHandler,
//!     Options::new("device-7").unwrap(),
//!     "broker.local",
//!     1883,
//!     ManagerOptions::default(),
//! )
//! .unwrap();
//! manager.set_credentials("device-7", Some("secret")).unwrap();
//! manager.start().unwrap();
//!
//! let mut tree: RpcTree<'_, Clock> = RpcTree::new(Clock, "site/device-7").unwrap();
//! loop {
//!     manager.update(&mut tree);
//!     tree.update();
//! }
//! ```

/// MQTT client implementation.
///
/// Provides an MQTT 3.1.1 client for lightweight publish-subscribe messaging,
/// commonly used in IoT applications.
pub mod mqtt;

/// RPC routing over MQTT topics.
pub mod rpc;
