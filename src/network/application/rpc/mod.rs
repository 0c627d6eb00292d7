//! Remote procedure calls routed over MQTT topics.
//!
//! Methods live on nodes of an [`RpcTree`] whose paths mirror the topic
//! hierarchy. A request for method `getTemp` on node `dev/42/sensor` is a
//! PUBLISH to
//!
//! ```text
//! dev/42/sensor/getTemp/a1b2
//! ```
//!
//! where `a1b2` is a four-character correlation id chosen by the caller. The
//! reply goes to the same path with the response prefix inserted:
//!
//! ```text
//! dev/42/sensor/resp/getTemp/a1b2
//! ```
//!
//! and carries a one-byte [`ResponseStatus`] followed by the handler output.
//! Topics that do not fit either shape are ignored.
//!
//! # Examples
//!
//! ```rust
//! use mqtt_rpc::network::application::rpc::{ResponseBuffer, RpcError, RpcTree, ROOT};
//! use mqtt_rpc::time::TimeBase;
//!
//! struct Clock;
//! impl TimeBase for Clock {
//!     fn now_us(&self) -> u32 { 0 }
//! }
//!
//! let mut get_temp = |_params: &[u8], out: &mut ResponseBuffer| -> Result<(), RpcError> {
//!     out.extend_from_slice(b"21.5").map_err(|_| RpcError::BufferOverflow)
//! };
//!
//! let mut tree: RpcTree<'_, Clock> = RpcTree::new(Clock, "dev/42").unwrap();
//! let sensor = tree.add_child(ROOT, "sensor").unwrap();
//! tree.register_method(sensor, "getTemp", &mut get_temp).unwrap();
//! assert_eq!(tree.find("dev/42/sensor"), Some(sensor));
//! ```

use crate::network::error::Error;
use heapless::{String, Vec};

pub mod topic;
pub mod tree;

pub use tree::{NodeId, ROOT, RpcTree};

/// Length of a correlation id.
pub const RPC_ID_LEN: usize = 4;
/// Default segment inserted before the method name of a response topic.
pub const DEFAULT_RESPONSE_PREFIX: &str = "resp";
/// Longest response prefix.
pub const MAX_PREFIX_LEN: usize = 16;
/// Longest child node name.
pub const MAX_NODE_NAME_LEN: usize = 32;
/// Longest method name.
pub const MAX_METHOD_NAME_LEN: usize = 32;
/// Longest request or response topic.
pub const MAX_TOPIC_LEN: usize = 128;
/// Largest handler output, excluding the status byte.
pub const MAX_RESPONSE_LEN: usize = 256;
/// Children per node.
pub const MAX_CHILDREN: usize = 8;
/// Registered response handlers per tree.
pub const MAX_RESPONSE_HANDLERS: usize = 8;
/// Response topics watched per tree.
pub const MAX_WATCHES: usize = 8;

/// Output buffer handed to method handlers.
pub type ResponseBuffer = Vec<u8, MAX_RESPONSE_LEN>;

/// Error types for RPC operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcError {
    /// The request parameters were not acceptable to the handler.
    InvalidArguments,
    /// The handler failed.
    ExecutionError,
    /// A name, topic or response did not fit its buffer.
    BufferOverflow,
    /// A node or method name is empty, contains `/` or a wildcard, or equals
    /// the response prefix.
    InvalidName,
    /// A sibling node or method with that name already exists.
    DuplicateName,
    /// The node id does not belong to this tree.
    NodeNotFound,
    /// A fixed-capacity table is full.
    CapacityExceeded,
    /// The response key was not returned by `add_response_handler`.
    UnknownResponseKey,
    /// Publishing or subscribing failed.
    Publish(Error),
}

impl From<Error> for RpcError {
    fn from(err: Error) -> Self {
        RpcError::Publish(err)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for RpcError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            RpcError::InvalidArguments => defmt::write!(f, "InvalidArguments"),
            RpcError::ExecutionError => defmt::write!(f, "ExecutionError"),
            RpcError::BufferOverflow => defmt::write!(f, "BufferOverflow"),
            RpcError::InvalidName => defmt::write!(f, "InvalidName"),
            RpcError::DuplicateName => defmt::write!(f, "DuplicateName"),
            RpcError::NodeNotFound => defmt::write!(f, "NodeNotFound"),
            RpcError::CapacityExceeded => defmt::write!(f, "CapacityExceeded"),
            RpcError::UnknownResponseKey => defmt::write!(f, "UnknownResponseKey"),
            RpcError::Publish(e) => defmt::write!(f, "Publish({})", e),
        }
    }
}

/// Status byte leading every response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseStatus {
    /// The handler succeeded.
    Ok = 0,
    /// The handler failed.
    Error = 1,
    /// The handler rejected its parameters.
    InvalidArgs = 2,
}

impl ResponseStatus {
    /// Decode a status byte. Unknown values read as [`ResponseStatus::Error`].
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => ResponseStatus::Ok,
            2 => ResponseStatus::InvalidArgs,
            _ => ResponseStatus::Error,
        }
    }

    /// Status reported for a handler result.
    pub fn for_result(result: &Result<(), RpcError>) -> Self {
        match result {
            Ok(()) => ResponseStatus::Ok,
            Err(RpcError::InvalidArguments) => ResponseStatus::InvalidArgs,
            Err(_) => ResponseStatus::Error,
        }
    }
}

/// A method exposed on a node.
pub trait RpcHandler {
    /// Run the method with the request payload, writing output to `response`.
    fn call(&mut self, params: &[u8], response: &mut ResponseBuffer) -> Result<(), RpcError>;
}

impl<F> RpcHandler for F
where
    F: FnMut(&[u8], &mut ResponseBuffer) -> Result<(), RpcError>,
{
    fn call(&mut self, params: &[u8], response: &mut ResponseBuffer) -> Result<(), RpcError> {
        self(params, response)
    }
}

/// Correlation id of an outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String<RPC_ID_LEN>);

impl RequestId {
    /// Wrap `id` if it is a valid correlation id.
    pub fn new(id: &str) -> Option<Self> {
        if !topic::is_valid_id(id) {
            return None;
        }
        String::try_from(id).ok().map(RequestId)
    }

    /// The id as it appears in topics.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A reply matched to one of this tree's pending requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcReply<'m> {
    /// Path of the node that answered.
    pub node: &'m str,
    /// Method that was called.
    pub method: &'m str,
    /// Correlation id of the request.
    pub id: &'m str,
    /// Status reported by the remote handler.
    pub status: ResponseStatus,
    /// Handler output after the status byte.
    pub data: &'m [u8],
}

/// Receives replies to outbound requests.
pub trait ResponseHandler {
    /// A reply matched a pending request.
    fn on_response(&mut self, reply: &RpcReply<'_>);
    /// A pending request expired without a reply.
    fn on_timeout(&mut self, _method: &str, _id: &RequestId) {}
}

/// Handle returned by [`RpcTree::add_response_handler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseKey(pub(crate) usize);
