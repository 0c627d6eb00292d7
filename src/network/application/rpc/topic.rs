//! Request and response topic syntax.
//!
//! ```text
//! request   <node path>/<method>/<id>
//! response  <node path>/<prefix>/<method>/<id>
//! ```
//!
//! Parsing works from the end of the topic: the id is the last segment, the
//! method the one before it, and for responses the prefix must be the segment
//! before the method. Anything else is not actionable.

use super::{MAX_TOPIC_LEN, RPC_ID_LEN, RpcError};
use core::fmt::Write as _;
use heapless::String;

/// A topic split into request parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTopic<'t> {
    /// Path of the addressed node.
    pub path: &'t str,
    /// Method name.
    pub method: &'t str,
    /// Correlation id.
    pub id: &'t str,
}

/// A topic split into response parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseTopic<'t> {
    /// Path of the node that answered. Empty if the prefix is the first
    /// segment.
    pub path: &'t str,
    /// Method name.
    pub method: &'t str,
    /// Correlation id.
    pub id: &'t str,
}

/// Returns `true` for exactly four printable ASCII characters that are not
/// topic separators or wildcards.
pub fn is_valid_id(id: &str) -> bool {
    id.len() == RPC_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_graphic() && !matches!(b, b'/' | b'+' | b'#'))
}

/// Returns `true` for a non-empty topic segment without separators or
/// wildcards.
pub fn is_valid_segment(name: &str) -> bool {
    !name.is_empty() && !name.bytes().any(|b| matches!(b, b'/' | b'+' | b'#' | 0))
}

/// Split `<path>/<method>/<id>`.
///
/// ```rust
/// use mqtt_rpc::network::application::rpc::topic::parse_request;
///
/// let request = parse_request("ns/dev/getTemp/a1b2").unwrap();
/// assert_eq!((request.path, request.method, request.id), ("ns/dev", "getTemp", "a1b2"));
/// assert!(parse_request("ns/getTemp/a1").is_none());
/// ```
pub fn parse_request(topic: &str) -> Option<RequestTopic<'_>> {
    let (rest, id) = topic.rsplit_once('/')?;
    let (path, method) = rest.rsplit_once('/')?;
    if !is_valid_id(id) || !is_valid_segment(method) || path.is_empty() {
        return None;
    }
    Some(RequestTopic { path, method, id })
}

/// Split `<path>/<prefix>/<method>/<id>`.
///
/// ```rust
/// use mqtt_rpc::network::application::rpc::topic::parse_response;
///
/// let reply = parse_response("ns/resp/getTemp/a1b2", "resp").unwrap();
/// assert_eq!((reply.path, reply.method, reply.id), ("ns", "getTemp", "a1b2"));
///
/// assert!(parse_response("ns/getTemp/a1b2", "resp").is_none());
/// assert!(parse_response("ns/resp/getTemp/a1", "resp").is_none());
/// ```
pub fn parse_response<'t>(topic: &'t str, prefix: &str) -> Option<ResponseTopic<'t>> {
    let (rest, id) = topic.rsplit_once('/')?;
    let (rest, method) = rest.rsplit_once('/')?;
    let (path, found) = match rest.rsplit_once('/') {
        Some((path, found)) => (path, found),
        None => ("", rest),
    };
    if found != prefix || !is_valid_segment(method) || !is_valid_id(id) {
        return None;
    }
    Some(ResponseTopic { path, method, id })
}

/// Write `<path>/<method>/<id>` into `out`.
pub fn write_request_topic(
    out: &mut String<MAX_TOPIC_LEN>,
    path: &str,
    method: &str,
    id: &str,
) -> Result<(), RpcError> {
    out.clear();
    write!(out, "{}/{}/{}", path, method, id).map_err(|_| RpcError::BufferOverflow)
}

/// Write `<path>/<prefix>/<method>/<id>` into `out`.
pub fn write_response_topic(
    out: &mut String<MAX_TOPIC_LEN>,
    path: &str,
    prefix: &str,
    method: &str,
    id: &str,
) -> Result<(), RpcError> {
    out.clear();
    write!(out, "{}/{}/{}/{}", path, prefix, method, id).map_err(|_| RpcError::BufferOverflow)
}

/// Write the filter `<path>/<prefix>/#` matching every response from `path`.
pub fn write_response_filter(
    out: &mut String<MAX_TOPIC_LEN>,
    path: &str,
    prefix: &str,
) -> Result<(), RpcError> {
    out.clear();
    write!(out, "{}/{}/#", path, prefix).map_err(|_| RpcError::BufferOverflow)
}
