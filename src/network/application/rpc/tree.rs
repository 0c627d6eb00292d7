//! The node tree that routes requests and correlates responses.

use super::topic::{
    is_valid_segment, parse_request, parse_response, write_request_topic,
    write_response_filter, write_response_topic,
};
use super::{
    DEFAULT_RESPONSE_PREFIX, MAX_CHILDREN, MAX_METHOD_NAME_LEN, MAX_NODE_NAME_LEN,
    MAX_PREFIX_LEN, MAX_RESPONSE_HANDLERS, MAX_RESPONSE_LEN, MAX_TOPIC_LEN, MAX_WATCHES,
    RPC_ID_LEN, RequestId, ResponseBuffer, ResponseHandler, ResponseKey, ResponseStatus,
    RpcError, RpcHandler, RpcReply,
};
use crate::logging::{debug, info, trace, warn};
use crate::network::application::mqtt::{ClientObserver, Publish, Publisher, QoS};
use crate::time::{TimeBase, TimeDiff};
use core::fmt::Write as _;
use heapless::{FnvIndexMap, String, Vec};

/// Handle to a node of an [`RpcTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

/// The root node, whose path is the tree's namespace.
pub const ROOT: NodeId = NodeId(0);

const ID_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug)]
struct Node {
    name: String<MAX_NODE_NAME_LEN>,
    parent: Option<NodeId>,
    children: Vec<NodeId, MAX_CHILDREN>,
}

struct Method<'a> {
    node: NodeId,
    name: String<MAX_METHOD_NAME_LEN>,
    handler: &'a mut dyn RpcHandler,
}

#[derive(Debug)]
struct Pending {
    method: String<MAX_METHOD_NAME_LEN>,
    key: ResponseKey,
    issued: TimeDiff,
    timeout_ms: u32,
}

/// A tree of named nodes mirroring the topic hierarchy below a namespace.
///
/// The tree is a [`ClientObserver`]: pass it to
/// [`MqttClient::update`](crate::network::application::mqtt::MqttClient::update)
/// or [`ConnectionManager::update`](crate::network::application::mqtt::ConnectionManager::update)
/// and it subscribes on connect, answers requests for its methods, and hands
/// replies to the response handlers of outstanding calls.
///
/// Handlers are borrowed for `'a`, so they must outlive the tree. `PENDING`
/// must be a power of two.
pub struct RpcTree<
    'a,
    T,
    const NODES: usize = 8,
    const METHODS: usize = 16,
    const PENDING: usize = 8,
> {
    clock: T,
    root: String<MAX_TOPIC_LEN>,
    prefix: String<MAX_PREFIX_LEN>,
    nodes: Vec<Node, NODES>,
    methods: Vec<Method<'a>, METHODS>,
    responders: Vec<&'a mut dyn ResponseHandler, MAX_RESPONSE_HANDLERS>,
    watches: Vec<String<MAX_TOPIC_LEN>, MAX_WATCHES>,
    pending: FnvIndexMap<RequestId, Pending, PENDING>,
    id_seed: u32,
}

impl<T, const NODES: usize, const METHODS: usize, const PENDING: usize> core::fmt::Debug
    for RpcTree<'_, T, NODES, METHODS, PENDING>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RpcTree")
            .field("root", &self.root)
            .field("prefix", &self.prefix)
            .field("nodes", &self.nodes.len())
            .field("methods", &self.methods.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<'a, T: TimeBase, const NODES: usize, const METHODS: usize, const PENDING: usize>
    RpcTree<'a, T, NODES, METHODS, PENDING>
{
    /// Create a tree whose root path is `root`. The root may span several
    /// topic levels (`"site/device-7"`) but may not contain wildcards or
    /// empty levels.
    pub fn new(clock: T, root: &str) -> Result<Self, RpcError> {
        if root.is_empty() || !root.split('/').all(is_valid_segment) {
            return Err(RpcError::InvalidName);
        }
        let mut nodes = Vec::new();
        nodes
            .push(Node {
                name: String::new(),
                parent: None,
                children: Vec::new(),
            })
            .map_err(|_| RpcError::CapacityExceeded)?;
        let id_seed = clock.now_us();
        Ok(Self {
            clock,
            root: String::try_from(root).map_err(|_| RpcError::BufferOverflow)?,
            prefix: String::try_from(DEFAULT_RESPONSE_PREFIX)
                .map_err(|_| RpcError::BufferOverflow)?,
            nodes,
            methods: Vec::new(),
            responders: Vec::new(),
            watches: Vec::new(),
            pending: FnvIndexMap::new(),
            id_seed,
        })
    }

    /// Use `prefix` instead of `"resp"` for response topics.
    pub fn with_response_prefix(mut self, prefix: &str) -> Result<Self, RpcError> {
        if !is_valid_segment(prefix) {
            return Err(RpcError::InvalidName);
        }
        self.prefix = String::try_from(prefix).map_err(|_| RpcError::BufferOverflow)?;
        Ok(self)
    }

    /// The response prefix in use.
    pub fn response_prefix(&self) -> &str {
        &self.prefix
    }

    /// The root path.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Add a child node named `name` under `parent`.
    pub fn add_child(&mut self, parent: NodeId, name: &str) -> Result<NodeId, RpcError> {
        self.check_name(name)?;
        let siblings = &self.node(parent)?.children;
        if siblings
            .iter()
            .any(|&child| self.nodes[child.0].name.as_str() == name)
        {
            return Err(RpcError::DuplicateName);
        }
        if self.nodes.is_full() || siblings.is_full() {
            return Err(RpcError::CapacityExceeded);
        }
        let id = NodeId(self.nodes.len());
        let node = Node {
            name: String::try_from(name).map_err(|_| RpcError::BufferOverflow)?,
            parent: Some(parent),
            children: Vec::new(),
        };
        self.nodes
            .push(node)
            .map_err(|_| RpcError::CapacityExceeded)?;
        self.nodes[parent.0]
            .children
            .push(id)
            .map_err(|_| RpcError::CapacityExceeded)?;
        Ok(id)
    }

    /// Look up a node by its full topic path.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        let rest = path.strip_prefix(self.root.as_str())?;
        if rest.is_empty() {
            return Some(ROOT);
        }
        let mut current = ROOT;
        for segment in rest.strip_prefix('/')?.split('/') {
            current = *self.nodes[current.0]
                .children
                .iter()
                .find(|&&child| self.nodes[child.0].name.as_str() == segment)?;
        }
        Some(current)
    }

    /// Write the full topic path of `node` into `out`.
    pub fn path(&self, node: NodeId, out: &mut String<MAX_TOPIC_LEN>) -> Result<(), RpcError> {
        self.node(node)?;
        let mut chain: Vec<NodeId, NODES> = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ROOT {
                break;
            }
            chain.push(id).map_err(|_| RpcError::CapacityExceeded)?;
            current = self.nodes[id.0].parent;
        }
        out.clear();
        out.push_str(&self.root)
            .map_err(|_| RpcError::BufferOverflow)?;
        for id in chain.iter().rev() {
            write!(out, "/{}", self.nodes[id.0].name).map_err(|_| RpcError::BufferOverflow)?;
        }
        Ok(())
    }

    /// Expose `handler` as method `name` on `node`.
    pub fn register_method(
        &mut self,
        node: NodeId,
        name: &str,
        handler: &'a mut dyn RpcHandler,
    ) -> Result<(), RpcError> {
        self.node(node)?;
        self.check_name(name)?;
        if self.method_index(node, name).is_some() {
            return Err(RpcError::DuplicateName);
        }
        let method = Method {
            node,
            name: String::try_from(name).map_err(|_| RpcError::BufferOverflow)?,
            handler,
        };
        self.methods
            .push(method)
            .map_err(|_| RpcError::CapacityExceeded)
    }

    /// Register a receiver for replies to outbound calls.
    pub fn add_response_handler(
        &mut self,
        handler: &'a mut dyn ResponseHandler,
    ) -> Result<ResponseKey, RpcError> {
        let key = ResponseKey(self.responders.len());
        self.responders
            .push(handler)
            .map_err(|_| RpcError::CapacityExceeded)?;
        Ok(key)
    }

    /// Call `method` on the node at `target` with `params` as payload.
    ///
    /// The reply is delivered to the response handler behind `key`, or its
    /// `on_timeout` runs once `timeout_ms` passed without one. The first call
    /// to a target also subscribes to that target's response topics, and the
    /// subscription is repeated on every reconnect.
    pub fn call(
        &mut self,
        publisher: &mut dyn Publisher,
        target: &str,
        method: &str,
        params: &[u8],
        timeout_ms: u32,
        key: ResponseKey,
    ) -> Result<RequestId, RpcError> {
        if key.0 >= self.responders.len() {
            return Err(RpcError::UnknownResponseKey);
        }
        if !is_valid_segment(method) || method == self.prefix.as_str() {
            return Err(RpcError::InvalidName);
        }
        if target.is_empty() || !target.split('/').all(is_valid_segment) {
            return Err(RpcError::InvalidName);
        }
        if self.pending.len() >= PENDING {
            return Err(RpcError::CapacityExceeded);
        }
        let method_name: String<MAX_METHOD_NAME_LEN> =
            String::try_from(method).map_err(|_| RpcError::BufferOverflow)?;

        self.watch(publisher, target)?;

        let id = self.fresh_id()?;
        let mut request = String::new();
        write_request_topic(&mut request, target, method, id.as_str())?;
        publisher.publish(&request, params, QoS::AtMostOnce)?;
        debug!("call {} id {}", request.as_str(), id.as_str());

        let pending = Pending {
            method: method_name,
            key,
            issued: TimeDiff::new(&self.clock),
            timeout_ms,
        };
        self.pending
            .insert(id.clone(), pending)
            .map_err(|_| RpcError::CapacityExceeded)?;
        Ok(id)
    }

    /// Drop a pending request. Returns `false` if it was not pending.
    pub fn cancel(&mut self, id: &RequestId) -> bool {
        self.pending.remove(id).is_some()
    }

    /// Returns `true` while `id` waits for a reply.
    pub fn is_pending(&self, id: &RequestId) -> bool {
        self.pending.contains_key(id)
    }

    /// Number of requests waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Expire requests whose timeout elapsed. Call this at least once per
    /// clock period.
    pub fn update(&mut self) {
        let mut expired: Vec<RequestId, PENDING> = Vec::new();
        for (id, pending) in self.pending.iter_mut() {
            if pending.issued.is_elapsed_ms(&self.clock, pending.timeout_ms) {
                // Capacities match, so this cannot overflow.
                let _ = expired.push(id.clone());
            }
        }
        for id in expired {
            if let Some(pending) = self.pending.remove(&id) {
                info!("call {} timed out", id.as_str());
                if let Some(responder) = self.responders.get_mut(pending.key.0) {
                    responder.on_timeout(&pending.method, &id);
                }
            }
        }
    }

    fn watch(&mut self, publisher: &mut dyn Publisher, target: &str) -> Result<(), RpcError> {
        let mut filter = String::new();
        write_response_filter(&mut filter, target, &self.prefix)?;
        if self.watches.contains(&filter) {
            return Ok(());
        }
        if publisher.is_connected() {
            publisher.subscribe(&filter, QoS::AtLeastOnce)?;
        }
        self.watches
            .push(filter)
            .map_err(|_| RpcError::CapacityExceeded)
    }

    fn fresh_id(&mut self) -> Result<RequestId, RpcError> {
        for _ in 0..=PENDING {
            self.id_seed = self
                .id_seed
                .wrapping_mul(1_664_525)
                .wrapping_add(1_013_904_223)
                ^ self.clock.now_us();
            let mut value = self.id_seed;
            let mut text: String<RPC_ID_LEN> = String::new();
            for _ in 0..RPC_ID_LEN {
                let digit = ID_ALPHABET[(value % 36) as usize];
                value /= 36;
                text.push(digit as char)
                    .map_err(|_| RpcError::BufferOverflow)?;
            }
            let id = RequestId(text);
            if !self.pending.contains_key(&id) {
                return Ok(id);
            }
        }
        Err(RpcError::CapacityExceeded)
    }

    fn check_name(&self, name: &str) -> Result<(), RpcError> {
        if !is_valid_segment(name) || name == self.prefix.as_str() {
            Err(RpcError::InvalidName)
        } else {
            Ok(())
        }
    }

    fn node(&self, id: NodeId) -> Result<&Node, RpcError> {
        self.nodes.get(id.0).ok_or(RpcError::NodeNotFound)
    }

    fn method_index(&self, node: NodeId, name: &str) -> Option<usize> {
        self.methods
            .iter()
            .position(|m| m.node == node && m.name.as_str() == name)
    }

    /// Deliver a reply if it matches a pending request.
    fn handle_response(&mut self, topic: &str, payload: &[u8]) -> bool {
        let Some(reply) = parse_response(topic, &self.prefix) else {
            return false;
        };
        let Some(id) = RequestId::new(reply.id) else {
            return false;
        };
        let matches = self
            .pending
            .get(&id)
            .is_some_and(|pending| pending.method.as_str() == reply.method);
        if !matches {
            return false;
        }
        let Some(pending) = self.pending.remove(&id) else {
            return false;
        };
        let (status, data) = match payload.split_first() {
            Some((&status, data)) => (ResponseStatus::from_byte(status), data),
            None => (ResponseStatus::Error, payload),
        };
        trace!("reply {} status {:?}", reply.id, status);
        if let Some(responder) = self.responders.get_mut(pending.key.0) {
            responder.on_response(&RpcReply {
                node: reply.path,
                method: reply.method,
                id: reply.id,
                status,
                data,
            });
        }
        true
    }

    /// Run a local method if the topic addresses one.
    fn handle_request(&mut self, topic: &str, payload: &[u8], publisher: &mut dyn Publisher) {
        let Some(request) = parse_request(topic) else {
            return;
        };
        let Some(node) = self.find(request.path) else {
            return;
        };
        let Some(index) = self.method_index(node, request.method) else {
            trace!("no method {} on {}", request.method, request.path);
            return;
        };

        let mut output = ResponseBuffer::new();
        let result = RpcHandler::call(&mut *self.methods[index].handler, payload, &mut output);
        let status = ResponseStatus::for_result(&result);
        if let Err(err) = result {
            debug!("method {} failed: {:?}", request.method, err);
            output.clear();
        }

        let mut reply: Vec<u8, { MAX_RESPONSE_LEN + 1 }> = Vec::new();
        // Capacity is one status byte plus a full response buffer.
        let _ = reply.push(status as u8);
        let _ = reply.extend_from_slice(&output);

        let mut response = String::new();
        if write_response_topic(
            &mut response,
            request.path,
            &self.prefix,
            request.method,
            request.id,
        )
        .is_err()
        {
            warn!("response topic for {} too long", request.method);
            return;
        }
        if let Err(err) = publisher.publish(&response, &reply, QoS::AtMostOnce) {
            warn!("response to {} not sent: {:?}", request.id, err);
        }
    }
}

impl<T: TimeBase, const NODES: usize, const METHODS: usize, const PENDING: usize> ClientObserver
    for RpcTree<'_, T, NODES, METHODS, PENDING>
{
    fn on_connect(&mut self, publisher: &mut dyn Publisher) {
        let mut filter: String<MAX_TOPIC_LEN> = String::new();
        if write!(filter, "{}/#", self.root).is_ok() {
            if let Err(err) = publisher.subscribe(&filter, QoS::AtLeastOnce) {
                warn!("subscribe {} failed: {:?}", filter.as_str(), err);
            }
        }
        for watch in &self.watches {
            if let Err(err) = publisher.subscribe(watch, QoS::AtLeastOnce) {
                warn!("subscribe {} failed: {:?}", watch.as_str(), err);
            }
        }
    }

    fn on_publish(&mut self, message: &Publish<'_>, publisher: &mut dyn Publisher) {
        if self.handle_response(message.topic, message.payload) {
            return;
        }
        self.handle_request(message.topic, message.payload, publisher);
    }
}
