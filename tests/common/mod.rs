#![allow(dead_code)]

use mqtt_rpc::codec::length::decode_remaining_length;
use mqtt_rpc::network::application::mqtt::{
    ClientObserver, ConnectFailure, DisconnectReason, MqttMessage, Publish, Publisher, QoS,
};
use mqtt_rpc::network::error::Error;
use mqtt_rpc::network::{Close, Connect, Connection, Read, Write};
use mqtt_rpc::time::TimeBase;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Both directions of a fake socket, shared between the test and the
/// connection handed to the code under test.
#[derive(Debug, Default)]
pub struct Wire {
    pub inbound: VecDeque<u8>,
    pub outbound: Vec<u8>,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub closed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MockConnection {
    pub wire: Rc<RefCell<Wire>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Helper for tests to inject data the client will read
    pub fn inject(&self, bytes: &[u8]) {
        self.wire.borrow_mut().inbound.extend(bytes.iter().copied());
    }

    /// Everything written since the last call
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.wire.borrow_mut().outbound)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.wire.borrow_mut().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.wire.borrow_mut().fail_writes = fail;
    }

    pub fn is_closed(&self) -> bool {
        self.wire.borrow().closed
    }
}

impl Read for MockConnection {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        if wire.closed || wire.fail_reads {
            return Err(Error::ReadError);
        }
        let mut count = 0;
        while count < buf.len() {
            match wire.inbound.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

impl Write for MockConnection {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        if wire.closed || wire.fail_writes {
            return Err(Error::WriteError);
        }
        wire.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for MockConnection {
    type Error = Error;

    fn close(self) -> Result<(), Self::Error> {
        self.wire.borrow_mut().closed = true;
        Ok(())
    }
}

impl Connection for MockConnection {}

/// Opens `MockConnection`s on a shared wire and counts attempts.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    pub link: MockConnection,
    pub attempts: Rc<Cell<u32>>,
    pub fail: Rc<Cell<bool>>,
    pub last_remote: Rc<RefCell<String>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let connector = Self::default();
        connector.fail.set(true);
        connector
    }
}

impl Connect for MockConnector {
    type Connection = MockConnection;
    type Error = Error;

    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error> {
        self.attempts.set(self.attempts.get() + 1);
        *self.last_remote.borrow_mut() = remote.to_string();
        if self.fail.get() {
            return Err(Error::ConnectFailed);
        }
        self.link.wire.borrow_mut().closed = false;
        Ok(self.link.clone())
    }
}

/// A settable microsecond clock.
#[derive(Debug, Clone)]
pub struct MockClock {
    now: Rc<Cell<u32>>,
    max: u32,
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClock {
    pub fn new() -> Self {
        Self::with_max(u32::MAX)
    }

    pub fn with_max(max: u32) -> Self {
        Self {
            now: Rc::new(Cell::new(0)),
            max,
        }
    }

    pub fn set_us(&self, now: u32) {
        self.now.set(now);
    }

    pub fn advance_us(&self, us: u32) {
        let now = self.now.get() as u64 + us as u64;
        self.now.set((now % (self.max as u64 + 1)) as u32);
    }

    pub fn advance_ms(&self, ms: u32) {
        self.advance_us(ms * 1000);
    }
}

impl TimeBase for MockClock {
    fn now_us(&self) -> u32 {
        self.now.get()
    }

    fn max_us(&self) -> u32 {
        self.max
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connected,
    ConnectFailed(ConnectFailure),
    Disconnected(DisconnectReason),
    Message {
        topic: String,
        payload: Vec<u8>,
        qos: QoS,
    },
}

/// Observer that records every event, optionally subscribing on connect and
/// echoing messages back.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
    pub subscribe_on_connect: Option<&'static str>,
    pub echo_to: Option<&'static str>,
    pub results: Vec<Result<u16, Error>>,
}

impl ClientObserver for Recorder {
    fn on_connect(&mut self, publisher: &mut dyn Publisher) {
        self.events.push(Event::Connected);
        if let Some(filter) = self.subscribe_on_connect {
            self.results.push(publisher.subscribe(filter, QoS::AtLeastOnce));
        }
    }

    fn on_connect_failed(&mut self, reason: ConnectFailure) {
        self.events.push(Event::ConnectFailed(reason));
    }

    fn on_disconnect(&mut self, reason: DisconnectReason) {
        self.events.push(Event::Disconnected(reason));
    }

    fn on_publish(&mut self, message: &Publish<'_>, publisher: &mut dyn Publisher) {
        self.events.push(Event::Message {
            topic: message.topic.to_string(),
            payload: message.payload.to_vec(),
            qos: message.qos,
        });
        if let Some(topic) = self.echo_to {
            self.results.push(
                publisher
                    .publish(topic, message.payload, QoS::AtMostOnce)
                    .map(|()| 0),
            );
        }
    }
}

/// A `Publisher` that only records what it was asked to send.
#[derive(Debug)]
pub struct RecordingPublisher {
    pub connected: bool,
    pub published: Vec<(String, Vec<u8>, QoS)>,
    pub subscribed: Vec<(String, QoS)>,
}

impl RecordingPublisher {
    pub fn connected() -> Self {
        Self {
            connected: true,
            published: Vec::new(),
            subscribed: Vec::new(),
        }
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), Error> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.published
            .push((topic.to_string(), payload.to_vec(), qos));
        Ok(())
    }

    fn subscribe(&mut self, filter: &str, qos: QoS) -> Result<u16, Error> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.subscribed.push((filter.to_string(), qos));
        Ok(self.subscribed.len() as u16)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

pub fn connack(return_code: u8) -> Vec<u8> {
    vec![0x20, 0x02, 0x00, return_code]
}

pub fn publish_bytes(topic: &str, payload: &[u8], qos: QoS, packet_id: u16) -> Vec<u8> {
    let mut message = MqttMessage::<512>::new();
    message
        .init_publish(topic, packet_id, qos, false, payload)
        .unwrap();
    message.as_bytes().to_vec()
}

/// Split a byte stream into complete MQTT frames.
pub fn frames(mut bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    while !bytes.is_empty() {
        let (len, used) = decode_remaining_length(&bytes[1..]).unwrap().unwrap();
        let total = 1 + used + len;
        out.push(bytes[..total].to_vec());
        bytes = &bytes[total..];
    }
    out
}

/// Load a frame into a message and validate it.
pub fn parse(frame: &[u8]) -> MqttMessage<512> {
    let mut message = MqttMessage::<512>::new();
    for &byte in frame {
        message.push_received(byte).unwrap();
    }
    message.validate_received_bytes().unwrap();
    message
}
