//! A poll-driven MQTT 3.1.1 client.
//!
//! [`MqttClient`] never blocks. The application opens a transport, hands it to
//! [`MqttClient::connect`], and then calls [`MqttClient::update`] from its run
//! loop. Each update drains the bytes the transport has ready, reassembles
//! and validates complete packets, dispatches them to a [`ClientObserver`],
//! and finally evaluates the connect, keep-alive and ping timers.
//!
//! ```text
//!                connect()            CONNACK(0)
//! Disconnected ───────────► Connecting ──────────► Connected
//!      ▲                        │                      │
//!      │  refused / timeout /   │      disconnect() /  │
//!      └──── transport error ───┴── ping timeout / ────┘
//!                                   transport error
//! ```

use super::message::{Credentials, MqttMessage, PacketType, QoS};
use crate::codec::length::decode_remaining_length;
use crate::logging::{debug, info, trace, warn};
use crate::network::error::Error;
use crate::network::{Close, Connection, IoStream, ReadStatus};
use crate::time::{TimeBase, TimeDiff};
use heapless::String;

/// Default capacity of the transmit and receive message buffers.
pub const DEFAULT_BUFFER_SIZE: usize = 512;

/// Longest client identifier accepted in [`Options`].
pub const MAX_CLIENT_ID_LEN: usize = 64;

/// Default time to wait for CONNACK.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u32 = 10_000;

/// Default time to wait for PINGRESP.
pub const DEFAULT_PING_TIMEOUT_MS: u32 = 10_000;

/// Configuration options for an MQTT session.
///
/// # Examples
///
/// ```rust
/// use mqtt_rpc::network::application::mqtt::Options;
///
/// let mut options = Options::new("sensor_node_1").unwrap();
/// options.keep_alive_seconds = 120;
/// assert!(options.clean_session);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// The client identifier, unique within the broker.
    pub client_id: String<MAX_CLIENT_ID_LEN>,
    /// Keep-alive interval in seconds. `0` disables keep-alive pings.
    pub keep_alive_seconds: u16,
    /// Ask the broker to discard any previous session state.
    pub clean_session: bool,
    /// How long to wait for CONNACK after sending CONNECT.
    pub connect_timeout_ms: u32,
    /// How long to wait for PINGRESP after sending PINGREQ.
    pub ping_timeout_ms: u32,
}

impl Options {
    /// Options with default timers and a clean session.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `client_id` is longer than
    /// [`MAX_CLIENT_ID_LEN`].
    pub fn new(client_id: &str) -> Result<Self, Error> {
        Ok(Self {
            client_id: String::try_from(client_id).map_err(|_| Error::InvalidArgument)?,
            keep_alive_seconds: 60,
            clean_session: true,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            ping_timeout_ms: DEFAULT_PING_TIMEOUT_MS,
        })
    }
}

/// Session state of an [`MqttClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// No transport attached.
    Disconnected,
    /// CONNECT sent, waiting for CONNACK.
    Connecting,
    /// Session established.
    Connected,
    /// DISCONNECT is being sent.
    Disconnecting,
}

/// Why a connection attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectFailure {
    /// The broker answered with a non-zero CONNACK return code.
    Refused(u8),
    /// No CONNACK arrived within the connect timeout.
    Timeout,
    /// The transport failed during the handshake.
    TransportError,
    /// Something other than CONNACK arrived first.
    UnexpectedPacket,
}

/// Why an established session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisconnectReason {
    /// [`MqttClient::disconnect`] was called.
    Requested,
    /// The transport failed to read or write.
    TransportError,
    /// No PINGRESP arrived within the ping timeout.
    PingTimeout,
}

/// The send side of a client, handed to observers so they can publish and
/// subscribe while a received message is still borrowed.
pub trait Publisher {
    /// Publish `payload` on `topic`. Only QoS 0 and 1 are supported.
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), Error>;
    /// Subscribe to `filter`, returning the packet identifier used.
    fn subscribe(&mut self, filter: &str, qos: QoS) -> Result<u16, Error>;
    /// Returns `true` while the session is established.
    fn is_connected(&self) -> bool;
}

/// A received PUBLISH, borrowed from the client's receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Publish<'m> {
    /// Topic the message was published on.
    pub topic: &'m str,
    /// Application payload.
    pub payload: &'m [u8],
    /// Delivery QoS.
    pub qos: QoS,
    /// Retain flag.
    pub retain: bool,
}

/// Receives client events. Every method has an empty default.
pub trait ClientObserver {
    /// The broker accepted the session.
    fn on_connect(&mut self, _publisher: &mut dyn Publisher) {}
    /// A connection attempt failed.
    fn on_connect_failed(&mut self, _reason: ConnectFailure) {}
    /// An established session ended.
    fn on_disconnect(&mut self, _reason: DisconnectReason) {}
    /// A PUBLISH arrived.
    fn on_publish(&mut self, _message: &Publish<'_>, _publisher: &mut dyn Publisher) {}
}

/// An observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ClientObserver for NoopObserver {}

impl<O: ClientObserver + ?Sized> ClientObserver for &mut O {
    fn on_connect(&mut self, publisher: &mut dyn Publisher) {
        (**self).on_connect(publisher)
    }

    fn on_connect_failed(&mut self, reason: ConnectFailure) {
        (**self).on_connect_failed(reason)
    }

    fn on_disconnect(&mut self, reason: DisconnectReason) {
        (**self).on_disconnect(reason)
    }

    fn on_publish(&mut self, message: &Publish<'_>, publisher: &mut dyn Publisher) {
        (**self).on_publish(message, publisher)
    }
}

/// Several observers, notified in slice order.
impl<'a> ClientObserver for [&'a mut (dyn ClientObserver + 'a)] {
    fn on_connect(&mut self, publisher: &mut dyn Publisher) {
        for observer in self.iter_mut() {
            observer.on_connect(publisher);
        }
    }

    fn on_connect_failed(&mut self, reason: ConnectFailure) {
        for observer in self.iter_mut() {
            observer.on_connect_failed(reason);
        }
    }

    fn on_disconnect(&mut self, reason: DisconnectReason) {
        for observer in self.iter_mut() {
            observer.on_disconnect(reason);
        }
    }

    fn on_publish(&mut self, message: &Publish<'_>, publisher: &mut dyn Publisher) {
        for observer in self.iter_mut() {
            observer.on_publish(message, publisher);
        }
    }
}

impl<'a, const K: usize> ClientObserver for [&'a mut (dyn ClientObserver + 'a); K] {
    fn on_connect(&mut self, publisher: &mut dyn Publisher) {
        self.as_mut_slice().on_connect(publisher)
    }

    fn on_connect_failed(&mut self, reason: ConnectFailure) {
        self.as_mut_slice().on_connect_failed(reason)
    }

    fn on_disconnect(&mut self, reason: DisconnectReason) {
        self.as_mut_slice().on_disconnect(reason)
    }

    fn on_publish(&mut self, message: &Publish<'_>, publisher: &mut dyn Publisher) {
        self.as_mut_slice().on_publish(message, publisher)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    Header,
    Length,
    Body { remaining: usize },
    Discard { remaining: usize },
}

/// Borrowed transmit half of a client.
struct Outbox<'c, C, const N: usize> {
    connection: &'c mut Option<C>,
    tx: &'c mut MqttMessage<N>,
    next_packet_id: &'c mut u16,
    transport_failed: &'c mut bool,
    state: State,
}

impl<C: IoStream, const N: usize> Outbox<'_, C, N> {
    fn packet_id(&mut self) -> u16 {
        let id = *self.next_packet_id;
        *self.next_packet_id = match id {
            u16::MAX => 1,
            id => id + 1,
        };
        id
    }

    fn send(&mut self) -> Result<(), Error> {
        send_message(self.connection, self.tx, self.transport_failed)
    }
}

impl<C: IoStream, const N: usize> Publisher for Outbox<'_, C, N> {
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), Error> {
        if self.state != State::Connected {
            return Err(Error::NotConnected);
        }
        let packet_id = match qos {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => self.packet_id(),
            QoS::ExactlyOnce => return Err(Error::InvalidArgument),
        };
        self.tx.init_publish(topic, packet_id, qos, false, payload)?;
        trace!("publish {} ({} bytes)", topic, payload.len());
        self.send()
    }

    fn subscribe(&mut self, filter: &str, qos: QoS) -> Result<u16, Error> {
        if self.state != State::Connected {
            return Err(Error::NotConnected);
        }
        if qos == QoS::ExactlyOnce {
            return Err(Error::InvalidArgument);
        }
        let packet_id = self.packet_id();
        self.tx.init_subscribe(packet_id, &[(filter, qos)])?;
        debug!("subscribe {} as packet {}", filter, packet_id);
        self.send()?;
        Ok(packet_id)
    }

    fn is_connected(&self) -> bool {
        self.state == State::Connected
    }
}

fn send_message<C: IoStream, const N: usize>(
    connection: &mut Option<C>,
    message: &MqttMessage<N>,
    transport_failed: &mut bool,
) -> Result<(), Error> {
    let connection = connection.as_mut().ok_or(Error::NotConnected)?;
    if connection.write_bytes(message.as_bytes()) {
        Ok(())
    } else {
        *transport_failed = true;
        Err(Error::WriteError)
    }
}

/// An MQTT 3.1.1 client driven by [`update`](MqttClient::update).
///
/// # Type Parameters
///
/// * `C` - The transport, any [`Connection`]
/// * `T` - The clock, any [`TimeBase`]
/// * `N` - Capacity of the transmit and receive buffers in bytes
///
/// # Examples
///
/// ```rust
/// use mqtt_rpc::network::application::mqtt::{
///     Credentials, MqttClient, NoopObserver, Options, State,
/// };
/// use mqtt_rpc::time::TimeBase;
/// # use mqtt_rpc::network::Connection;
/// # struct Loopback;
/// # impl Connection for Loopback {}
/// # impl mqtt_rpc::network::Read for Loopback {
/// #     type Error = ();
/// #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
/// # }
/// # impl mqtt_rpc::network::Write for Loopback {
/// #     type Error = ();
/// #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
/// #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
/// # }
/// # impl mqtt_rpc::network::Close for Loopback {
/// #     type Error = ();
/// #     fn close(self) -> Result<(), Self::Error> { Ok(()) }
/// # }
/// struct Clock;
/// impl TimeBase for Clock {
///     fn now_us(&self) -> u32 { 0 }
/// }
///
/// let mut client: MqttClient<Loopback, Clock> =
///     MqttClient::new(Options::new("device-1").unwrap(), Clock);
/// client.connect(Loopback, Credentials::default()).unwrap();
/// assert_eq!(client.state(), State::Connecting);
///
/// // Called from the run loop.
/// client.update(&mut NoopObserver);
/// ```
pub struct MqttClient<C, T, const N: usize = DEFAULT_BUFFER_SIZE> {
    options: Options,
    clock: T,
    connection: Option<C>,
    state: State,
    tx: MqttMessage<N>,
    rx: MqttMessage<N>,
    rx_state: RxState,
    next_packet_id: u16,
    transport_failed: bool,
    connect_timer: TimeDiff,
    keep_alive_timer: TimeDiff,
    ping_timer: TimeDiff,
    ping_outstanding: bool,
    failed_connects: u32,
    pending_disconnect: Option<DisconnectReason>,
}

impl<C, T, const N: usize> core::fmt::Debug for MqttClient<C, T, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MqttClient")
            .field("client_id", &self.options.client_id)
            .field("state", &self.state)
            .field("failed_connects", &self.failed_connects)
            .finish()
    }
}

impl<C: Connection, T: TimeBase, const N: usize> MqttClient<C, T, N> {
    /// Create a disconnected client.
    pub fn new(options: Options, clock: T) -> Self {
        Self {
            options,
            clock,
            connection: None,
            state: State::Disconnected,
            tx: MqttMessage::new(),
            rx: MqttMessage::new(),
            rx_state: RxState::Header,
            next_packet_id: 1,
            transport_failed: false,
            connect_timer: TimeDiff::default(),
            keep_alive_timer: TimeDiff::default(),
            ping_timer: TimeDiff::default(),
            ping_outstanding: false,
            failed_connects: 0,
            pending_disconnect: None,
        }
    }

    /// Current session state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Returns `true` while the session is established.
    pub fn is_connected(&self) -> bool {
        self.state == State::Connected
    }

    /// Connection attempts that failed since the last accepted CONNACK.
    pub fn failed_connects(&self) -> u32 {
        self.failed_connects
    }

    /// Session options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Replace the session options. Takes effect on the next connect.
    pub fn set_options(&mut self, options: Options) {
        self.options = options;
    }

    /// Start the handshake over an opened transport.
    ///
    /// Sends CONNECT and starts the connect timer; the outcome is reported
    /// through the observer passed to a later [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidState`] - the client is not disconnected
    /// * [`Error::WriteError`] - CONNECT could not be written
    /// * [`Error::Codec`] - CONNECT does not fit the transmit buffer
    ///
    /// On error the transport is closed and the attempt counts as failed.
    pub fn connect(&mut self, connection: C, credentials: Credentials<'_>) -> Result<(), Error> {
        if self.state != State::Disconnected {
            close_connection(connection);
            return Err(Error::InvalidState);
        }
        self.connection = Some(connection);
        self.rx.reset();
        self.rx_state = RxState::Header;
        self.transport_failed = false;
        self.ping_outstanding = false;
        self.pending_disconnect = None;

        let sent = self
            .tx
            .init_connect(
                &self.options.client_id,
                self.options.keep_alive_seconds,
                self.options.clean_session,
                credentials,
            )
            .map_err(Error::from)
            .and_then(|()| {
                send_message(&mut self.connection, &self.tx, &mut self.transport_failed)
            });
        if let Err(err) = sent {
            warn!("CONNECT not sent: {:?}", err);
            self.close_transport();
            self.failed_connects = self.failed_connects.saturating_add(1);
            return Err(err);
        }

        self.state = State::Connecting;
        self.connect_timer.set_start(&self.clock);
        debug!("CONNECT sent as {}", self.options.client_id.as_str());
        Ok(())
    }

    /// Send DISCONNECT if connected and close the transport.
    ///
    /// Observers hear `on_disconnect(Requested)` on the next update.
    pub fn disconnect(&mut self) {
        let was = self.state;
        if was == State::Disconnected {
            return;
        }
        if was == State::Connected {
            self.state = State::Disconnecting;
            if self.tx.init_disconnect().is_ok() {
                let _ = send_message(&mut self.connection, &self.tx, &mut self.transport_failed);
            }
            self.pending_disconnect = Some(DisconnectReason::Requested);
        }
        self.close_transport();
        self.state = State::Disconnected;
        info!("disconnected on request");
    }

    /// Drive the client: deliver pending notices, drain inbound bytes,
    /// dispatch complete packets and evaluate timers.
    ///
    /// Timers only see time pass between calls, so call this at least once
    /// per [`TimeBase::max_us`] period.
    pub fn update(&mut self, observer: &mut dyn ClientObserver) {
        if let Some(reason) = self.pending_disconnect.take() {
            observer.on_disconnect(reason);
        }
        if self.state == State::Disconnected || self.state == State::Disconnecting {
            return;
        }
        if self.transport_failed {
            self.transport_error(observer);
            return;
        }

        loop {
            let status = match self.connection.as_mut() {
                Some(connection) => connection.read_byte(),
                None => ReadStatus::Error,
            };
            match status {
                ReadStatus::NoData => break,
                ReadStatus::Error => {
                    self.transport_error(observer);
                    return;
                }
                ReadStatus::Data(byte) => {
                    if self.feed(byte) {
                        self.dispatch(observer);
                        if self.state == State::Disconnected {
                            return;
                        }
                    }
                }
            }
        }

        if self.transport_failed {
            self.transport_error(observer);
            return;
        }
        self.check_timers(observer);
    }

    /// Push one byte through the framer. Returns `true` when the receive
    /// buffer holds a complete packet.
    fn feed(&mut self, byte: u8) -> bool {
        match self.rx_state {
            RxState::Header => {
                self.rx.reset();
                if self.rx.push_received(byte).is_err() {
                    return false;
                }
                self.rx_state = RxState::Length;
                false
            }
            RxState::Length => {
                if self.rx.push_received(byte).is_err() {
                    warn!("receive buffer too small for a fixed header");
                    self.rx_state = RxState::Header;
                    return false;
                }
                match decode_remaining_length(&self.rx.as_bytes()[1..]) {
                    Ok(None) => false,
                    Ok(Some((0, _))) => {
                        self.rx_state = RxState::Header;
                        true
                    }
                    Ok(Some((remaining, _))) => {
                        if self.rx.as_bytes().len() + remaining > N {
                            warn!("skipping {} byte packet, buffer holds {}", remaining, N);
                            self.rx_state = RxState::Discard { remaining };
                        } else {
                            self.rx_state = RxState::Body { remaining };
                        }
                        false
                    }
                    Err(err) => {
                        warn!("bad remaining length: {:?}", err);
                        self.rx_state = RxState::Header;
                        false
                    }
                }
            }
            RxState::Body { remaining } => {
                if self.rx.push_received(byte).is_err() {
                    self.rx_state = RxState::Discard {
                        remaining: remaining - 1,
                    };
                    return false;
                }
                if remaining == 1 {
                    self.rx_state = RxState::Header;
                    true
                } else {
                    self.rx_state = RxState::Body {
                        remaining: remaining - 1,
                    };
                    false
                }
            }
            RxState::Discard { remaining } => {
                self.rx_state = match remaining {
                    0 | 1 => RxState::Header,
                    n => RxState::Discard { remaining: n - 1 },
                };
                false
            }
        }
    }

    fn dispatch(&mut self, observer: &mut dyn ClientObserver) {
        let packet_type = match self.rx.validate_received_bytes() {
            Ok(packet_type) => packet_type,
            Err(err) => {
                warn!("dropping malformed packet: {:?}", err);
                return;
            }
        };
        trace!("received {:?}", packet_type);

        match (self.state, packet_type) {
            (State::Connecting, PacketType::ConnAck) => match self.rx.connack_return_code() {
                Ok(0) => {
                    self.state = State::Connected;
                    self.failed_connects = 0;
                    self.ping_outstanding = false;
                    self.keep_alive_timer.set_start(&self.clock);
                    info!("connected as {}", self.options.client_id.as_str());
                    observer.on_connect(&mut self.outbox());
                }
                Ok(code) => self.connect_failed(observer, ConnectFailure::Refused(code)),
                Err(_) => self.connect_failed(observer, ConnectFailure::UnexpectedPacket),
            },
            (State::Connecting, _) => {
                self.connect_failed(observer, ConnectFailure::UnexpectedPacket)
            }
            (State::Connected, PacketType::Publish) => self.handle_publish(observer),
            (State::Connected, PacketType::PingResp) => {
                self.ping_outstanding = false;
                self.keep_alive_timer.set_start(&self.clock);
            }
            (State::Connected, PacketType::SubAck) => {
                if let Ok(codes) = self.rx.suback_return_codes() {
                    if codes.contains(&0x80) {
                        warn!("subscription refused");
                    }
                }
            }
            (State::Connected, PacketType::PubAck) => {
                if let Ok(id) = self.rx.packet_id() {
                    trace!("packet {} acknowledged", id);
                }
            }
            (_, other) => warn!("ignoring unexpected {:?}", other),
        }
    }

    fn handle_publish(&mut self, observer: &mut dyn ClientObserver) {
        let Self {
            rx,
            tx,
            connection,
            next_packet_id,
            transport_failed,
            state,
            ..
        } = self;

        let (topic, payload, qos, retain) =
            match (rx.topic_name(), rx.payload(), rx.qos(), rx.retain()) {
                (Ok(topic), Ok(payload), Ok(qos), Ok(retain)) => (topic, payload, qos, retain),
                _ => {
                    warn!("dropping unreadable PUBLISH");
                    return;
                }
            };

        match qos {
            QoS::AtMostOnce => {}
            QoS::AtLeastOnce => {
                let acked = rx
                    .packet_id()
                    .and_then(|id| tx.init_puback(id))
                    .map_err(Error::from)
                    .and_then(|()| send_message(connection, tx, transport_failed));
                if let Err(err) = acked {
                    warn!("PUBACK not sent: {:?}", err);
                }
            }
            QoS::ExactlyOnce => warn!("QoS 2 delivery is not acknowledged"),
        }

        let message = Publish {
            topic,
            payload,
            qos,
            retain,
        };
        let mut outbox = Outbox {
            connection,
            tx,
            next_packet_id,
            transport_failed,
            state: *state,
        };
        observer.on_publish(&message, &mut outbox);
    }

    fn check_timers(&mut self, observer: &mut dyn ClientObserver) {
        match self.state {
            State::Connecting => {
                if self
                    .connect_timer
                    .is_elapsed_ms(&self.clock, self.options.connect_timeout_ms)
                {
                    warn!("no CONNACK within {} ms", self.options.connect_timeout_ms);
                    self.connect_failed(observer, ConnectFailure::Timeout);
                }
            }
            State::Connected if self.options.keep_alive_seconds > 0 => {
                if self.ping_outstanding {
                    if self
                        .ping_timer
                        .is_elapsed_ms(&self.clock, self.options.ping_timeout_ms)
                    {
                        warn!("no PINGRESP within {} ms", self.options.ping_timeout_ms);
                        self.session_lost(observer, DisconnectReason::PingTimeout);
                    }
                } else if self.keep_alive_timer.is_elapsed_ms(
                    &self.clock,
                    u32::from(self.options.keep_alive_seconds) * 1000,
                ) {
                    let sent = self
                        .tx
                        .init_pingreq()
                        .map_err(Error::from)
                        .and_then(|()| {
                            send_message(&mut self.connection, &self.tx, &mut self.transport_failed)
                        });
                    match sent {
                        Ok(()) => {
                            trace!("PINGREQ sent");
                            self.ping_outstanding = true;
                            self.ping_timer.set_start(&self.clock);
                        }
                        Err(_) => self.transport_error(observer),
                    }
                }
            }
            _ => {}
        }
    }

    fn transport_error(&mut self, observer: &mut dyn ClientObserver) {
        match self.state {
            State::Connecting => self.connect_failed(observer, ConnectFailure::TransportError),
            State::Connected => self.session_lost(observer, DisconnectReason::TransportError),
            _ => {
                self.close_transport();
                self.state = State::Disconnected;
            }
        }
    }

    fn connect_failed(&mut self, observer: &mut dyn ClientObserver, reason: ConnectFailure) {
        warn!("connect failed: {:?}", reason);
        self.close_transport();
        self.state = State::Disconnected;
        self.failed_connects = self.failed_connects.saturating_add(1);
        observer.on_connect_failed(reason);
    }

    fn session_lost(&mut self, observer: &mut dyn ClientObserver, reason: DisconnectReason) {
        warn!("session lost: {:?}", reason);
        self.close_transport();
        self.state = State::Disconnected;
        observer.on_disconnect(reason);
    }

    fn close_transport(&mut self) {
        if let Some(connection) = self.connection.take() {
            close_connection(connection);
        }
        self.transport_failed = false;
        self.ping_outstanding = false;
        self.rx_state = RxState::Header;
    }

    fn outbox(&mut self) -> Outbox<'_, C, N> {
        Outbox {
            connection: &mut self.connection,
            tx: &mut self.tx,
            next_packet_id: &mut self.next_packet_id,
            transport_failed: &mut self.transport_failed,
            state: self.state,
        }
    }
}

impl<C: Connection, T: TimeBase, const N: usize> Publisher for MqttClient<C, T, N> {
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), Error> {
        self.outbox().publish(topic, payload, qos)
    }

    fn subscribe(&mut self, filter: &str, qos: QoS) -> Result<u16, Error> {
        self.outbox().subscribe(filter, qos)
    }

    fn is_connected(&self) -> bool {
        self.state == State::Connected
    }
}

fn close_connection<C: Close>(connection: C) {
    if connection.close().is_err() {
        debug!("transport close reported an error");
    }
}
