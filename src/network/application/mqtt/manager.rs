//! Connection supervision: reconnect delays and standoff.
//!
//! A [`ConnectionManager`] owns one [`MqttClient`] and the [`Connect`]
//! implementation used to open its transport. Failed attempts and dropped
//! sessions are counted; below the failure threshold the manager waits the
//! reconnect delay and tries again, at the threshold it enters standoff and
//! asks its [`StandoffHandler`] when it may try again.

use super::client::{
    ClientObserver, ConnectFailure, DEFAULT_BUFFER_SIZE, MqttClient, Options, State,
};
use super::message::Credentials;
use crate::config::Config;
use crate::logging::{debug, info, warn};
use crate::network::Connect;
use crate::network::error::Error;
use crate::time::{TimeBase, TimeDiff};
use core::fmt::Write as _;
use heapless::String;

/// Longest broker host name.
pub const MAX_HOST_LEN: usize = 64;

/// Longest `"host:port"` remote address.
pub const MAX_REMOTE_LEN: usize = MAX_HOST_LEN + 6;

/// Longest user name kept for reconnects.
pub const MAX_USERNAME_LEN: usize = 64;

/// Longest password kept for reconnects.
pub const MAX_PASSWORD_LEN: usize = 64;

/// Application hooks for the standoff state.
pub trait StandoffHandler {
    /// Called once each time the manager enters standoff.
    fn on_enter_standoff(&mut self) {}

    /// Polled on every update during standoff. Returning `true` ends the
    /// standoff early.
    fn can_leave_standoff(&mut self) -> bool {
        false
    }
}

/// A standoff handler that only relies on the standoff delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStandoffHandler;

impl StandoffHandler for NoStandoffHandler {}

/// Reconnect policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerOptions {
    /// Consecutive failures that trigger standoff.
    pub failure_threshold: u32,
    /// Delay between attempts below the threshold.
    pub reconnect_delay_ms: u32,
    /// Longest time spent in standoff.
    pub standoff_ms: u32,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            reconnect_delay_ms: 2_000,
            standoff_ms: 60_000,
        }
    }
}

/// Supervision state of a [`ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ManagerState {
    /// Not started, or stopped by the application.
    Stopped,
    /// Will connect on the next update.
    Ready,
    /// Waiting out the reconnect delay.
    Waiting,
    /// The client owns a transport and is connecting or connected.
    Active,
    /// Too many failures; waiting for the standoff to end.
    Standoff,
}

/// Owns an [`MqttClient`] and keeps it connected.
pub struct ConnectionManager<
    N: Connect,
    T: TimeBase + Clone,
    S: StandoffHandler = NoStandoffHandler,
    const B: usize = DEFAULT_BUFFER_SIZE,
> {
    connector: N,
    clock: T,
    standoff: S,
    client: MqttClient<N::Connection, T, B>,
    remote: String<MAX_REMOTE_LEN>,
    username: Option<String<MAX_USERNAME_LEN>>,
    password: Option<String<MAX_PASSWORD_LEN>>,
    options: ManagerOptions,
    state: ManagerState,
    failures: u32,
    timer: TimeDiff,
}

impl<N: Connect, T: TimeBase + Clone, S: StandoffHandler, const B: usize> core::fmt::Debug
    for ConnectionManager<N, T, S, B>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("remote", &self.remote)
            .field("state", &self.state)
            .field("failures", &self.failures)
            .field("client", &self.client)
            .finish()
    }
}

impl<N: Connect, T: TimeBase + Clone, S: StandoffHandler, const B: usize>
    ConnectionManager<N, T, S, B>
{
    /// Create a stopped manager for the broker at `host:port`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAddress`] if `host` is empty or too long.
    pub fn new(
        connector: N,
        clock: T,
        standoff: S,
        client_options: Options,
        host: &str,
        port: u16,
        options: ManagerOptions,
    ) -> Result<Self, Error> {
        if host.is_empty() || host.len() > MAX_HOST_LEN {
            return Err(Error::InvalidAddress);
        }
        let mut remote = String::new();
        write!(remote, "{}:{}", host, port).map_err(|_| Error::InvalidAddress)?;
        Ok(Self {
            connector,
            client: MqttClient::new(client_options, clock.clone()),
            clock,
            standoff,
            remote,
            username: None,
            password: None,
            options,
            state: ManagerState::Stopped,
            failures: 0,
            timer: TimeDiff::default(),
        })
    }

    /// Create a stopped manager from a parsed [`Config`], including any
    /// credentials it carries.
    pub fn from_config(
        connector: N,
        clock: T,
        standoff: S,
        config: &Config<'_>,
    ) -> Result<Self, Error> {
        let client_options = config.client_options()?;
        let mut manager = Self::new(
            connector,
            clock,
            standoff,
            client_options,
            config.host,
            config.port,
            config.manager_options(),
        )?;
        if let Some(username) = config.username {
            manager.set_credentials(username, config.password)?;
        }
        Ok(manager)
    }

    /// Store credentials used by every subsequent connect.
    pub fn set_credentials(&mut self, username: &str, password: Option<&str>) -> Result<(), Error> {
        let username = String::try_from(username).map_err(|_| Error::InvalidArgument)?;
        let password = match password {
            Some(password) => {
                Some(String::try_from(password).map_err(|_| Error::InvalidArgument)?)
            }
            None => None,
        };
        self.username = Some(username);
        self.password = password;
        Ok(())
    }

    /// Forget stored credentials.
    pub fn clear_credentials(&mut self) {
        self.username = None;
        self.password = None;
    }

    /// Returns `true` once a user name has been stored.
    pub fn are_credentials_set(&self) -> bool {
        self.username.is_some()
    }

    /// Enable automatic connection. The first attempt runs on the next update.
    ///
    /// # Errors
    ///
    /// [`Error::CredentialsNotSet`] if no credentials were stored.
    pub fn start(&mut self) -> Result<(), Error> {
        if !self.are_credentials_set() {
            return Err(Error::CredentialsNotSet);
        }
        if self.state == ManagerState::Stopped {
            info!("starting connection to {}", self.remote.as_str());
            self.failures = 0;
            self.state = ManagerState::Ready;
        }
        Ok(())
    }

    /// Disconnect and suppress reconnection until [`start`](Self::start).
    pub fn stop(&mut self) {
        self.client.disconnect();
        self.state = ManagerState::Stopped;
    }

    /// Drive the manager and its client. Call this from the run loop.
    pub fn update(&mut self, observer: &mut dyn ClientObserver) {
        match self.state {
            ManagerState::Stopped => self.client.update(observer),
            ManagerState::Ready => self.try_connect(observer),
            ManagerState::Waiting => {
                if self
                    .timer
                    .is_elapsed_ms(&self.clock, self.options.reconnect_delay_ms)
                {
                    self.try_connect(observer);
                }
            }
            ManagerState::Standoff => {
                if self.standoff.can_leave_standoff()
                    || self.timer.is_elapsed_ms(&self.clock, self.options.standoff_ms)
                {
                    info!("leaving standoff");
                    self.failures = 0;
                    self.try_connect(observer);
                }
            }
            ManagerState::Active => {
                let before = self.client.state();
                self.client.update(observer);
                let after = self.client.state();
                if before == State::Connecting && after == State::Connected {
                    self.failures = 0;
                }
                if after == State::Disconnected {
                    self.record_failure();
                }
            }
        }
    }

    /// Open a transport and send CONNECT. Failures at either step reach the
    /// observer as [`ConnectFailure::TransportError`].
    fn try_connect(&mut self, observer: &mut dyn ClientObserver) {
        debug!("opening {}", self.remote.as_str());
        let connection = match self.connector.connect(&self.remote) {
            Ok(connection) => connection,
            Err(_) => {
                warn!("could not open {}", self.remote.as_str());
                observer.on_connect_failed(ConnectFailure::TransportError);
                self.record_failure();
                return;
            }
        };
        let credentials = Credentials {
            username: self.username.as_deref(),
            password: self.password.as_deref(),
        };
        match self.client.connect(connection, credentials) {
            Ok(()) => self.state = ManagerState::Active,
            Err(_) => {
                observer.on_connect_failed(ConnectFailure::TransportError);
                self.record_failure();
            }
        }
    }

    fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
        self.timer.set_start(&self.clock);
        if self.failures >= self.options.failure_threshold {
            warn!("{} consecutive failures, entering standoff", self.failures);
            self.state = ManagerState::Standoff;
            self.standoff.on_enter_standoff();
        } else {
            self.state = ManagerState::Waiting;
        }
    }

    /// The supervised client.
    pub fn client(&self) -> &MqttClient<N::Connection, T, B> {
        &self.client
    }

    /// Mutable access to the supervised client, e.g. to publish.
    pub fn client_mut(&mut self) -> &mut MqttClient<N::Connection, T, B> {
        &mut self.client
    }

    /// Returns `true` while the client session is established.
    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Current supervision state.
    pub fn state(&self) -> ManagerState {
        self.state
    }

    /// Consecutive failures counted toward standoff.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// The `"host:port"` address passed to the connector.
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// The standoff handler.
    pub fn standoff_handler(&self) -> &S {
        &self.standoff
    }

    /// Mutable access to the standoff handler.
    pub fn standoff_handler_mut(&mut self) -> &mut S {
        &mut self.standoff
    }
}
