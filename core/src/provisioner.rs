#![deny(unsafe_code)]
//! Connection state machine
//!
//! Tries the credentials the station driver already holds, falls back to
//! broadcast provisioning when they fail, and gates time sync and timezone
//! setup on a working link.
//!
//! Two halves share one [`Provisioner`]:
//! - [`Provisioner::connect`] issues commands and suspends on the rendezvous
//! - [`Provisioner::handle_event`] (or [`Provisioner::run_event_handler`])
//!   reacts to bus events, applies the retry policy and raises signals
//!
//! Only the event handler raises signals; only `connect` consumes them.
//!
//! # Example
//!
//! ```ignore
//! static BUS: EventBus<CriticalSectionRawMutex> = EventBus::new();
//!
//! let provisioner = Provisioner::<CriticalSectionRawMutex, _, _, _>::new(
//!     ConnectionConfig::default(),
//!     station,
//!     smartconfig,
//!     nvs,
//! );
//! provisioner.provision(&BUS, &mut sntp).await?;
//! ```

use core::cell::RefCell;
use core::future::Future;
use core::pin::pin;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use provision_hal::{
    BroadcastListener, CredentialStore, StationDriver, StoredCredentials, TimeSyncClient,
};

use crate::config::{ConnectionConfig, TIMEZONE_KEY};
use crate::error::ProvisionError;
use crate::events::{BroadcastCredentials, ConnectionEvent, EventBus};
use crate::post_connect;
use crate::retry::{RetryAction, RetryPolicy};
use crate::signal::{Rendezvous, SignalBits};
use crate::time::Timezone;

/// Where the state machine is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProvisionState {
    /// No attempt made yet
    #[default]
    Idle,
    /// Waiting on the stored credentials
    AttemptingStored,
    /// Stored credentials worked
    Connected,
    /// Stored credentials failed; about to listen for a broadcast
    StoredFailed,
    /// Broadcast listener running
    ListeningBroadcast,
    /// Got an IP with broadcast credentials, handshake not yet finished
    BroadcastConnected,
    /// Broadcast phase failed
    BroadcastFailed,
    /// Caller's deadline fired while listening
    BroadcastTimedOut,
    /// Broadcast handshake finished
    Done,
}

struct Components<D, L, S> {
    station: D,
    listener: L,
    store: S,
}

struct Shared {
    state: ProvisionState,
    retry: RetryPolicy,
    /// Why the handler last raised `FAILED`
    failure: Option<ProvisionError>,
    /// `connect` returned success; link losses no longer count as retries
    online: bool,
    time_sync_started: bool,
}

/// Wi-Fi provisioning state machine
///
/// `M` guards the state shared with the event handler: use
/// `CriticalSectionRawMutex` when events are handled at another priority,
/// `NoopRawMutex` when everything runs in one task.
pub struct Provisioner<M: RawMutex, D, L, S> {
    config: ConnectionConfig,
    components: Mutex<M, RefCell<Components<D, L, S>>>,
    shared: Mutex<M, RefCell<Shared>>,
    signals: Rendezvous<M>,
}

impl<M, D, L, S> Provisioner<M, D, L, S>
where
    M: RawMutex,
    D: StationDriver,
    L: BroadcastListener,
    S: CredentialStore,
{
    /// Create an idle provisioner owning its collaborators
    pub fn new(config: ConnectionConfig, station: D, listener: L, store: S) -> Self {
        let retry = RetryPolicy::with_limit(config.max_retries);
        Self {
            config,
            components: Mutex::new(RefCell::new(Components {
                station,
                listener,
                store,
            })),
            shared: Mutex::new(RefCell::new(Shared {
                state: ProvisionState::Idle,
                retry,
                failure: None,
                online: false,
                time_sync_started: false,
            })),
            signals: Rendezvous::new(),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Current state
    pub fn state(&self) -> ProvisionState {
        self.with_shared(|s| s.state)
    }

    /// Consecutive disconnects counted in the current phase
    pub fn retry_count(&self) -> u8 {
        self.with_shared(|s| s.retry.count())
    }

    fn with_components<R>(&self, f: impl FnOnce(&mut Components<D, L, S>) -> R) -> R {
        self.components.lock(|c| f(&mut c.borrow_mut()))
    }

    fn with_shared<R>(&self, f: impl FnOnce(&mut Shared) -> R) -> R {
        self.shared.lock(|s| f(&mut s.borrow_mut()))
    }

    fn set_state(&self, state: ProvisionState) {
        debug!("Provisioning state: {:?}", state);
        self.with_shared(|s| s.state = state);
    }

    /// Prepare the store and the station driver
    ///
    /// A store that is full or was written by an incompatible version is
    /// erased and initialized again. Every failure is `Config`.
    pub fn init(&self) -> Result<(), ProvisionError> {
        self.config.validate().map_err(|e| {
            error!("Invalid connection configuration");
            e
        })?;

        self.with_components(|c| match c.store.init() {
            Err(e) if e.needs_erase() => {
                warn!("Credential store unusable ({:?}), erasing", e);
                c.store.erase()?;
                c.store.init()
            }
            other => other,
        })
        .map_err(|e| {
            error!("Credential store init failed: {:?}", e);
            ProvisionError::Config
        })?;

        self.with_components(|c| c.station.init(self.config.hostname))
            .map_err(|e| {
                error!("Station init failed: {:?}", e);
                ProvisionError::Config
            })?;

        info!("Provisioner initialized as {}", self.config.hostname);
        Ok(())
    }

    /// Start the radio in station mode
    pub fn start_station(&self) -> Result<(), ProvisionError> {
        self.with_components(|c| c.station.start()).map_err(|e| {
            error!("Station start failed: {:?}", e);
            ProvisionError::from(e)
        })
    }

    /// Stop the radio
    pub fn stop_station(&self) -> Result<(), ProvisionError> {
        self.with_components(|c| c.station.stop()).map_err(|e| {
            error!("Station stop failed: {:?}", e);
            ProvisionError::from(e)
        })
    }

    /// Acquire a connection, waiting as long as it takes
    ///
    /// Tries the stored credentials first; if they fail, listens for a
    /// broadcast until the phone app delivers working credentials or the
    /// phase fails. Requires the event handler to run concurrently.
    pub async fn connect(&self) -> Result<(), ProvisionError> {
        self.connect_with_deadline(core::future::pending::<()>())
            .await
    }

    /// [`connect`](Self::connect) with a bound on the broadcast phase
    ///
    /// `deadline` is only polled while listening for a broadcast; when it
    /// completes first the listener and station are stopped and
    /// `BroadcastTimeout` is returned.
    pub async fn connect_with_deadline<F: Future>(
        &self,
        deadline: F,
    ) -> Result<(), ProvisionError> {
        // Leftovers from an earlier attempt must not satisfy this one
        self.signals.take(SignalBits::ALL);

        let credentials = self
            .with_components(|c| c.station.active_config())
            .map_err(|e| {
                error!("Reading stored credentials failed: {:?}", e);
                ProvisionError::StoreRead
            })?;
        log_credentials(&credentials);

        self.with_shared(|s| {
            s.retry.reset();
            s.failure = None;
            s.online = false;
        });
        self.set_state(ProvisionState::AttemptingStored);
        if let Err(e) = self.start_station() {
            self.set_state(ProvisionState::Idle);
            return Err(e);
        }

        let hit = self
            .signals
            .wait_any(SignalBits::CONNECTED | SignalBits::FAILED)
            .await;
        if hit.highest() == Some(SignalBits::CONNECTED) {
            info!("Connected with stored credentials");
            self.go_online(ProvisionState::Connected);
            return Ok(());
        }

        let cause = self.take_failure();
        warn!("Stored credentials failed ({:?}), listening for broadcast", cause);
        self.with_shared(|s| s.retry.reset());
        self.set_state(ProvisionState::StoredFailed);

        if let Err(e) = self.start_listener() {
            self.stop_listener();
            let _ = self.stop_station();
            self.set_state(ProvisionState::BroadcastFailed);
            return Err(e);
        }
        self.set_state(ProvisionState::ListeningBroadcast);

        let mut deadline = pin!(deadline);
        loop {
            let hit = match select(self.signals.wait_any(SignalBits::ALL), deadline.as_mut()).await
            {
                Either::First(hit) => hit,
                Either::Second(_) => {
                    warn!("Broadcast provisioning timed out");
                    self.stop_listener();
                    let _ = self.stop_station();
                    self.set_state(ProvisionState::BroadcastTimedOut);
                    return Err(ProvisionError::BroadcastTimeout);
                }
            };

            // Highest priority first; a Failed raised in the same wake as
            // Connected lost the race and is dropped
            let mut pending = hit;
            while let Some(bit) = pending.highest() {
                pending = pending.difference(bit);

                if bit == SignalBits::CONNECTED {
                    info!("Connected with broadcast credentials, waiting for handshake");
                    self.set_state(ProvisionState::BroadcastConnected);
                    pending = pending.difference(SignalBits::FAILED);
                } else if bit == SignalBits::FAILED {
                    let cause = self.take_failure();
                    error!("Broadcast provisioning failed: {:?}", cause);
                    self.stop_listener();
                    let _ = self.stop_station();
                    self.set_state(ProvisionState::BroadcastFailed);
                    return Err(cause);
                } else {
                    info!("Broadcast provisioning complete");
                    self.stop_listener();
                    self.go_online(ProvisionState::Done);
                    return Ok(());
                }
            }
        }
    }

    /// One [`connect`](Self::connect) with the event handler running alongside
    ///
    /// For executors that drive both halves from a single task.
    pub async fn connect_with<const N: usize>(
        &self,
        bus: &EventBus<M, N>,
    ) -> Result<(), ProvisionError> {
        match select(self.connect(), self.run_event_handler(bus)).await {
            Either::First(result) => result,
            Either::Second(never) => never,
        }
    }

    /// Process entry: [`provision`](Self::provision), then handle events for
    /// the life of the process
    ///
    /// Keeps link-loss reconnects working and the bus drained once online.
    /// Returns only if initialization or time sync setup fails.
    pub async fn run<T: TimeSyncClient, const N: usize>(
        &self,
        bus: &EventBus<M, N>,
        time_client: &mut T,
    ) -> ProvisionError {
        if let Err(e) = self.provision(bus, time_client).await {
            error!("Provisioning aborted: {:?}", e);
            return e;
        }
        self.run_event_handler(bus).await
    }

    /// Full bootstrap: init, connect until it works, then time and timezone
    ///
    /// Connection failures are retried without limit. A missing or unreadable
    /// timezone is logged and leaves local time in UTC.
    ///
    /// The event handler only runs while connecting. Afterwards the caller
    /// must keep [`run_event_handler`](Self::run_event_handler) going on the
    /// same bus, or use [`run`](Self::run) instead.
    pub async fn provision<T: TimeSyncClient, const N: usize>(
        &self,
        bus: &EventBus<M, N>,
        time_client: &mut T,
    ) -> Result<(), ProvisionError> {
        self.init()?;

        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.wrapping_add(1);
            match self.connect_with(bus).await {
                Ok(()) => break,
                Err(e) => warn!("Provisioning attempt {} failed: {:?}", attempt, e),
            }
        }

        self.init_time_sync(time_client)?;

        match self.init_timezone() {
            Ok(_) => {}
            Err(ProvisionError::NotFound) => info!("No timezone stored, using UTC"),
            Err(e) => warn!("Timezone not applied: {:?}", e),
        }
        Ok(())
    }

    /// Start time sync against the configured server; later calls do nothing
    pub fn init_time_sync<T: TimeSyncClient>(
        &self,
        client: &mut T,
    ) -> Result<(), ProvisionError> {
        if self.with_shared(|s| s.time_sync_started) {
            debug!("Time sync already running");
            return Ok(());
        }
        post_connect::init_time_sync(client, self.config.time_server)?;
        self.with_shared(|s| s.time_sync_started = true);
        Ok(())
    }

    /// Apply the timezone captured with the broadcast credentials
    pub fn init_timezone(&self) -> Result<Timezone, ProvisionError> {
        self.with_components(|c| post_connect::init_timezone(&c.store))
    }

    /// Process events from `bus` forever
    pub async fn run_event_handler<const N: usize>(&self, bus: &EventBus<M, N>) -> ! {
        loop {
            let event = bus.next().await;
            self.handle_event(event);
        }
    }

    /// React to one event
    ///
    /// Never blocks; safe to call from the context that receives driver
    /// callbacks as long as `M` allows it.
    pub fn handle_event(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::StationStarted => {
                debug!("Station started, connecting");
                self.issue_connect();
            }
            ConnectionEvent::StationDisconnected => self.on_disconnected(),
            ConnectionEvent::GotIp { address } => {
                info!(
                    "Got IP {}.{}.{}.{}",
                    address[0], address[1], address[2], address[3]
                );
                self.with_shared(|s| s.retry.on_connected());
                self.signals.raise(SignalBits::CONNECTED);
            }
            ConnectionEvent::BroadcastCredentialsReceived(credentials) => {
                self.on_credentials(credentials);
            }
            ConnectionEvent::BroadcastAckSent => {
                debug!("Broadcast acknowledged to phone");
                self.signals.raise(SignalBits::BROADCAST_DONE);
            }
            ConnectionEvent::BroadcastScanDone => info!("Broadcast scan done"),
            ConnectionEvent::BroadcastChannelFound => info!("Broadcast channel found"),
            ConnectionEvent::StationConnectedL2 => debug!("Associated, waiting for IP"),
            ConnectionEvent::StationStopped => debug!("Station stopped"),
        }
    }

    fn on_disconnected(&self) {
        let decision = self.with_shared(|s| {
            if s.online {
                None
            } else {
                Some((s.retry.on_disconnect(), s.retry.count()))
            }
        });

        match decision {
            None => {
                warn!("Link lost, reconnecting");
                self.issue_connect();
            }
            Some((RetryAction::Retry, count)) => {
                info!(
                    "Disconnected, retry {}/{}",
                    count, self.config.max_retries
                );
                self.issue_connect();
            }
            Some((RetryAction::GiveUp, _)) => {
                warn!("Connection retries exhausted");
                self.fail(ProvisionError::RetryExhausted);
            }
        }
    }

    fn on_credentials(&self, received: BroadcastCredentials) {
        let BroadcastCredentials {
            ssid,
            password,
            bssid,
            aux_data,
        } = received;
        let credentials = StoredCredentials {
            ssid,
            password,
            bssid,
        };
        info!(
            "Broadcast credentials received for {}",
            credentials.ssid_str().unwrap_or("<non-UTF-8 SSID>")
        );

        // Durable before the new network is used
        if let Err(e) = self.with_components(|c| c.store.set(TIMEZONE_KEY, &aux_data)) {
            error!("Persisting timezone failed: {:?}, credentials dropped", e);
            self.disconnect_station();
            self.fail(ProvisionError::StoreWrite);
            return;
        }

        self.disconnect_station();
        if let Err(e) = self.with_components(|c| c.station.set_active_config(&credentials)) {
            error!("Applying broadcast credentials failed: {:?}", e);
            self.fail(ProvisionError::Driver);
            return;
        }
        self.issue_connect();
    }

    fn issue_connect(&self) {
        if let Err(e) = self.with_components(|c| c.station.connect()) {
            error!("Connect command failed: {:?}", e);
            self.disconnect_station();
            self.fail(ProvisionError::ConnectIssue);
        }
    }

    fn disconnect_station(&self) {
        if let Err(e) = self.with_components(|c| c.station.disconnect()) {
            warn!("Disconnect failed: {:?}", e);
        }
    }

    fn fail(&self, cause: ProvisionError) {
        self.with_shared(|s| s.failure = Some(cause));
        self.signals.raise(SignalBits::FAILED);
    }

    fn take_failure(&self) -> ProvisionError {
        self.with_shared(|s| s.failure.take())
            .unwrap_or(ProvisionError::RetryExhausted)
    }

    fn go_online(&self, state: ProvisionState) {
        self.with_shared(|s| s.online = true);
        self.set_state(state);
    }

    fn start_listener(&self) -> Result<(), ProvisionError> {
        let protocol = self.config.protocol;
        let key = self.config.broadcast_key.as_ref();
        self.with_components(|c| {
            c.listener.configure(protocol, key)?;
            c.listener.start()
        })
        .map_err(|e| {
            error!("Broadcast listener start failed: {:?}", e);
            ProvisionError::Driver
        })
    }

    fn stop_listener(&self) {
        if let Err(e) = self.with_components(|c| c.listener.stop()) {
            warn!("Broadcast listener stop failed: {:?}", e);
        }
    }
}

fn log_credentials(credentials: &StoredCredentials) {
    if credentials.is_empty() {
        info!("No stored credentials");
    } else {
        info!(
            "Trying stored network {}",
            credentials.ssid_str().unwrap_or("<non-UTF-8 SSID>")
        );
    }
}
