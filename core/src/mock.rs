//! Scripted collaborators for host tests
//!
//! Every mock appends to a shared [`CallLog`] so tests can assert the order of
//! commands across components. The station and listener publish their events
//! on the bus the provisioner's event handler consumes.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use provision_hal::{
    BroadcastKey, BroadcastListener, CredentialStore, DriverError, ProtocolVersion, StationDriver,
    StoreError, StoreKey, StoredCredentials, SyncCallback, SyncMode, TimeSyncClient, Timestamp,
};

use crate::events::{BroadcastCredentials, ConnectionEvent, EventBus};

pub const TEST_BUS_DEPTH: usize = 16;

pub type TestBus = EventBus<NoopRawMutex, TEST_BUS_DEPTH>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    StationInit(String),
    StationStart,
    StationStop,
    Connect,
    Disconnect,
    SetActiveConfig(StoredCredentials),
    ListenerConfigure(ProtocolVersion, bool),
    ListenerStart,
    ListenerStop,
    StoreInit,
    StoreErase,
    StoreSet(&'static str, Vec<u8>),
    SyncMode(SyncMode),
    SyncServer(String),
    SyncCallback,
    SyncStart,
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.0.borrow().iter().filter(|c| *c == call).count()
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.0.borrow().iter().position(|c| c == call)
    }

    /// Index of the first `call` after index `from`
    pub fn position_after(&self, from: usize, call: &Call) -> Option<usize> {
        self.0
            .borrow()
            .iter()
            .skip(from + 1)
            .position(|c| c == call)
            .map(|i| i + from + 1)
    }
}

pub fn credentials(ssid: &str, password: &str) -> StoredCredentials {
    StoredCredentials::new(ssid.as_bytes(), password.as_bytes()).unwrap()
}

pub fn broadcast(ssid: &str, password: &str, aux: &str) -> ConnectionEvent {
    ConnectionEvent::BroadcastCredentialsReceived(BroadcastCredentials {
        ssid: heapless::Vec::from_slice(ssid.as_bytes()).unwrap(),
        password: heapless::Vec::from_slice(password.as_bytes()).unwrap(),
        bssid: None,
        aux_data: heapless::Vec::from_slice(aux.as_bytes()).unwrap(),
    })
}

pub const GOT_IP: ConnectionEvent = ConnectionEvent::GotIp {
    address: [192, 168, 1, 50],
};

/// Station whose connect attempts follow a script
///
/// Each `connect` pops the next event list; once the script is exhausted an
/// attempt ends in `StationDisconnected`, like an access point that is gone.
pub struct MockStation<'a> {
    bus: &'a TestBus,
    log: CallLog,
    active: StoredCredentials,
    script: VecDeque<Vec<ConnectionEvent>>,
    associating: bool,
    pub fail_init: bool,
    pub fail_connect: bool,
}

impl<'a> MockStation<'a> {
    pub fn new(bus: &'a TestBus, log: CallLog, active: StoredCredentials) -> Self {
        Self {
            bus,
            log,
            active,
            script: VecDeque::new(),
            associating: false,
            fail_init: false,
            fail_connect: false,
        }
    }

    pub fn script(mut self, attempts: Vec<Vec<ConnectionEvent>>) -> Self {
        self.script = attempts.into();
        self
    }

    fn emit(&self, event: ConnectionEvent) {
        self.bus.publish(event).unwrap();
    }
}

impl StationDriver for MockStation<'_> {
    fn init(&mut self, hostname: &str) -> Result<(), DriverError> {
        self.log.push(Call::StationInit(hostname.into()));
        if self.fail_init {
            return Err(DriverError::Internal);
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), DriverError> {
        self.log.push(Call::StationStart);
        self.emit(ConnectionEvent::StationStarted);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        self.log.push(Call::StationStop);
        self.associating = false;
        self.emit(ConnectionEvent::StationStopped);
        Ok(())
    }

    fn connect(&mut self) -> Result<(), DriverError> {
        self.log.push(Call::Connect);
        if self.fail_connect {
            return Err(DriverError::InvalidState);
        }

        self.associating = true;
        let events = self
            .script
            .pop_front()
            .unwrap_or_else(|| vec![ConnectionEvent::StationDisconnected]);
        for event in events {
            if event == ConnectionEvent::StationDisconnected {
                self.associating = false;
            }
            self.emit(event);
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), DriverError> {
        self.log.push(Call::Disconnect);
        if self.associating {
            self.associating = false;
            self.emit(ConnectionEvent::StationDisconnected);
        }
        Ok(())
    }

    fn active_config(&self) -> Result<StoredCredentials, DriverError> {
        Ok(self.active.clone())
    }

    fn set_active_config(&mut self, credentials: &StoredCredentials) -> Result<(), DriverError> {
        self.log.push(Call::SetActiveConfig(credentials.clone()));
        self.active = credentials.clone();
        Ok(())
    }
}

/// Listener that replays a fixed event sequence when started
pub struct MockListener<'a> {
    bus: &'a TestBus,
    log: CallLog,
    events: Vec<ConnectionEvent>,
}

impl<'a> MockListener<'a> {
    pub fn new(bus: &'a TestBus, log: CallLog, events: Vec<ConnectionEvent>) -> Self {
        Self { bus, log, events }
    }
}

impl BroadcastListener for MockListener<'_> {
    fn configure(
        &mut self,
        version: ProtocolVersion,
        key: Option<&BroadcastKey>,
    ) -> Result<(), DriverError> {
        self.log.push(Call::ListenerConfigure(version, key.is_some()));
        Ok(())
    }

    fn start(&mut self) -> Result<(), DriverError> {
        self.log.push(Call::ListenerStart);
        for event in self.events.iter().cloned() {
            self.bus.publish(event).unwrap();
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        self.log.push(Call::ListenerStop);
        Ok(())
    }
}

/// In-memory store; clones share contents
#[derive(Clone)]
pub struct MockStore {
    log: CallLog,
    data: Rc<RefCell<HashMap<(&'static str, &'static str), Vec<u8>>>>,
    init_errors: Rc<RefCell<VecDeque<StoreError>>>,
    pub fail_set: bool,
}

impl MockStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            data: Rc::default(),
            init_errors: Rc::default(),
            fail_set: false,
        }
    }

    /// Make the next `init` calls fail with `errors`, in order
    pub fn with_init_errors(self, errors: &[StoreError]) -> Self {
        self.init_errors.borrow_mut().extend(errors.iter().copied());
        self
    }

    pub fn insert(&mut self, key: StoreKey, value: &[u8]) {
        self.data
            .borrow_mut()
            .insert((key.namespace, key.name), value.to_vec());
    }

    pub fn value(&self, key: StoreKey) -> Option<Vec<u8>> {
        self.data.borrow().get(&(key.namespace, key.name)).cloned()
    }
}

impl CredentialStore for MockStore {
    fn init(&mut self) -> Result<(), StoreError> {
        self.log.push(Call::StoreInit);
        match self.init_errors.borrow_mut().pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        self.log.push(Call::StoreErase);
        self.data.borrow_mut().clear();
        Ok(())
    }

    fn get(&self, key: StoreKey, buf: &mut [u8]) -> Result<usize, StoreError> {
        let data = self.data.borrow();
        let value = data
            .get(&(key.namespace, key.name))
            .ok_or(StoreError::NotFound)?;
        let dest = buf
            .get_mut(..value.len())
            .ok_or(StoreError::BufferTooSmall)?;
        dest.copy_from_slice(value);
        Ok(value.len())
    }

    fn set(&mut self, key: StoreKey, value: &[u8]) -> Result<(), StoreError> {
        self.log.push(Call::StoreSet(key.name, value.to_vec()));
        if self.fail_set {
            return Err(StoreError::WriteFailed);
        }
        self.insert(key, value);
        Ok(())
    }
}

pub struct MockTimeSync {
    log: CallLog,
    callback: Option<SyncCallback>,
    pub fail_start: bool,
}

impl MockTimeSync {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            callback: None,
            fail_start: false,
        }
    }

    /// Simulate a completed synchronization
    pub fn fire(&self, ts: Timestamp) {
        if let Some(callback) = self.callback {
            callback(ts);
        }
    }
}

impl TimeSyncClient for MockTimeSync {
    fn set_mode(&mut self, mode: SyncMode) -> Result<(), DriverError> {
        self.log.push(Call::SyncMode(mode));
        Ok(())
    }

    fn set_server(&mut self, address: &str) -> Result<(), DriverError> {
        self.log.push(Call::SyncServer(address.into()));
        Ok(())
    }

    fn register_callback(&mut self, callback: SyncCallback) -> Result<(), DriverError> {
        self.log.push(Call::SyncCallback);
        self.callback = Some(callback);
        Ok(())
    }

    fn start(&mut self) -> Result<(), DriverError> {
        self.log.push(Call::SyncStart);
        if self.fail_start {
            return Err(DriverError::Internal);
        }
        Ok(())
    }
}
