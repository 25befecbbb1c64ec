//! The [`Device`] type and supporting types.
//!
//! A device is a routing endpoint between a [`Motherboard`] and the
//! applications it hosts. It owns a port space: each port is bound to at most
//! one [`UserProcess`], and each process is bound to at most one port. The
//! device keeps the port table and the application table exact inverses of
//! each other.

use crate::{
    application::{Application, Listener, UserProcess},
    logging,
    message::Payload,
    motherboard::{DeviceId, MembershipError, Motherboard, SendError},
    ApplicationId, Message,
};
use rustc_hash::FxHashMap;
use std::{
    fmt::Debug,
    sync::{Arc, PoisonError, RwLock, Weak},
};

mod snapshot;
pub use snapshot::{AppMap, PortMap};

/// A port number, local to a device, selecting an application.
pub type Port = u16;

/// The behavior a device variant provides for broadcasts.
///
/// When a broadcast fans out from the motherboard, every attached device that
/// has opted in gets `receive_broadcast` called exactly once with the raw
/// payload. Broadcasts are not routed to ports; what to do with the payload is
/// entirely up to the implementor.
pub trait BroadcastReceiver: Send + Sync + 'static {
    fn receive_broadcast(&self, payload: &Payload);
}

impl<F> BroadcastReceiver for F
where
    F: Fn(&Payload) + Send + Sync + 'static,
{
    fn receive_broadcast(&self, payload: &Payload) {
        self(payload)
    }
}

/// A [`BroadcastReceiver`] that drops every broadcast.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreBroadcasts;

impl BroadcastReceiver for IgnoreBroadcasts {
    fn receive_broadcast(&self, _payload: &Payload) {}
}

/// A routing endpoint hosting applications on ports.
///
/// Devices are created standalone and shared behind an [`Arc`]. Attaching a
/// device to a motherboard with [`set_motherboard`](Device::set_motherboard)
/// registers it under its current identifier; the motherboard only keeps a
/// weak reference, so dropping the last handle to a device removes it from
/// its motherboard.
pub struct Device {
    state: RwLock<DeviceState>,
    receiver: Box<dyn BroadcastReceiver>,
}

pub(crate) struct DeviceState {
    pub(crate) identifier: DeviceId,
    pub(crate) motherboard: Option<Arc<Motherboard>>,
    receive_broadcast: bool,
    ports: FxHashMap<Port, Binding>,
    applications: FxHashMap<ApplicationId, Port>,
}

struct Binding {
    application: ApplicationId,
    listener: Weak<dyn Listener>,
}

impl Device {
    /// Creates a detached device with the given identifier. `receiver` is
    /// called for broadcasts while `receive_broadcast` is set.
    pub fn new(
        identifier: DeviceId,
        receive_broadcast: bool,
        receiver: impl BroadcastReceiver,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(DeviceState {
                identifier,
                motherboard: None,
                receive_broadcast,
                ports: Default::default(),
                applications: Default::default(),
            }),
            receiver: Box::new(receiver),
        })
    }

    pub(crate) fn state(&self) -> &RwLock<DeviceState> {
        &self.state
    }

    /// Sends a message up to the motherboard this device is attached to.
    pub fn send_message(&self, message: Message) -> Result<(), SendError> {
        self.attached_motherboard()?.send_message(message)
    }

    /// Validates `payload` and broadcasts it through the motherboard. Returns
    /// the number of devices the broadcast reached.
    pub fn send_broadcast_message(&self, payload: &str) -> Result<usize, SendError> {
        let payload = Payload::new(payload).map_err(|e| {
            logging::invalid_payload_event(&e.0);
            e
        })?;
        Ok(self
            .attached_motherboard()?
            .send_broadcast_message(&payload))
    }

    fn attached_motherboard(&self) -> Result<Arc<Motherboard>, SendError> {
        let state = self.state.read().unwrap();
        match &state.motherboard {
            Some(motherboard) => Ok(motherboard.clone()),
            None => {
                logging::not_attached_event(state.identifier);
                Err(SendError::NotAttached(state.identifier))
            }
        }
    }

    /// Delivers a message to the application bound to the message's port.
    pub fn receive_message(&self, message: Message) -> Result<(), SendError> {
        let port = message.port();
        // Never hold the lock while the application runs; it may send.
        let (identifier, listener) = {
            let state = self.state.read().unwrap();
            let listener = state.ports.get(&port).map(|b| b.listener.clone());
            (state.identifier, listener)
        };
        match listener.and_then(|listener| listener.upgrade()) {
            Some(listener) => {
                logging::delivery_event(identifier, port);
                listener.deliver(message);
                Ok(())
            }
            None => {
                logging::no_listener_event(port, identifier);
                Err(SendError::NoListener {
                    port,
                    device: identifier,
                })
            }
        }
    }

    /// Hands a broadcast payload to this device's [`BroadcastReceiver`].
    pub fn receive_broadcast_message(&self, payload: &Payload) {
        self.receiver.receive_broadcast(payload)
    }

    pub fn identifier(&self) -> DeviceId {
        self.state.read().unwrap().identifier
    }

    /// Changes the identifier of this device.
    ///
    /// A detached device may take any identifier. An attached device is
    /// re-registered with its motherboard under the new identifier, unless
    /// the motherboard already has a device with that identifier. That
    /// includes this device itself, so setting the current identifier again
    /// while attached fails with [`MembershipError::DuplicateId`].
    pub fn set_identifier(&self, identifier: DeviceId) -> Result<(), MembershipError> {
        loop {
            let motherboard = self.state.read().unwrap().motherboard.clone();
            match motherboard {
                Some(motherboard) => {
                    if let Some(result) = motherboard.rename(self, identifier) {
                        return result;
                    }
                }
                None => {
                    let mut state = self.state.write().unwrap();
                    if state.motherboard.is_none() {
                        state.identifier = identifier;
                        return Ok(());
                    }
                }
            }
            // Attachment changed between the two lock acquisitions.
        }
    }

    /// A snapshot of the port to application table.
    pub fn port_mapping(&self) -> PortMap {
        let state = self.state.read().unwrap();
        PortMap::new(
            state
                .ports
                .iter()
                .map(|(port, binding)| (*port, binding.application))
                .collect(),
        )
    }

    /// A snapshot of the application to port table.
    pub fn app_mapping(&self) -> AppMap {
        AppMap::new(self.state.read().unwrap().applications.clone())
    }

    pub fn is_application_connected(&self, application: ApplicationId) -> bool {
        self.state
            .read()
            .unwrap()
            .applications
            .contains_key(&application)
    }

    /// The port `application` is bound to on this device, if any.
    pub fn application_port(&self, application: ApplicationId) -> Option<Port> {
        self.state
            .read()
            .unwrap()
            .applications
            .get(&application)
            .copied()
    }

    /// Binds `process` to `port`.
    ///
    /// Fails if the port is already taken, if the process is already bound to
    /// a port on this device, or if the process is hosted by a different
    /// device.
    pub fn add_application<A: Application>(
        &self,
        port: Port,
        process: &Arc<UserProcess<A>>,
    ) -> Result<(), BindError> {
        let application = process.id();
        let mut state = self.state.write().unwrap();
        let device = state.identifier;
        if !std::ptr::eq(Arc::as_ptr(process.device()), self) {
            logging::foreign_application_event(application, device);
            return Err(BindError::ForeignApplication {
                application,
                device,
            });
        }
        if let Some(occupant) = state.ports.get(&port) {
            let occupant = occupant.application;
            logging::port_taken_event(application, port, device, occupant);
            return Err(BindError::PortTaken {
                port,
                device,
                occupant,
            });
        }
        if let Some(&bound) = state.applications.get(&application) {
            logging::already_bound_event(application, bound, port);
            return Err(BindError::AlreadyBound {
                application,
                port: bound,
            });
        }
        let listener = Arc::downgrade(process);
        let listener: Weak<dyn Listener> = listener;
        state.ports.insert(
            port,
            Binding {
                application,
                listener,
            },
        );
        state.applications.insert(application, port);
        Ok(())
    }

    /// Unbinds whatever application is on `port`, returning its ID.
    pub fn remove_application(&self, port: Port) -> Option<ApplicationId> {
        let mut state = self.state.write().unwrap();
        let binding = state.ports.remove(&port)?;
        state.applications.remove(&binding.application);
        Some(binding.application)
    }

    /// Unbinds `application` from whatever port it is on, returning the port.
    pub(crate) fn release(&self, application: ApplicationId) -> Option<Port> {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let port = state.applications.remove(&application)?;
        state.ports.remove(&port);
        Some(port)
    }

    pub fn receives_broadcast(&self) -> bool {
        self.state.read().unwrap().receive_broadcast
    }

    pub fn set_receive_broadcast(&self, receive_broadcast: bool) {
        self.state.write().unwrap().receive_broadcast = receive_broadcast;
    }

    pub fn connected_to_motherboard(&self) -> bool {
        self.state.read().unwrap().motherboard.is_some()
    }

    /// The motherboard this device is attached to, if any.
    pub fn motherboard(&self) -> Option<Arc<Motherboard>> {
        self.state.read().unwrap().motherboard.clone()
    }

    /// Attaches this device to `motherboard` under its current identifier.
    pub fn set_motherboard(
        self: &Arc<Self>,
        motherboard: &Arc<Motherboard>,
    ) -> Result<(), MembershipError> {
        motherboard.add_device(self)
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        let identifier = state.identifier;
        if let Some(motherboard) = state.motherboard.take() {
            motherboard.forget(identifier, self);
        }
    }
}

impl Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Device")
            .field("identifier", &state.identifier)
            .field("receive_broadcast", &state.receive_broadcast)
            .field("attached", &state.motherboard.is_some())
            .field("ports", &state.ports.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("port {port} on device with ID {device} is already taken by application {occupant}")]
    PortTaken {
        port: Port,
        device: DeviceId,
        occupant: ApplicationId,
    },
    #[error("application {application} is already connected to port {port}")]
    AlreadyBound {
        application: ApplicationId,
        port: Port,
    },
    #[error("application {application} is not hosted by device with ID {device}")]
    ForeignApplication {
        application: ApplicationId,
        device: DeviceId,
    },
}
